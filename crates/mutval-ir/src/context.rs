//! IR context and the set of modules loaded through it.

use crate::module::{Function, Module, IR_VERSION};
use mutval_core::{Error, FunctionRef, ModuleId, Result};
use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Owns module identity and the accepted IR format version.
///
/// A context is created once and passed by reference; every [`Program`]
/// borrows it, so no loaded module can outlive the context it came from.
#[derive(Debug)]
pub struct Context {
    format_version: u32,
    next_module: Cell<u32>,
}

impl Context {
    pub fn new() -> Self {
        Self::with_format_version(IR_VERSION)
    }

    pub fn with_format_version(format_version: u32) -> Self {
        Self {
            format_version,
            next_module: Cell::new(0),
        }
    }

    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    fn allocate_id(&self) -> ModuleId {
        let id = self.next_module.get();
        self.next_module.set(id + 1);
        ModuleId(id)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// A module owned by a program, plus its mutation bookkeeping
#[derive(Debug)]
pub struct LoadedModule {
    id: ModuleId,
    identifier: String,
    module: Module,
    mutant_clones: Option<BTreeMap<String, usize>>,
    applied: BTreeSet<String>,
}

impl LoadedModule {
    pub fn id(&self) -> ModuleId {
        self.id
    }

    /// Name used in diagnostics (the path the module was read from)
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn module_mut(&mut self) -> &mut Module {
        &mut self.module
    }

    pub fn is_prepared(&self) -> bool {
        self.mutant_clones.is_some()
    }

    /// Record which function each mutant is applied to. Allowed once.
    pub fn set_mutant_clones(&mut self, clones: BTreeMap<String, usize>) -> Result<()> {
        if self.mutant_clones.is_some() {
            return Err(Error::InvalidState(format!(
                "mutations for {} were already prepared",
                self.identifier
            )));
        }
        self.mutant_clones = Some(clones);
        Ok(())
    }

    /// Function reserved for the given mutant by the preparation pass
    pub fn mutant_clone(&self, mutant: &str) -> Option<usize> {
        self.mutant_clones.as_ref()?.get(mutant).copied()
    }

    pub fn is_applied(&self, mutant: &str) -> bool {
        self.applied.contains(mutant)
    }

    /// Returns false if the mutant was already marked as applied
    pub fn mark_applied(&mut self, mutant: &str) -> bool {
        self.applied.insert(mutant.to_string())
    }

    pub fn num_applied(&self) -> usize {
        self.applied.len()
    }
}

/// All modules taking part in one validation run
#[derive(Debug)]
pub struct Program<'ctx> {
    context: &'ctx Context,
    modules: Vec<LoadedModule>,
}

impl<'ctx> Program<'ctx> {
    pub fn new(context: &'ctx Context) -> Self {
        Self {
            context,
            modules: Vec::new(),
        }
    }

    pub fn context(&self) -> &'ctx Context {
        self.context
    }

    /// Load a module from disk and add it to the program
    pub fn load(&mut self, path: &Path) -> Result<ModuleId> {
        let module = crate::loader::load_module(path, self.context)?;
        Ok(self.add(module, path.display().to_string()))
    }

    /// Add an in-memory module
    pub fn add(&mut self, module: Module, identifier: impl Into<String>) -> ModuleId {
        let id = self.context.allocate_id();
        self.modules.push(LoadedModule {
            id,
            identifier: identifier.into(),
            module,
            mutant_clones: None,
            applied: BTreeSet::new(),
        });
        id
    }

    pub fn modules(&self) -> &[LoadedModule] {
        &self.modules
    }

    pub fn modules_mut(&mut self) -> &mut [LoadedModule] {
        &mut self.modules
    }

    pub fn module(&self, id: ModuleId) -> Option<&LoadedModule> {
        self.modules.iter().find(|m| m.id == id)
    }

    pub fn module_mut(&mut self, id: ModuleId) -> Option<&mut LoadedModule> {
        self.modules.iter_mut().find(|m| m.id == id)
    }

    pub fn function(&self, func: FunctionRef) -> Option<&Function> {
        self.module(func.module)?.module.get_function(func.function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ReturnType;

    #[test]
    fn test_module_ids_are_unique_per_context() {
        let context = Context::new();
        let mut program = Program::new(&context);
        let a = program.add(Module::new("a"), "a.bc");
        let b = program.add(Module::new("b"), "b.bc");
        assert_ne!(a, b);
        assert_eq!(program.module(b).unwrap().identifier(), "b.bc");
    }

    #[test]
    fn test_function_lookup() {
        let context = Context::new();
        let mut program = Program::new(&context);
        let mut module = Module::new("m");
        module.add_function(Function::new("f", 0, ReturnType::Void));
        let id = program.add(module, "m.bc");

        assert_eq!(program.function(FunctionRef::new(id, 0)).unwrap().name, "f");
        assert!(program.function(FunctionRef::new(id, 1)).is_none());
        assert!(program.function(FunctionRef::new(ModuleId(99), 0)).is_none());
    }

    #[test]
    fn test_mutant_clones_set_once() {
        let context = Context::new();
        let mut program = Program::new(&context);
        let id = program.add(Module::new("m"), "m.bc");
        let loaded = program.module_mut(id).unwrap();

        assert!(!loaded.is_prepared());
        let mut clones = BTreeMap::new();
        clones.insert("mutant".to_string(), 3);
        loaded.set_mutant_clones(clones).unwrap();
        assert!(loaded.is_prepared());
        assert_eq!(loaded.mutant_clone("mutant"), Some(3));
        assert_eq!(loaded.mutant_clone("other"), None);

        assert!(matches!(
            loaded.set_mutant_clones(BTreeMap::new()),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_mark_applied() {
        let context = Context::new();
        let mut program = Program::new(&context);
        let id = program.add(Module::new("m"), "m.bc");
        let loaded = program.module_mut(id).unwrap();
        assert!(!loaded.is_applied("x"));
        assert!(loaded.mark_applied("x"));
        assert!(loaded.is_applied("x"));
        assert!(!loaded.mark_applied("x"));
        assert_eq!(loaded.num_applied(), 1);
    }
}

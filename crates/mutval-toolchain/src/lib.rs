//! Native compilation of IR modules.
//!
//! Modules are lowered to WebAssembly by [`mutval_ir::Compiler`] and then
//! compiled ahead of time by wasmtime's Cranelift backend for the configured
//! target.

use mutval_core::{CompilerConfig, Error, OptLevel, Result, TargetConfig};
use mutval_ir::{Compiler, Module};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};
use wasmtime::{Config, Engine};

/// Code generation target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDescription {
    /// Target triple, `None` for the host
    pub triple: Option<String>,
    pub opt_level: OptLevel,
}

impl TargetDescription {
    pub fn host() -> Self {
        Self::default()
    }

    pub fn from_config(config: &TargetConfig) -> Self {
        Self {
            triple: config.triple.clone(),
            opt_level: config.opt_level,
        }
    }

    pub fn is_host(&self) -> bool {
        self.triple.is_none()
    }

    fn engine_config(&self) -> Result<Config> {
        let mut config = Config::new();
        config.cranelift_opt_level(match self.opt_level {
            OptLevel::None => wasmtime::OptLevel::None,
            OptLevel::Speed => wasmtime::OptLevel::Speed,
            OptLevel::SpeedAndSize => wasmtime::OptLevel::SpeedAndSize,
        });
        if let Some(triple) = &self.triple {
            config.target(triple).map_err(|e| {
                Error::Config(format!("unsupported target '{}': {}", triple, e))
            })?;
        }
        Ok(config)
    }
}

/// Result of compiling one module
#[derive(Debug, Clone)]
pub struct CompiledArtifact {
    /// Lowered WebAssembly
    pub wasm: Vec<u8>,
    /// Precompiled machine code for the target
    pub native: Vec<u8>,
}

/// Lowering plus native code generation for one target
pub struct Toolchain {
    engine: Engine,
    target: TargetDescription,
    compiler: Compiler,
}

impl Toolchain {
    pub fn new(target: &TargetDescription, compiler: CompilerConfig) -> Result<Self> {
        let engine = Engine::new(&target.engine_config()?)
            .map_err(|e| Error::Config(format!("failed to create engine: {}", e)))?;
        debug!(
            triple = target.triple.as_deref().unwrap_or("host"),
            opt_level = ?target.opt_level,
            "Created toolchain"
        );

        Ok(Self {
            engine,
            target: target.clone(),
            compiler: Compiler::new(compiler),
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn target(&self) -> &TargetDescription {
        &self.target
    }

    pub fn compile(&self, module: &Module) -> Result<CompiledArtifact> {
        let start = Instant::now();
        let wasm = self.compiler.compile(module)?;
        let native = self
            .engine
            .precompile_module(&wasm)
            .map_err(|e| Error::Compilation {
                module: module.name.clone(),
                reason: e.to_string(),
            })?;

        info!(
            module = %module.name,
            wasm_bytes = wasm.len(),
            native_bytes = native.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Compiled module"
        );
        Ok(CompiledArtifact { wasm, native })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mutval_ir::{
        Context, Function, Instruction, Opcode, Program, Register, ReturnType,
        FUNCTION_EXPORT_PREFIX, SWITCH_EXPORT_PREFIX,
    };
    use mutval_mutation::{
        apply_mutation, build_testees, prepare_program, Filter, Mutator, MutationsFinder,
    };
    use wasmtime::{Instance, Store, Val};

    fn add_module() -> mutval_ir::Module {
        let mut add = Function::new("add", 2, ReturnType::Int).with_locals(1);
        add.blocks[0].instructions = vec![
            Instruction::arithmetic(Opcode::Add, Register(2), Register(0), Register(1)),
            Instruction::return_value(Register(2)),
        ];
        mutval_ir::Module::with_functions("arith", vec![add])
    }

    #[test]
    fn test_create_host_toolchain() {
        let toolchain = Toolchain::new(&TargetDescription::host(), CompilerConfig::default());
        assert!(toolchain.is_ok());
        assert!(toolchain.unwrap().target().is_host());
    }

    #[test]
    fn test_unknown_triple_is_rejected() {
        let target = TargetDescription {
            triple: Some("not-a-real-triple".to_string()),
            opt_level: OptLevel::Speed,
        };
        assert!(matches!(
            Toolchain::new(&target, CompilerConfig::default()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_from_config() {
        let config = TargetConfig {
            triple: Some("x86_64-unknown-linux-gnu".to_string()),
            opt_level: OptLevel::None,
        };
        let target = TargetDescription::from_config(&config);
        assert_eq!(target.triple.as_deref(), Some("x86_64-unknown-linux-gnu"));
        assert_eq!(target.opt_level, OptLevel::None);
        assert!(!target.is_host());
    }

    #[test]
    fn test_compile_produces_native_code() {
        let toolchain = Toolchain::new(&TargetDescription::host(), CompilerConfig::default()).unwrap();
        let artifact = toolchain.compile(&add_module()).unwrap();
        assert!(!artifact.wasm.is_empty());
        assert!(!artifact.native.is_empty());
    }

    #[test]
    fn test_function_named_like_memory_export_compiles() {
        let mut module = add_module();
        module.functions[0].name = "memory".to_string();
        assert!(mutval_ir::verify_module(&module).is_empty());

        let toolchain = Toolchain::new(&TargetDescription::host(), CompilerConfig::default()).unwrap();
        let artifact = toolchain.compile(&module).unwrap();

        let compiled = wasmtime::Module::new(toolchain.engine(), &artifact.wasm).unwrap();
        let mut store = Store::new(toolchain.engine(), ());
        let instance = Instance::new(&mut store, &compiled, &[]).unwrap();
        let func = instance
            .get_typed_func::<(i32, i32), i32>(&mut store, "fn:memory")
            .unwrap();
        assert_eq!(func.call(&mut store, (2, 3)).unwrap(), 5);
        assert!(instance.get_memory(&mut store, "memory").is_some());
    }

    #[test]
    fn test_switches_select_mutant_at_runtime() {
        let context = Context::new();
        let mut program = Program::new(&context);
        let id = program.add(add_module(), "arith.bc");
        let testees = build_testees(&program);
        let points = MutationsFinder::new(vec![Mutator::AddToSub]).find(&program, &testees, &Filter);
        assert_eq!(points.len(), 1);
        prepare_program(&mut program, &points).unwrap();
        apply_mutation(&mut program, &points[0]).unwrap();

        let toolchain = Toolchain::new(&TargetDescription::host(), CompilerConfig::default()).unwrap();
        let artifact = toolchain.compile(program.module(id).unwrap().module()).unwrap();

        let module = wasmtime::Module::new(toolchain.engine(), &artifact.wasm).unwrap();
        let mut store = Store::new(toolchain.engine(), ());
        let instance = Instance::new(&mut store, &module, &[]).unwrap();
        let add = instance
            .get_typed_func::<(i32, i32), i32>(&mut store, &format!("{}add", FUNCTION_EXPORT_PREFIX))
            .unwrap();

        assert_eq!(add.call(&mut store, (7, 3)).unwrap(), 10);

        let switch_name = format!("{}{}", SWITCH_EXPORT_PREFIX, points[0].identifier);
        let switch = instance.get_global(&mut store, &switch_name).unwrap();
        switch.set(&mut store, Val::I32(1)).unwrap();
        assert_eq!(add.call(&mut store, (7, 3)).unwrap(), 4);
    }
}

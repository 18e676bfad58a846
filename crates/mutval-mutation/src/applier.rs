//! Two-phase application of mutation points.
//!
//! [`prepare_mutations`] runs once per module. Every function that owns
//! mutation points is split into an untouched copy, one clone per point and a
//! trampoline that keeps the original name and signature. The trampoline
//! reads one switch per mutant and forwards to the selected clone, or to the
//! untouched copy when every switch is off. [`apply_mutation`] then rewrites
//! a point's instruction inside its own clone, so points never interfere with
//! each other and the unmutated behaviour stays reachable.

use crate::point::MutationPoint;
use mutval_core::{Error, Result};
use mutval_ir::{
    BasicBlock, Function, Instruction, LoadedModule, Location, Module, Program, Register, ReturnType,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Run the preparation pass on every module of the program
pub fn prepare_program(program: &mut Program<'_>, points: &[MutationPoint]) -> Result<()> {
    for loaded in program.modules_mut() {
        prepare_mutations(loaded, points)?;
    }
    Ok(())
}

/// Isolate the functions owning `points` (points of other modules are
/// ignored). May be called once per module.
pub fn prepare_mutations(loaded: &mut LoadedModule, points: &[MutationPoint]) -> Result<()> {
    if loaded.is_prepared() {
        return Err(Error::InvalidState(format!(
            "mutations for {} were already prepared",
            loaded.identifier()
        )));
    }

    let id = loaded.id();
    let mut by_function: BTreeMap<usize, Vec<&MutationPoint>> = BTreeMap::new();
    for point in points.iter().filter(|p| p.module == id) {
        by_function
            .entry(point.location.function)
            .or_default()
            .push(point);
    }

    let mut clones = BTreeMap::new();
    let module = loaded.module_mut();
    for (func_idx, func_points) in &by_function {
        let original = module.get_function(*func_idx).cloned().ok_or_else(|| {
            Error::Application {
                mutant: func_points[0].identifier.clone(),
                reason: format!("function {} does not exist", func_idx),
            }
        })?;

        let untouched = Function {
            name: fresh_name(module, &format!("{}$original", original.name)),
            ..original.clone()
        };
        let fallback = module.add_function(untouched);

        let mut targets = Vec::with_capacity(func_points.len());
        for (k, point) in func_points.iter().enumerate() {
            let clone = Function {
                name: fresh_name(module, &format!("{}$m{}", original.name, k)),
                ..original.clone()
            };
            let clone_idx = module.add_function(clone);
            if module.switches.contains(&point.identifier) {
                return Err(Error::InvalidState(format!(
                    "module already has a switch named {}",
                    point.identifier
                )));
            }
            let switch = module.add_switch(point.identifier.clone());
            if clones.insert(point.identifier.clone(), clone_idx as usize).is_some() {
                return Err(Error::InvalidState(format!(
                    "mutation point {} listed twice",
                    point.identifier
                )));
            }
            targets.push((switch, clone_idx));
        }

        module.functions[*func_idx] = trampoline(&original, fallback, &targets)?;
        debug!(
            function = %original.name,
            mutants = targets.len(),
            "Isolated function for mutation"
        );
    }

    info!(
        module = loaded.identifier(),
        functions = by_function.len(),
        mutants = clones.len(),
        "Prepared mutations"
    );
    loaded.set_mutant_clones(clones)
}

/// `stem`, or `stem.N` for the first N no function of `module` uses yet
fn fresh_name(module: &Module, stem: &str) -> String {
    let mut name = stem.to_string();
    let mut suffix = 1;
    while module.find_function(&name).is_some() {
        name = format!("{}.{}", stem, suffix);
        suffix += 1;
    }
    name
}

/// Function with `original`'s signature that dispatches on the mutant switches
fn trampoline(original: &Function, fallback: u32, targets: &[(u32, u32)]) -> Result<Function> {
    let num_params = original.num_params;
    if num_params > u8::MAX as usize {
        return Err(Error::InvalidState(format!(
            "function '{}' has too many parameters to forward",
            original.name
        )));
    }
    let scratch = Register(num_params as u8);
    let args: Vec<Register> = (0..num_params).map(|i| Register(i as u8)).collect();

    let forward = |target: u32| {
        let block = match original.return_type {
            ReturnType::Int => vec![
                Instruction::call(target, Some(scratch), &args),
                Instruction::return_value(scratch),
            ],
            ReturnType::Void => vec![
                Instruction::call(target, None, &args),
                Instruction::return_void(),
            ],
        };
        BasicBlock::with_instructions(block)
    };

    // Blocks 0..k test switch i and jump to block k + 1 + i; block k
    // forwards to the untouched copy.
    let k = targets.len();
    let mut blocks = Vec::with_capacity(2 * k + 1);
    for (i, (switch, _)) in targets.iter().enumerate() {
        blocks.push(BasicBlock::with_instructions(vec![
            Instruction::read_switch(scratch, *switch),
            Instruction::branch_if(scratch, (k + 1 + i) as u32),
        ]));
    }
    blocks.push(forward(fallback));
    for (_, clone) in targets {
        blocks.push(forward(*clone));
    }

    Ok(Function {
        name: original.name.clone(),
        num_params,
        num_locals: 1,
        blocks,
        return_type: original.return_type,
    })
}

/// Rewrite the instruction of one prepared mutation point.
/// Each point can be applied once.
pub fn apply_mutation(program: &mut Program<'_>, point: &MutationPoint) -> Result<()> {
    let fail = |reason: String| Error::Application {
        mutant: point.identifier.clone(),
        reason,
    };

    let loaded = program
        .module_mut(point.module)
        .ok_or_else(|| fail(format!("{} is not loaded", point.module)))?;
    if !loaded.is_prepared() {
        return Err(fail(format!(
            "mutations were not prepared for {}",
            loaded.identifier()
        )));
    }
    let clone = loaded
        .mutant_clone(&point.identifier)
        .ok_or_else(|| fail("no function was prepared for this mutant".to_string()))?;
    if loaded.is_applied(&point.identifier) {
        return Err(fail("mutation was already applied".to_string()));
    }

    let location = Location {
        function: clone,
        ..point.location
    };
    let inst = loaded
        .module_mut()
        .instruction_mut(location)
        .ok_or_else(|| fail(format!("no instruction at {}", location)))?;
    let before = inst.to_string();
    point
        .mutator
        .apply(inst, point.variant)
        .map_err(|e| fail(e.to_string()))?;
    debug!(mutant = %point, before = %before, after = %inst, "Applied mutation");

    loaded.mark_applied(&point.identifier);
    Ok(())
}

//! Structural verification of IR modules.
//!
//! A module that passes verification can be lowered by
//! [`Compiler`](crate::compiler::Compiler) as long as its memory fits the
//! configured page limit.

use crate::instruction::{Instruction, Opcode, Operand};
use crate::module::{Function, Module, ReturnType};
use mutval_core::{Error, Result};
use std::collections::HashSet;
use std::fmt;

/// One well-formedness violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub function: Option<String>,
    pub block: Option<usize>,
    pub instruction: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    fn module(message: String) -> Self {
        Self {
            function: None,
            block: None,
            instruction: None,
            message,
        }
    }

    fn function(func: &Function, message: String) -> Self {
        Self {
            function: Some(func.name.clone()),
            ..Self::module(message)
        }
    }

    fn block(func: &Function, block: usize, message: String) -> Self {
        Self {
            block: Some(block),
            ..Self::function(func, message)
        }
    }

    fn instruction(func: &Function, block: usize, instruction: usize, message: String) -> Self {
        Self {
            instruction: Some(instruction),
            ..Self::block(func, block, message)
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(function) = &self.function {
            write!(f, "function '{}'", function)?;
            if let Some(block) = self.block {
                write!(f, " block {}", block)?;
            }
            if let Some(instruction) = self.instruction {
                write!(f, " instruction {}", instruction)?;
            }
            write!(f, ": ")?;
        }
        f.write_str(&self.message)
    }
}

/// Collect every structural problem in a module
pub fn verify_module(module: &Module) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let mut names = HashSet::new();
    for func in &module.functions {
        if func.name.is_empty() {
            diagnostics.push(Diagnostic::module("function with empty name".to_string()));
        } else if !names.insert(func.name.as_str()) {
            diagnostics.push(Diagnostic::module(format!(
                "duplicate function name '{}'",
                func.name
            )));
        }
    }

    let mut switches = HashSet::new();
    for switch in &module.switches {
        if !switches.insert(switch.as_str()) {
            diagnostics.push(Diagnostic::module(format!(
                "duplicate switch name '{}'",
                switch
            )));
        }
    }

    for func in &module.functions {
        verify_function(module, func, &mut diagnostics);
    }

    diagnostics
}

/// Verify a module, writing diagnostics to `sink` when given.
/// Returns true if the module is well-formed.
pub fn verify(module: &Module, sink: Option<&mut dyn fmt::Write>) -> bool {
    let diagnostics = verify_module(module);
    if let Some(sink) = sink {
        for diagnostic in &diagnostics {
            // A failing sink must not change the verdict
            let _ = writeln!(sink, "{}", diagnostic);
        }
    }
    diagnostics.is_empty()
}

/// Verification gate used by the pipeline
#[derive(Debug, Default, Clone, Copy)]
pub struct Verifier;

impl Verifier {
    pub fn new() -> Self {
        Self
    }

    /// Fails with [`Error::Verification`] naming `identifier`
    pub fn check(&self, module: &Module, identifier: &str) -> Result<()> {
        let diagnostics = verify_module(module);
        if diagnostics.is_empty() {
            return Ok(());
        }
        for diagnostic in &diagnostics {
            tracing::error!(module = identifier, "{}", diagnostic);
        }
        let details = diagnostics
            .iter()
            .map(|d| format!("  {}", d))
            .collect::<Vec<_>>()
            .join("\n");
        Err(Error::Verification {
            module: identifier.to_string(),
            details,
        })
    }
}

fn verify_function(module: &Module, func: &Function, diagnostics: &mut Vec<Diagnostic>) {
    if func.blocks.is_empty() {
        diagnostics.push(Diagnostic::function(func, "has no basic blocks".to_string()));
        return;
    }

    for (block_idx, block) in func.blocks.iter().enumerate() {
        if block.is_empty() {
            diagnostics.push(Diagnostic::block(func, block_idx, "is empty".to_string()));
            continue;
        }

        let last = block.len() - 1;
        for (inst_idx, inst) in block.instructions.iter().enumerate() {
            let mut report = |message: String| {
                diagnostics.push(Diagnostic::instruction(func, block_idx, inst_idx, message));
            };

            if inst_idx == last && !inst.opcode.is_terminator() {
                report(format!("block ends with non-terminator '{}'", inst));
            } else if inst_idx != last && inst.opcode.is_terminator() {
                report(format!("terminator '{}' in the middle of a block", inst));
            }

            verify_instruction(module, func, block_idx, inst, &mut report);
        }
    }
}

fn verify_instruction(
    module: &Module,
    func: &Function,
    block_idx: usize,
    inst: &Instruction,
    report: &mut dyn FnMut(String),
) {
    let num_registers = func.num_registers();
    if let Some(dest) = inst.dest {
        if dest.0 as usize >= num_registers {
            report(format!(
                "destination {} out of range ({} registers)",
                dest, num_registers
            ));
        }
    }
    for operand in &inst.operands {
        if let Operand::Register(reg) = operand {
            if reg.0 as usize >= num_registers {
                report(format!(
                    "operand {} out of range ({} registers)",
                    reg, num_registers
                ));
            }
        }
    }

    let expect_values = |operands: &[Operand], report: &mut dyn FnMut(String)| {
        for operand in operands {
            if !operand.is_value() {
                report(format!("operand '{}' is not a register or immediate", operand));
            }
        }
    };
    let expect_block = |operand: Option<&Operand>, report: &mut dyn FnMut(String)| match operand {
        Some(Operand::BlockIndex(target)) if (*target as usize) < func.blocks.len() => {}
        Some(Operand::BlockIndex(target)) => {
            report(format!("branch target bb{} does not exist", target))
        }
        _ => report("branch without block target".to_string()),
    };

    match inst.opcode {
        Opcode::Call => match inst.operands.first() {
            Some(Operand::FunctionIndex(idx)) => match module.get_function(*idx as usize) {
                Some(callee) => {
                    let args = &inst.operands[1..];
                    if args.len() != callee.num_params {
                        report(format!(
                            "call to '{}' passes {} arguments, expected {}",
                            callee.name,
                            args.len(),
                            callee.num_params
                        ));
                    }
                    expect_values(args, &mut *report);
                    if callee.return_type == ReturnType::Void && inst.dest.is_some() {
                        report(format!(
                            "call to void function '{}' has a destination",
                            callee.name
                        ));
                    }
                }
                None => report(format!("call to missing function @{}", idx)),
            },
            _ => report("call without function index".to_string()),
        },
        Opcode::Return => {
            let expected = match func.return_type {
                ReturnType::Int => 1,
                ReturnType::Void => 0,
            };
            if inst.operands.len() != expected {
                report(format!(
                    "return with {} operands in function returning {:?}",
                    inst.operands.len(),
                    func.return_type
                ));
            }
            expect_values(&inst.operands, &mut *report);
        }
        Opcode::Branch => {
            if inst.operands.len() != 1 {
                report(format!("br expects 1 operand, found {}", inst.operands.len()));
            }
            expect_block(inst.operands.first(), &mut *report);
        }
        Opcode::BranchIf => {
            if inst.operands.len() != 2 {
                report(format!(
                    "br_if expects 2 operands, found {}",
                    inst.operands.len()
                ));
            }
            expect_values(&inst.operands[..inst.operands.len().min(1)], &mut *report);
            expect_block(inst.operands.get(1), &mut *report);
            if block_idx + 1 >= func.blocks.len() {
                report("br_if in the last block has no fallthrough".to_string());
            }
        }
        Opcode::ReadSwitch => match inst.operands.as_slice() {
            [Operand::Switch(idx)] if (*idx as usize) < module.switches.len() => {}
            [Operand::Switch(idx)] => report(format!("switch{} does not exist", idx)),
            _ => report("switch read expects a single switch operand".to_string()),
        },
        opcode => {
            if inst.operands.len() != opcode.num_operands() {
                report(format!(
                    "{} expects {} operands, found {}",
                    opcode,
                    opcode.num_operands(),
                    inst.operands.len()
                ));
            }
            expect_values(&inst.operands, &mut *report);
        }
    }

    if inst.opcode != Opcode::Call && !inst.opcode.produces_value() && inst.dest.is_some() {
        report(format!("{} cannot have a destination", inst.opcode));
    }
}

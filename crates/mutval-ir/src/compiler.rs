//! Compiler from IR to WebAssembly.
//!
//! Every function becomes a dispatch loop over a `pc` local: block `i` runs
//! when `pc == i`, branches update `pc` and restart the loop. All registers
//! are i32 locals, memory addresses are word indices. Exports are
//! namespaced (`fn:`, `switch:`, plus `memory`) so IR names never collide.

use crate::instruction::{Instruction, Opcode, Operand};
use crate::module::{Function, Module, ReturnType};
use mutval_core::{CompilerConfig, Error, Result};
use wasm_encoder::{
    BlockType, CodeSection, ConstExpr, ExportKind, ExportSection, FunctionSection,
    GlobalSection, GlobalType, MemArg, MemorySection, MemoryType, TypeSection, ValType,
};

const WASM_PAGE_BYTES: u64 = 65536;

/// Prefix of the export name under which a function is visible
pub const FUNCTION_EXPORT_PREFIX: &str = "fn:";

/// Prefix of the export name under which a mutant switch is visible
pub const SWITCH_EXPORT_PREFIX: &str = "switch:";

pub struct Compiler {
    config: CompilerConfig,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn compile(&self, module: &Module) -> Result<Vec<u8>> {
        let mut wasm = wasm_encoder::Module::new();

        // Type section: one signature per function
        let mut types = TypeSection::new();
        for func in &module.functions {
            let params = vec![ValType::I32; func.num_params];
            let results = match func.return_type {
                ReturnType::Int => vec![ValType::I32],
                ReturnType::Void => vec![],
            };
            types.function(params, results);
        }
        wasm.section(&types);

        let mut functions = FunctionSection::new();
        for idx in 0..module.functions.len() {
            functions.function(idx as u32);
        }
        wasm.section(&functions);

        // Memory section
        let min_pages = self.memory_pages(module)?;
        let mut memories = MemorySection::new();
        memories.memory(MemoryType {
            minimum: min_pages,
            maximum: Some(u64::from(self.config.max_memory_pages).max(min_pages)),
            memory64: false,
            shared: false,
        });
        wasm.section(&memories);

        // Global section: mutant switches, all off
        let mut globals = GlobalSection::new();
        for _ in &module.switches {
            globals.global(
                GlobalType {
                    val_type: ValType::I32,
                    mutable: true,
                },
                &ConstExpr::i32_const(0),
            );
        }
        wasm.section(&globals);

        let mut exports = ExportSection::new();
        if self.config.export_functions {
            for (idx, func) in module.functions.iter().enumerate() {
                let name = format!("{}{}", FUNCTION_EXPORT_PREFIX, func.name);
                exports.export(&name, ExportKind::Func, idx as u32);
            }
        }
        exports.export("memory", ExportKind::Memory, 0);
        for (idx, switch) in module.switches.iter().enumerate() {
            let name = format!("{}{}", SWITCH_EXPORT_PREFIX, switch);
            exports.export(&name, ExportKind::Global, idx as u32);
        }
        wasm.section(&exports);

        // Code section: function bodies
        let mut code = CodeSection::new();
        for func in &module.functions {
            let body = self
                .compile_function(module, func)
                .map_err(|reason| Error::Compilation {
                    module: module.name.clone(),
                    reason: format!("function '{}': {}", func.name, reason),
                })?;
            code.function(&body);
        }
        wasm.section(&code);

        let bytes = wasm.finish();
        tracing::debug!(module = %module.name, size = bytes.len(), "Lowered module to wasm");
        Ok(bytes)
    }

    fn memory_pages(&self, module: &Module) -> Result<u64> {
        let limit = u64::from(self.config.max_memory_pages);
        let fail = |needed: String| Error::Compilation {
            module: module.name.clone(),
            reason: format!(
                "memory of {} words needs {} pages, limit is {}",
                module.memory_size, needed, limit
            ),
        };

        let bytes = u64::try_from(module.memory_size)
            .ok()
            .and_then(|words| words.checked_mul(4))
            .ok_or_else(|| fail("too many".to_string()))?;
        let pages = bytes.div_ceil(WASM_PAGE_BYTES).max(1);
        if pages > limit {
            return Err(fail(pages.to_string()));
        }
        Ok(pages)
    }

    fn compile_function(
        &self,
        module: &Module,
        func: &Function,
    ) -> std::result::Result<wasm_encoder::Function, String> {
        use wasm_encoder::Instruction as WI;

        // Locals after the parameters, plus the block selector
        let pc = func.num_registers() as u32;
        let mut wasm_func =
            wasm_encoder::Function::new(vec![(func.num_locals as u32 + 1, ValType::I32)]);

        wasm_func.instruction(&WI::Loop(BlockType::Empty));
        for (block_idx, block) in func.blocks.iter().enumerate() {
            wasm_func.instruction(&WI::LocalGet(pc));
            wasm_func.instruction(&WI::I32Const(block_idx as i32));
            wasm_func.instruction(&WI::I32Eq);
            wasm_func.instruction(&WI::If(BlockType::Empty));
            for inst in &block.instructions {
                self.compile_instruction(&mut wasm_func, module, block_idx, pc, inst)?;
            }
            wasm_func.instruction(&WI::End);
        }
        wasm_func.instruction(&WI::End);
        // Every block leaves through a branch or a return
        wasm_func.instruction(&WI::Unreachable);
        wasm_func.instruction(&WI::End);

        Ok(wasm_func)
    }

    fn compile_instruction(
        &self,
        wasm_func: &mut wasm_encoder::Function,
        module: &Module,
        block_idx: usize,
        pc: u32,
        inst: &Instruction,
    ) -> std::result::Result<(), String> {
        use wasm_encoder::Instruction as WI;

        let word = MemArg {
            offset: 0,
            align: 2,
            memory_index: 0,
        };

        match inst.opcode {
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::Eq
            | Opcode::Ne
            | Opcode::Lt
            | Opcode::Le
            | Opcode::Gt
            | Opcode::Ge
            | Opcode::And
            | Opcode::Or
            | Opcode::Xor => {
                self.load_operands(wasm_func, &inst.operands)?;
                let op = match inst.opcode {
                    Opcode::Add => WI::I32Add,
                    Opcode::Sub => WI::I32Sub,
                    Opcode::Mul => WI::I32Mul,
                    Opcode::Div => WI::I32DivS,
                    Opcode::Mod => WI::I32RemS,
                    Opcode::Eq => WI::I32Eq,
                    Opcode::Ne => WI::I32Ne,
                    Opcode::Lt => WI::I32LtS,
                    Opcode::Le => WI::I32LeS,
                    Opcode::Gt => WI::I32GtS,
                    Opcode::Ge => WI::I32GeS,
                    Opcode::And => WI::I32And,
                    Opcode::Or => WI::I32Or,
                    _ => WI::I32Xor,
                };
                wasm_func.instruction(&op);
                self.store_result(wasm_func, inst);
            }
            Opcode::Min | Opcode::Max => {
                // select(a, b, a < b) for min, select(a, b, a > b) for max
                self.load_operands(wasm_func, &inst.operands)?;
                self.load_operands(wasm_func, &inst.operands)?;
                let cmp = if inst.opcode == Opcode::Min {
                    WI::I32LtS
                } else {
                    WI::I32GtS
                };
                wasm_func.instruction(&cmp);
                wasm_func.instruction(&WI::Select);
                self.store_result(wasm_func, inst);
            }
            Opcode::Neg => {
                wasm_func.instruction(&WI::I32Const(0));
                self.load_operands(wasm_func, &inst.operands)?;
                wasm_func.instruction(&WI::I32Sub);
                self.store_result(wasm_func, inst);
            }
            Opcode::Abs => {
                // select(x, 0 - x, x >= 0)
                self.load_operands(wasm_func, &inst.operands)?;
                wasm_func.instruction(&WI::I32Const(0));
                self.load_operands(wasm_func, &inst.operands)?;
                wasm_func.instruction(&WI::I32Sub);
                self.load_operands(wasm_func, &inst.operands)?;
                wasm_func.instruction(&WI::I32Const(0));
                wasm_func.instruction(&WI::I32GeS);
                wasm_func.instruction(&WI::Select);
                self.store_result(wasm_func, inst);
            }
            Opcode::Not => {
                self.load_operands(wasm_func, &inst.operands)?;
                wasm_func.instruction(&WI::I32Eqz);
                self.store_result(wasm_func, inst);
            }
            Opcode::LoadConst | Opcode::Copy => {
                self.load_operands(wasm_func, &inst.operands)?;
                self.store_result(wasm_func, inst);
            }
            Opcode::Load => {
                self.load_address(wasm_func, inst.operands.first())?;
                wasm_func.instruction(&WI::I32Load(word));
                self.store_result(wasm_func, inst);
            }
            Opcode::Store => {
                self.load_address(wasm_func, inst.operands.first())?;
                self.load_operands(wasm_func, &inst.operands[1..])?;
                wasm_func.instruction(&WI::I32Store(word));
            }
            Opcode::ReadSwitch => match inst.operands.first() {
                Some(Operand::Switch(idx)) => {
                    wasm_func.instruction(&WI::GlobalGet(*idx));
                    self.store_result(wasm_func, inst);
                }
                _ => return Err(format!("malformed switch read '{}'", inst)),
            },
            Opcode::Nop => {
                wasm_func.instruction(&WI::Nop);
            }
            Opcode::Call => {
                let callee_idx = inst
                    .callee()
                    .ok_or_else(|| format!("call without callee '{}'", inst))?;
                let callee = module
                    .get_function(callee_idx as usize)
                    .ok_or_else(|| format!("call to missing function @{}", callee_idx))?;
                self.load_operands(wasm_func, &inst.operands[1..])?;
                wasm_func.instruction(&WI::Call(callee_idx));
                if callee.return_type == ReturnType::Int {
                    self.store_result(wasm_func, inst);
                }
            }
            Opcode::Branch => {
                let target = block_target(inst.operands.first())?;
                wasm_func.instruction(&WI::I32Const(target));
                wasm_func.instruction(&WI::LocalSet(pc));
                wasm_func.instruction(&WI::Br(1));
            }
            Opcode::BranchIf => {
                let target = block_target(inst.operands.get(1))?;
                wasm_func.instruction(&WI::I32Const(target));
                wasm_func.instruction(&WI::I32Const(block_idx as i32 + 1));
                self.load_operands(wasm_func, &inst.operands[..1])?;
                wasm_func.instruction(&WI::Select);
                wasm_func.instruction(&WI::LocalSet(pc));
                wasm_func.instruction(&WI::Br(1));
            }
            Opcode::Return => {
                self.load_operands(wasm_func, &inst.operands)?;
                wasm_func.instruction(&WI::Return);
            }
        }

        Ok(())
    }

    fn load_operands(
        &self,
        wasm_func: &mut wasm_encoder::Function,
        operands: &[Operand],
    ) -> std::result::Result<(), String> {
        use wasm_encoder::Instruction as WI;

        for operand in operands {
            match operand {
                Operand::Register(reg) => {
                    wasm_func.instruction(&WI::LocalGet(reg.0 as u32));
                }
                Operand::Immediate(value) => {
                    wasm_func.instruction(&WI::I32Const(value.as_i32()));
                }
                other => return Err(format!("operand '{}' is not a value", other)),
            }
        }

        Ok(())
    }

    /// Push the byte address of a word index operand
    fn load_address(
        &self,
        wasm_func: &mut wasm_encoder::Function,
        operand: Option<&Operand>,
    ) -> std::result::Result<(), String> {
        use wasm_encoder::Instruction as WI;

        let operand = operand.ok_or("memory access without address")?;
        self.load_operands(wasm_func, std::slice::from_ref(operand))?;
        wasm_func.instruction(&WI::I32Const(2));
        wasm_func.instruction(&WI::I32Shl);
        Ok(())
    }

    fn store_result(&self, wasm_func: &mut wasm_encoder::Function, inst: &Instruction) {
        use wasm_encoder::Instruction as WI;

        match inst.dest {
            Some(dest) => wasm_func.instruction(&WI::LocalSet(dest.0 as u32)),
            None => wasm_func.instruction(&WI::Drop),
        };
    }
}

fn block_target(operand: Option<&Operand>) -> std::result::Result<i32, String> {
    match operand {
        Some(Operand::BlockIndex(idx)) => Ok(*idx as i32),
        _ => Err("branch without block target".to_string()),
    }
}

//! Module structure: functions made of basic blocks.

use crate::instruction::Instruction;
use mutval_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// IR format version written into every serialized module
pub const IR_VERSION: u32 = 1;

/// A basic block is a sequence of instructions with no internal control flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    pub fn new() -> Self {
        Self {
            instructions: Vec::new(),
        }
    }

    pub fn with_instructions(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    pub fn add_instruction(&mut self, inst: Instruction) {
        self.instructions.push(inst);
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last().filter(|inst| inst.opcode.is_terminator())
    }
}

impl Default for BasicBlock {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnType {
    Void,
    Int,
}

/// Position of one instruction inside a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub function: usize,
    pub block: usize,
    pub instruction: usize,
}

impl Location {
    pub fn new(function: usize, block: usize, instruction: usize) -> Self {
        Self {
            function,
            block,
            instruction,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.function, self.block, self.instruction)
    }
}

/// A function contains multiple basic blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub num_params: usize,
    pub num_locals: usize,
    pub blocks: Vec<BasicBlock>,
    pub return_type: ReturnType,
}

impl Function {
    pub fn new(name: impl Into<String>, num_params: usize, return_type: ReturnType) -> Self {
        Self {
            name: name.into(),
            num_params,
            num_locals: 0,
            blocks: vec![BasicBlock::new()],
            return_type,
        }
    }

    pub fn with_locals(mut self, num_locals: usize) -> Self {
        self.num_locals = num_locals;
        self
    }

    pub fn add_block(&mut self, block: BasicBlock) -> u32 {
        self.blocks.push(block);
        (self.blocks.len() - 1) as u32
    }

    pub fn get_block_mut(&mut self, index: usize) -> Option<&mut BasicBlock> {
        self.blocks.get_mut(index)
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Parameters and locals together
    pub fn num_registers(&self) -> usize {
        self.num_params + self.num_locals
    }

    /// Count total instructions in the function
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(|b| b.len()).sum()
    }

    /// Instructions in program order with their (block, index) position
    pub fn instructions(&self) -> impl Iterator<Item = (usize, usize, &Instruction)> {
        self.blocks.iter().enumerate().flat_map(|(block_idx, block)| {
            block
                .instructions
                .iter()
                .enumerate()
                .map(move |(inst_idx, inst)| (block_idx, inst_idx, inst))
        })
    }

    pub fn instruction(&self, block: usize, index: usize) -> Option<&Instruction> {
        self.blocks.get(block)?.instructions.get(index)
    }

    pub fn instruction_mut(&mut self, block: usize, index: usize) -> Option<&mut Instruction> {
        self.blocks.get_mut(block)?.instructions.get_mut(index)
    }
}

/// One compilation unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub functions: Vec<Function>,
    /// Linear memory size in 4-byte words
    pub memory_size: usize,
    pub version: u32,
    /// Named mutant switches, lowered to exported globals
    #[serde(default)]
    pub switches: Vec<String>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: Vec::new(),
            memory_size: 256,
            version: IR_VERSION,
            switches: Vec::new(),
        }
    }

    pub fn with_functions(name: impl Into<String>, functions: Vec<Function>) -> Self {
        Self {
            functions,
            ..Self::new(name)
        }
    }

    pub fn add_function(&mut self, function: Function) -> u32 {
        self.functions.push(function);
        (self.functions.len() - 1) as u32
    }

    pub fn get_function(&self, index: usize) -> Option<&Function> {
        self.functions.get(index)
    }

    pub fn get_function_mut(&mut self, index: usize) -> Option<&mut Function> {
        self.functions.get_mut(index)
    }

    pub fn find_function(&self, name: &str) -> Option<usize> {
        self.functions.iter().position(|f| f.name == name)
    }

    pub fn num_functions(&self) -> usize {
        self.functions.len()
    }

    /// Count total instructions in the module
    pub fn total_instructions(&self) -> usize {
        self.functions.iter().map(|f| f.instruction_count()).sum()
    }

    pub fn instruction(&self, location: Location) -> Option<&Instruction> {
        self.functions
            .get(location.function)?
            .instruction(location.block, location.instruction)
    }

    pub fn instruction_mut(&mut self, location: Location) -> Option<&mut Instruction> {
        self.functions
            .get_mut(location.function)?
            .instruction_mut(location.block, location.instruction)
    }

    /// Register a named switch and return its index
    pub fn add_switch(&mut self, name: impl Into<String>) -> u32 {
        self.switches.push(name.into());
        (self.switches.len() - 1) as u32
    }

    /// Serialize the module to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a module from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

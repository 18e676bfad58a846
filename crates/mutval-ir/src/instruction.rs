//! Instruction set for the IR.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Register identifier (parameter or local variable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Register(pub u8);

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Immediate value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i32),
    Float(f32),
    Bool(bool),
}

impl Value {
    pub fn as_i32(&self) -> i32 {
        match self {
            Value::Int(v) => *v,
            Value::Float(v) => *v as i32,
            Value::Bool(v) => *v as i32,
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            Value::Int(v) => *v != 0,
            Value::Float(v) => *v != 0.0,
            Value::Bool(v) => *v,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{:?}", v),
            Value::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// IR Opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,
    Abs,
    Min,
    Max,

    // Comparison (signed)
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Logical
    And,
    Or,
    Not,
    Xor,

    // Data movement
    LoadConst,
    Copy,
    Load,
    Store,

    // Control flow
    Branch,       // Unconditional jump
    BranchIf,     // Conditional jump, falls through to the next block
    Call,         // Function call
    Return,       // Return from function

    // Mutant selection
    ReadSwitch,
    Nop,
}

impl Opcode {
    /// Returns true if this opcode is a control flow instruction
    pub fn is_control_flow(&self) -> bool {
        matches!(
            self,
            Opcode::Branch | Opcode::BranchIf | Opcode::Call | Opcode::Return
        )
    }

    /// Returns true if this opcode must close a basic block
    pub fn is_terminator(&self) -> bool {
        matches!(self, Opcode::Branch | Opcode::BranchIf | Opcode::Return)
    }

    pub fn is_binary_arithmetic(&self) -> bool {
        matches!(
            self,
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod
        )
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Opcode::Eq | Opcode::Ne | Opcode::Lt | Opcode::Le | Opcode::Gt | Opcode::Ge
        )
    }

    /// Returns true if the instruction may write a destination register.
    /// `Call` depends on the callee and is answered by the verifier.
    pub fn produces_value(&self) -> bool {
        !matches!(
            self,
            Opcode::Store
                | Opcode::Branch
                | Opcode::BranchIf
                | Opcode::Return
                | Opcode::Nop
                | Opcode::Call
        )
    }

    /// Returns the number of operands this opcode expects
    pub fn num_operands(&self) -> usize {
        match self {
            // Unary operations
            Opcode::Neg | Opcode::Not | Opcode::Abs | Opcode::Copy => 1,
            // Binary operations
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod => 2,
            Opcode::Eq | Opcode::Ne | Opcode::Lt | Opcode::Le | Opcode::Gt | Opcode::Ge => 2,
            Opcode::And | Opcode::Or | Opcode::Xor => 2,
            Opcode::Min | Opcode::Max => 2,
            // Memory operations
            Opcode::Load => 1,
            Opcode::Store => 2, // address, value
            Opcode::LoadConst => 1,
            // Control flow
            Opcode::Branch => 1,
            Opcode::BranchIf => 2,
            Opcode::Call => 1, // Callee plus its arguments
            Opcode::Return => 0, // Plus one for functions returning a value
            Opcode::ReadSwitch => 1,
            Opcode::Nop => 0,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::Mod => "mod",
            Opcode::Neg => "neg",
            Opcode::Abs => "abs",
            Opcode::Min => "min",
            Opcode::Max => "max",
            Opcode::Eq => "eq",
            Opcode::Ne => "ne",
            Opcode::Lt => "lt",
            Opcode::Le => "le",
            Opcode::Gt => "gt",
            Opcode::Ge => "ge",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Not => "not",
            Opcode::Xor => "xor",
            Opcode::LoadConst => "const",
            Opcode::Copy => "copy",
            Opcode::Load => "load",
            Opcode::Store => "store",
            Opcode::Branch => "br",
            Opcode::BranchIf => "br_if",
            Opcode::Call => "call",
            Opcode::Return => "ret",
            Opcode::ReadSwitch => "switch",
            Opcode::Nop => "nop",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A single instruction in the IR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub dest: Option<Register>,
    pub operands: Vec<Operand>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Register(Register),
    Immediate(Value),
    BlockIndex(u32),
    FunctionIndex(u32),
    Switch(u32),
}

impl Operand {
    /// Returns true for operands usable as an i32 input
    pub fn is_value(&self) -> bool {
        matches!(self, Operand::Register(_) | Operand::Immediate(_))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(reg) => write!(f, "{}", reg),
            Operand::Immediate(value) => write!(f, "{}", value),
            Operand::BlockIndex(idx) => write!(f, "bb{}", idx),
            Operand::FunctionIndex(idx) => write!(f, "@{}", idx),
            Operand::Switch(idx) => write!(f, "switch{}", idx),
        }
    }
}

impl Instruction {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            dest: None,
            operands: Vec::new(),
        }
    }

    pub fn with_dest(mut self, reg: Register) -> Self {
        self.dest = Some(reg);
        self
    }

    pub fn with_operand(mut self, operand: Operand) -> Self {
        self.operands.push(operand);
        self
    }

    pub fn with_operands(mut self, operands: Vec<Operand>) -> Self {
        self.operands = operands;
        self
    }

    /// Create a simple arithmetic instruction
    pub fn arithmetic(opcode: Opcode, dest: Register, a: Register, b: Register) -> Self {
        Self {
            opcode,
            dest: Some(dest),
            operands: vec![Operand::Register(a), Operand::Register(b)],
        }
    }

    /// Create a single-operand instruction such as `neg` or `not`
    pub fn unary(opcode: Opcode, dest: Register, src: Register) -> Self {
        Self {
            opcode,
            dest: Some(dest),
            operands: vec![Operand::Register(src)],
        }
    }

    /// Create a load constant instruction
    pub fn load_const(dest: Register, value: Value) -> Self {
        Self {
            opcode: Opcode::LoadConst,
            dest: Some(dest),
            operands: vec![Operand::Immediate(value)],
        }
    }

    pub fn copy(dest: Register, src: Register) -> Self {
        Self::unary(Opcode::Copy, dest, src)
    }

    pub fn load(dest: Register, address: Register) -> Self {
        Self::unary(Opcode::Load, dest, address)
    }

    pub fn store(address: Register, value: Register) -> Self {
        Self {
            opcode: Opcode::Store,
            dest: None,
            operands: vec![Operand::Register(address), Operand::Register(value)],
        }
    }

    /// Create a branch instruction
    pub fn branch(block: u32) -> Self {
        Self {
            opcode: Opcode::Branch,
            dest: None,
            operands: vec![Operand::BlockIndex(block)],
        }
    }

    /// Create a conditional branch instruction
    pub fn branch_if(condition: Register, block: u32) -> Self {
        Self {
            opcode: Opcode::BranchIf,
            dest: None,
            operands: vec![Operand::Register(condition), Operand::BlockIndex(block)],
        }
    }

    /// Create a call; `dest` receives the callee's result if any
    pub fn call(function: u32, dest: Option<Register>, args: &[Register]) -> Self {
        let mut operands = Vec::with_capacity(args.len() + 1);
        operands.push(Operand::FunctionIndex(function));
        operands.extend(args.iter().copied().map(Operand::Register));
        Self {
            opcode: Opcode::Call,
            dest,
            operands,
        }
    }

    pub fn read_switch(dest: Register, switch: u32) -> Self {
        Self {
            opcode: Opcode::ReadSwitch,
            dest: Some(dest),
            operands: vec![Operand::Switch(switch)],
        }
    }

    pub fn nop() -> Self {
        Self::new(Opcode::Nop)
    }

    /// Create a return instruction
    pub fn return_void() -> Self {
        Self {
            opcode: Opcode::Return,
            dest: None,
            operands: Vec::new(),
        }
    }

    pub fn return_value(reg: Register) -> Self {
        Self {
            opcode: Opcode::Return,
            dest: None,
            operands: vec![Operand::Register(reg)],
        }
    }

    /// Callee of a `Call` instruction
    pub fn callee(&self) -> Option<u32> {
        match (self.opcode, self.operands.first()) {
            (Opcode::Call, Some(Operand::FunctionIndex(idx))) => Some(*idx),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(dest) = self.dest {
            write!(f, "{} = ", dest)?;
        }
        write!(f, "{}", self.opcode)?;
        for (i, operand) in self.operands.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{}{}", sep, operand)?;
        }
        Ok(())
    }
}

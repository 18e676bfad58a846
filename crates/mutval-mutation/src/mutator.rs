//! Mutation operators.
//!
//! Each variant pairs a match predicate with a rewrite. The rewrite only
//! touches the matched instruction, so the module stays well-formed as long
//! as the replacement keeps the instruction's arity and destination rules.

use mutval_ir::{Instruction, Opcode, Operand, Value};
use std::fmt;
use thiserror::Error;

/// Constant a replaced call produces
pub const REPLACED_CALL_VALUE: i32 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Mutator {
    // Arithmetic
    AddToSub,
    SubToAdd,
    MulToDiv,
    DivToMul,
    RemToDiv,
    MinusToNoop,

    // Comparison
    EqToNe,
    NeToEq,
    LtToGe,
    GeToLt,
    GtToLe,
    LeToGt,

    // Bitwise
    AndToOr,
    OrToAnd,
    XorToOr,
    RemoveNegation,

    // Calls
    RemoveVoidCall,
    ReplaceCall,

    // Constants
    ReplaceScalar,

    /// Matches arithmetic but leaves it untouched; checks the pipeline itself
    NoMutation,
}

impl Mutator {
    pub const ALL: [Mutator; 20] = [
        Mutator::AddToSub,
        Mutator::SubToAdd,
        Mutator::MulToDiv,
        Mutator::DivToMul,
        Mutator::RemToDiv,
        Mutator::MinusToNoop,
        Mutator::EqToNe,
        Mutator::NeToEq,
        Mutator::LtToGe,
        Mutator::GeToLt,
        Mutator::GtToLe,
        Mutator::LeToGt,
        Mutator::AndToOr,
        Mutator::OrToAnd,
        Mutator::XorToOr,
        Mutator::RemoveNegation,
        Mutator::RemoveVoidCall,
        Mutator::ReplaceCall,
        Mutator::ReplaceScalar,
        Mutator::NoMutation,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Mutator::AddToSub => "cxx_add_to_sub",
            Mutator::SubToAdd => "cxx_sub_to_add",
            Mutator::MulToDiv => "cxx_mul_to_div",
            Mutator::DivToMul => "cxx_div_to_mul",
            Mutator::RemToDiv => "cxx_rem_to_div",
            Mutator::MinusToNoop => "cxx_minus_to_noop",
            Mutator::EqToNe => "cxx_eq_to_ne",
            Mutator::NeToEq => "cxx_ne_to_eq",
            Mutator::LtToGe => "cxx_lt_to_ge",
            Mutator::GeToLt => "cxx_ge_to_lt",
            Mutator::GtToLe => "cxx_gt_to_le",
            Mutator::LeToGt => "cxx_le_to_gt",
            Mutator::AndToOr => "cxx_and_to_or",
            Mutator::OrToAnd => "cxx_or_to_and",
            Mutator::XorToOr => "cxx_xor_to_or",
            Mutator::RemoveNegation => "cxx_remove_negation",
            Mutator::RemoveVoidCall => "cxx_remove_void_call",
            Mutator::ReplaceCall => "cxx_replace_call",
            Mutator::ReplaceScalar => "cxx_replace_scalar",
            Mutator::NoMutation => "no_mutation",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.id() == id)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Mutator::AddToSub => "Replaces + with -",
            Mutator::SubToAdd => "Replaces - with +",
            Mutator::MulToDiv => "Replaces * with /",
            Mutator::DivToMul => "Replaces / with *",
            Mutator::RemToDiv => "Replaces % with /",
            Mutator::MinusToNoop => "Replaces -x with x",
            Mutator::EqToNe => "Replaces == with !=",
            Mutator::NeToEq => "Replaces != with ==",
            Mutator::LtToGe => "Replaces < with >=",
            Mutator::GeToLt => "Replaces >= with <",
            Mutator::GtToLe => "Replaces > with <=",
            Mutator::LeToGt => "Replaces <= with >",
            Mutator::AndToOr => "Replaces & with |",
            Mutator::OrToAnd => "Replaces | with &",
            Mutator::XorToOr => "Replaces ^ with |",
            Mutator::RemoveNegation => "Replaces !x with x",
            Mutator::RemoveVoidCall => "Removes calls whose result is unused",
            Mutator::ReplaceCall => "Replaces a call result with 42",
            Mutator::ReplaceScalar => "Replaces integer constants and flips booleans",
            Mutator::NoMutation => "Matches arithmetic without changing it",
        }
    }

    /// Opcode replacement performed by the operator-swapping mutators
    fn opcode_swap(&self) -> Option<(Opcode, Opcode)> {
        let swap = match self {
            Mutator::AddToSub => (Opcode::Add, Opcode::Sub),
            Mutator::SubToAdd => (Opcode::Sub, Opcode::Add),
            Mutator::MulToDiv => (Opcode::Mul, Opcode::Div),
            Mutator::DivToMul => (Opcode::Div, Opcode::Mul),
            Mutator::RemToDiv => (Opcode::Mod, Opcode::Div),
            Mutator::MinusToNoop => (Opcode::Neg, Opcode::Copy),
            Mutator::EqToNe => (Opcode::Eq, Opcode::Ne),
            Mutator::NeToEq => (Opcode::Ne, Opcode::Eq),
            Mutator::LtToGe => (Opcode::Lt, Opcode::Ge),
            Mutator::GeToLt => (Opcode::Ge, Opcode::Lt),
            Mutator::GtToLe => (Opcode::Gt, Opcode::Le),
            Mutator::LeToGt => (Opcode::Le, Opcode::Gt),
            Mutator::AndToOr => (Opcode::And, Opcode::Or),
            Mutator::OrToAnd => (Opcode::Or, Opcode::And),
            Mutator::XorToOr => (Opcode::Xor, Opcode::Or),
            Mutator::RemoveNegation => (Opcode::Not, Opcode::Copy),
            _ => return None,
        };
        Some(swap)
    }

    pub fn matches(&self, inst: &Instruction) -> bool {
        self.rewrites(inst) > 0
    }

    /// Number of distinct rewrites this mutator offers for `inst`
    pub fn rewrites(&self, inst: &Instruction) -> u32 {
        if let Some((from, _)) = self.opcode_swap() {
            return (inst.opcode == from) as u32;
        }
        match self {
            Mutator::RemoveVoidCall => {
                (inst.opcode == Opcode::Call && inst.dest.is_none()) as u32
            }
            Mutator::ReplaceCall => (inst.opcode == Opcode::Call && inst.dest.is_some()) as u32,
            Mutator::ReplaceScalar => match scalar(inst) {
                Some(Value::Int(_)) => 2,
                Some(Value::Bool(_)) => 1,
                _ => 0,
            },
            Mutator::NoMutation => inst.opcode.is_binary_arithmetic() as u32,
            _ => 0,
        }
    }

    /// Rewrite `inst` in place using rewrite number `variant`
    pub fn apply(&self, inst: &mut Instruction, variant: u32) -> Result<(), RewriteError> {
        let mismatch = |inst: &Instruction| RewriteError::Mismatch {
            mutator: *self,
            instruction: inst.to_string(),
        };
        let available = self.rewrites(inst);
        if available == 0 {
            return Err(mismatch(inst));
        }
        if variant >= available {
            return Err(RewriteError::NoSuchVariant {
                mutator: *self,
                instruction: inst.to_string(),
                available,
                variant,
            });
        }

        if let Some((_, to)) = self.opcode_swap() {
            inst.opcode = to;
            return Ok(());
        }

        match self {
            Mutator::RemoveVoidCall => {
                *inst = Instruction::nop();
            }
            Mutator::ReplaceCall => {
                let dest = inst.dest.ok_or_else(|| mismatch(inst))?;
                *inst = Instruction::load_const(dest, Value::Int(REPLACED_CALL_VALUE));
            }
            Mutator::ReplaceScalar => {
                let replacement = match scalar(inst) {
                    Some(Value::Int(v)) => Value::Int(scalar_replacements(v)[variant as usize]),
                    Some(Value::Bool(b)) => Value::Bool(!b),
                    _ => return Err(mismatch(inst)),
                };
                inst.operands[0] = Operand::Immediate(replacement);
            }
            Mutator::NoMutation => {}
            _ => unreachable!("operator swaps are handled above"),
        }
        Ok(())
    }
}

impl fmt::Display for Mutator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Why a mutator refused to rewrite an instruction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    #[error("'{instruction}' does not match {mutator}")]
    Mismatch { mutator: Mutator, instruction: String },

    #[error("{mutator} has {available} rewrites for '{instruction}', variant {variant} requested")]
    NoSuchVariant {
        mutator: Mutator,
        instruction: String,
        available: u32,
        variant: u32,
    },
}

fn scalar(inst: &Instruction) -> Option<Value> {
    match (inst.opcode, inst.operands.as_slice()) {
        (Opcode::LoadConst, [Operand::Immediate(value)]) => Some(*value),
        _ => None,
    }
}

/// Two distinct replacements for an integer constant, both different from it
fn scalar_replacements(value: i32) -> [i32; 2] {
    let first = if value == 0 { 1 } else { 0 };
    let mut second = value.wrapping_add(1);
    if second == first {
        second = value.wrapping_sub(1);
    }
    [first, second]
}

#[cfg(test)]
mod tests {
    use super::*;
    use mutval_ir::Register;

    fn add() -> Instruction {
        Instruction::arithmetic(Opcode::Add, Register(0), Register(1), Register(2))
    }

    #[test]
    fn test_ids_round_trip() {
        for mutator in Mutator::ALL {
            assert_eq!(Mutator::from_id(mutator.id()), Some(mutator));
            assert!(!mutator.description().is_empty());
        }
        assert_eq!(Mutator::from_id("cxx_nonsense"), None);
    }

    #[test]
    fn test_operator_swap() {
        let mut inst = add();
        assert!(Mutator::AddToSub.matches(&inst));
        assert!(!Mutator::SubToAdd.matches(&inst));

        Mutator::AddToSub.apply(&mut inst, 0).unwrap();
        assert_eq!(inst.opcode, Opcode::Sub);
        assert_eq!(inst.operands.len(), 2);
        assert_eq!(inst.dest, Some(Register(0)));
    }

    #[test]
    fn test_apply_rejects_mismatch_and_bad_variant() {
        let mut inst = add();
        assert!(matches!(
            Mutator::MulToDiv.apply(&mut inst, 0),
            Err(RewriteError::Mismatch { mutator: Mutator::MulToDiv, .. })
        ));
        assert!(matches!(
            Mutator::AddToSub.apply(&mut inst, 1),
            Err(RewriteError::NoSuchVariant { available: 1, variant: 1, .. })
        ));
        assert_eq!(inst, add());
    }

    #[test]
    fn test_negation_removal() {
        let mut inst = Instruction::unary(Opcode::Not, Register(0), Register(1));
        Mutator::RemoveNegation.apply(&mut inst, 0).unwrap();
        assert_eq!(inst, Instruction::copy(Register(0), Register(1)));
    }

    #[test]
    fn test_call_mutators() {
        let mut void_call = Instruction::call(1, None, &[Register(0)]);
        assert!(Mutator::RemoveVoidCall.matches(&void_call));
        assert!(!Mutator::ReplaceCall.matches(&void_call));
        Mutator::RemoveVoidCall.apply(&mut void_call, 0).unwrap();
        assert_eq!(void_call, Instruction::nop());

        let mut value_call = Instruction::call(1, Some(Register(3)), &[]);
        assert!(!Mutator::RemoveVoidCall.matches(&value_call));
        Mutator::ReplaceCall.apply(&mut value_call, 0).unwrap();
        assert_eq!(
            value_call,
            Instruction::load_const(Register(3), Value::Int(REPLACED_CALL_VALUE))
        );
    }

    #[test]
    fn test_scalar_replacements_are_distinct() {
        for value in [0, 1, -1, 7, i32::MAX, i32::MIN] {
            let [a, b] = scalar_replacements(value);
            assert_ne!(a, value);
            assert_ne!(b, value);
            assert_ne!(a, b);
        }
    }

    #[test]
    fn test_replace_scalar_variants() {
        let inst = Instruction::load_const(Register(0), Value::Int(5));
        assert_eq!(Mutator::ReplaceScalar.rewrites(&inst), 2);

        let mut zero = inst.clone();
        Mutator::ReplaceScalar.apply(&mut zero, 0).unwrap();
        assert_eq!(zero.operands[0], Operand::Immediate(Value::Int(0)));

        let mut bumped = inst.clone();
        Mutator::ReplaceScalar.apply(&mut bumped, 1).unwrap();
        assert_eq!(bumped.operands[0], Operand::Immediate(Value::Int(6)));

        let mut flag = Instruction::load_const(Register(0), Value::Bool(true));
        assert_eq!(Mutator::ReplaceScalar.rewrites(&flag), 1);
        Mutator::ReplaceScalar.apply(&mut flag, 0).unwrap();
        assert_eq!(flag.operands[0], Operand::Immediate(Value::Bool(false)));

        let float = Instruction::load_const(Register(0), Value::Float(1.5));
        assert!(!Mutator::ReplaceScalar.matches(&float));
    }

    #[test]
    fn test_no_mutation_leaves_instruction() {
        let mut inst = add();
        assert!(Mutator::NoMutation.matches(&inst));
        Mutator::NoMutation.apply(&mut inst, 0).unwrap();
        assert_eq!(inst, add());
    }
}

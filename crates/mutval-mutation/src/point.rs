//! Mutation points: accepted (instruction, mutator) matches.

use crate::mutator::Mutator;
use mutval_core::{FunctionRef, ModuleId};
use mutval_ir::Location;
use std::fmt;

/// One accepted match.
///
/// A point refers to its instruction by position only; it stays meaningful
/// for the program it was found in and must not be reused across runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationPoint {
    pub module: ModuleId,
    pub location: Location,
    pub mutator: Mutator,
    /// Running index among all points found on the same instruction
    pub index: u32,
    /// Which of the mutator's rewrites this point applies
    pub variant: u32,
    /// Stable name, also used for the mutant's switch
    pub identifier: String,
}

impl MutationPoint {
    pub fn new(
        module: ModuleId,
        module_name: &str,
        function_name: &str,
        location: Location,
        mutator: Mutator,
        index: u32,
        variant: u32,
    ) -> Self {
        let identifier = format!(
            "{}:{}:{}:{}:{}:{}",
            mutator.id(),
            module_name,
            function_name,
            location.block,
            location.instruction,
            index
        );
        Self {
            module,
            location,
            mutator,
            index,
            variant,
            identifier,
        }
    }

    pub fn function(&self) -> FunctionRef {
        FunctionRef::new(self.module, self.location.function)
    }
}

impl fmt::Display for MutationPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier() {
        let point = MutationPoint::new(
            ModuleId(0),
            "demo.bc",
            "main",
            Location::new(2, 1, 4),
            Mutator::AddToSub,
            1,
            0,
        );
        assert_eq!(point.identifier, "cxx_add_to_sub:demo.bc:main:1:4:1");
        assert_eq!(point.to_string(), point.identifier);
        assert_eq!(point.function(), FunctionRef::new(ModuleId(0), 2));
    }
}

//! Candidate set: the functions mutation points are searched in.

use mutval_core::FunctionRef;
use mutval_ir::Program;

/// One function selected for analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Testee {
    pub function: FunctionRef,
    /// Test reaching this function; the validator runs no tests, so `None`
    pub test: Option<String>,
    pub weight: u32,
}

impl Testee {
    pub fn new(function: FunctionRef) -> Self {
        Self {
            function,
            test: None,
            weight: 1,
        }
    }
}

/// One testee per function, in module then function order
pub fn build_testees(program: &Program<'_>) -> Vec<Testee> {
    program
        .modules()
        .iter()
        .flat_map(|loaded| {
            let id = loaded.id();
            (0..loaded.module().num_functions()).map(move |idx| Testee::new(FunctionRef::new(id, idx)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mutval_ir::{Context, Function, Module, ReturnType};

    #[test]
    fn test_empty_program() {
        let context = Context::new();
        let program = Program::new(&context);
        assert!(build_testees(&program).is_empty());

        let mut program = Program::new(&context);
        program.add(Module::new("empty"), "empty.bc");
        assert!(build_testees(&program).is_empty());
    }

    #[test]
    fn test_one_testee_per_function_in_order() {
        let context = Context::new();
        let mut program = Program::new(&context);
        let first = program.add(
            Module::with_functions(
                "a",
                vec![
                    Function::new("f", 0, ReturnType::Void),
                    Function::new("g", 0, ReturnType::Void),
                ],
            ),
            "a.bc",
        );
        let second = program.add(
            Module::with_functions("b", vec![Function::new("h", 0, ReturnType::Void)]),
            "b.bc",
        );

        let testees = build_testees(&program);
        let refs: Vec<_> = testees.iter().map(|t| t.function).collect();
        assert_eq!(
            refs,
            vec![
                FunctionRef::new(first, 0),
                FunctionRef::new(first, 1),
                FunctionRef::new(second, 0),
            ]
        );
        assert!(testees.iter().all(|t| t.test.is_none() && t.weight == 1));
    }
}

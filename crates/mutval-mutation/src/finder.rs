//! Search for mutation points.

use crate::filter::MutationFilter;
use crate::mutator::Mutator;
use crate::point::MutationPoint;
use crate::testee::Testee;
use mutval_ir::{Location, Program};
use tracing::{debug, info, trace, warn};

/// Matches a fixed set of mutators against candidate functions
pub struct MutationsFinder {
    mutators: Vec<Mutator>,
}

impl MutationsFinder {
    pub fn new(mutators: Vec<Mutator>) -> Self {
        Self { mutators }
    }

    /// All mutation points, ordered by testee, then instruction, then
    /// mutator. The same inputs always produce the same list.
    pub fn find(
        &self,
        program: &Program<'_>,
        testees: &[Testee],
        filter: &dyn MutationFilter,
    ) -> Vec<MutationPoint> {
        let mut points = Vec::new();

        for testee in testees {
            let Some(loaded) = program.module(testee.function.module) else {
                warn!(testee = %testee.function, "Testee refers to a module that is not loaded");
                continue;
            };
            let Some(function) = loaded.module().get_function(testee.function.function) else {
                warn!(testee = %testee.function, "Testee refers to a missing function");
                continue;
            };
            if !filter.allows_function(function) {
                trace!(function = %function.name, "Function excluded by filter");
                continue;
            }

            for (block, index, inst) in function.instructions() {
                if !filter.allows_instruction(inst) {
                    continue;
                }

                let location = Location::new(testee.function.function, block, index);
                let mut next_index = 0;
                for mutator in &self.mutators {
                    if !mutator.matches(inst) || !filter.allows_mutator(*mutator) {
                        continue;
                    }
                    for variant in 0..mutator.rewrites(inst) {
                        let point = MutationPoint::new(
                            loaded.id(),
                            loaded.identifier(),
                            &function.name,
                            location,
                            *mutator,
                            next_index,
                            variant,
                        );
                        debug!(mutant = %point, instruction = %inst, "Found mutation point");
                        points.push(point);
                        next_index += 1;
                    }
                }
            }
        }

        info!(
            count = points.len(),
            testees = testees.len(),
            mutators = self.mutators.len(),
            "Mutation search finished"
        );
        points
    }
}

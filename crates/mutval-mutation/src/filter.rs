//! Filters consulted while searching for mutation points.

use crate::mutator::Mutator;
use mutval_core::{Error, FilterConfig, Result};
use mutval_ir::{Function, Instruction};
use std::collections::HashSet;

/// Gate for candidate functions, instructions and mutator matches.
/// Every check accepts by default.
pub trait MutationFilter {
    fn allows_function(&self, _function: &Function) -> bool {
        true
    }

    fn allows_instruction(&self, _instruction: &Instruction) -> bool {
        true
    }

    fn allows_mutator(&self, _mutator: Mutator) -> bool {
        true
    }
}

/// Accepts everything
#[derive(Debug, Default, Clone, Copy)]
pub struct Filter;

impl MutationFilter for Filter {}

/// Rejects configured functions and mutators
#[derive(Debug, Default, Clone)]
pub struct ExclusionFilter {
    functions: HashSet<String>,
    mutators: HashSet<Mutator>,
}

impl ExclusionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        let mut filter = Self::new();
        for name in &config.exclude_functions {
            filter = filter.exclude_function(name.clone());
        }
        for id in &config.exclude_mutators {
            let mutator = Mutator::from_id(id)
                .ok_or_else(|| Error::Config(format!("unknown mutator '{}' in filter", id)))?;
            filter = filter.exclude_mutator(mutator);
        }
        Ok(filter)
    }

    pub fn exclude_function(mut self, name: impl Into<String>) -> Self {
        self.functions.insert(name.into());
        self
    }

    pub fn exclude_mutator(mut self, mutator: Mutator) -> Self {
        self.mutators.insert(mutator);
        self
    }
}

impl MutationFilter for ExclusionFilter {
    fn allows_function(&self, function: &Function) -> bool {
        !self.functions.contains(&function.name)
    }

    fn allows_mutator(&self, mutator: Mutator) -> bool {
        !self.mutators.contains(&mutator)
    }
}

//! Identifiers shared across the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier handed out by the IR context to every loaded module
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleId(pub u32);

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module#{}", self.0)
    }
}

/// Non-owning reference to a function inside a loaded module
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FunctionRef {
    pub module: ModuleId,
    pub function: usize,
}

impl FunctionRef {
    pub fn new(module: ModuleId, function: usize) -> Self {
        Self { module, function }
    }
}

impl fmt::Display for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:fn{}", self.module, self.function)
    }
}

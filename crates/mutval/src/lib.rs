//! Mutator validator: discovers every mutation a mutator group can make in a
//! module, applies them all and checks the result still verifies and
//! compiles.

pub mod pipeline;
pub mod task;
pub mod telemetry;

pub use pipeline::{Pipeline, Report};
pub use task::SingleTaskExecutor;

//! Mutation point discovery and application.
//!
//! The pipeline is: [`build_testees`] selects the functions to look at,
//! [`MutationsFinder`] matches the resolved [`Mutator`]s against their
//! instructions under a [`MutationFilter`], and the [`applier`] rewrites the
//! module in two phases (prepare once per module, then apply per point).

pub mod mutator;
pub mod catalogue;
pub mod filter;
pub mod testee;
pub mod point;
pub mod finder;
pub mod applier;

pub use mutator::{Mutator, RewriteError};
pub use catalogue::MutatorCatalogue;
pub use filter::{ExclusionFilter, Filter, MutationFilter};
pub use testee::{build_testees, Testee};
pub use point::MutationPoint;
pub use finder::MutationsFinder;
pub use applier::{apply_mutation, prepare_mutations, prepare_program};

//! Mutator groups and their resolution.
//!
//! A requested name is either a group or a single mutator id. Unknown names
//! are an error: a typo must not turn into a run that silently finds nothing.

use crate::mutator::Mutator;
use mutval_core::{Error, Result};
use std::collections::HashSet;
use tracing::debug;

enum Member {
    Mutator(Mutator),
    Group(&'static str),
}

struct MutatorGroup {
    name: &'static str,
    members: &'static [Member],
}

static GROUPS: &[MutatorGroup] = &[
    MutatorGroup {
        name: "cxx_arithmetic",
        members: &[
            Member::Mutator(Mutator::AddToSub),
            Member::Mutator(Mutator::SubToAdd),
            Member::Mutator(Mutator::MulToDiv),
            Member::Mutator(Mutator::DivToMul),
            Member::Mutator(Mutator::RemToDiv),
            Member::Mutator(Mutator::MinusToNoop),
        ],
    },
    MutatorGroup {
        name: "cxx_comparison",
        members: &[
            Member::Mutator(Mutator::EqToNe),
            Member::Mutator(Mutator::NeToEq),
            Member::Mutator(Mutator::LtToGe),
            Member::Mutator(Mutator::GeToLt),
            Member::Mutator(Mutator::GtToLe),
            Member::Mutator(Mutator::LeToGt),
        ],
    },
    MutatorGroup {
        name: "cxx_bitwise",
        members: &[
            Member::Mutator(Mutator::AndToOr),
            Member::Mutator(Mutator::OrToAnd),
            Member::Mutator(Mutator::XorToOr),
            Member::Mutator(Mutator::RemoveNegation),
        ],
    },
    MutatorGroup {
        name: "cxx_calls",
        members: &[
            Member::Mutator(Mutator::RemoveVoidCall),
            Member::Mutator(Mutator::ReplaceCall),
        ],
    },
    MutatorGroup {
        name: "cxx_scalar",
        members: &[Member::Mutator(Mutator::ReplaceScalar)],
    },
    MutatorGroup {
        name: "cxx_default",
        members: &[
            Member::Group("cxx_arithmetic"),
            Member::Group("cxx_comparison"),
            Member::Group("cxx_calls"),
        ],
    },
    MutatorGroup {
        name: "cxx_all",
        members: &[
            Member::Group("cxx_arithmetic"),
            Member::Group("cxx_comparison"),
            Member::Group("cxx_bitwise"),
            Member::Group("cxx_calls"),
            Member::Group("cxx_scalar"),
        ],
    },
    MutatorGroup {
        name: "experimental",
        members: &[Member::Mutator(Mutator::NoMutation)],
    },
];

/// Resolves group names to mutators
#[derive(Debug, Default, Clone, Copy)]
pub struct MutatorCatalogue;

impl MutatorCatalogue {
    pub fn new() -> Self {
        Self
    }

    /// Group names in catalogue order
    pub fn groups(&self) -> impl Iterator<Item = &'static str> {
        GROUPS.iter().map(|g| g.name)
    }

    /// Resolve names to mutators. The result follows request order, then
    /// catalogue order inside each group, without duplicates.
    pub fn mutators<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Mutator>> {
        if names.is_empty() {
            return Err(Error::Usage("no mutator group requested".to_string()));
        }

        let mut resolved = Vec::new();
        let mut seen = HashSet::new();
        for name in names {
            self.expand(name.as_ref(), &mut resolved, &mut seen)?;
        }

        debug!(
            requested = ?names.iter().map(|n| n.as_ref()).collect::<Vec<_>>(),
            resolved = ?resolved.iter().map(|m| m.id()).collect::<Vec<_>>(),
            "Resolved mutators"
        );
        Ok(resolved)
    }

    fn expand(
        &self,
        name: &str,
        resolved: &mut Vec<Mutator>,
        seen: &mut HashSet<Mutator>,
    ) -> Result<()> {
        if let Some(group) = GROUPS.iter().find(|g| g.name == name) {
            for member in group.members {
                match member {
                    Member::Mutator(mutator) => {
                        if seen.insert(*mutator) {
                            resolved.push(*mutator);
                        }
                    }
                    Member::Group(nested) => self.expand(nested, resolved, seen)?,
                }
            }
            return Ok(());
        }

        match Mutator::from_id(name) {
            Some(mutator) => {
                if seen.insert(mutator) {
                    resolved.push(mutator);
                }
                Ok(())
            }
            None => Err(Error::UnknownMutatorGroup(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_group_in_catalogue_order() {
        let mutators = MutatorCatalogue::new().mutators(&["cxx_arithmetic"]).unwrap();
        assert_eq!(
            mutators,
            vec![
                Mutator::AddToSub,
                Mutator::SubToAdd,
                Mutator::MulToDiv,
                Mutator::DivToMul,
                Mutator::RemToDiv,
                Mutator::MinusToNoop,
            ]
        );
    }

    #[test]
    fn test_resolve_single_mutator_id() {
        let mutators = MutatorCatalogue::new().mutators(&["cxx_lt_to_ge"]).unwrap();
        assert_eq!(mutators, vec![Mutator::LtToGe]);
    }

    #[test]
    fn test_nested_groups_are_deduplicated() {
        let catalogue = MutatorCatalogue::new();
        let all = catalogue.mutators(&["cxx_all", "cxx_arithmetic", "cxx_add_to_sub"]).unwrap();
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), all.len());
        assert_eq!(all[0], Mutator::AddToSub);
        assert!(!all.contains(&Mutator::NoMutation));
        assert_eq!(all.len(), Mutator::ALL.len() - 1);
    }

    #[test]
    fn test_every_group_resolves() {
        let catalogue = MutatorCatalogue::new();
        for group in catalogue.groups() {
            assert!(!catalogue.mutators(&[group]).unwrap().is_empty(), "{}", group);
        }
    }

    #[test]
    fn test_unknown_group_is_an_error() {
        let result = MutatorCatalogue::new().mutators(&["cxx_arithmetic", "cxx_bogus"]);
        match result {
            Err(Error::UnknownMutatorGroup(name)) => assert_eq!(name, "cxx_bogus"),
            other => panic!("expected unknown group error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_request_is_an_error() {
        let names: [&str; 0] = [];
        assert!(matches!(
            MutatorCatalogue::new().mutators(&names),
            Err(Error::Usage(_))
        ));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let catalogue = MutatorCatalogue::new();
        let first = catalogue.mutators(&["cxx_default"]).unwrap();
        let second = catalogue.mutators(&["cxx_default"]).unwrap();
        assert_eq!(first, second);
    }
}

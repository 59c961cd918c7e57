//! Footprint flattener - the full transitive resource set of one command.
//!
//! Each direct [`ResourceRequest`](crate::command::ResourceRequest) is
//! expanded through the hierarchy: the requested name is charged at the
//! request's upper bound, every descendant at its hierarchy weight. The
//! top-level request's release flag propagates to every descendant it pulls
//! in; a descendant's own stored flag is never consulted.
//!
//! Entries are deduplicated by name with first-wins semantics: a name
//! already present from an earlier expansion keeps its original share,
//! even when the duplicate is the literal name of a later request.

use std::collections::BTreeMap;

use crate::command::Command;
use crate::hierarchy::ResourceHierarchy;

/// The per-name charge recorded in a footprint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResourceShare {
    /// Weight charged against the resource on acceptance
    pub weight: f64,
    /// Whether the charge is reversed when the command is released
    pub release: bool,
}

/// The flattened, name-deduplicated resource set of a single command.
///
/// Name-ordered so the greedy admission walk is deterministic regardless of
/// request order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Footprint {
    entries: BTreeMap<String, ResourceShare>,
}

impl Footprint {
    /// Flatten a command's requests against the hierarchy.
    pub fn of_command(cmd: &Command, hierarchy: &ResourceHierarchy) -> Self {
        let mut footprint = Self::default();
        for request in &cmd.resources {
            footprint.expand(
                hierarchy,
                &request.name,
                ResourceShare {
                    weight: request.upper_bound,
                    release: request.release_at_termination,
                },
            );
        }
        footprint
    }

    /// Insert `name` if absent, then expand its children with the same
    /// release flag.
    ///
    /// A name already present was inserted together with its full
    /// expansion, so descent stops there; this also bounds the recursion on
    /// a cyclic hierarchy description.
    fn expand(&mut self, hierarchy: &ResourceHierarchy, name: &str, share: ResourceShare) {
        if self.entries.contains_key(name) {
            return;
        }
        self.entries.insert(name.to_string(), share);

        for child in hierarchy.children(name) {
            self.expand(
                hierarchy,
                &child.name,
                ResourceShare {
                    weight: child.weight,
                    release: share.release,
                },
            );
        }
    }

    /// Iterate entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ResourceShare)> {
        self.entries.iter().map(|(name, share)| (name.as_str(), *share))
    }

    /// The share recorded for `name`, if the footprint touches it.
    pub fn get(&self, name: &str) -> Option<ResourceShare> {
        self.entries.get(name).copied()
    }

    /// Number of distinct resources touched.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the command touches no resources.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! Resource arbiter - priority-ordered, hierarchy-aware admission control.
//!
//! One arbiter instance serves one executive: the executive drains its
//! outbound commands into a pending [`LinkedQueue`], calls
//! [`ResourceArbiter::arbitrate`] once per scheduling epoch, dispatches the
//! accepted queue, and calls [`ResourceArbiter::release`] when an accepted
//! command's execution ends. The allocation ledger and the active-command
//! map are the only state carried between calls.
//!
//! Admission is greedy in ascending priority order (lower priority number
//! first, FIFO among ties). Each resource runs two tallies against the same
//! capacity bound: negative weights accumulate on the `renewable` side,
//! non-negative weights on the `consumable` side; a command is rejected the
//! instant either tally of any touched resource leaves `[0, capacity]`, and
//! all of its tally updates are rolled back. Rejection is a normal outcome
//! surfaced as data (the reject queue), never an error.

use std::collections::BTreeMap;
use std::path::Path;

use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::arena::{Arena, ArenaIndex};
use crate::command::Command;
use crate::footprint::Footprint;
use crate::hierarchy::{HierarchyError, ResourceHierarchy};
use crate::queue::{LinkedQueue, PriorityQueue};

/// Per-resource running usage during one arbitration pass.
///
/// Both sides seed from the ledger's current allocation and share one
/// capacity bound; keeping them separate is deliberate (worst-case
/// accounting for both kinds of usage), do not collapse into a single
/// signed total.
#[derive(Clone, Copy, Debug)]
struct Tally {
    renewable: f64,
    consumable: f64,
}

impl Tally {
    fn seeded(held: f64) -> Self {
        Self {
            renewable: held,
            consumable: held,
        }
    }
}

/// The command-admission engine.
///
/// Single-threaded, call-and-return; the caller must not invoke
/// [`arbitrate`](Self::arbitrate) or [`release`](Self::release)
/// concurrently, and must not mutate a command while it is queued.
#[derive(Debug, Default)]
pub struct ResourceArbiter {
    /// Read-only after load
    hierarchy: ResourceHierarchy,
    /// Allocation ledger: resource name -> currently allocated amount.
    /// Entries are never zero; a value landing at exactly 0.0 is removed.
    allocated: BTreeMap<String, f64>,
    /// Footprint each active (accepted, not yet released) command was
    /// charged for, keyed by command id
    active: FxHashMap<u64, Footprint>,
}

impl ResourceArbiter {
    /// Create an arbiter with an empty hierarchy (every resource at
    /// capacity 1.0, no children).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an arbiter over an already-loaded hierarchy.
    pub fn with_hierarchy(hierarchy: ResourceHierarchy) -> Self {
        Self {
            hierarchy,
            ..Self::default()
        }
    }

    /// Load a hierarchy description, replacing the current one.
    ///
    /// On failure the hierarchy is left empty (see
    /// [`ResourceHierarchy::load`]); the ledger and active map are not
    /// touched either way.
    pub fn load_hierarchy(&mut self, text: &str) -> Result<(), HierarchyError> {
        self.hierarchy.load(text)
    }

    /// Load a hierarchy description file.
    pub fn load_hierarchy_file(&mut self, path: impl AsRef<Path>) -> Result<(), HierarchyError> {
        self.hierarchy.load_file(path)
    }

    /// The hierarchy currently in force.
    pub fn hierarchy(&self) -> &ResourceHierarchy {
        &self.hierarchy
    }

    /// Currently allocated amount of `name`, if any.
    pub fn allocated(&self, name: &str) -> Option<f64> {
        self.allocated.get(name).copied()
    }

    /// Iterate the ledger in name order.
    pub fn allocations(&self) -> impl Iterator<Item = (&str, f64)> {
        self.allocated.iter().map(|(name, held)| (name.as_str(), *held))
    }

    /// True while `cmd` is accepted and not yet released.
    pub fn is_active(&self, cmd: &Command) -> bool {
        self.active.contains_key(&cmd.id)
    }

    /// Number of active commands.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Arbitrate one batch of pending commands.
    ///
    /// Consumes `pending` entirely; every submitted command is spliced into
    /// exactly one of `accepted`/`rejected` (ownership transfer, no
    /// copying). Accepted commands are charged to the ledger and recorded
    /// in the active map.
    pub fn arbitrate(
        &mut self,
        arena: &mut Arena<Command>,
        pending: &mut LinkedQueue<Command>,
        accepted: &mut LinkedQueue<Command>,
        rejected: &mut LinkedQueue<Command>,
    ) {
        debug!(pending = pending.len(), "arbitrating command batch");

        let mut sorted = PriorityQueue::new();
        let mut footprints: FxHashMap<ArenaIndex, Footprint> = FxHashMap::default();

        // Partition: flatten footprints and order by priority. Commands
        // with no resource requests never contend and skip the sort.
        while let Some(index) = pending.pop(arena) {
            let cmd = arena.get(index);
            if cmd.resources.is_empty() {
                trace!(command = %cmd.name, "no resource requests, admitted directly");
                accepted.push(arena, index);
                continue;
            }
            if cmd.has_mixed_priorities() {
                warn!(
                    command = %cmd.name,
                    priority = cmd.priority(),
                    "resource requests carry differing priorities, using the first"
                );
            }
            footprints.insert(index, Footprint::of_command(cmd, &self.hierarchy));
            sorted.insert(arena, index, |a, b| a.priority() < b.priority());
        }

        // Seed both tallies of every touched resource from the ledger
        let mut tallies: FxHashMap<String, Tally> = FxHashMap::default();
        for index in sorted.iter(arena) {
            for (name, _) in footprints[&index].iter() {
                if !tallies.contains_key(name) {
                    let held = self.allocated.get(name).copied().unwrap_or(0.0);
                    tallies.insert(name.to_string(), Tally::seeded(held));
                }
            }
        }

        // Greedy admission in ascending priority order
        while let Some(index) = sorted.pop(arena) {
            let footprint = footprints
                .remove(&index)
                .expect("footprint computed during partition");
            let saved = tallies.clone();
            let mut violation: Option<String> = None;

            for (name, share) in footprint.iter() {
                let tally = tallies
                    .get_mut(name)
                    .expect("tally seeded for every touched resource");
                if share.weight < 0.0 {
                    tally.renewable += share.weight;
                } else {
                    tally.consumable += share.weight;
                }
                trace!(
                    resource = name,
                    weight = share.weight,
                    renewable = tally.renewable,
                    consumable = tally.consumable,
                    "tally update"
                );

                let capacity = self.hierarchy.capacity(name);
                if tally.renewable < 0.0
                    || tally.renewable > capacity
                    || tally.consumable < 0.0
                    || tally.consumable > capacity
                {
                    violation = Some(name.to_string());
                    break;
                }
            }

            if let Some(resource) = violation {
                let cmd = arena.get(index);
                debug!(
                    command = %cmd.name,
                    resource = %resource,
                    "rejected, usage would exceed limits"
                );
                tallies = saved;
                rejected.push(arena, index);
            } else {
                let cmd = arena.get(index);
                debug!(command = %cmd.name, resources = footprint.len(), "accepted");
                let id = cmd.id;

                for (name, share) in footprint.iter() {
                    let held = self.allocated.get(name).copied().unwrap_or(0.0) + share.weight;
                    if held == 0.0 {
                        self.allocated.remove(name);
                    } else {
                        self.allocated.insert(name.to_string(), held);
                    }
                }
                self.active.insert(id, footprint);
                accepted.push(arena, index);
            }
        }

        debug!(
            accepted = accepted.len(),
            rejected = rejected.len(),
            "arbitration complete"
        );
    }

    /// Reverse the releasable part of an accepted command's charge.
    ///
    /// Entries charged with `release == false` stay in the ledger
    /// indefinitely (sticky consumption). Calling this for a command that
    /// is not active is a silent no-op; the caller must invoke it exactly
    /// once per accepted command whose execution has ended, and never for a
    /// rejected one.
    pub fn release(&mut self, cmd: &Command) {
        let Some(footprint) = self.active.remove(&cmd.id) else {
            return;
        };

        for (name, share) in footprint.iter() {
            if !share.release {
                continue;
            }
            let held = self.allocated.get(name).copied().unwrap_or(0.0) - share.weight;
            if held == 0.0 {
                self.allocated.remove(name);
            } else {
                self.allocated.insert(name.to_string(), held);
            }
        }

        debug!(command = %cmd.name, "released resources");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ResourceRequest;

    struct Fixture {
        arena: Arena<Command>,
        pending: LinkedQueue<Command>,
        accepted: LinkedQueue<Command>,
        rejected: LinkedQueue<Command>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                arena: Arena::new(64),
                pending: LinkedQueue::new(),
                accepted: LinkedQueue::new(),
                rejected: LinkedQueue::new(),
            }
        }

        fn submit(&mut self, cmd: Command) -> ArenaIndex {
            let index = self.arena.alloc(cmd).expect("arena has room");
            self.pending.push(&mut self.arena, index);
            index
        }

        fn run(&mut self, arbiter: &mut ResourceArbiter) {
            arbiter.arbitrate(
                &mut self.arena,
                &mut self.pending,
                &mut self.accepted,
                &mut self.rejected,
            );
        }

        fn accepted_ids(&self) -> Vec<u64> {
            self.accepted
                .iter(&self.arena)
                .map(|i| self.arena.get(i).id)
                .collect()
        }

        fn rejected_ids(&self) -> Vec<u64> {
            self.rejected
                .iter(&self.arena)
                .map(|i| self.arena.get(i).id)
                .collect()
        }
    }

    fn request(name: &str, priority: i32, weight: f64) -> ResourceRequest {
        ResourceRequest::new(name, priority, weight)
    }

    #[test]
    fn test_accept_charges_ledger() {
        let mut arbiter = ResourceArbiter::new();
        let mut fx = Fixture::new();

        fx.submit(Command::with_resources(
            1,
            "sample",
            vec![request("Camera", 1, 0.5)],
        ));
        fx.run(&mut arbiter);

        assert_eq!(fx.accepted_ids(), vec![1]);
        assert!(fx.rejected_ids().is_empty());
        assert_eq!(arbiter.allocated("Camera"), Some(0.5));
        assert_eq!(arbiter.active_count(), 1);
    }

    #[test]
    fn test_pending_fully_consumed() {
        let mut arbiter = ResourceArbiter::new();
        let mut fx = Fixture::new();

        fx.submit(Command::new(1, "a"));
        fx.submit(Command::with_resources(2, "b", vec![request("R", 1, 1.0)]));
        fx.run(&mut arbiter);

        assert!(fx.pending.is_empty());
        assert_eq!(fx.accepted.len() + fx.rejected.len(), 2);
    }

    #[test]
    fn test_rejection_rolls_back_tallies() {
        // Second command pushes R past its default capacity, so only its
        // first resource would have been charged; the third command still
        // sees the post-first-command tallies.
        let mut arbiter = ResourceArbiter::new();
        let mut fx = Fixture::new();

        fx.submit(Command::with_resources(1, "a", vec![request("R", 1, 0.5)]));
        fx.submit(Command::with_resources(
            2,
            "b",
            vec![request("Q", 2, 0.5), request("R", 2, 0.6)],
        ));
        fx.submit(Command::with_resources(3, "c", vec![request("Q", 3, 0.5)]));
        fx.run(&mut arbiter);

        assert_eq!(fx.accepted_ids(), vec![1, 3]);
        assert_eq!(fx.rejected_ids(), vec![2]);
        assert_eq!(arbiter.allocated("R"), Some(0.5));
        assert_eq!(arbiter.allocated("Q"), Some(0.5));
    }

    #[test]
    fn test_ledger_seeds_next_batch() {
        let mut arbiter = ResourceArbiter::new();
        let mut fx = Fixture::new();

        fx.submit(Command::with_resources(1, "a", vec![request("R", 1, 0.8)]));
        fx.run(&mut arbiter);
        assert_eq!(fx.accepted_ids(), vec![1]);

        // A later epoch sees the standing charge
        fx.submit(Command::with_resources(2, "b", vec![request("R", 1, 0.8)]));
        fx.run(&mut arbiter);
        assert_eq!(fx.rejected_ids(), vec![2]);
        assert_eq!(arbiter.allocated("R"), Some(0.8));
    }

    #[test]
    fn test_release_unknown_command_is_noop() {
        let mut arbiter = ResourceArbiter::new();
        let stranger = Command::new(99, "stranger");

        arbiter.release(&stranger);
        assert_eq!(arbiter.active_count(), 0);
        assert_eq!(arbiter.allocations().count(), 0);
    }

    #[test]
    fn test_release_is_single_shot() {
        let mut arbiter = ResourceArbiter::new();
        let mut fx = Fixture::new();

        let index = fx.submit(Command::with_resources(
            1,
            "a",
            vec![request("R", 1, 0.5)],
        ));
        fx.run(&mut arbiter);

        let cmd = fx.arena.get(index).clone();
        arbiter.release(&cmd);
        assert_eq!(arbiter.allocated("R"), None);

        // Second release must not drive the ledger negative
        arbiter.release(&cmd);
        assert_eq!(arbiter.allocated("R"), None);
    }

    #[test]
    fn test_zero_weight_leaves_no_ledger_entry() {
        let mut arbiter = ResourceArbiter::new();
        let mut fx = Fixture::new();

        fx.submit(Command::with_resources(1, "a", vec![request("R", 1, 0.0)]));
        fx.run(&mut arbiter);

        assert_eq!(fx.accepted_ids(), vec![1]);
        assert_eq!(arbiter.allocated("R"), None, "zero entries are removed");
        assert_eq!(arbiter.active_count(), 1);
    }

    #[test]
    fn test_negative_request_needs_standing_allocation() {
        let mut arbiter = ResourceArbiter::new();
        let mut fx = Fixture::new();

        // Nothing allocated yet: the renewable tally would go negative
        fx.submit(Command::with_resources(1, "a", vec![request("R", 1, -0.5)]));
        fx.run(&mut arbiter);
        assert_eq!(fx.rejected_ids(), vec![1]);

        // With a standing charge from an earlier epoch the decrease fits
        fx.submit(Command::with_resources(2, "b", vec![request("R", 1, 0.9)]));
        fx.run(&mut arbiter);
        fx.submit(Command::with_resources(3, "c", vec![request("R", 2, -0.5)]));
        fx.run(&mut arbiter);
        assert_eq!(fx.accepted_ids(), vec![2, 3]);
        assert!(fx.rejected_ids() == vec![1]);
        assert!((arbiter.allocated("R").unwrap() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_hierarchy_reload_between_batches() {
        let mut arbiter = ResourceArbiter::new();
        arbiter.load_hierarchy("Bus 2.0 1.0 Sensor\n").unwrap();

        let mut fx = Fixture::new();
        fx.submit(Command::with_resources(1, "a", vec![request("Bus", 1, 1.5)]));
        fx.run(&mut arbiter);
        assert_eq!(fx.accepted_ids(), vec![1]);
        assert_eq!(arbiter.allocated("Sensor"), Some(1.0));

        // Ledger survives a reload
        arbiter.load_hierarchy("Bus 4.0\n").unwrap();
        assert_eq!(arbiter.allocated("Bus"), Some(1.5));
    }
}

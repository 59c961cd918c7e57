//! # Plan-Arbiter
//!
//! A deterministic, priority-ordered resource arbitration engine: the
//! command-admission layer of an autonomous-plan executive. Outgoing
//! actuator/device commands are gated against shared, capacity-limited
//! resources before dispatch.
//!
//! ## Design Principles
//!
//! - **Single-Owner**: one arbiter per executive, call-and-return, no locks
//! - **Intrusive Queues**: commands move between pending/accept/reject
//!   queues by O(1) splice of arena-index links, never by copying
//! - **Deterministic**: priority order with FIFO tie-break, name-ordered
//!   footprint walks; identical batches yield identical decisions
//! - **Stateful**: the allocation ledger and active-command map persist
//!   across arbitration epochs until commands are released
//!
//! ## Architecture
//!
//! ```text
//! [Executive outbound drain] --> LinkedQueue<Command> (pending)
//!                                        |
//!                                 [ResourceArbiter]
//!                      footprint flattening -> priority sort
//!                          -> greedy admission vs. ledger
//!                                   /          \
//!                          accepted queue   rejected queue
//! ```

pub mod arbiter;
pub mod arena;
pub mod command;
pub mod footprint;
pub mod hierarchy;
pub mod queue;

// Re-exports for convenience
pub use arbiter::ResourceArbiter;
pub use arena::{Arena, ArenaIndex, NULL_INDEX};
pub use command::{Command, ResourceRequest};
pub use footprint::{Footprint, ResourceShare};
pub use hierarchy::{HierarchyError, ResourceHierarchy, DEFAULT_CAPACITY};
pub use queue::{LinkedQueue, PriorityQueue};

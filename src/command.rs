//! Command and resource-request types.
//!
//! Commands are the queued participants of the arbitration engine: the
//! executive allocates them in the arena, drains them into a pending queue,
//! and the arbiter splices each into the accept or reject queue. The
//! arbiter reads them, it never mutates them.

/// A single resource claim carried by a command.
///
/// `upper_bound` is the weight charged against the resource when the
/// command is admitted; a negative weight models a release/decrease in
/// usage (renewable accounting, see [`crate::arbiter`]).
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceRequest {
    /// Resource name, the key into the hierarchy and the ledger
    pub name: String,
    /// Scheduling priority; lower values are admitted first
    pub priority: i32,
    /// Lower usage bound (carried for the executive, unused in admission)
    pub lower_bound: f64,
    /// Upper usage bound - the weight charged on acceptance
    pub upper_bound: f64,
    /// Whether the charge is reversed when the command's execution ends
    pub release_at_termination: bool,
}

impl ResourceRequest {
    /// Create a request charging `upper_bound` of `name`, released at
    /// termination.
    pub fn new(name: impl Into<String>, priority: i32, upper_bound: f64) -> Self {
        Self {
            name: name.into(),
            priority,
            lower_bound: upper_bound,
            upper_bound,
            release_at_termination: true,
        }
    }

    /// Same request with the release flag overridden.
    pub fn sticky(mut self) -> Self {
        self.release_at_termination = false;
        self
    }
}

/// An outgoing actuator/device command awaiting admission.
#[derive(Clone, Debug)]
pub struct Command {
    /// Stable identity; key of the arbiter's active-command map
    pub id: u64,
    /// Command name (for diagnostics)
    pub name: String,
    /// Ordered resource requests; the first one carries the priority
    pub resources: Vec<ResourceRequest>,
}

impl Command {
    /// Create a command with no resource requests.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            resources: Vec::new(),
        }
    }

    /// Create a command with the given resource requests.
    pub fn with_resources(
        id: u64,
        name: impl Into<String>,
        resources: Vec<ResourceRequest>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            resources,
        }
    }

    /// Scheduling priority: taken from the first resource request.
    ///
    /// A command with no requests never reaches the sort (it is admitted
    /// on the fast path), so the fallback value is inconsequential.
    #[inline]
    pub fn priority(&self) -> i32 {
        self.resources.first().map_or(0, |r| r.priority)
    }

    /// True when later requests disagree with the first one's priority.
    /// Documented-but-unenforced convention; the arbiter logs a warning.
    pub fn has_mixed_priorities(&self) -> bool {
        let first = self.priority();
        self.resources.iter().skip(1).any(|r| r.priority != first)
    }
}

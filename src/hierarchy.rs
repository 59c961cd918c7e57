//! Resource hierarchy - the read-only forest of capacity-bounded resources.
//!
//! Built once from a whitespace-delimited text description:
//!
//! ```text
//! <resourceName> <maxCapacity> [<childWeight> <childName>]*
//! ```
//!
//! Blank lines are skipped and `%` starts a comment line. Using a parent
//! resource implicitly uses the listed weighted amount of each child (and,
//! transitively, of the child's own children - see [`crate::footprint`]).
//!
//! A resource absent from the description is not an error: it behaves as an
//! independent resource with capacity 1.0 and no children.

use std::path::Path;

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;

/// Capacity assumed for any resource the description does not name.
pub const DEFAULT_CAPACITY: f64 = 1.0;

/// Failure to parse a hierarchy description. All variants carry the
/// 1-based line number of the offending row.
#[derive(Debug, Error)]
pub enum HierarchyError {
    /// The row has a resource name but no capacity value.
    #[error("line {line}: resource `{name}` is missing a capacity")]
    MissingCapacity { line: usize, name: String },

    /// The capacity token is not a number.
    #[error("line {line}: invalid capacity `{token}` for resource `{name}`")]
    InvalidCapacity {
        line: usize,
        name: String,
        token: String,
    },

    /// A child weight token is not a number.
    #[error("line {line}: invalid child weight `{token}`")]
    InvalidWeight { line: usize, token: String },

    /// A child weight has no resource name after it.
    #[error("line {line}: child weight {weight} is missing a resource name")]
    MissingChildName { line: usize, weight: f64 },

    /// The description file could not be read.
    #[error("failed to read hierarchy file: {0}")]
    Io(#[from] std::io::Error),
}

/// A weighted child reference inside a [`ResourceNode`].
///
/// The child's release behavior is not stored here: the flattener
/// propagates the top-level request's release flag to every descendant.
#[derive(Clone, Debug, PartialEq)]
pub struct ChildResource {
    /// Name of the child resource
    pub name: String,
    /// Amount of the child implied by one use of the parent; may be negative
    pub weight: f64,
}

/// One named resource: its capacity and its ordered child references.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceNode {
    /// Maximum consumable value (capacity); non-negative
    pub max_consumable: f64,
    /// Ordered weighted children
    pub children: Vec<ChildResource>,
}

/// The in-memory hierarchy map, read-only after a successful load.
#[derive(Debug, Default)]
pub struct ResourceHierarchy {
    nodes: FxHashMap<String, ResourceNode>,
}

impl ResourceHierarchy {
    /// Create an empty hierarchy (every resource at its defaults).
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a hierarchy description, replacing the current contents.
    ///
    /// The map is cleared before parsing begins, so a failed load leaves an
    /// empty hierarchy rather than the previous one. Any parse error aborts
    /// the whole load.
    pub fn load(&mut self, text: &str) -> Result<(), HierarchyError> {
        self.nodes.clear();

        for (lineno, raw) in text.lines().enumerate() {
            let line = lineno + 1;
            let trimmed = raw.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('%') {
                continue;
            }

            let mut tokens = trimmed.split_whitespace();
            let name = tokens
                .next()
                .expect("non-blank line has at least one token");

            let cap_token = tokens.next().ok_or_else(|| HierarchyError::MissingCapacity {
                line,
                name: name.to_string(),
            })?;
            let max_consumable: f64 =
                cap_token
                    .parse()
                    .map_err(|_| HierarchyError::InvalidCapacity {
                        line,
                        name: name.to_string(),
                        token: cap_token.to_string(),
                    })?;

            // Remaining tokens are weight/name pairs
            let mut children = Vec::new();
            while let Some(weight_token) = tokens.next() {
                let weight: f64 =
                    weight_token
                        .parse()
                        .map_err(|_| HierarchyError::InvalidWeight {
                            line,
                            token: weight_token.to_string(),
                        })?;
                let child_name = tokens
                    .next()
                    .ok_or(HierarchyError::MissingChildName { line, weight })?;
                children.push(ChildResource {
                    name: child_name.to_string(),
                    weight,
                });
            }

            self.nodes.insert(
                name.to_string(),
                ResourceNode {
                    max_consumable,
                    children,
                },
            );
        }

        debug!(resources = self.nodes.len(), "hierarchy loaded");
        Ok(())
    }

    /// Read and parse a hierarchy description file.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<(), HierarchyError> {
        let text = std::fs::read_to_string(path)?;
        self.load(&text)
    }

    /// Capacity of `name`, defaulting to [`DEFAULT_CAPACITY`] for resources
    /// the description does not mention.
    #[inline]
    pub fn capacity(&self, name: &str) -> f64 {
        self.nodes
            .get(name)
            .map_or(DEFAULT_CAPACITY, |n| n.max_consumable)
    }

    /// Weighted children of `name`; empty for unknown resources.
    #[inline]
    pub fn children(&self, name: &str) -> &[ChildResource] {
        self.nodes.get(name).map_or(&[], |n| n.children.as_slice())
    }

    /// Number of declared resources.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no resources are declared.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

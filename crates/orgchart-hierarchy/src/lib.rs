//! Orgchart hierarchy - reporting-line resolution and pagination
//!
//! Pure computations over snapshots of the position tree and the
//! assignment history:
//! - Transitive closure of descendant positions with tree depth ("level")
//! - Person-centric joins against current or windowed occupancy
//! - Page slicing of one fully resolved, deterministically ordered sequence

pub mod pagination;
pub mod resolver;

pub use pagination::paginate;
pub use resolver::{HierarchyResolver, TraversalLimits};

use thiserror::Error;

use orgchart_protocol::PositionId;
use orgchart_state::StateError;

/// Errors originating from the hierarchy layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    /// Store errors pass through unchanged.
    #[error(transparent)]
    Store(#[from] StateError),

    #[error("Hierarchy corrupted: position {position} reached twice while walking from {root}")]
    HierarchyCorrupted {
        root: PositionId,
        position: PositionId,
    },

    #[error("Traversal limit exceeded: {0}")]
    TraversalLimitExceeded(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl HierarchyError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, HierarchyError::Store(e) if e.is_not_found())
    }

    /// Whether the error signals stored data violating the tree invariants
    /// rather than bad input. A valid tree deeper or wider than the
    /// configured limits is not a fault.
    pub fn is_integrity_fault(&self) -> bool {
        matches!(self, HierarchyError::HierarchyCorrupted { .. })
    }

    pub fn is_limit_exceeded(&self) -> bool {
        matches!(self, HierarchyError::TraversalLimitExceeded(_))
    }
}

//! Orgchart state - position tree and assignment history stores
//!
//! Owns the two mutable record sets of the hierarchy engine:
//! - Position tree: a forest of positions per company with unique titles
//!   and acyclic parent links enforced at write time
//! - Assignment history: non-overlapping intervals binding employees to
//!   positions or pay-grade posts, one independent store per dimension
//!
//! Read access for the resolver goes through the [`PositionTree`] and
//! [`AssignmentHistory`] traits so any backing store can be walked.

pub mod assignment_store;
pub mod position_store;

pub use assignment_store::{validate_window, AssignmentStore, PositionHistory, PostHistory};
pub use position_store::PositionStore;

use std::fmt::{Debug, Display};
use std::hash::Hash;

use thiserror::Error;

use orgchart_protocol::{
    DateWindow, Dimension, EmployeeId, Interval, Position, PositionId, PostId,
};

/// Errors originating from the state layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Position not found: {0}")]
    PositionNotFound(PositionId),

    #[error("No {dimension} history for employee {employee} on {subject}")]
    IntervalNotFound {
        dimension: Dimension,
        subject: String,
        employee: EmployeeId,
    },

    #[error("Employee {employee} holds no current {dimension}")]
    NoCurrentAssignment {
        dimension: Dimension,
        employee: EmployeeId,
    },

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid parent: {0}")]
    InvalidParent(String),

    #[error("Cycle detected: position {position} cannot report to {parent}")]
    CycleDetected {
        position: PositionId,
        parent: PositionId,
    },

    #[error("Position {position} has dependents: {children} child position(s), {intervals} history record(s)")]
    HasDependents {
        position: PositionId,
        children: usize,
        intervals: usize,
    },

    #[error("Overlapping {dimension} interval for employee {employee}")]
    Overlap {
        dimension: Dimension,
        employee: EmployeeId,
    },

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl StateError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StateError::PositionNotFound(_)
                | StateError::IntervalNotFound { .. }
                | StateError::NoCurrentAssignment { .. }
        )
    }
}

/// An identifier that assignment history can be kept against.
pub trait Subject: Copy + Eq + Ord + Hash + Display + Debug {
    const DIMENSION: Dimension;
}

impl Subject for PositionId {
    const DIMENSION: Dimension = Dimension::Position;
}

impl Subject for PostId {
    const DIMENSION: Dimension = Dimension::Post;
}

/// Read-only view of a position forest.
pub trait PositionTree {
    fn position(&self, id: PositionId) -> Result<&Position, StateError>;

    /// Direct children of `id`, ordered by title.
    fn children_of(&self, id: PositionId) -> Result<Vec<&Position>, StateError>;
}

/// Read-only view of one dimension of assignment history.
pub trait AssignmentHistory<S: Subject> {
    /// The employee's open-ended interval in this dimension.
    fn current_assignment(&self, employee: EmployeeId) -> Result<&Interval<S>, StateError>;

    /// Employees whose current interval references `subject`, ascending.
    fn current_occupants(&self, subject: S) -> Vec<EmployeeId>;

    /// Every interval on `subject` intersecting `window`.
    fn intervals_for_subject(
        &self,
        subject: S,
        window: &DateWindow,
    ) -> Result<Vec<&Interval<S>>, StateError>;

    /// Every interval of `employee` intersecting `window`, newest start first.
    fn intervals_for_employee(
        &self,
        employee: EmployeeId,
        window: &DateWindow,
    ) -> Result<Vec<&Interval<S>>, StateError>;
}

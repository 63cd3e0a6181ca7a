//! Service-level error type.

use thiserror::Error;

use orgchart_hierarchy::HierarchyError;
use orgchart_state::StateError;

/// Errors returned by [`crate::OrgChartService`].
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        match self {
            ServiceError::State(e) => e.is_not_found(),
            ServiceError::Hierarchy(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// Stored data violates the tree invariants. Callers should report this
    /// as a server fault rather than a client error.
    pub fn is_integrity_fault(&self) -> bool {
        matches!(self, ServiceError::Hierarchy(e) if e.is_integrity_fault())
    }

    /// A walk hit the configured depth or node limit on a valid tree.
    pub fn is_limit_exceeded(&self) -> bool {
        matches!(self, ServiceError::Hierarchy(e) if e.is_limit_exceeded())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orgchart_protocol::PositionId;

    #[test]
    fn test_classification() {
        let id = PositionId::generate();
        assert!(ServiceError::from(StateError::PositionNotFound(id)).is_not_found());
        assert!(ServiceError::from(HierarchyError::Store(StateError::PositionNotFound(id)))
            .is_not_found());

        let corrupted = ServiceError::from(HierarchyError::HierarchyCorrupted {
            root: id,
            position: id,
        });
        assert!(corrupted.is_integrity_fault());
        assert!(!corrupted.is_not_found());

        assert!(!ServiceError::InvalidArgument("x".into()).is_integrity_fault());

        let too_deep = ServiceError::from(HierarchyError::TraversalLimitExceeded("depth".into()));
        assert!(too_deep.is_limit_exceeded());
        assert!(!too_deep.is_integrity_fault());
    }

    #[test]
    fn test_transparent_message() {
        let id = PositionId::generate();
        let err = ServiceError::from(StateError::PositionNotFound(id));
        assert_eq!(err.to_string(), format!("Position not found: {id}"));
    }
}

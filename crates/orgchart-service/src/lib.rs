//! Orgchart service - façade over the hierarchy engine
//!
//! The service owns the position tree and both assignment histories and
//! exposes them to the surrounding application:
//! - Position and interval CRUD with write-time invariant checks
//! - Sub-tree, current-subordinate and windowed-subordinate queries
//! - Employee and team history roll-ups
//! - JSON snapshot import/export
//!
//! Configuration is read from TOML with `ORGCHART_` environment overrides;
//! the `orgchart` binary wraps everything in a command-line tool.

pub mod config;
pub mod error;
pub mod service;
pub mod snapshot;

pub use config::ServiceConfig;
pub use error::ServiceError;
pub use service::{OrgChartService, OrgState};
pub use snapshot::{Snapshot, SnapshotSummary};

//! Orgchart protocol - core identifiers and records
//!
//! Shared vocabulary of the organizational hierarchy engine:
//! - Opaque UUID-backed identifiers for positions, employees, companies and posts
//! - Position and assignment-interval records with their write requests
//! - Derived hierarchy nodes produced by the resolver
//! - Page metadata shared by every paginated query

pub mod constants;
pub mod error;
pub mod identity;
pub mod types;

pub use constants::*;
pub use error::*;
pub use identity::*;
pub use types::*;

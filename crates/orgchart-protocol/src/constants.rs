/// Default number of items per page when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Maximum hierarchy depth walked before traversal is aborted.
/// Real reporting lines are far shallower; hitting this means bad data.
pub const MAX_HIERARCHY_DEPTH: u32 = 64;

/// Maximum number of positions a single traversal may visit.
pub const MAX_TRAVERSAL_NODES: usize = 100_000;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "ORGCHART_";

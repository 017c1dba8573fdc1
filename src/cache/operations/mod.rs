//! Cache lookup, population, and validation operations.

mod copy;
mod lookup;
mod populate;

pub use lookup::{CacheLookupResult, check_cache, list_cached_versions};
pub use populate::populate_cache;

/// Marker file name indicating a complete cache entry.
pub(crate) const COMPLETION_MARKER: &str = ".complete";

/// Observability target for cache operations.
const LOG_TARGET: &str = "codeql_setup::cache";

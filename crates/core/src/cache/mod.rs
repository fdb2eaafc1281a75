//! Content-addressable cache of classification results.
//!
//! Entries are keyed by `(path, fingerprint)`. A changed file gets a new
//! fingerprint and therefore a new key; the old row simply stops matching.
//! Stale rows are left in place since the cache is an optimization, not a
//! source of truth.

mod error;
mod memory;
mod result_cache;
mod sqlite;
mod traits;
mod types;

pub use error::CacheError;
pub use memory::MemoryCacheStore;
pub use result_cache::ResultCache;
pub use sqlite::SqliteCacheStore;
pub use traits::CacheStore;
pub use types::{CacheEntry, CacheStats, ClassificationResult, EmptyCategoryError};

//! Tenant-scoped HTTP response cache.
//!
//! This module provides a volatile, in-process cache for read endpoints that:
//! - Partitions entries by tenant slug, path and query string
//! - Expires entries after a TTL (lazily, on lookup or when room is needed)
//! - Bounds the number of entries, evicting stale entries first and then the
//!   single oldest one
//! - Answers `If-None-Match` revalidation with `304 Not Modified`

mod layer;
mod store;

pub use layer::response_cache;
#[cfg(test)]
pub use layer::X_CACHE;
pub use store::ResponseCache;

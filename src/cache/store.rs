//! In-memory response store with TTL freshness and a size bound.

use axum::body::Bytes;
use axum::http::{HeaderValue, Uri};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

/// Identifies one cached response. Tenants never share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
  tenant: String,
  path: String,
  query: String,
}

impl CacheKey {
  pub fn new(tenant: &str, uri: &Uri) -> Self {
    Self {
      tenant: tenant.to_string(),
      path: uri.path().to_string(),
      query: uri.query().unwrap_or_default().to_string(),
    }
  }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
  pub body: Bytes,
  pub etag: String,
  pub content_type: Option<HeaderValue>,
  stored_at: Instant,
  /// Breaks `stored_at` ties when picking the oldest entry
  seq: u64,
}

impl CacheEntry {
  fn age(&self, now: Instant) -> Duration {
    now.saturating_duration_since(self.stored_at)
  }
}

#[derive(Default)]
struct Entries {
  map: HashMap<CacheKey, CacheEntry>,
  next_seq: u64,
}

/// Tenant-scoped response cache shared by every request task.
///
/// Lookups and inserts each run as one critical section, so the capacity
/// bound holds with handlers running on several threads. The lock is never
/// held across an await point.
pub struct ResponseCache {
  entries: Mutex<Entries>,
  ttl: Duration,
  max_entries: usize,
}

impl ResponseCache {
  pub fn new(ttl: Duration, max_entries: usize) -> Self {
    Self {
      entries: Mutex::new(Entries::default()),
      ttl,
      max_entries: max_entries.max(1),
    }
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.lock().map.len()
  }

  #[cfg(test)]
  pub fn contains(&self, key: &CacheKey) -> bool {
    self.lock().map.contains_key(key)
  }

  /// The entry for `key` if it is younger than the TTL. Stale entries are
  /// left in place until an insert needs the room.
  pub fn lookup(&self, key: &CacheKey) -> Option<CacheEntry> {
    let entries = self.lock();
    entries
      .map
      .get(key)
      .filter(|entry| entry.age(Instant::now()) < self.ttl)
      .cloned()
  }

  /// Store a successful response body, evicting if the store is full.
  /// Returns the ETag assigned to the body.
  pub fn insert(&self, key: CacheKey, body: Bytes, content_type: Option<HeaderValue>) -> String {
    let etag = fingerprint(&body);
    let now = Instant::now();
    let mut entries = self.lock();

    if !entries.map.contains_key(&key) && entries.map.len() >= self.max_entries {
      let ttl = self.ttl;
      let before = entries.map.len();
      entries.map.retain(|_, entry| entry.age(now) < ttl);
      debug!(evicted = before - entries.map.len(), "evicted stale cache entries");

      if entries.map.len() >= self.max_entries {
        let oldest = entries
          .map
          .iter()
          .min_by_key(|(_, entry)| (entry.stored_at, entry.seq))
          .map(|(k, _)| k.clone());
        if let Some(oldest) = oldest {
          debug!(tenant = %oldest.tenant, path = %oldest.path, "evicted oldest cache entry");
          entries.map.remove(&oldest);
        }
      }
    }

    let seq = entries.next_seq;
    entries.next_seq += 1;
    entries.map.insert(
      key,
      CacheEntry {
        body,
        etag: etag.clone(),
        content_type,
        stored_at: now,
        seq,
      },
    );

    etag
  }

  fn lock(&self) -> MutexGuard<'_, Entries> {
    // Every critical section leaves the map consistent, so a poisoned lock is still usable.
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

/// Quoted ETag: the first 16 hex digits of the body's SHA-256.
pub fn fingerprint(body: &[u8]) -> String {
  let digest = hex::encode(Sha256::digest(body));
  format!("\"{}\"", &digest[..16])
}

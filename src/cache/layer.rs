//! Axum middleware serving tenant-scoped GET responses from the store.

use axum::{
  body::{Body, HttpBody},
  extract::{Request, State},
  http::{
    header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_NONE_MATCH},
    HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
  },
  middleware::Next,
  response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error};

use super::store::{CacheEntry, CacheKey, ResponseCache};
use crate::error::ApiError;
use crate::tenant::TenantConfig;

pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Larger or unsized bodies are passed through without being cached
const MAX_CACHEABLE_BODY: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
  Hit,
  Miss,
}

impl CacheStatus {
  fn header_value(self) -> HeaderValue {
    match self {
      CacheStatus::Hit => HeaderValue::from_static("HIT"),
      CacheStatus::Miss => HeaderValue::from_static("MISS"),
    }
  }
}

/// Response cache for tenant read endpoints.
///
/// Must run after tenant resolution. Requests without a tenant, and anything
/// other than GET, pass straight through. Only `200 OK` responses are stored.
pub async fn response_cache(
  State(cache): State<Arc<ResponseCache>>,
  request: Request,
  next: Next,
) -> Response {
  if request.method() != Method::GET {
    return next.run(request).await;
  }

  // Fail open: no identity means no cache, not a rejection.
  let Some(tenant) = request.extensions().get::<TenantConfig>() else {
    debug!(path = %request.uri().path(), "no tenant identity, bypassing response cache");
    return next.run(request).await;
  };

  let key = CacheKey::new(&tenant.slug, request.uri());

  if let Some(entry) = cache.lookup(&key) {
    if validator_matches(request.headers(), &entry.etag) {
      debug!(tenant = %tenant.slug, path = %request.uri().path(), "cache hit, not modified");
      let mut response = StatusCode::NOT_MODIFIED.into_response();
      set_cache_headers(response.headers_mut(), &cache, &entry.etag, CacheStatus::Hit);
      return response;
    }

    debug!(tenant = %tenant.slug, path = %request.uri().path(), "cache hit");
    return replay(&cache, entry);
  }

  let tenant_slug = tenant.slug.clone();
  let response = next.run(request).await;
  if response.status() != StatusCode::OK {
    return response;
  }

  let (mut parts, body) = response.into_parts();
  let fits = body
    .size_hint()
    .upper()
    .is_some_and(|len| len <= MAX_CACHEABLE_BODY as u64);
  if !fits {
    debug!(tenant = %tenant_slug, "response body too large or unsized, not cached");
    return Response::from_parts(parts, body);
  }

  let bytes = match axum::body::to_bytes(body, MAX_CACHEABLE_BODY).await {
    Ok(bytes) => bytes,
    Err(e) => {
      error!(tenant = %tenant_slug, error = %e, "failed to buffer response for caching");
      return ApiError::Internal(format!("failed to buffer response: {}", e)).into_response();
    }
  };

  let etag = cache.insert(key, bytes.clone(), parts.headers.get(CONTENT_TYPE).cloned());
  debug!(tenant = %tenant_slug, etag = %etag, "cache miss, stored response");

  set_cache_headers(&mut parts.headers, &cache, &etag, CacheStatus::Miss);
  Response::from_parts(parts, Body::from(bytes))
}

fn replay(cache: &ResponseCache, entry: CacheEntry) -> Response {
  let mut response = Response::new(Body::from(entry.body));
  let headers = response.headers_mut();
  headers.insert(
    CONTENT_TYPE,
    entry
      .content_type
      .unwrap_or_else(|| HeaderValue::from_static("application/json")),
  );
  set_cache_headers(headers, cache, &entry.etag, CacheStatus::Hit);
  response
}

fn set_cache_headers(headers: &mut HeaderMap, cache: &ResponseCache, etag: &str, status: CacheStatus) {
  if let Ok(value) = HeaderValue::from_str(etag) {
    headers.insert(ETAG, value);
  }
  let directive = format!("private, max-age={}", cache.ttl().as_secs());
  if let Ok(value) = HeaderValue::from_str(&directive) {
    headers.insert(CACHE_CONTROL, value);
  }
  headers.insert(X_CACHE, status.header_value());
}

/// `If-None-Match` check: any listed tag (weak or strong, quoted or not) or `*`.
fn validator_matches(headers: &HeaderMap, etag: &str) -> bool {
  let wanted = etag.trim_matches('"');

  headers
    .get_all(IF_NONE_MATCH)
    .iter()
    .filter_map(|value| value.to_str().ok())
    .flat_map(|value| value.split(','))
    .map(str::trim)
    .any(|candidate| {
      candidate == "*" || candidate.trim_start_matches("W/").trim_matches('"') == wanted
    })
}

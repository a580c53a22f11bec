//! Tenant identity: which upstream project/team a request is scoped to.

use axum::{
  async_trait,
  extract::{FromRequestParts, Request, State},
  http::{header::AUTHORIZATION, request::Parts, HeaderMap},
  middleware::Next,
  response::Response,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::config::TenantEntry;
use crate::error::ApiError;

/// Upstream scope of one request. `slug` partitions the response cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantConfig {
  pub slug: String,
  pub project: String,
  pub team: String,
}

/// Tenants from config, looked up by the SHA-256 of their bearer token.
#[derive(Debug, Default)]
pub struct TenantRegistry {
  by_token_hash: HashMap<String, TenantConfig>,
  ordered: Vec<TenantConfig>,
}

impl TenantRegistry {
  pub fn new(entries: &[TenantEntry]) -> Self {
    let ordered: Vec<TenantConfig> = entries
      .iter()
      .map(|e| TenantConfig {
        slug: e.slug.clone(),
        project: e.project.clone(),
        team: e.team.clone(),
      })
      .collect();

    let by_token_hash = entries
      .iter()
      .zip(ordered.iter())
      .map(|(entry, tenant)| (entry.token_sha256.clone(), tenant.clone()))
      .collect();

    Self {
      by_token_hash,
      ordered,
    }
  }

  pub fn resolve(&self, token: &str) -> Option<&TenantConfig> {
    self.by_token_hash.get(&token_hash(token))
  }

  /// First tenant in declaration order, used for upstream health checks.
  pub fn first(&self) -> Option<&TenantConfig> {
    self.ordered.first()
  }

  pub fn len(&self) -> usize {
    self.ordered.len()
  }

  pub fn is_empty(&self) -> bool {
    self.ordered.is_empty()
  }
}

pub fn token_hash(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(AUTHORIZATION)
    .and_then(|h| h.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

/// Attaches the caller's `TenantConfig` to the request when the bearer token
/// is known. Never rejects; tenant routes answer 401 through [`Tenant`].
pub async fn resolve_tenant(
  State(registry): State<Arc<TenantRegistry>>,
  mut request: Request,
  next: Next,
) -> Response {
  let tenant = bearer_token(request.headers()).and_then(|token| registry.resolve(token));

  match tenant {
    Some(tenant) => {
      let tenant = tenant.clone();
      request.extensions_mut().insert(tenant);
    }
    None => debug!(path = %request.uri().path(), "request without a known tenant"),
  }

  next.run(request).await
}

/// Extractor for the resolved tenant; 401 when identity is missing.
#[derive(Debug, Clone)]
pub struct Tenant(pub TenantConfig);

#[async_trait]
impl<S> FromRequestParts<S> for Tenant
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<TenantConfig>()
      .cloned()
      .map(Tenant)
      .ok_or(ApiError::Unauthorized)
  }
}

//! HTTP surface, mounted under `/api`.
//!
//! Tenant routes sit behind identity resolution and the response cache;
//! health routes sit behind neither.

use axum::{
  extract::State,
  http::StatusCode,
  middleware,
  response::{IntoResponse, Response},
  routing::get,
  Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::cache::{response_cache, ResponseCache};
use crate::devops::Iteration;
use crate::error::ApiError;
use crate::sprint::{build_summary, ClientStory, SprintAggregator, SprintInfo, SprintSummary};
use crate::tenant::{resolve_tenant, Tenant, TenantRegistry};

const STORIES_FAILED: &str = "Failed to fetch stories from Azure DevOps";
const SUMMARY_FAILED: &str = "Failed to fetch summary from Azure DevOps";
const ITERATIONS_FAILED: &str = "Failed to fetch iterations from Azure DevOps";

#[derive(Clone)]
pub struct AppState {
  pub aggregator: Arc<SprintAggregator>,
  pub tenants: Arc<TenantRegistry>,
  pub cache: Arc<ResponseCache>,
}

pub fn router(state: AppState) -> Router {
  // Layers run bottom-up: identity is resolved before the cache sees the request.
  let tenant_routes = Router::new()
    .route("/stories", get(stories))
    .route("/summary", get(summary))
    .route("/iterations", get(iterations))
    .layer(middleware::from_fn_with_state(state.cache.clone(), response_cache))
    .layer(middleware::from_fn_with_state(state.tenants.clone(), resolve_tenant));

  let api = Router::new()
    .route("/health", get(health))
    .route("/health/devops", get(devops_health))
    .route("/health/azure", get(devops_health))
    .merge(tenant_routes);

  Router::new()
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn stories(
  State(state): State<AppState>,
  Tenant(tenant): Tenant,
) -> Result<Json<Vec<ClientStory>>, ApiError> {
  let sprint = state
    .aggregator
    .fetch_current_sprint_stories(&tenant)
    .await
    .map_err(ApiError::upstream(STORIES_FAILED))?;

  Ok(Json(sprint.stories))
}

async fn summary(
  State(state): State<AppState>,
  Tenant(tenant): Tenant,
) -> Result<Json<SprintSummary>, ApiError> {
  let sprint = state
    .aggregator
    .fetch_current_sprint_stories(&tenant)
    .await
    .map_err(ApiError::upstream(SUMMARY_FAILED))?;

  let Some(iteration) = sprint.iteration else {
    return Err(ApiError::NotFound("No active sprint found"));
  };

  let info = SprintInfo {
    project_name: tenant.project,
    name: iteration.name,
    start_date: iteration.attributes.start_date,
    end_date: iteration.attributes.finish_date,
  };

  Ok(Json(build_summary(&sprint.stories, info)))
}

async fn iterations(
  State(state): State<AppState>,
  Tenant(tenant): Tenant,
) -> Result<Json<Vec<Iteration>>, ApiError> {
  let iterations = state
    .aggregator
    .client()
    .list_iterations(&tenant.project, &tenant.team)
    .await
    .map_err(ApiError::upstream(ITERATIONS_FAILED))?;

  Ok(Json(iterations))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
  status: &'static str,
  #[serde(skip_serializing_if = "Option::is_none")]
  error: Option<&'static str>,
}

async fn health() -> Json<HealthResponse> {
  Json(HealthResponse {
    status: "ok",
    error: None,
  })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DevOpsHealthResponse {
  status: &'static str,
  current_iteration: Option<String>,
}

/// Resolves the first tenant's current iteration as an upstream health check.
async fn devops_health(State(state): State<AppState>) -> Result<Response, ApiError> {
  let tenant = state
    .tenants
    .first()
    .ok_or_else(|| ApiError::Internal("no tenants configured".into()))?;

  let check = state
    .aggregator
    .client()
    .resolve_current_iteration(&tenant.project, &tenant.team)
    .await;

  match check {
    Ok(iteration) => Ok(
      Json(DevOpsHealthResponse {
        status: "ok",
        current_iteration: iteration.map(|i| i.name),
      })
      .into_response(),
    ),
    Err(e) => {
      warn!(tenant = %tenant.slug, error = %e, "upstream health check failed");
      Ok(
        (
          StatusCode::BAD_GATEWAY,
          Json(HealthResponse {
            status: "error",
            error: Some("Failed to reach Azure DevOps"),
          }),
        )
          .into_response(),
      )
    }
  }
}

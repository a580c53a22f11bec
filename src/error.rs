//! Client-facing errors for the HTTP layer.
//!
//! Upstream details never reach the response body; they were already logged
//! where the failure happened.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::devops::UpstreamError;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("authentication required")]
  Unauthorized,

  #[error("{0}")]
  NotFound(&'static str),

  /// `message` is what the client sees; `source` stays server-side.
  #[error("{message}")]
  Upstream {
    message: &'static str,
    #[source]
    source: UpstreamError,
  },

  #[error("{0}")]
  Internal(String),
}

impl ApiError {
  pub fn upstream(message: &'static str) -> impl FnOnce(UpstreamError) -> Self {
    move |source| Self::Upstream { message, source }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::Unauthorized => StatusCode::UNAUTHORIZED,
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
      Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match &self {
      Self::Upstream { message, source } => {
        warn!(error = %source, upstream_status = ?source.status(), "{}", message);
        (*message).to_string()
      }
      Self::Internal(detail) => {
        error!(error = %detail, "internal error");
        "Internal server error".to_string()
      }
      other => other.to_string(),
    };

    (status, Json(json!({ "error": message }))).into_response()
  }
}

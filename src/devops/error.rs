use std::time::Duration;
use thiserror::Error;

/// Failure of a single upstream call.
///
/// Every variant is logged where it is detected; callers only propagate it.
#[derive(Debug, Error)]
pub enum UpstreamError {
  #[error("{method} {url} timed out after {}s", .after.as_secs())]
  Timeout {
    method: &'static str,
    url: String,
    after: Duration,
  },

  #[error("upstream returned status {status} for {method} {url}")]
  Http {
    method: &'static str,
    url: String,
    status: u16,
  },

  #[error("network failure for {method} {url}: {message}")]
  Network {
    method: &'static str,
    url: String,
    message: String,
  },

  #[error("failed to decode response from {url}: {message}")]
  Decode { url: String, message: String },
}

impl UpstreamError {
  /// Upstream HTTP status, if the call got that far.
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Http { status, .. } => Some(*status),
      _ => None,
    }
  }
}

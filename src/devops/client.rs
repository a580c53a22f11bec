use crate::config::{Config, DevOpsConfig};
use crate::devops::error::UpstreamError;
use crate::devops::transport::{HttpTransport, Method, Transport, UpstreamRequest};
use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

const API_VERSION: &str = "7.1";

/// Azure DevOps REST client scoped to one organization.
///
/// Every call gets its own timeout and is never retried. Failures are logged
/// here, with the URL and upstream body, and returned unchanged.
#[derive(Clone)]
pub struct DevOpsClient {
  transport: Arc<dyn Transport>,
  base: Url,
  timeout: Duration,
}

impl DevOpsClient {
  pub fn new(config: &DevOpsConfig) -> Result<Self> {
    let token = Config::get_api_token()?;
    let transport = HttpTransport::new(token)
      .map_err(|e| eyre!("Failed to create Azure DevOps client: {}", e))?;

    let base = organization_url(&config.base_url, &config.organization)?;

    Ok(Self::with_transport(
      Arc::new(transport),
      base,
      config.timeout(),
    ))
  }

  pub fn with_transport(transport: Arc<dyn Transport>, base: Url, timeout: Duration) -> Self {
    Self {
      transport,
      base,
      timeout,
    }
  }

  /// Organization URL extended with the given path segments (each percent-encoded).
  pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
      .query_pairs_mut()
      .append_pair("api-version", API_VERSION);
    url
  }

  pub(crate) async fn get_json<T: DeserializeOwned>(
    &self,
    operation: &'static str,
    url: Url,
  ) -> Result<T, UpstreamError> {
    self
      .execute(
        operation,
        UpstreamRequest {
          method: Method::Get,
          url,
          body: None,
        },
      )
      .await
  }

  pub(crate) async fn post_json<T: DeserializeOwned>(
    &self,
    operation: &'static str,
    url: Url,
    body: Value,
  ) -> Result<T, UpstreamError> {
    self
      .execute(
        operation,
        UpstreamRequest {
          method: Method::Post,
          url,
          body: Some(body),
        },
      )
      .await
  }

  async fn execute<T: DeserializeOwned>(
    &self,
    operation: &'static str,
    request: UpstreamRequest,
  ) -> Result<T, UpstreamError> {
    let method = request.method.as_str();
    let url = request.url.to_string();
    debug!(operation, method, url = %url, "upstream request");

    // Dropping the send future on expiry cancels the in-flight request.
    let response = match tokio::time::timeout(self.timeout, self.transport.send(request)).await {
      Ok(Ok(response)) => response,
      Ok(Err(e)) => {
        error!(operation, method, url = %url, error = %e, "upstream request failed");
        return Err(e);
      }
      Err(_) => {
        error!(
          operation,
          method,
          url = %url,
          timeout_secs = self.timeout.as_secs(),
          "upstream request timed out"
        );
        return Err(UpstreamError::Timeout {
          method,
          url,
          after: self.timeout,
        });
      }
    };

    if !response.is_success() {
      error!(
        operation,
        method,
        status = response.status,
        url = %url,
        body = %response.body,
        "upstream returned an error status"
      );
      return Err(UpstreamError::Http {
        method,
        url,
        status: response.status,
      });
    }

    serde_json::from_str(&response.body).map_err(|e| {
      error!(operation, url = %url, error = %e, "failed to decode upstream response");
      UpstreamError::Decode {
        url,
        message: e.to_string(),
      }
    })
  }
}

fn organization_url(base_url: &str, organization: &str) -> Result<Url> {
  let mut url =
    Url::parse(base_url).map_err(|e| eyre!("Invalid devops.base_url {}: {}", base_url, e))?;

  url
    .path_segments_mut()
    .map_err(|_| eyre!("devops.base_url cannot be a base URL: {}", base_url))?
    .pop_if_empty()
    .push(organization);

  Ok(url)
}

//! Raw HTTP exchange with the upstream API.
//!
//! `DevOpsClient` owns timeouts, status checks and decoding; a transport only
//! moves bytes. Tests swap in an in-memory transport.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use url::Url;

use super::error::UpstreamError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Post,
}

impl Method {
  pub fn as_str(self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Post => "POST",
    }
  }
}

#[derive(Debug, Clone)]
pub struct UpstreamRequest {
  pub method: Method,
  pub url: Url,
  pub body: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct UpstreamResponse {
  pub status: u16,
  pub body: String,
}

impl UpstreamResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError>;
}

/// reqwest-backed transport authenticating with a personal access token.
pub struct HttpTransport {
  client: reqwest::Client,
  pat: String,
}

impl HttpTransport {
  pub fn new(pat: String) -> reqwest::Result<Self> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("sprintdeck/", env!("CARGO_PKG_VERSION")))
      .build()?;

    Ok(Self { client, pat })
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
    let method = request.method.as_str();
    let url = request.url.to_string();

    let builder = match request.method {
      Method::Get => self.client.get(request.url),
      Method::Post => self.client.post(request.url),
    };
    // PAT auth is Basic with an empty user name
    let builder = builder
      .basic_auth("", Some(&self.pat))
      .header(CONTENT_TYPE, "application/json");
    let builder = match &request.body {
      Some(body) => builder.json(body),
      None => builder,
    };

    let network = |e: reqwest::Error| UpstreamError::Network {
      method,
      url: url.clone(),
      message: e.to_string(),
    };

    let response = builder.send().await.map_err(network)?;
    let status = response.status().as_u16();
    let body = response.text().await.map_err(network)?;

    Ok(UpstreamResponse { status, body })
  }
}

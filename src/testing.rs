//! In-memory upstream and fixtures shared by the unit tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

use crate::config::TenantEntry;
use crate::devops::error::UpstreamError;
use crate::devops::transport::{Method, Transport, UpstreamRequest, UpstreamResponse};
use crate::devops::types::IterationAttributes;
use crate::devops::{DevOpsClient, Iteration, WorkItemId};
use crate::tenant::{token_hash, TenantConfig};

type Handler = dyn Fn(&UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> + Send + Sync;

/// Records every request and answers it with a handler closure.
#[derive(Clone)]
pub struct FakeTransport {
  handler: Arc<Handler>,
  requests: Arc<Mutex<Vec<UpstreamRequest>>>,
}

impl FakeTransport {
  pub fn new<F>(handler: F) -> Self
  where
    F: Fn(&UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> + Send + Sync + 'static,
  {
    Self {
      handler: Arc::new(handler),
      requests: Arc::new(Mutex::new(Vec::new())),
    }
  }

  pub fn reply_json(value: Value) -> Self {
    Self::new(move |_| Ok(json_reply(value.clone())))
  }

  pub fn reply_status(status: u16, body: &'static str) -> Self {
    Self::new(move |_| Ok(raw(status, body)))
  }

  pub fn requests(&self) -> Vec<UpstreamRequest> {
    self.requests.lock().unwrap().clone()
  }

  pub fn request_count(&self) -> usize {
    self.requests.lock().unwrap().len()
  }
}

#[async_trait]
impl Transport for FakeTransport {
  async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
    let reply = (self.handler)(&request);
    self.requests.lock().unwrap().push(request);
    reply
  }
}

/// Never answers.
pub struct StallingTransport;

#[async_trait]
impl Transport for StallingTransport {
  async fn send(&self, _request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
    tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
    Ok(raw(200, "{}"))
  }
}

pub fn raw(status: u16, body: &str) -> UpstreamResponse {
  UpstreamResponse {
    status,
    body: body.to_string(),
  }
}

pub fn json_reply(value: Value) -> UpstreamResponse {
  raw(200, &value.to_string())
}

pub fn fake_client(transport: FakeTransport) -> DevOpsClient {
  DevOpsClient::with_transport(
    Arc::new(transport),
    Url::parse("https://dev.azure.com/contoso").unwrap(),
    Duration::from_secs(30),
  )
}

pub fn iteration(name: &str, start: &str, finish: &str, time_frame: &str) -> Iteration {
  let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
  Iteration {
    id: format!("id-{}", name.to_lowercase().replace(' ', "-")),
    name: name.to_string(),
    path: format!("Acme Web\\{}", name),
    attributes: IterationAttributes {
      start_date: non_empty(start),
      finish_date: non_empty(finish),
      time_frame: non_empty(time_frame),
    },
  }
}

pub fn requested_ids(request: &UpstreamRequest) -> Vec<WorkItemId> {
  request
    .url
    .query_pairs()
    .find(|(k, _)| k == "ids")
    .map(|(_, v)| v.split(',').filter_map(|id| id.parse().ok()).collect())
    .unwrap_or_default()
}

pub fn work_items_reply(ids: &[WorkItemId]) -> UpstreamResponse {
  let value: Vec<Value> = ids
    .iter()
    .map(|id| {
      json!({
        "id": id,
        "rev": 1,
        "fields": {
          "System.Id": id,
          "System.Title": format!("Story {}", id),
          "System.State": "Active",
          "Microsoft.VSTS.Common.Priority": 2,
          "Microsoft.VSTS.Scheduling.Effort": 3,
        },
      })
    })
    .collect();

  json_reply(json!({ "count": value.len(), "value": value }))
}

/// Upstream serving one team: a "current" iteration (or none) whose WIQL
/// query yields `ids`.
pub fn sprint_upstream(has_iteration: bool, ids: Vec<WorkItemId>) -> FakeTransport {
  FakeTransport::new(move |request| {
    let path = request.url.path();
    if request.method == Method::Post {
      let refs: Vec<Value> = ids.iter().map(|id| json!({ "id": id, "url": "" })).collect();
      return Ok(json_reply(json!({ "workItems": refs })));
    }
    if path.ends_with("/teamsettings/iterations") {
      let value: Vec<Iteration> = if has_iteration {
        vec![iteration(
          "Sprint 4",
          "2020-01-01T00:00:00Z",
          "2020-01-14T00:00:00Z",
          "current",
        )]
      } else {
        Vec::new()
      };
      return Ok(json_reply(json!({ "count": value.len(), "value": value })));
    }
    Ok(work_items_reply(&requested_ids(request)))
  })
}

pub fn acme() -> TenantConfig {
  TenantConfig {
    slug: "acme".into(),
    project: "Acme Web".into(),
    team: "Acme Web Team".into(),
  }
}

pub fn tenant_entry(slug: &str, token: &str) -> TenantEntry {
  TenantEntry {
    slug: slug.to_string(),
    project: format!("{} project", slug),
    team: format!("{} team", slug),
    token_sha256: token_hash(token),
  }
}

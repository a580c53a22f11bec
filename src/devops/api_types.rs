//! Serde envelopes for Azure DevOps responses.
//!
//! Records that are passed on unchanged (iterations, work items) deserialize
//! straight into the domain types; only the wrappers live here.

use serde::Deserialize;

use super::types::WorkItemId;

/// `{ "count": n, "value": [...] }` list envelope.
#[derive(Debug, Deserialize)]
pub struct ApiList<T> {
  #[serde(default = "Vec::new")]
  pub value: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiWiqlResponse {
  #[serde(default)]
  pub work_items: Vec<ApiWorkItemRef>,
}

#[derive(Debug, Deserialize)]
pub struct ApiWorkItemRef {
  pub id: WorkItemId,
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type WorkItemId = u64;

/// Sprint / time-box as reported by the team settings API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Iteration {
  pub id: String,
  pub name: String,
  pub path: String,
  #[serde(default)]
  pub attributes: IterationAttributes,
}

/// Dates stay as upstream strings; they are parsed only when a tier needs them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationAttributes {
  pub start_date: Option<String>,
  pub finish_date: Option<String>,
  pub time_frame: Option<String>,
}

/// Work item with its requested field projection, untyped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawWorkItem {
  pub id: WorkItemId,
  #[serde(default)]
  pub fields: Map<String, Value>,
}

impl RawWorkItem {
  pub fn field(&self, name: &str) -> Option<&Value> {
    self.fields.get(name).filter(|v| !v.is_null())
  }
}

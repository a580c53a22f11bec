use std::collections::HashMap;
use tracing::debug;

use super::api_types::ApiList;
use super::client::DevOpsClient;
use super::error::UpstreamError;
use super::types::{RawWorkItem, WorkItemId};

/// Upstream hard limit on ids per work item batch request
pub const BATCH_SIZE: usize = 200;

/// Field projection requested for every work item
pub const FIELDS: &[&str] = &[
  "System.Id",
  "System.Title",
  "System.State",
  "System.AssignedTo",
  "Microsoft.VSTS.Scheduling.Effort",
  "Microsoft.VSTS.Common.Priority",
  "System.Tags",
  "System.ChangedDate",
  "Microsoft.VSTS.Scheduling.TargetDate",
];

impl DevOpsClient {
  /// Fetch full field sets for `ids`, in batches of at most `BATCH_SIZE`.
  ///
  /// Batches run one after another and any failure aborts the whole call.
  /// The result follows the order of `ids`, whatever order each batch came
  /// back in.
  pub async fn hydrate(&self, ids: &[WorkItemId]) -> Result<Vec<RawWorkItem>, UpstreamError> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }

    let fields = FIELDS.join(",");
    let mut items = Vec::with_capacity(ids.len());

    for (index, batch) in ids.chunks(BATCH_SIZE).enumerate() {
      let mut url = self.endpoint(&["_apis", "wit", "workitems"]);
      url
        .query_pairs_mut()
        .append_pair("ids", &join_ids(batch))
        .append_pair("fields", &fields);

      let response: ApiList<RawWorkItem> = self.get_json("hydrate_work_items", url).await?;
      debug!(
        batch = index,
        requested = batch.len(),
        received = response.value.len(),
        "hydrated work item batch"
      );
      items.extend(response.value);
    }

    Ok(in_request_order(ids, items))
  }
}

fn join_ids(ids: &[WorkItemId]) -> String {
  ids
    .iter()
    .map(|id| id.to_string())
    .collect::<Vec<_>>()
    .join(",")
}

/// Stable re-sort by position in `ids`; ids nobody asked for go last.
fn in_request_order(ids: &[WorkItemId], mut items: Vec<RawWorkItem>) -> Vec<RawWorkItem> {
  let positions: HashMap<WorkItemId, usize> = ids
    .iter()
    .enumerate()
    .rev()
    .map(|(position, id)| (*id, position))
    .collect();

  items.sort_by_key(|item| positions.get(&item.id).copied().unwrap_or(usize::MAX));
  items
}

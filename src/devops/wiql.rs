//! WIQL query for the user stories of one iteration.

use serde_json::json;
use tracing::debug;

use super::api_types::ApiWiqlResponse;
use super::client::DevOpsClient;
use super::error::UpstreamError;
use super::types::WorkItemId;

const WORK_ITEM_TYPE: &str = "User Story";

impl DevOpsClient {
  /// Ids of the project's user stories under `iteration_path`, ordered by
  /// priority ascending then last change descending.
  pub async fn query_work_item_ids(
    &self,
    project: &str,
    iteration_path: &str,
  ) -> Result<Vec<WorkItemId>, UpstreamError> {
    let url = self.endpoint(&[project, "_apis", "wit", "wiql"]);
    let query = sprint_query(project, iteration_path);

    let response: ApiWiqlResponse = self
      .post_json("query_work_items", url, json!({ "query": query }))
      .await?;

    let ids: Vec<WorkItemId> = response.work_items.into_iter().map(|w| w.id).collect();
    debug!(project, iteration_path, count = ids.len(), "queried work item ids");
    Ok(ids)
  }
}

/// WIQL has no bind variables: literals are quoted by hand.
pub fn escape_literal(value: &str) -> String {
  value.replace('\'', "''")
}

pub fn sprint_query(project: &str, iteration_path: &str) -> String {
  format!(
    "SELECT [System.Id] \
     FROM WorkItems \
     WHERE [System.TeamProject] = '{project}' \
     AND [System.WorkItemType] = '{WORK_ITEM_TYPE}' \
     AND [System.IterationPath] UNDER '{path}' \
     ORDER BY [Microsoft.VSTS.Common.Priority] ASC, [System.ChangedDate] DESC",
    project = escape_literal(project),
    path = escape_literal(iteration_path),
  )
}

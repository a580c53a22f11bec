//! Current-sprint aggregation: iteration → story ids → work items → stories.

pub mod transform;

use serde::Serialize;
use tracing::info;

use crate::devops::{DevOpsClient, Iteration, UpstreamError};
use crate::tenant::TenantConfig;

pub use transform::{build_summary, transform_work_item, ClientStory, SprintInfo, SprintSummary};

#[derive(Debug, Clone, Serialize)]
pub struct SprintStories {
  pub stories: Vec<ClientStory>,
  /// `None` means the team has no active sprint
  pub iteration: Option<Iteration>,
}

/// Runs the upstream calls for one request strictly one after another.
#[derive(Clone)]
pub struct SprintAggregator {
  client: DevOpsClient,
}

impl SprintAggregator {
  pub fn new(client: DevOpsClient) -> Self {
    Self { client }
  }

  pub fn client(&self) -> &DevOpsClient {
    &self.client
  }

  pub async fn fetch_current_sprint_stories(
    &self,
    tenant: &TenantConfig,
  ) -> Result<SprintStories, UpstreamError> {
    let Some(iteration) = self
      .client
      .resolve_current_iteration(&tenant.project, &tenant.team)
      .await?
    else {
      info!(tenant = %tenant.slug, "no active sprint");
      return Ok(SprintStories {
        stories: Vec::new(),
        iteration: None,
      });
    };

    info!(
      tenant = %tenant.slug,
      iteration = %iteration.name,
      path = %iteration.path,
      "resolved current iteration"
    );

    let ids = self
      .client
      .query_work_item_ids(&tenant.project, &iteration.path)
      .await?;
    info!(tenant = %tenant.slug, count = ids.len(), "work item ids");

    let stories = self
      .client
      .hydrate(&ids)
      .await?
      .into_iter()
      .map(transform_work_item)
      .collect();

    Ok(SprintStories {
      stories,
      iteration: Some(iteration),
    })
  }
}

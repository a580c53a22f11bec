//! Current-iteration resolution.
//!
//! Tiers are tried in order, first match wins:
//! 1. the iteration whose start..finish range (inclusive) contains now
//! 2. the first iteration the upstream flags with `timeFrame == "current"`
//! 3. the last iteration in the list

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::{debug, info};

use super::api_types::ApiList;
use super::client::DevOpsClient;
use super::error::UpstreamError;
use super::types::Iteration;

type Tier = fn(&Iteration, DateTime<Utc>) -> bool;

const TIERS: &[(&str, Tier)] = &[
  ("date_range", contains_now),
  ("time_frame", flagged_current),
];

impl DevOpsClient {
  /// All iterations configured for a team, in upstream order.
  pub async fn list_iterations(
    &self,
    project: &str,
    team: &str,
  ) -> Result<Vec<Iteration>, UpstreamError> {
    let url = self.endpoint(&[
      project,
      team,
      "_apis",
      "work",
      "teamsettings",
      "iterations",
    ]);

    let response: ApiList<Iteration> = self.get_json("list_iterations", url).await?;
    Ok(response.value)
  }

  /// The team's current iteration, or `None` when the team has no iterations at all.
  pub async fn resolve_current_iteration(
    &self,
    project: &str,
    team: &str,
  ) -> Result<Option<Iteration>, UpstreamError> {
    let iterations = self.list_iterations(project, team).await?;
    let current = select_current(&iterations, Utc::now()).cloned();

    if current.is_none() {
      info!(project, team, "team has no iterations");
    }

    Ok(current)
  }
}

pub fn select_current(iterations: &[Iteration], now: DateTime<Utc>) -> Option<&Iteration> {
  for &(tier_name, tier) in TIERS {
    if let Some(found) = iterations.iter().find(|iteration| tier(iteration, now)) {
      debug!(tier = tier_name, iteration = %found.name, "selected current iteration");
      return Some(found);
    }
  }

  let last = iterations.last();
  if let Some(found) = last {
    debug!(tier = "last", iteration = %found.name, "selected current iteration");
  }
  last
}

fn contains_now(iteration: &Iteration, now: DateTime<Utc>) -> bool {
  let attributes = &iteration.attributes;
  let start = attributes.start_date.as_deref().and_then(parse_upstream_date);
  let finish = attributes.finish_date.as_deref().and_then(parse_upstream_date);

  match (start, finish) {
    (Some(start), Some(finish)) => start <= now && now <= finish,
    _ => false,
  }
}

fn flagged_current(iteration: &Iteration, _now: DateTime<Utc>) -> bool {
  iteration.attributes.time_frame.as_deref() == Some("current")
}

/// Upstream dates are RFC 3339, but older servers omit the offset.
fn parse_upstream_date(value: &str) -> Option<DateTime<Utc>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
    return Some(dt.with_timezone(&Utc));
  }
  if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
    return Some(naive.and_utc());
  }
  NaiveDate::parse_from_str(value, "%Y-%m-%d")
    .ok()
    .and_then(|date| date.and_hms_opt(0, 0, 0))
    .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::devops::types::IterationAttributes;
  use crate::testing::{fake_client, iteration, FakeTransport};
  use chrono::TimeZone;
  use serde_json::json;

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
  }

  // A: dates contain now, B: flagged current but dated in the past, C/D: neither
  fn a() -> Iteration {
    iteration("A", "2024-03-04T00:00:00Z", "2024-03-15T00:00:00Z", "future")
  }

  fn b() -> Iteration {
    iteration("B", "2024-02-01T00:00:00Z", "2024-02-14T00:00:00Z", "current")
  }

  fn c() -> Iteration {
    iteration("C", "2024-01-01T00:00:00Z", "2024-01-14T00:00:00Z", "past")
  }

  fn d() -> Iteration {
    iteration("D", "2024-04-01T00:00:00Z", "2024-04-14T00:00:00Z", "future")
  }

  #[test]
  fn test_date_range_beats_time_frame() {
    let iterations = vec![c(), b(), a()];
    assert_eq!(select_current(&iterations, now()).unwrap().name, "A");
  }

  #[test]
  fn test_time_frame_when_no_range_matches() {
    let iterations = vec![c(), b(), d()];
    assert_eq!(select_current(&iterations, now()).unwrap().name, "B");
  }

  #[test]
  fn test_last_resort_is_last_element() {
    let iterations = vec![c(), d()];
    assert_eq!(select_current(&iterations, now()).unwrap().name, "D");
  }

  #[test]
  fn test_empty_list_has_no_current() {
    assert!(select_current(&[], now()).is_none());
  }

  #[test]
  fn test_range_is_inclusive() {
    let edge = iteration("Edge", "2024-03-01T00:00:00Z", "2024-03-10T12:00:00Z", "past");
    let iterations = vec![edge, d()];
    assert_eq!(select_current(&iterations, now()).unwrap().name, "Edge");
  }

  #[test]
  fn test_missing_dates_skip_range_tier() {
    let undated = Iteration {
      id: "u".into(),
      name: "Undated".into(),
      path: "Proj\\Undated".into(),
      attributes: IterationAttributes {
        start_date: None,
        finish_date: None,
        time_frame: Some("current".into()),
      },
    };
    let iterations = vec![undated, d()];
    assert_eq!(select_current(&iterations, now()).unwrap().name, "Undated");
  }

  #[test]
  fn test_unparseable_dates_skip_range_tier() {
    let garbled = iteration("Garbled", "soon", "later", "future");
    let iterations = vec![garbled, c()];
    assert_eq!(select_current(&iterations, now()).unwrap().name, "C");
  }

  #[test]
  fn test_parse_upstream_date_forms() {
    let expected = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
    assert_eq!(parse_upstream_date("2024-03-04T00:00:00Z"), Some(expected));
    assert_eq!(parse_upstream_date("2024-03-04T00:00:00"), Some(expected));
    assert_eq!(parse_upstream_date("2024-03-04"), Some(expected));
    assert_eq!(parse_upstream_date(""), None);
  }

  #[tokio::test]
  async fn test_resolve_fetches_team_iterations() {
    let transport = FakeTransport::reply_json(json!({
      "count": 2,
      "value": [c(), d()],
    }));
    let client = fake_client(transport.clone());

    let current = client
      .resolve_current_iteration("Acme Web", "Acme Web Team")
      .await
      .unwrap();

    assert_eq!(current.unwrap().name, "D");
    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
      requests[0].url.path(),
      "/contoso/Acme%20Web/Acme%20Web%20Team/_apis/work/teamsettings/iterations"
    );
  }

  #[tokio::test]
  async fn test_resolve_empty_list_is_none() {
    let transport = FakeTransport::reply_json(json!({ "count": 0, "value": [] }));
    let client = fake_client(transport);

    let current = client.resolve_current_iteration("P", "T").await.unwrap();
    assert!(current.is_none());
  }

  #[tokio::test]
  async fn test_resolve_propagates_upstream_error() {
    let client = fake_client(FakeTransport::reply_status(401, "unauthorized"));

    let err = client.resolve_current_iteration("P", "T").await.unwrap_err();
    assert_eq!(err.status(), Some(401));
  }
}

//! Work item → dashboard view model.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::devops::{RawWorkItem, WorkItemId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum StoryState {
  Planned,
  #[serde(rename = "In Progress")]
  InProgress,
  #[serde(rename = "In Review")]
  InReview,
  Completed,
  Blocked,
}

impl StoryState {
  pub const ALL: [StoryState; 5] = [
    StoryState::Planned,
    StoryState::InProgress,
    StoryState::InReview,
    StoryState::Completed,
    StoryState::Blocked,
  ];

  fn from_upstream(state: &str, tags: &[String]) -> Self {
    if tags.iter().any(|t| t.eq_ignore_ascii_case("blocked")) {
      return StoryState::Blocked;
    }

    match state.to_ascii_lowercase().as_str() {
      "committed" | "active" | "in progress" | "doing" => StoryState::InProgress,
      "in review" | "resolved" | "testing" => StoryState::InReview,
      "done" | "closed" => StoryState::Completed,
      "blocked" => StoryState::Blocked,
      // new, approved, to do, proposed, and anything unknown
      _ => StoryState::Planned,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Priority {
  Critical,
  High,
  Medium,
  Low,
  Unset,
}

impl Priority {
  pub const ALL: [Priority; 5] = [
    Priority::Critical,
    Priority::High,
    Priority::Medium,
    Priority::Low,
    Priority::Unset,
  ];

  fn from_upstream(value: Option<&Value>) -> Self {
    match value.and_then(Value::as_i64) {
      Some(1) => Priority::Critical,
      Some(2) => Priority::High,
      Some(3) => Priority::Medium,
      Some(4) => Priority::Low,
      _ => Priority::Unset,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignee {
  pub name: String,
  pub email: Option<String>,
  pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientStory {
  pub id: WorkItemId,
  pub title: String,
  pub state: StoryState,
  pub assignee: Option<Assignee>,
  pub effort: Option<f64>,
  pub priority: Priority,
  pub tags: Vec<String>,
  pub changed_date: Option<String>,
  pub target_date: Option<String>,
}

pub fn transform_work_item(item: RawWorkItem) -> ClientStory {
  let text = |name: &str| item.field(name).and_then(Value::as_str).map(String::from);

  let tags: Vec<String> = text("System.Tags")
    .map(|raw| {
      raw
        .split(';')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
    })
    .unwrap_or_default();

  let state = StoryState::from_upstream(
    item
      .field("System.State")
      .and_then(Value::as_str)
      .unwrap_or_default(),
    &tags,
  );

  ClientStory {
    id: item.id,
    title: text("System.Title").unwrap_or_default(),
    state,
    assignee: item.field("System.AssignedTo").and_then(assignee),
    effort: item
      .field("Microsoft.VSTS.Scheduling.Effort")
      .and_then(Value::as_f64),
    priority: Priority::from_upstream(item.field("Microsoft.VSTS.Common.Priority")),
    tags,
    changed_date: text("System.ChangedDate"),
    target_date: text("Microsoft.VSTS.Scheduling.TargetDate"),
  }
}

/// Identity fields are objects on current servers and plain "Name <email>"
/// strings on old ones.
fn assignee(value: &Value) -> Option<Assignee> {
  match value {
    Value::Object(identity) => {
      let get = |key: &str| identity.get(key).and_then(Value::as_str).map(String::from);
      Some(Assignee {
        name: get("displayName")?,
        email: get("uniqueName"),
        avatar_url: get("imageUrl"),
      })
    }
    Value::String(raw) => {
      let (name, email) = match raw.split_once('<') {
        Some((name, rest)) => (name.trim(), Some(rest.trim_end_matches('>').trim())),
        None => (raw.trim(), None),
      };
      (!name.is_empty()).then(|| Assignee {
        name: name.to_string(),
        email: email.map(String::from),
        avatar_url: None,
      })
    }
    _ => None,
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintInfo {
  pub project_name: String,
  pub name: String,
  pub start_date: Option<String>,
  pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintSummary {
  pub sprint: SprintInfo,
  pub total_stories: usize,
  pub total_effort: f64,
  pub completed_effort: f64,
  /// Share of effort completed, 0..=100, one decimal
  pub completion_percent: f64,
  pub by_state: BTreeMap<StoryState, usize>,
  pub by_priority: BTreeMap<Priority, usize>,
}

pub fn build_summary(stories: &[ClientStory], sprint: SprintInfo) -> SprintSummary {
  let mut by_state: BTreeMap<StoryState, usize> = StoryState::ALL.iter().map(|s| (*s, 0)).collect();
  let mut by_priority: BTreeMap<Priority, usize> = Priority::ALL.iter().map(|p| (*p, 0)).collect();
  let mut total_effort = 0.0;
  let mut completed_effort = 0.0;

  for story in stories {
    *by_state.entry(story.state).or_default() += 1;
    *by_priority.entry(story.priority).or_default() += 1;

    let effort = story.effort.unwrap_or(0.0);
    total_effort += effort;
    if story.state == StoryState::Completed {
      completed_effort += effort;
    }
  }

  let completion_percent = if total_effort > 0.0 {
    (completed_effort / total_effort * 1000.0).round() / 10.0
  } else {
    0.0
  };

  SprintSummary {
    sprint,
    total_stories: stories.len(),
    total_effort,
    completed_effort,
    completion_percent,
    by_state,
    by_priority,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn raw(id: WorkItemId, fields: Value) -> RawWorkItem {
    RawWorkItem {
      id,
      fields: fields.as_object().cloned().unwrap_or_default(),
    }
  }

  #[test]
  fn test_full_item() {
    let story = transform_work_item(raw(
      12,
      json!({
        "System.Id": 12,
        "System.Title": "Checkout redesign",
        "System.State": "Active",
        "System.AssignedTo": {
          "displayName": "Sam Lee",
          "uniqueName": "sam@acme.test",
          "imageUrl": "https://img/sam"
        },
        "Microsoft.VSTS.Scheduling.Effort": 5.0,
        "Microsoft.VSTS.Common.Priority": 2,
        "System.Tags": "frontend; payments ;",
        "System.ChangedDate": "2024-03-08T10:00:00Z",
        "Microsoft.VSTS.Scheduling.TargetDate": null
      }),
    ));

    assert_eq!(story.id, 12);
    assert_eq!(story.title, "Checkout redesign");
    assert_eq!(story.state, StoryState::InProgress);
    assert_eq!(story.priority, Priority::High);
    assert_eq!(story.effort, Some(5.0));
    assert_eq!(story.tags, vec!["frontend", "payments"]);
    assert_eq!(story.assignee.unwrap().email.as_deref(), Some("sam@acme.test"));
    assert_eq!(story.changed_date.as_deref(), Some("2024-03-08T10:00:00Z"));
    assert_eq!(story.target_date, None);
  }

  #[test]
  fn test_sparse_item_defaults() {
    let story = transform_work_item(raw(1, json!({})));

    assert_eq!(story.title, "");
    assert_eq!(story.state, StoryState::Planned);
    assert_eq!(story.priority, Priority::Unset);
    assert!(story.assignee.is_none());
    assert!(story.tags.is_empty());
  }

  #[test]
  fn test_state_mapping() {
    let state = |s: &str| StoryState::from_upstream(s, &[]);
    assert_eq!(state("New"), StoryState::Planned);
    assert_eq!(state("Committed"), StoryState::InProgress);
    assert_eq!(state("Resolved"), StoryState::InReview);
    assert_eq!(state("Done"), StoryState::Completed);
    assert_eq!(state("Closed"), StoryState::Completed);
    assert_eq!(state("Mystery"), StoryState::Planned);
    assert_eq!(
      StoryState::from_upstream("Active", &["Blocked".to_string()]),
      StoryState::Blocked
    );
  }

  #[test]
  fn test_legacy_string_assignee() {
    let assignee = assignee(&json!("Sam Lee <sam@acme.test>")).unwrap();
    assert_eq!(assignee.name, "Sam Lee");
    assert_eq!(assignee.email.as_deref(), Some("sam@acme.test"));
  }

  #[test]
  fn test_serialized_shape() {
    let story = transform_work_item(raw(3, json!({ "System.State": "Resolved" })));
    let value = serde_json::to_value(&story).unwrap();

    assert_eq!(value["state"], "In Review");
    assert_eq!(value["priority"], "Unset");
    assert!(value.get("changedDate").is_some());
  }

  #[test]
  fn test_summary_totals() {
    let story = |state, effort, priority| ClientStory {
      id: 1,
      title: String::new(),
      state,
      assignee: None,
      effort,
      priority,
      tags: Vec::new(),
      changed_date: None,
      target_date: None,
    };
    let stories = vec![
      story(StoryState::Completed, Some(3.0), Priority::High),
      story(StoryState::InProgress, Some(5.0), Priority::High),
      story(StoryState::Planned, None, Priority::Low),
    ];
    let sprint = SprintInfo {
      project_name: "Acme".into(),
      name: "Sprint 4".into(),
      start_date: None,
      end_date: None,
    };

    let summary = build_summary(&stories, sprint);

    assert_eq!(summary.total_stories, 3);
    assert_eq!(summary.total_effort, 8.0);
    assert_eq!(summary.completed_effort, 3.0);
    assert_eq!(summary.completion_percent, 37.5);
    assert_eq!(summary.by_state[&StoryState::Completed], 1);
    assert_eq!(summary.by_state[&StoryState::Blocked], 0);
    assert_eq!(summary.by_priority[&Priority::High], 2);

    let value = serde_json::to_value(&summary).unwrap();
    assert_eq!(value["byState"]["In Progress"], 1);
  }

  #[test]
  fn test_summary_without_effort() {
    let sprint = SprintInfo {
      project_name: "Acme".into(),
      name: "Empty".into(),
      start_date: None,
      end_date: None,
    };
    let summary = build_summary(&[], sprint);
    assert_eq!(summary.completion_percent, 0.0);
    assert_eq!(summary.total_stories, 0);
  }
}

use jiff::Timestamp;
use jiff::civil::Date;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::TesseraError;

/// Prefix carried by client-generated issue ids that the server has not seen yet.
pub const PLACEHOLDER_PREFIX: &str = "tmp-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IssuePriority {
    Urgent,
    High,
    Medium,
    Low,
    #[default]
    None,
}

enum_display_fromstr!(
    IssuePriority,
    TesseraError::InvalidPriority,
    {
        Urgent => "urgent",
        High => "high",
        Medium => "medium",
        Low => "low",
        None => "none",
    }
);

impl IssuePriority {
    /// Priorities in display order, most urgent first.
    pub const ALL: [IssuePriority; 5] = [
        IssuePriority::Urgent,
        IssuePriority::High,
        IssuePriority::Medium,
        IssuePriority::Low,
        IssuePriority::None,
    ];

    /// Rank used for ordering; lower is more urgent.
    pub fn rank(&self) -> u8 {
        match self {
            IssuePriority::Urgent => 0,
            IssuePriority::High => 1,
            IssuePriority::Medium => 2,
            IssuePriority::Low => 3,
            IssuePriority::None => 4,
        }
    }
}

/// Workflow bucket a project state belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateGroup {
    Backlog,
    Unstarted,
    Started,
    Completed,
    Cancelled,
}

enum_display_fromstr!(
    StateGroup,
    TesseraError::InvalidStateGroup,
    {
        Backlog => "backlog",
        Unstarted => "unstarted",
        Started => "started",
        Completed => "completed",
        Cancelled => "cancelled",
    }
);

impl StateGroup {
    pub const ALL: [StateGroup; 5] = [
        StateGroup::Backlog,
        StateGroup::Unstarted,
        StateGroup::Started,
        StateGroup::Completed,
        StateGroup::Cancelled,
    ];
}

/// Accepts `null` as well as `"none"` for an unset priority.
fn deserialize_priority<'de, D>(deserializer: D) -> Result<IssuePriority, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<IssuePriority>::deserialize(deserializer)?.unwrap_or_default())
}

/// An issue record as served by the issue service.
///
/// Fields used for grouping and ordering are typed; everything else the
/// service sends is kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(rename = "project", default)]
    pub project_id: Option<String>,

    #[serde(rename = "state", default)]
    pub state_id: Option<String>,

    #[serde(default, deserialize_with = "deserialize_priority")]
    pub priority: IssuePriority,

    #[serde(rename = "assignees", default)]
    pub assignee_ids: Vec<String>,

    #[serde(rename = "labels", default)]
    pub label_ids: Vec<String>,

    #[serde(default)]
    pub start_date: Option<Date>,

    #[serde(default)]
    pub target_date: Option<Date>,

    #[serde(default)]
    pub created_at: Timestamp,

    #[serde(default)]
    pub updated_at: Timestamp,

    #[serde(default)]
    pub created_by: Option<String>,

    #[serde(default)]
    pub sort_order: f64,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Issue {
    /// Build a client-side row for quick-add, identified by a fresh `tmp-` id.
    pub fn placeholder(project_id: &str, name: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Issue {
            id: format!("{PLACEHOLDER_PREFIX}{}", uuid::Uuid::new_v4()),
            name: name.into(),
            project_id: Some(project_id.to_string()),
            created_at: now,
            updated_at: now,
            sort_order: 65535.0,
            ..Default::default()
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id.starts_with(PLACEHOLDER_PREFIX)
    }
}

/// Body of an issue creation request.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct IssueDraft {
    pub name: String,

    #[serde(rename = "state", skip_serializing_if = "Option::is_none")]
    pub state_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<IssuePriority>,

    #[serde(rename = "assignees", skip_serializing_if = "Vec::is_empty")]
    pub assignee_ids: Vec<String>,

    #[serde(rename = "labels", skip_serializing_if = "Vec::is_empty")]
    pub label_ids: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Date>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<Date>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<f64>,
}

impl IssueDraft {
    pub fn new(name: impl Into<String>) -> Self {
        IssueDraft {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl From<&Issue> for IssueDraft {
    /// Drafts never carry the client id; the service assigns the real one.
    fn from(issue: &Issue) -> Self {
        IssueDraft {
            name: issue.name.clone(),
            state_id: issue.state_id.clone(),
            priority: Some(issue.priority),
            assignee_ids: issue.assignee_ids.clone(),
            label_ids: issue.label_ids.clone(),
            start_date: issue.start_date,
            target_date: issue.target_date,
            sort_order: Some(issue.sort_order),
        }
    }
}

/// Partial update of an issue. `None` leaves a field untouched; for the
/// nullable dates `Some(None)` clears the value.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct IssuePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "state", skip_serializing_if = "Option::is_none")]
    pub state_id: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<IssuePriority>,

    #[serde(rename = "assignees", skip_serializing_if = "Option::is_none")]
    pub assignee_ids: Option<Vec<String>>,

    #[serde(rename = "labels", skip_serializing_if = "Option::is_none")]
    pub label_ids: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Option<Date>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<Option<Date>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<f64>,
}

impl IssuePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.state_id.is_none()
            && self.priority.is_none()
            && self.assignee_ids.is_none()
            && self.label_ids.is_none()
            && self.start_date.is_none()
            && self.target_date.is_none()
            && self.sort_order.is_none()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn state(mut self, state_id: Option<&str>) -> Self {
        self.state_id = Some(state_id.map(str::to_string));
        self
    }

    pub fn priority(mut self, priority: IssuePriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn target_date(mut self, date: Option<Date>) -> Self {
        self.target_date = Some(date);
        self
    }

    pub fn sort_order(mut self, sort_order: f64) -> Self {
        self.sort_order = Some(sort_order);
        self
    }

    /// Write every set field onto `issue`.
    pub fn apply_to(&self, issue: &mut Issue) {
        if let Some(name) = &self.name {
            issue.name = name.clone();
        }
        if let Some(state_id) = &self.state_id {
            issue.state_id = state_id.clone();
        }
        if let Some(priority) = self.priority {
            issue.priority = priority;
        }
        if let Some(assignees) = &self.assignee_ids {
            issue.assignee_ids = assignees.clone();
        }
        if let Some(labels) = &self.label_ids {
            issue.label_ids = labels.clone();
        }
        if let Some(start) = self.start_date {
            issue.start_date = start;
        }
        if let Some(target) = self.target_date {
            issue.target_date = target;
        }
        if let Some(sort_order) = self.sort_order {
            issue.sort_order = sort_order;
        }
    }
}

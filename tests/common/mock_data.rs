//! Mock data builders for creating test issues and group catalogs.

use jiff::civil::date;
use tessera::types::{Issue, IssuePriority, StateGroup};
use tessera::view::GroupCatalog;

pub const WORKSPACE: &str = "acme";
pub const PROJECT: &str = "proj";

/// Builder for creating test issues
pub struct IssueBuilder {
    issue: Issue,
}

impl IssueBuilder {
    /// Create a new issue builder with the given ID
    pub fn new(id: &str) -> Self {
        let created = "2024-01-01T00:00:00Z"
            .parse()
            .expect("test timestamp should be valid");
        Self {
            issue: Issue {
                id: id.to_string(),
                name: format!("Test issue {id}"),
                project_id: Some(PROJECT.to_string()),
                created_at: created,
                updated_at: created,
                ..Default::default()
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.issue.name = name.to_string();
        self
    }

    pub fn state(mut self, state_id: &str) -> Self {
        self.issue.state_id = Some(state_id.to_string());
        self
    }

    pub fn priority(mut self, priority: IssuePriority) -> Self {
        self.issue.priority = priority;
        self
    }

    pub fn label(mut self, label_id: &str) -> Self {
        self.issue.label_ids.push(label_id.to_string());
        self
    }

    pub fn assignee(mut self, member_id: &str) -> Self {
        self.issue.assignee_ids.push(member_id.to_string());
        self
    }

    pub fn target_date(mut self, year: i16, month: i8, day: i8) -> Self {
        self.issue.target_date = Some(date(year, month, day));
        self
    }

    pub fn sort_order(mut self, sort_order: f64) -> Self {
        self.issue.sort_order = sort_order;
        self
    }

    /// Set the creation timestamp (RFC 3339)
    pub fn created_at(mut self, ts: &str) -> Self {
        self.issue.created_at = ts.parse().expect("test timestamp should be valid");
        self
    }

    pub fn build(self) -> Issue {
        self.issue
    }
}

/// Create a basic issue with the given manual ordering
pub fn mock_issue(id: &str, sort_order: f64) -> Issue {
    IssueBuilder::new(id).sort_order(sort_order).build()
}

/// States, labels and members of the test project
pub fn mock_catalog() -> GroupCatalog {
    GroupCatalog::new()
        .with_state("s-backlog", StateGroup::Backlog)
        .with_state("s-todo", StateGroup::Unstarted)
        .with_state("s-doing", StateGroup::Started)
        .with_state("s-done", StateGroup::Completed)
        .with_labels(&["bug", "feature", "ui"])
        .with_members(&["alice", "bob"])
        .with_projects(&[PROJECT])
}

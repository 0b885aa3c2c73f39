//! Partitioning of issues into (sub-)groups.
//!
//! Every value the domain knows for a grouping field gets a bucket, even when
//! no issue currently carries it, followed by any unknown values found in the
//! data and finally the reserved [`GroupKey::Empty`] bucket.

use std::collections::HashMap;
use std::fmt;

use crate::filters::GroupBy;
use crate::types::{Issue, IssuePriority, StateGroup};

/// Identifier of a bucket in a grouped view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    Value(String),
    /// Issues with no value for the grouping field.
    Empty,
}

impl GroupKey {
    pub const EMPTY_LABEL: &'static str = "None";

    pub fn value(value: impl Into<String>) -> Self {
        GroupKey::Value(value.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            GroupKey::Value(v) => v,
            GroupKey::Empty => Self::EMPTY_LABEL,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateOption {
    pub id: String,
    pub group: StateGroup,
}

/// Values the domain defines for each grouping field, in display order.
///
/// Supplied by the project's state, label, member and project stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GroupCatalog {
    pub states: Vec<StateOption>,
    pub labels: Vec<String>,
    pub members: Vec<String>,
    pub projects: Vec<String>,
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl GroupCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(mut self, id: &str, group: StateGroup) -> Self {
        self.states.push(StateOption {
            id: id.to_string(),
            group,
        });
        self
    }

    pub fn with_labels(mut self, labels: &[&str]) -> Self {
        self.labels.extend(owned(labels));
        self
    }

    pub fn with_members(mut self, members: &[&str]) -> Self {
        self.members.extend(owned(members));
        self
    }

    pub fn with_projects(mut self, projects: &[&str]) -> Self {
        self.projects.extend(owned(projects));
        self
    }

    pub fn state_group(&self, state_id: &str) -> Option<StateGroup> {
        self.states.iter().find(|s| s.id == state_id).map(|s| s.group)
    }
}

/// Field a view is partitioned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dimension {
    Field(GroupBy),
    /// Calendar days; the domain is whatever dates the data carries.
    TargetDate,
}

fn single(value: Option<String>) -> Vec<GroupKey> {
    vec![value.map_or(GroupKey::Empty, GroupKey::Value)]
}

fn fan_out(values: &[String]) -> Vec<GroupKey> {
    let mut keys: Vec<GroupKey> = Vec::with_capacity(values.len());
    for value in values {
        let key = GroupKey::value(value.as_str());
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    if keys.is_empty() {
        keys.push(GroupKey::Empty);
    }
    keys
}

impl Dimension {
    /// Known non-empty keys for this dimension, in display order.
    fn domain_keys(&self, catalog: &GroupCatalog) -> Vec<GroupKey> {
        let values: Vec<String> = match self {
            Dimension::Field(GroupBy::State) => {
                catalog.states.iter().map(|s| s.id.clone()).collect()
            }
            Dimension::Field(GroupBy::StateGroup) => {
                StateGroup::ALL.iter().map(|g| g.to_string()).collect()
            }
            Dimension::Field(GroupBy::Priority) => IssuePriority::ALL
                .iter()
                .filter(|p| **p != IssuePriority::None)
                .map(|p| p.to_string())
                .collect(),
            Dimension::Field(GroupBy::Labels) => catalog.labels.clone(),
            Dimension::Field(GroupBy::Assignees | GroupBy::CreatedBy) => catalog.members.clone(),
            Dimension::Field(GroupBy::Project) => catalog.projects.clone(),
            Dimension::TargetDate => Vec::new(),
        };
        values.into_iter().map(GroupKey::Value).collect()
    }

    /// Buckets `issue` belongs to. Never empty.
    fn issue_keys(&self, issue: &Issue, catalog: &GroupCatalog) -> Vec<GroupKey> {
        match self {
            Dimension::Field(GroupBy::State) => single(issue.state_id.clone()),
            Dimension::Field(GroupBy::StateGroup) => single(
                issue
                    .state_id
                    .as_deref()
                    .and_then(|id| catalog.state_group(id))
                    .map(|g| g.to_string()),
            ),
            Dimension::Field(GroupBy::Priority) => match issue.priority {
                IssuePriority::None => vec![GroupKey::Empty],
                p => vec![GroupKey::value(p.to_string())],
            },
            Dimension::Field(GroupBy::Labels) => fan_out(&issue.label_ids),
            Dimension::Field(GroupBy::Assignees) => fan_out(&issue.assignee_ids),
            Dimension::Field(GroupBy::CreatedBy) => single(issue.created_by.clone()),
            Dimension::Field(GroupBy::Project) => single(issue.project_id.clone()),
            Dimension::TargetDate => single(issue.target_date.map(|d| d.to_string())),
        }
    }
}

/// One bucket of a grouped view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueGroup {
    pub key: GroupKey,
    pub issue_ids: Vec<String>,
}

/// Issue ids partitioned by one field, buckets in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupedIssues {
    groups: Vec<IssueGroup>,
}

impl GroupedIssues {
    pub fn get(&self, key: &GroupKey) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|g| &g.key == key)
            .map(|g| g.issue_ids.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = &GroupKey> {
        self.groups.iter().map(|g| &g.key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &IssueGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of placements; fan-out counts an issue once per bucket.
    pub fn placements(&self) -> usize {
        self.groups.iter().map(|g| g.issue_ids.len()).sum()
    }

    /// Copy without the buckets that hold no issue, for `show_empty_groups = false`.
    pub fn without_empty_groups(&self) -> Self {
        GroupedIssues {
            groups: self
                .groups
                .iter()
                .filter(|g| !g.issue_ids.is_empty())
                .cloned()
                .collect(),
        }
    }
}

/// One outer bucket of a two-level view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubGroup {
    pub key: GroupKey,
    pub sub_groups: GroupedIssues,
}

/// Issue ids partitioned by group, then by sub-group within each group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubGroupedIssues {
    groups: Vec<SubGroup>,
}

impl SubGroupedIssues {
    pub fn get(&self, group: &GroupKey) -> Option<&GroupedIssues> {
        self.groups
            .iter()
            .find(|g| &g.key == group)
            .map(|g| &g.sub_groups)
    }

    /// Copy keeping only non-empty sub-groups, and only the outer groups left
    /// with at least one of them.
    pub fn without_empty_groups(&self) -> Self {
        SubGroupedIssues {
            groups: self
                .groups
                .iter()
                .filter_map(|g| {
                    let sub_groups = g.sub_groups.without_empty_groups();
                    (!sub_groups.is_empty()).then(|| SubGroup {
                        key: g.key.clone(),
                        sub_groups,
                    })
                })
                .collect(),
        }
    }

    pub fn get_ids(&self, group: &GroupKey, sub_group: &GroupKey) -> Option<&[String]> {
        self.get(group).and_then(|g| g.get(sub_group))
    }

    pub fn keys(&self) -> impl Iterator<Item = &GroupKey> {
        self.groups.iter().map(|g| &g.key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Split already-ordered issues into buckets, keeping their order inside each bucket.
pub(crate) fn partition<'a>(
    issues: &[&'a Issue],
    dimension: Dimension,
    catalog: &GroupCatalog,
) -> Vec<(GroupKey, Vec<&'a Issue>)> {
    let mut buckets: Vec<(GroupKey, Vec<&'a Issue>)> = Vec::new();
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    for key in dimension.domain_keys(catalog) {
        if !index.contains_key(&key) {
            index.insert(key.clone(), buckets.len());
            buckets.push((key, Vec::new()));
        }
    }
    let mut empty: Vec<&'a Issue> = Vec::new();

    for &issue in issues {
        for key in dimension.issue_keys(issue, catalog) {
            if key == GroupKey::Empty {
                empty.push(issue);
                continue;
            }
            let slot = *index.entry(key.clone()).or_insert_with(|| {
                buckets.push((key, Vec::new()));
                buckets.len() - 1
            });
            buckets[slot].1.push(issue);
        }
    }

    buckets.push((GroupKey::Empty, empty));
    buckets
}

fn to_ids(issues: &[&Issue]) -> Vec<String> {
    issues.iter().map(|i| i.id.clone()).collect()
}

pub(crate) fn group_issues(
    issues: &[&Issue],
    dimension: Dimension,
    catalog: &GroupCatalog,
) -> GroupedIssues {
    GroupedIssues {
        groups: partition(issues, dimension, catalog)
            .into_iter()
            .map(|(key, members)| IssueGroup {
                key,
                issue_ids: to_ids(&members),
            })
            .collect(),
    }
}

pub(crate) fn sub_group_issues(
    issues: &[&Issue],
    group: Dimension,
    sub_group: Dimension,
    catalog: &GroupCatalog,
) -> SubGroupedIssues {
    SubGroupedIssues {
        groups: partition(issues, group, catalog)
            .into_iter()
            .map(|(key, members)| SubGroup {
                key,
                sub_groups: group_issues(&members, sub_group, catalog),
            })
            .collect(),
    }
}

//! Issue filter state per project.
//!
//! The filter service owns persistence; this module holds the in-memory
//! shape the controller and the view materializer read from.

pub mod display;
pub mod options;

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

pub use display::{
    DisplayFilters, DisplayFiltersPatch, DisplayProperties, DisplayProperty, GroupBy,
    IssueTypeFilter, Layout, OrderBy, OrderField,
};
pub use options::{FilterKey, IssueFilterOptions};

/// Everything a user has selected for one project's issue views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFilters {
    #[serde(default)]
    pub filters: IssueFilterOptions,
    #[serde(default)]
    pub display_filters: DisplayFilters,
    #[serde(default)]
    pub display_properties: DisplayProperties,
}

/// Ordered query parameters sent along with a list request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `application/x-www-form-urlencoded` rendering, in insertion order.
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}

impl IssueFilters {
    /// Server-side parameters for fetching this project's issues.
    ///
    /// Applied property filters come first (comma-joined, key order), then
    /// the display filters the server honours.
    pub fn query_params(&self) -> QueryParams {
        let mut params = QueryParams::default();
        for (key, values) in self.filters.applied() {
            params.push(key.to_string(), values.join(","));
        }

        let display = &self.display_filters;
        match display.layout {
            Layout::Calendar => params.push("group_by", "target_date"),
            Layout::List | Layout::Kanban => {
                if let Some(group_by) = display.group_by {
                    params.push("group_by", group_by.to_string());
                }
                if display.layout == Layout::Kanban
                    && let Some(sub_group_by) = display.sub_group_by
                {
                    params.push("sub_group_by", sub_group_by.to_string());
                }
            }
            Layout::Spreadsheet => {}
            Layout::GanttChart => params.push("start_target_date", "true"),
        }
        if let Some(order_by) = display.order_by {
            params.push("order_by", order_by.to_string());
        }
        if let Some(issue_type) = display.issue_type {
            params.push("type", issue_type.to_string());
        }
        params.push("sub_issue", display.sub_issue.to_string());
        params
    }
}

/// Read access to the currently applied filters of a project.
pub trait FilterSource: Send + Sync {
    /// `None` until the filters for `project_id` have been loaded.
    fn issue_filters(&self, project_id: &str) -> Option<IssueFilters>;
}

/// In-memory filter state keyed by project id.
#[derive(Debug, Default)]
pub struct ProjectFilterStore {
    filters: RwLock<HashMap<String, IssueFilters>>,
}

impl ProjectFilterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the filters loaded for a project, replacing any previous ones.
    pub fn set(&self, project_id: &str, filters: IssueFilters) {
        self.filters.write().insert(project_id.to_string(), filters);
    }

    /// Apply a display filter patch; returns the resulting filters, or `None`
    /// when nothing is loaded for the project.
    pub fn update_display_filters(
        &self,
        project_id: &str,
        patch: DisplayFiltersPatch,
    ) -> Option<DisplayFilters> {
        let mut guard = self.filters.write();
        let entry = guard.get_mut(project_id)?;
        entry.display_filters.apply(patch);
        Some(entry.display_filters.clone())
    }

    pub fn toggle_display_property(
        &self,
        project_id: &str,
        property: DisplayProperty,
    ) -> Option<DisplayProperties> {
        let mut guard = self.filters.write();
        let entry = guard.get_mut(project_id)?;
        entry.display_properties.toggle(property);
        Some(entry.display_properties)
    }

    /// Edit the property filters of a project in place.
    pub fn update_filter_options(
        &self,
        project_id: &str,
        edit: impl FnOnce(&mut IssueFilterOptions),
    ) -> Option<IssueFilterOptions> {
        let mut guard = self.filters.write();
        let entry = guard.get_mut(project_id)?;
        edit(&mut entry.filters);
        Some(entry.filters.clone())
    }
}

impl FilterSource for ProjectFilterStore {
    fn issue_filters(&self, project_id: &str) -> Option<IssueFilters> {
        self.filters.read().get(project_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_params_order_and_values() {
        let filters = IssueFilters {
            filters: IssueFilterOptions::new()
                .with(FilterKey::Labels, &["l1", "l2"])
                .with(FilterKey::Priority, &["urgent"]),
            display_filters: DisplayFilters {
                layout: Layout::Kanban,
                group_by: Some(GroupBy::State),
                sub_group_by: Some(GroupBy::Priority),
                issue_type: Some(IssueTypeFilter::Backlog),
                ..Default::default()
            },
            ..Default::default()
        };

        let params = filters.query_params();
        let keys: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![
                "priority",
                "labels",
                "group_by",
                "sub_group_by",
                "order_by",
                "type",
                "sub_issue"
            ]
        );
        assert_eq!(params.get("labels"), Some("l1,l2"));
        assert_eq!(params.get("order_by"), Some("-created_at"));
        assert_eq!(params.get("type"), Some("backlog"));
    }

    #[test]
    fn test_query_params_layout_specific() {
        let mut filters = IssueFilters::default();
        filters.display_filters.layout = Layout::Calendar;
        filters.display_filters.group_by = Some(GroupBy::Priority);
        assert_eq!(filters.query_params().get("group_by"), Some("target_date"));

        filters.display_filters.layout = Layout::GanttChart;
        let params = filters.query_params();
        assert_eq!(params.get("start_target_date"), Some("true"));
        assert_eq!(params.get("group_by"), None);

        filters.display_filters.layout = Layout::List;
        assert_eq!(filters.query_params().get("sub_group_by"), None);
    }

    #[test]
    fn test_query_string_rendering() {
        let filters = IssueFilters {
            filters: IssueFilterOptions::new().with(FilterKey::Priority, &["urgent", "high"]),
            display_filters: DisplayFilters {
                issue_type: Some(IssueTypeFilter::Active),
                ..Default::default()
            },
            ..Default::default()
        };
        insta::assert_snapshot!(
            filters.query_params().to_query_string(),
            @"priority=urgent%2Chigh&order_by=-created_at&type=active&sub_issue=true"
        );
    }

    #[test]
    fn test_filter_store_unknown_project_is_not_loaded() {
        let store = ProjectFilterStore::new();
        assert!(store.issue_filters("p1").is_none());
        assert!(
            store
                .update_display_filters("p1", DisplayFiltersPatch::default())
                .is_none()
        );
    }

    #[test]
    fn test_filter_store_edits() {
        let store = ProjectFilterStore::new();
        store.set("p1", IssueFilters::default());

        let display = store
            .update_display_filters(
                "p1",
                DisplayFiltersPatch {
                    layout: Some(Layout::Kanban),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(display.group_by, Some(GroupBy::State));

        store.update_filter_options("p1", |opts| opts.toggle(FilterKey::Labels, "bug"));
        let props = store
            .toggle_display_property("p1", DisplayProperty::Key)
            .unwrap();
        assert!(!props.key);

        let current = store.issue_filters("p1").unwrap();
        assert_eq!(current.filters.get(FilterKey::Labels), ["bug".to_string()]);
        assert_eq!(current.display_filters.layout, Layout::Kanban);
    }
}

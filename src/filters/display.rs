//! Display filters: layout, grouping and ordering selected by the user.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TesseraError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    #[default]
    List,
    Kanban,
    Calendar,
    Spreadsheet,
    GanttChart,
}

enum_display_fromstr!(
    Layout,
    TesseraError::InvalidLayout,
    {
        List => "list",
        Kanban => "kanban",
        Calendar => "calendar",
        Spreadsheet => "spreadsheet",
        GanttChart => "gantt_chart",
    }
);

impl Layout {
    pub const ALL: [Layout; 5] = [
        Layout::List,
        Layout::Kanban,
        Layout::Calendar,
        Layout::Spreadsheet,
        Layout::GanttChart,
    ];

    /// Whether the user can pick a group-by / order-by for this layout.
    pub fn supports_grouping(&self) -> bool {
        matches!(self, Layout::List | Layout::Kanban)
    }
}

/// Issue field used to partition issues into buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupBy {
    #[serde(rename = "state")]
    State,
    #[serde(rename = "state_detail.group")]
    StateGroup,
    #[serde(rename = "priority")]
    Priority,
    #[serde(rename = "labels")]
    Labels,
    #[serde(rename = "assignees")]
    Assignees,
    #[serde(rename = "created_by")]
    CreatedBy,
    #[serde(rename = "project")]
    Project,
}

enum_display_fromstr!(
    GroupBy,
    TesseraError::InvalidGroupBy,
    {
        State => "state",
        StateGroup => "state_detail.group",
        Priority => "priority",
        Labels => "labels",
        Assignees => "assignees",
        CreatedBy => "created_by",
        Project => "project",
    }
);

impl GroupBy {
    pub const ALL: [GroupBy; 7] = [
        GroupBy::State,
        GroupBy::StateGroup,
        GroupBy::Priority,
        GroupBy::Labels,
        GroupBy::Assignees,
        GroupBy::CreatedBy,
        GroupBy::Project,
    ];

    /// Multi-valued fields place an issue in every matching bucket.
    pub fn is_multi_valued(&self) -> bool {
        matches!(self, GroupBy::Labels | GroupBy::Assignees)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderField {
    SortOrder,
    CreatedAt,
    UpdatedAt,
    StartDate,
    TargetDate,
    Priority,
}

enum_display_fromstr!(
    OrderField,
    TesseraError::InvalidOrderBy,
    {
        SortOrder => "sort_order",
        CreatedAt => "created_at",
        UpdatedAt => "updated_at",
        StartDate => "start_date",
        TargetDate => "target_date",
        Priority => "priority",
    }
);

/// Sort key with direction. The string form prefixes descending keys with `-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderBy {
    pub field: OrderField,
    pub descending: bool,
}

impl OrderBy {
    /// Manual ordering, the gantt default.
    pub const MANUAL: OrderBy = OrderBy::ascending(OrderField::SortOrder);
    /// Newest first, the spreadsheet default.
    pub const LAST_CREATED: OrderBy = OrderBy::descending(OrderField::CreatedAt);
    pub const LAST_UPDATED: OrderBy = OrderBy::descending(OrderField::UpdatedAt);

    pub const fn ascending(field: OrderField) -> Self {
        OrderBy {
            field,
            descending: false,
        }
    }

    pub const fn descending(field: OrderField) -> Self {
        OrderBy {
            field,
            descending: true,
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "-{}", self.field)
        } else {
            write!(f, "{}", self.field)
        }
    }
}

impl FromStr for OrderBy {
    type Err = TesseraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.strip_prefix('-') {
            Some(rest) => rest
                .parse()
                .map(OrderBy::descending)
                .map_err(|_| TesseraError::InvalidOrderBy(s.to_string())),
            None => s.parse().map(OrderBy::ascending),
        }
    }
}

impl TryFrom<String> for OrderBy {
    type Error = TesseraError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OrderBy> for String {
    fn from(order: OrderBy) -> Self {
        order.to_string()
    }
}

/// Server-side issue type filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueTypeFilter {
    Active,
    Backlog,
}

enum_display_fromstr!(
    IssueTypeFilter,
    TesseraError::InvalidIssueType,
    {
        Active => "active",
        Backlog => "backlog",
    }
);

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayFilters {
    #[serde(default)]
    pub layout: Layout,

    #[serde(default)]
    pub group_by: Option<GroupBy>,

    #[serde(default)]
    pub sub_group_by: Option<GroupBy>,

    #[serde(default)]
    pub order_by: Option<OrderBy>,

    #[serde(rename = "type", default)]
    pub issue_type: Option<IssueTypeFilter>,

    #[serde(default = "default_true")]
    pub sub_issue: bool,

    #[serde(default = "default_true")]
    pub show_empty_groups: bool,
}

impl Default for DisplayFilters {
    fn default() -> Self {
        DisplayFilters {
            layout: Layout::List,
            group_by: None,
            sub_group_by: None,
            order_by: Some(OrderBy::LAST_CREATED),
            issue_type: None,
            sub_issue: true,
            show_empty_groups: true,
        }
    }
}

/// Partial update of [`DisplayFilters`]. Outer `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayFiltersPatch {
    pub layout: Option<Layout>,
    pub group_by: Option<Option<GroupBy>>,
    pub sub_group_by: Option<Option<GroupBy>>,
    pub order_by: Option<Option<OrderBy>>,
    pub issue_type: Option<Option<IssueTypeFilter>>,
    pub sub_issue: Option<bool>,
    pub show_empty_groups: Option<bool>,
}

impl DisplayFilters {
    /// Merge a patch and restore the cross-field rules between the grouping keys.
    pub fn apply(&mut self, patch: DisplayFiltersPatch) {
        if let Some(layout) = patch.layout {
            self.layout = layout;
        }
        if let Some(group_by) = patch.group_by {
            self.group_by = group_by;
        }
        if let Some(sub_group_by) = patch.sub_group_by {
            self.sub_group_by = sub_group_by;
        }
        if let Some(order_by) = patch.order_by {
            self.order_by = order_by;
        }
        if let Some(issue_type) = patch.issue_type {
            self.issue_type = issue_type;
        }
        if let Some(sub_issue) = patch.sub_issue {
            self.sub_issue = sub_issue;
        }
        if let Some(show) = patch.show_empty_groups {
            self.show_empty_groups = show;
        }
        self.normalize();
    }

    fn normalize(&mut self) {
        if self.layout == Layout::Kanban && self.group_by.is_none() {
            self.group_by = Some(GroupBy::State);
        }
        if self.group_by.is_none() {
            self.sub_group_by = None;
        }
        if self.sub_group_by.is_some() && self.sub_group_by == self.group_by {
            self.sub_group_by = None;
        }
    }

    /// Group-by choices offered for the current layout. `None` means "no grouping".
    pub fn group_by_options(&self) -> Vec<Option<GroupBy>> {
        match self.layout {
            Layout::List => std::iter::once(None)
                .chain(GroupBy::ALL.iter().copied().map(Some))
                .collect(),
            Layout::Kanban => GroupBy::ALL.iter().copied().map(Some).collect(),
            Layout::Calendar | Layout::Spreadsheet | Layout::GanttChart => Vec::new(),
        }
    }

    /// Order-by choices offered for the current layout and grouping.
    ///
    /// Manual ordering is never offered as a pick, and ordering by priority is
    /// pointless inside priority groups.
    pub fn order_by_options(&self) -> Vec<OrderBy> {
        if !self.layout.supports_grouping() {
            return Vec::new();
        }
        [
            OrderBy::LAST_CREATED,
            OrderBy::LAST_UPDATED,
            OrderBy::ascending(OrderField::StartDate),
            OrderBy::ascending(OrderField::Priority),
        ]
        .into_iter()
        .filter(|o| !(o.field == OrderField::Priority && self.group_by == Some(GroupBy::Priority)))
        .collect()
    }
}

/// Per-property visibility toggles for issue rows and cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayProperty {
    Assignee,
    StartDate,
    DueDate,
    Labels,
    Key,
    Priority,
    State,
    SubIssueCount,
    Link,
    AttachmentCount,
    Estimate,
    CreatedOn,
    UpdatedOn,
}

enum_display!(
    DisplayProperty,
    {
        Assignee => "assignee",
        StartDate => "start_date",
        DueDate => "due_date",
        Labels => "labels",
        Key => "key",
        Priority => "priority",
        State => "state",
        SubIssueCount => "sub_issue_count",
        Link => "link",
        AttachmentCount => "attachment_count",
        Estimate => "estimate",
        CreatedOn => "created_on",
        UpdatedOn => "updated_on",
    }
);

impl DisplayProperty {
    pub const ALL: [DisplayProperty; 13] = [
        DisplayProperty::Assignee,
        DisplayProperty::StartDate,
        DisplayProperty::DueDate,
        DisplayProperty::Labels,
        DisplayProperty::Key,
        DisplayProperty::Priority,
        DisplayProperty::State,
        DisplayProperty::SubIssueCount,
        DisplayProperty::Link,
        DisplayProperty::AttachmentCount,
        DisplayProperty::Estimate,
        DisplayProperty::CreatedOn,
        DisplayProperty::UpdatedOn,
    ];

    /// Whether the toggle for this property is offered in `layout`.
    pub fn is_available(&self, layout: Layout, estimates_enabled: bool) -> bool {
        match self {
            DisplayProperty::Estimate => estimates_enabled,
            DisplayProperty::AttachmentCount
            | DisplayProperty::Link
            | DisplayProperty::SubIssueCount => layout != Layout::Spreadsheet,
            DisplayProperty::CreatedOn | DisplayProperty::UpdatedOn => {
                layout == Layout::Spreadsheet
            }
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayProperties {
    pub assignee: bool,
    pub start_date: bool,
    pub due_date: bool,
    pub labels: bool,
    pub key: bool,
    pub priority: bool,
    pub state: bool,
    pub sub_issue_count: bool,
    pub link: bool,
    pub attachment_count: bool,
    pub estimate: bool,
    pub created_on: bool,
    pub updated_on: bool,
}

impl Default for DisplayProperties {
    fn default() -> Self {
        DisplayProperties {
            assignee: true,
            start_date: true,
            due_date: true,
            labels: true,
            key: true,
            priority: true,
            state: true,
            sub_issue_count: true,
            link: true,
            attachment_count: true,
            estimate: true,
            created_on: true,
            updated_on: true,
        }
    }
}

impl DisplayProperties {
    fn slot(&mut self, property: DisplayProperty) -> &mut bool {
        match property {
            DisplayProperty::Assignee => &mut self.assignee,
            DisplayProperty::StartDate => &mut self.start_date,
            DisplayProperty::DueDate => &mut self.due_date,
            DisplayProperty::Labels => &mut self.labels,
            DisplayProperty::Key => &mut self.key,
            DisplayProperty::Priority => &mut self.priority,
            DisplayProperty::State => &mut self.state,
            DisplayProperty::SubIssueCount => &mut self.sub_issue_count,
            DisplayProperty::Link => &mut self.link,
            DisplayProperty::AttachmentCount => &mut self.attachment_count,
            DisplayProperty::Estimate => &mut self.estimate,
            DisplayProperty::CreatedOn => &mut self.created_on,
            DisplayProperty::UpdatedOn => &mut self.updated_on,
        }
    }

    pub fn get(&self, property: DisplayProperty) -> bool {
        let mut copy = *self;
        *copy.slot(property)
    }

    pub fn toggle(&mut self, property: DisplayProperty) {
        let slot = self.slot(property);
        *slot = !*slot;
    }

    /// Properties whose toggle is shown for `layout`, in menu order.
    pub fn available(layout: Layout, estimates_enabled: bool) -> Vec<DisplayProperty> {
        DisplayProperty::ALL
            .iter()
            .copied()
            .filter(|p| p.is_available(layout, estimates_enabled))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_by_parse_descending_marker() {
        let order: OrderBy = "-sort_order".parse().unwrap();
        assert_eq!(order, OrderBy::descending(OrderField::SortOrder));
        assert_eq!(order.to_string(), "-sort_order");

        let order: OrderBy = "priority".parse().unwrap();
        assert!(!order.descending);
        assert_eq!(order.to_string(), "priority");
    }

    #[test]
    fn test_order_by_parse_invalid() {
        assert!("-".parse::<OrderBy>().is_err());
        assert!("--created_at".parse::<OrderBy>().is_err());
        assert!("name".parse::<OrderBy>().is_err());
    }

    #[test]
    fn test_layout_and_group_by_wire_forms() {
        assert_eq!(Layout::GanttChart.to_string(), "gantt_chart");
        assert_eq!("Kanban".parse::<Layout>().unwrap(), Layout::Kanban);
        assert_eq!(
            "state_detail.group".parse::<GroupBy>().unwrap(),
            GroupBy::StateGroup
        );
        assert!("cycle".parse::<GroupBy>().is_err());
    }

    #[test]
    fn test_display_filters_serde_round_trip_wire_names() {
        let json = r#"{
            "layout": "kanban",
            "group_by": "state_detail.group",
            "sub_group_by": "priority",
            "order_by": "-updated_at",
            "type": "active"
        }"#;
        let filters: DisplayFilters = serde_json::from_str(json).unwrap();
        assert_eq!(filters.layout, Layout::Kanban);
        assert_eq!(filters.group_by, Some(GroupBy::StateGroup));
        assert_eq!(filters.order_by, Some(OrderBy::LAST_UPDATED));
        assert_eq!(filters.issue_type, Some(IssueTypeFilter::Active));
        assert!(filters.show_empty_groups);

        let value = serde_json::to_value(&filters).unwrap();
        assert_eq!(value["order_by"], "-updated_at");
        assert_eq!(value["group_by"], "state_detail.group");
    }

    #[test]
    fn test_clearing_group_by_clears_sub_group_by() {
        let mut filters = DisplayFilters {
            layout: Layout::List,
            group_by: Some(GroupBy::State),
            sub_group_by: Some(GroupBy::Priority),
            ..Default::default()
        };
        filters.apply(DisplayFiltersPatch {
            group_by: Some(None),
            ..Default::default()
        });
        assert_eq!(filters.group_by, None);
        assert_eq!(filters.sub_group_by, None);
    }

    #[test]
    fn test_switching_to_kanban_defaults_group_by_state() {
        let mut filters = DisplayFilters::default();
        filters.apply(DisplayFiltersPatch {
            layout: Some(Layout::Kanban),
            ..Default::default()
        });
        assert_eq!(filters.group_by, Some(GroupBy::State));
    }

    #[test]
    fn test_sub_group_equal_to_group_is_dropped() {
        let mut filters = DisplayFilters {
            layout: Layout::Kanban,
            group_by: Some(GroupBy::Labels),
            ..Default::default()
        };
        filters.apply(DisplayFiltersPatch {
            sub_group_by: Some(Some(GroupBy::Labels)),
            ..Default::default()
        });
        assert_eq!(filters.sub_group_by, None);
    }

    #[test]
    fn test_group_by_options_per_layout() {
        let list = DisplayFilters::default();
        assert_eq!(list.group_by_options().len(), GroupBy::ALL.len() + 1);
        assert_eq!(list.group_by_options()[0], None);

        let kanban = DisplayFilters {
            layout: Layout::Kanban,
            ..Default::default()
        };
        assert!(!kanban.group_by_options().contains(&None));

        let calendar = DisplayFilters {
            layout: Layout::Calendar,
            ..Default::default()
        };
        assert!(calendar.group_by_options().is_empty());
        assert!(calendar.order_by_options().is_empty());
    }

    #[test]
    fn test_priority_order_hidden_when_grouped_by_priority() {
        let filters = DisplayFilters {
            group_by: Some(GroupBy::Priority),
            ..Default::default()
        };
        let options = filters.order_by_options();
        assert!(options.iter().all(|o| o.field != OrderField::Priority));
        assert!(options.iter().all(|o| o.field != OrderField::SortOrder));
    }

    #[test]
    fn test_display_property_availability() {
        let spreadsheet = DisplayProperties::available(Layout::Spreadsheet, false);
        assert!(spreadsheet.contains(&DisplayProperty::CreatedOn));
        assert!(!spreadsheet.contains(&DisplayProperty::Link));
        assert!(!spreadsheet.contains(&DisplayProperty::Estimate));

        let list = DisplayProperties::available(Layout::List, true);
        assert!(list.contains(&DisplayProperty::Estimate));
        assert!(list.contains(&DisplayProperty::SubIssueCount));
        assert!(!list.contains(&DisplayProperty::UpdatedOn));
    }

    #[test]
    fn test_display_property_toggle() {
        let mut props = DisplayProperties::default();
        assert!(props.get(DisplayProperty::Labels));
        props.toggle(DisplayProperty::Labels);
        assert!(!props.get(DisplayProperty::Labels));
        assert_eq!(DisplayProperty::SubIssueCount.to_string(), "sub_issue_count");
    }
}

//! Derived issue views.
//!
//! A view is a pure function of a project's ordered id list, its display
//! filters, the issue records and the group catalog. Views are never patched
//! in place; callers recompute them (or hit [`ViewCache`]) after every change.

pub mod group;
pub mod sort;

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::filters::{DisplayFilters, Layout, OrderBy, OrderField};
use crate::types::Issue;

pub use group::{
    GroupCatalog, GroupKey, GroupedIssues, IssueGroup, StateOption, SubGroup, SubGroupedIssues,
};
pub use sort::{compare_issues, sort_issues};

use group::{Dimension, group_issues, sub_group_issues};

/// Read access to issue records by id.
pub trait IssueLookup {
    fn issue(&self, id: &str) -> Option<&Issue>;
}

impl<S: BuildHasher> IssueLookup for HashMap<String, Issue, S> {
    fn issue(&self, id: &str) -> Option<&Issue> {
        self.get(id)
    }
}

/// Materialized shape of a project's issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueView {
    Ungrouped(Vec<String>),
    Grouped(GroupedIssues),
    SubGrouped(SubGroupedIssues),
}

impl IssueView {
    pub fn as_ungrouped(&self) -> Option<&[String]> {
        match self {
            IssueView::Ungrouped(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn as_grouped(&self) -> Option<&GroupedIssues> {
        match self {
            IssueView::Grouped(groups) => Some(groups),
            _ => None,
        }
    }

    pub fn as_sub_grouped(&self) -> Option<&SubGroupedIssues> {
        match self {
            IssueView::SubGrouped(groups) => Some(groups),
            _ => None,
        }
    }

    /// Drop buckets holding no issue. Outer groups of a two-level view are
    /// kept only if one of their sub-groups is non-empty.
    pub fn without_empty_groups(&self) -> IssueView {
        match self {
            IssueView::Ungrouped(ids) => IssueView::Ungrouped(ids.clone()),
            IssueView::Grouped(groups) => IssueView::Grouped(groups.without_empty_groups()),
            IssueView::SubGrouped(groups) => {
                IssueView::SubGrouped(groups.without_empty_groups())
            }
        }
    }
}

/// How a layout turns the ordered issues into a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ViewPlan {
    Flat(OrderBy),
    Grouped(Dimension, OrderBy),
    SubGrouped(Dimension, Dimension, OrderBy),
}

impl ViewPlan {
    /// `None` when the layout's required inputs are missing.
    fn for_filters(filters: &DisplayFilters) -> Option<ViewPlan> {
        match filters.layout {
            Layout::List => {
                let order = filters.order_by?;
                Some(match filters.group_by {
                    Some(group_by) => ViewPlan::Grouped(Dimension::Field(group_by), order),
                    None => ViewPlan::Flat(order),
                })
            }
            Layout::Kanban => {
                let group_by = filters.group_by?;
                let order = filters.order_by?;
                Some(match filters.sub_group_by {
                    Some(sub) => ViewPlan::SubGrouped(
                        Dimension::Field(group_by),
                        Dimension::Field(sub),
                        order,
                    ),
                    None => ViewPlan::Grouped(Dimension::Field(group_by), order),
                })
            }
            Layout::Calendar => Some(ViewPlan::Grouped(
                Dimension::TargetDate,
                OrderBy::ascending(OrderField::TargetDate),
            )),
            Layout::Spreadsheet => Some(ViewPlan::Flat(
                filters.order_by.unwrap_or(OrderBy::LAST_CREATED),
            )),
            Layout::GanttChart => {
                Some(ViewPlan::Flat(filters.order_by.unwrap_or(OrderBy::MANUAL)))
            }
        }
    }

    fn order(&self) -> OrderBy {
        match *self {
            ViewPlan::Flat(order)
            | ViewPlan::Grouped(_, order)
            | ViewPlan::SubGrouped(_, _, order) => order,
        }
    }
}

/// Project a project's issues through its display filters.
///
/// Returns `None` ("not ready") when the filters are not loaded, the id list
/// has not been fetched, or the layout lacks a required group-by/order-by.
/// Ids without a record in `issues` are skipped.
pub fn materialize<L: IssueLookup + ?Sized>(
    project_issue_ids: Option<&[String]>,
    filters: Option<&DisplayFilters>,
    issues: &L,
    catalog: &GroupCatalog,
) -> Option<IssueView> {
    let ids = project_issue_ids?;
    let plan = ViewPlan::for_filters(filters?)?;

    let mut ordered: Vec<&Issue> = ids.iter().filter_map(|id| issues.issue(id)).collect();
    sort_issues(&mut ordered, plan.order());

    Some(match plan {
        ViewPlan::Flat(_) => IssueView::Ungrouped(ordered.iter().map(|i| i.id.clone()).collect()),
        ViewPlan::Grouped(by, _) => IssueView::Grouped(group_issues(&ordered, by, catalog)),
        ViewPlan::SubGrouped(by, sub_by, _) => {
            IssueView::SubGrouped(sub_group_issues(&ordered, by, sub_by, catalog))
        }
    })
}

/// Inputs a cached view was computed from.
#[derive(Debug, Clone, Copy)]
pub struct ViewKey<'a> {
    pub project_id: &'a str,
    pub filters: &'a DisplayFilters,
    pub catalog: &'a GroupCatalog,
    pub collection_version: u64,
    pub index_version: u64,
}

#[derive(Debug)]
struct CachedView {
    project_id: String,
    filters: DisplayFilters,
    catalog: GroupCatalog,
    collection_version: u64,
    index_version: u64,
    view: Option<IssueView>,
}

impl CachedView {
    fn matches(&self, key: &ViewKey<'_>) -> bool {
        self.collection_version == key.collection_version
            && self.index_version == key.index_version
            && self.project_id == key.project_id
            && &self.filters == key.filters
            && &self.catalog == key.catalog
    }
}

/// Single-entry memo of the last materialized view.
#[derive(Debug, Default)]
pub struct ViewCache {
    entry: Mutex<Option<CachedView>>,
    computed: AtomicU64,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(
        &self,
        key: ViewKey<'_>,
        compute: impl FnOnce() -> Option<IssueView>,
    ) -> Option<IssueView> {
        let mut entry = self.entry.lock();
        if let Some(cached) = entry.as_ref()
            && cached.matches(&key)
        {
            return cached.view.clone();
        }

        let view = compute();
        self.computed.fetch_add(1, Ordering::Relaxed);
        *entry = Some(CachedView {
            project_id: key.project_id.to_string(),
            filters: key.filters.clone(),
            catalog: key.catalog.clone(),
            collection_version: key.collection_version,
            index_version: key.index_version,
            view: view.clone(),
        });
        view
    }

    /// Number of times a view had to be recomputed.
    pub fn computations(&self) -> u64 {
        self.computed.load(Ordering::Relaxed)
    }

    pub fn invalidate(&self) {
        *self.entry.lock() = None;
    }
}

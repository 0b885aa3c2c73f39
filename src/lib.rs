#[macro_use]
mod macros;

pub mod config;
pub mod error;
pub mod filters;
pub mod remote;
pub mod store;
pub mod types;
pub mod view;

pub use config::{Config, ViewFlags};
pub use error::{Result, TesseraError};
pub use filters::{
    DisplayFilters, DisplayFiltersPatch, DisplayProperties, DisplayProperty, FilterKey,
    FilterSource, GroupBy, IssueFilterOptions, IssueFilters, IssueTypeFilter, Layout, OrderBy,
    OrderField, ProjectFilterStore, QueryParams,
};
pub use remote::{HttpIssueService, IssueService};
pub use store::{IssueCollection, LoadKind, LoadState, MutationGate, ProjectIssues};
pub use types::{Issue, IssueDraft, IssuePatch, IssuePriority, PLACEHOLDER_PREFIX, StateGroup};
pub use view::{
    GroupCatalog, GroupKey, GroupedIssues, IssueView, SubGroupedIssues, ViewCache, materialize,
};

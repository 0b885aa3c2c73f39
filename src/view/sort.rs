//! Ordering of issues within a view or a bucket.

use std::cmp::Ordering;

use crate::filters::{OrderBy, OrderField};
use crate::types::Issue;

/// Missing values sort after present ones in both directions.
fn cmp_present<T: Ord>(a: Option<T>, b: Option<T>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => directed(a.cmp(&b), descending),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn directed(ordering: Ordering, descending: bool) -> Ordering {
    if descending {
        ordering.reverse()
    } else {
        ordering
    }
}

/// Compare two issues by `order`. Equal keys compare `Equal` so that a
/// stable sort keeps their input order.
pub fn compare_issues(a: &Issue, b: &Issue, order: OrderBy) -> Ordering {
    let desc = order.descending;
    match order.field {
        OrderField::SortOrder => directed(a.sort_order.total_cmp(&b.sort_order), desc),
        OrderField::CreatedAt => directed(a.created_at.cmp(&b.created_at), desc),
        OrderField::UpdatedAt => directed(a.updated_at.cmp(&b.updated_at), desc),
        OrderField::StartDate => cmp_present(a.start_date, b.start_date, desc),
        OrderField::TargetDate => cmp_present(a.target_date, b.target_date, desc),
        OrderField::Priority => directed(a.priority.rank().cmp(&b.priority.rank()), desc),
    }
}

/// Stable in-place sort of issue references.
pub fn sort_issues(issues: &mut [&Issue], order: OrderBy) {
    issues.sort_by(|a, b| compare_issues(a, b, order));
}

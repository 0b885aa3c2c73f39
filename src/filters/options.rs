//! Property filters (priority, state, labels, ...) and the subset currently applied.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::TesseraError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKey {
    Priority,
    State,
    StateGroup,
    Assignees,
    Mentions,
    CreatedBy,
    Labels,
    StartDate,
    TargetDate,
    Subscriber,
}

enum_display_fromstr!(
    FilterKey,
    TesseraError::InvalidFilterKey,
    {
        Priority => "priority",
        State => "state",
        StateGroup => "state_group",
        Assignees => "assignees",
        Mentions => "mentions",
        CreatedBy => "created_by",
        Labels => "labels",
        StartDate => "start_date",
        TargetDate => "target_date",
        Subscriber => "subscriber",
    }
);

impl FilterKey {
    /// Date keys hold a range expression rather than a set of ids.
    pub fn is_date(&self) -> bool {
        matches!(self, FilterKey::StartDate | FilterKey::TargetDate)
    }
}

/// Values selected per filter key. Keys without values are not stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueFilterOptions(BTreeMap<FilterKey, Vec<String>>);

impl IssueFilterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: FilterKey) -> &[String] {
        self.0.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replace the values of `key`. An empty list removes the key.
    pub fn set(&mut self, key: FilterKey, values: Vec<String>) {
        if values.is_empty() {
            self.0.remove(&key);
        } else {
            self.0.insert(key, values);
        }
    }

    pub fn with(mut self, key: FilterKey, values: &[&str]) -> Self {
        self.set(key, values.iter().map(|v| v.to_string()).collect());
        self
    }

    /// Filters with at least one value, in key order.
    pub fn applied(&self) -> impl Iterator<Item = (FilterKey, &[String])> {
        self.0
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(key, values)| (*key, values.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.applied().next().is_none()
    }

    /// Remove one value from `key`, or every value when `value` is `None`.
    pub fn remove(&mut self, key: FilterKey, value: Option<&str>) {
        match value {
            None => {
                self.0.remove(&key);
            }
            Some(value) => {
                let remaining: Vec<String> = self
                    .get(key)
                    .iter()
                    .filter(|v| v.as_str() != value)
                    .cloned()
                    .collect();
                self.set(key, remaining);
            }
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Add `value` to `key` if absent, remove it if present.
    pub fn toggle(&mut self, key: FilterKey, value: &str) {
        if self.get(key).iter().any(|v| v == value) {
            self.remove(key, Some(value));
        } else {
            let mut values = self.get(key).to_vec();
            values.push(value.to_string());
            self.set(key, values);
        }
    }

    /// Set a date range; selecting the range that is already applied clears it.
    pub fn toggle_range(&mut self, key: FilterKey, range: &[String]) {
        let current: HashSet<&String> = self.get(key).iter().collect();
        let next: HashSet<&String> = range.iter().collect();
        if !current.is_empty() && current == next {
            self.0.remove(&key);
        } else {
            self.set(key, range.to_vec());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applied_skips_empty_keys() {
        let mut opts = IssueFilterOptions::new()
            .with(FilterKey::Labels, &["bug"])
            .with(FilterKey::Priority, &["urgent", "high"]);
        opts.set(FilterKey::State, Vec::new());

        let applied: Vec<FilterKey> = opts.applied().map(|(k, _)| k).collect();
        assert_eq!(applied, vec![FilterKey::Priority, FilterKey::Labels]);
    }

    #[test]
    fn test_remove_single_value_and_whole_key() {
        let mut opts = IssueFilterOptions::new()
            .with(FilterKey::Assignees, &["u1", "u2"])
            .with(FilterKey::Labels, &["bug"]);

        opts.remove(FilterKey::Assignees, Some("u1"));
        assert_eq!(opts.get(FilterKey::Assignees), ["u2".to_string()]);

        opts.remove(FilterKey::Assignees, Some("u2"));
        assert!(opts.get(FilterKey::Assignees).is_empty());

        opts.remove(FilterKey::Labels, None);
        assert!(opts.is_empty());
    }

    #[test]
    fn test_toggle_value() {
        let mut opts = IssueFilterOptions::new();
        opts.toggle(FilterKey::Priority, "low");
        assert_eq!(opts.get(FilterKey::Priority), ["low".to_string()]);
        opts.toggle(FilterKey::Priority, "low");
        assert!(opts.is_empty());
    }

    #[test]
    fn test_toggle_same_date_range_clears_it() {
        let range = vec![
            "2024-01-01;after".to_string(),
            "2024-01-31;before".to_string(),
        ];
        let reversed: Vec<String> = range.iter().rev().cloned().collect();

        let mut opts = IssueFilterOptions::new();
        opts.toggle_range(FilterKey::TargetDate, &range);
        assert_eq!(opts.get(FilterKey::TargetDate).len(), 2);

        opts.toggle_range(FilterKey::TargetDate, &reversed);
        assert!(opts.get(FilterKey::TargetDate).is_empty());
    }

    #[test]
    fn test_serde_uses_wire_keys() {
        let opts = IssueFilterOptions::new().with(FilterKey::StateGroup, &["started"]);
        let value = serde_json::to_value(&opts).unwrap();
        assert_eq!(value, serde_json::json!({ "state_group": ["started"] }));

        let parsed: IssueFilterOptions =
            serde_json::from_str(r#"{"created_by": ["u9"]}"#).unwrap();
        assert_eq!(parsed.get(FilterKey::CreatedBy), ["u9".to_string()]);
        assert!(FilterKey::StartDate.is_date());
    }
}

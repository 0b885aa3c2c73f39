//! Client-side issue state.
//!
//! [`IssueCollection`] is the single owner of issue records; per-project
//! stores such as [`ProjectIssues`] only keep ids into it.

mod gate;
pub mod project;

use std::collections::HashMap;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::types::Issue;
use crate::view::IssueLookup;

pub use crate::config::ViewFlags;
pub use gate::MutationGate;
pub use project::{LoadKind, LoadState, ProjectIssues};

/// Issue records keyed by id, plus a counter bumped on every change.
#[derive(Debug, Default)]
pub struct IssueMap {
    issues: HashMap<String, Issue>,
    version: u64,
}

impl IssueMap {
    pub fn get(&self, id: &str) -> Option<&Issue> {
        self.issues.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.issues.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.issues.values()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn upsert(&mut self, issue: Issue) {
        self.issues.insert(issue.id.clone(), issue);
        self.version += 1;
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<Issue> {
        let removed = self.issues.remove(id);
        if removed.is_some() {
            self.version += 1;
        }
        removed
    }

    /// Edit a record in place; `None` if there is no such record.
    pub(crate) fn modify(&mut self, id: &str, edit: impl FnOnce(&mut Issue)) -> Option<Issue> {
        let issue = self.issues.get_mut(id)?;
        edit(issue);
        self.version += 1;
        Some(issue.clone())
    }
}

impl IssueLookup for IssueMap {
    fn issue(&self, id: &str) -> Option<&Issue> {
        self.issues.get(id)
    }
}

/// Workspace-wide issue index shared by every project store.
#[derive(Debug, Default)]
pub struct IssueCollection {
    inner: RwLock<IssueMap>,
}

impl IssueCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot access for readers. Do not hold across an `.await`.
    pub fn read(&self) -> RwLockReadGuard<'_, IssueMap> {
        self.inner.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, IssueMap> {
        self.inner.write()
    }

    pub fn get(&self, id: &str) -> Option<Issue> {
        self.inner.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().contains(id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn version(&self) -> u64 {
        self.inner.read().version()
    }

    pub fn upsert(&self, issue: Issue) {
        self.inner.write().upsert(issue);
    }

    pub fn upsert_many(&self, issues: impl IntoIterator<Item = Issue>) {
        let mut map = self.inner.write();
        for issue in issues {
            map.upsert(issue);
        }
    }

    pub fn remove(&self, id: &str) -> Option<Issue> {
        self.inner.write().remove(id)
    }
}

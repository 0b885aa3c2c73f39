//! Per-project issue lists and the operations that keep them in step with the
//! issue service.
//!
//! Every mutation follows the same shape: apply the local change (where there
//! is one), call the service, then either merge the service's answer or
//! schedule a full refetch of the project and hand the service error back to
//! the caller.
//!
//! Lock order is project index, then issue collection. No guard is held
//! across an `.await`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::gate::{MutationGate, MutationPermit};
use super::IssueCollection;
use crate::config::{Config, ViewFlags};
use crate::error::{Result, TesseraError};
use crate::filters::FilterSource;
use crate::remote::IssueService;
use crate::types::{Issue, IssueDraft, IssuePatch};
use crate::view::{GroupCatalog, IssueView, ViewCache, ViewKey, materialize};

/// Why a fetch is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadKind {
    /// First load of a project.
    InitLoader,
    /// Refetch after a failed mutation.
    Mutation,
}

enum_display!(
    LoadKind,
    {
        InitLoader => "init-loader",
        Mutation => "mutation",
    }
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Never fetched.
    Uninitialized,
    Loading(LoadKind),
    Ready,
}

/// Ordered issue ids per project, and which projects are being fetched.
#[derive(Debug, Default)]
struct ProjectIndex {
    issues: HashMap<String, Vec<String>>,
    loaders: HashMap<String, LoadKind>,
    version: u64,
}

impl ProjectIndex {
    fn contains(&self, project_id: &str, issue_id: &str) -> bool {
        self.issues
            .get(project_id)
            .is_some_and(|ids| ids.iter().any(|id| id == issue_id))
    }

    fn touch(&mut self) {
        self.version += 1;
    }
}

/// Keep the first occurrence of every id.
fn dedup_ids(issues: &[Issue]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(issues.len());
    issues
        .iter()
        .filter(|issue| seen.insert(issue.id.as_str()))
        .map(|issue| issue.id.clone())
        .collect()
}

struct Inner {
    service: Arc<dyn IssueService>,
    filters: Arc<dyn FilterSource>,
    collection: Arc<IssueCollection>,
    index: RwLock<ProjectIndex>,
    view_cache: ViewCache,
    view_flags: ViewFlags,
    gate: Option<MutationGate>,
    resyncs: Mutex<Vec<JoinHandle<()>>>,
}

/// Issue lists of the projects in a workspace.
///
/// Cheap to clone; clones share state.
///
/// Mutations must run inside a Tokio runtime: a failed mutation schedules
/// its resync on the current runtime. Without one the resync is skipped and
/// only logged, and the project stays as the optimistic write left it until
/// the next [`fetch`](Self::fetch).
#[derive(Clone)]
pub struct ProjectIssues {
    inner: Arc<Inner>,
}

impl ProjectIssues {
    pub fn new(
        service: Arc<dyn IssueService>,
        filters: Arc<dyn FilterSource>,
        collection: Arc<IssueCollection>,
    ) -> Self {
        Self::with_config(service, filters, collection, &Config::default())
    }

    pub fn with_config(
        service: Arc<dyn IssueService>,
        filters: Arc<dyn FilterSource>,
        collection: Arc<IssueCollection>,
        config: &Config,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                service,
                filters,
                collection,
                index: RwLock::new(ProjectIndex::default()),
                view_cache: ViewCache::new(),
                view_flags: config.view_flags,
                gate: config.store.serialize_mutations.then(MutationGate::new),
                resyncs: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn collection(&self) -> &Arc<IssueCollection> {
        &self.inner.collection
    }

    /// Per-issue locks, present when `store.serialize_mutations` is on.
    pub fn mutation_gate(&self) -> Option<&MutationGate> {
        self.inner.gate.as_ref()
    }

    pub fn view_flags(&self) -> ViewFlags {
        self.inner.view_flags
    }

    /// Ids of a project in list order; `None` until the project is fetched.
    pub fn project_issue_ids(&self, project_id: &str) -> Option<Vec<String>> {
        self.inner.index.read().issues.get(project_id).cloned()
    }

    pub fn load_state(&self, project_id: &str) -> LoadState {
        let index = self.inner.index.read();
        match index.loaders.get(project_id) {
            Some(kind) => LoadState::Loading(*kind),
            None if index.issues.contains_key(project_id) => LoadState::Ready,
            None => LoadState::Uninitialized,
        }
    }

    /// Materialized view of a project under its current display filters.
    ///
    /// `None` while there is no active project, its filters are not loaded,
    /// or its issues have not been fetched. Served from a single-entry cache
    /// until the filters, the catalog, the project list or any issue changes.
    pub fn issue_ids(&self, project_id: Option<&str>, catalog: &GroupCatalog) -> Option<IssueView> {
        let project_id = project_id?;
        let filters = self.inner.filters.issue_filters(project_id)?;
        let display = &filters.display_filters;

        let index = self.inner.index.read();
        let issues = self.inner.collection.read();
        let key = ViewKey {
            project_id,
            filters: display,
            catalog,
            collection_version: issues.version(),
            index_version: index.version,
        };
        self.inner.view_cache.get_or_compute(key, || {
            materialize(
                index.issues.get(project_id).map(Vec::as_slice),
                Some(display),
                &*issues,
                catalog,
            )
        })
    }

    /// Load a project's issues with its applied filters.
    ///
    /// On success the project list becomes exactly the returned ids and every
    /// returned record is upserted. On failure nothing but the loader changes.
    pub async fn fetch(
        &self,
        workspace_id: &str,
        project_id: &str,
        kind: LoadKind,
    ) -> Result<Vec<Issue>> {
        self.inner
            .index
            .write()
            .loaders
            .insert(project_id.to_string(), kind);

        let params = self
            .inner
            .filters
            .issue_filters(project_id)
            .map(|f| f.query_params())
            .unwrap_or_default();
        debug!(project_id, load_kind = %kind, "fetching issues");

        match self.inner.service.list(workspace_id, project_id, &params).await {
            Ok(fetched) => {
                let mut index = self.inner.index.write();
                let mut issues = self.inner.collection.write();
                for issue in &fetched {
                    issues.upsert(issue.clone());
                }
                index
                    .issues
                    .insert(project_id.to_string(), dedup_ids(&fetched));
                index.loaders.remove(project_id);
                index.touch();
                debug!(project_id, count = fetched.len(), "issues fetched");
                Ok(fetched)
            }
            Err(err) => {
                self.inner.index.write().loaders.remove(project_id);
                warn!(project_id, load_kind = %kind, "fetching issues failed: {err}");
                Err(err)
            }
        }
    }

    /// Create an issue and append it to the project list.
    pub async fn create(
        &self,
        workspace_id: &str,
        project_id: &str,
        draft: &IssueDraft,
    ) -> Result<Issue> {
        debug!(project_id, "creating issue");
        match self.inner.service.create(workspace_id, project_id, draft).await {
            Ok(created) => {
                let mut index = self.inner.index.write();
                let mut issues = self.inner.collection.write();
                issues.upsert(created.clone());
                if let Some(ids) = index.issues.get_mut(project_id)
                    && !ids.contains(&created.id)
                {
                    ids.push(created.id.clone());
                }
                index.touch();
                Ok(created)
            }
            Err(err) => Err(self.fail(workspace_id, project_id, "create", None, err)),
        }
    }

    /// Patch an issue of the project.
    ///
    /// The patch is visible locally before the service answers. Returns
    /// `Ok(None)` without calling the service when the issue is not in the
    /// project list.
    pub async fn update(
        &self,
        workspace_id: &str,
        project_id: &str,
        issue_id: &str,
        patch: &IssuePatch,
    ) -> Result<Option<Issue>> {
        let _permit = self.permit(issue_id).await;
        {
            let index = self.inner.index.read();
            if !index.contains(project_id, issue_id) {
                return Ok(None);
            }
            self.inner
                .collection
                .write()
                .modify(issue_id, |issue| patch.apply_to(issue));
        }

        debug!(project_id, issue_id, "updating issue");
        match self
            .inner
            .service
            .patch(workspace_id, project_id, issue_id, patch)
            .await
        {
            Ok(updated) => {
                let _index = self.inner.index.read();
                let mut issues = self.inner.collection.write();
                if issues.contains(issue_id) {
                    issues.upsert(updated.clone());
                }
                Ok(Some(updated))
            }
            Err(err) => Err(self.fail(workspace_id, project_id, "update", Some(issue_id), err)),
        }
    }

    /// Delete an issue of the project.
    ///
    /// The issue leaves the project list and the collection before the
    /// service answers. Returns `Ok(false)` without calling the service when
    /// the issue is not in the project list.
    pub async fn remove(&self, workspace_id: &str, project_id: &str, issue_id: &str) -> Result<bool> {
        let _permit = self.permit(issue_id).await;
        {
            let mut index = self.inner.index.write();
            let Some(ids) = index.issues.get_mut(project_id) else {
                return Ok(false);
            };
            let Some(position) = ids.iter().position(|id| id == issue_id) else {
                return Ok(false);
            };
            ids.remove(position);
            index.touch();
            self.inner.collection.write().remove(issue_id);
        }

        debug!(project_id, issue_id, "deleting issue");
        match self
            .inner
            .service
            .delete(workspace_id, project_id, issue_id)
            .await
        {
            Ok(()) => Ok(true),
            Err(err) => Err(self.fail(workspace_id, project_id, "delete", Some(issue_id), err)),
        }
    }

    /// Show a client-side placeholder row in the project list.
    ///
    /// Returns `false` when the project has not been fetched yet.
    pub fn insert_placeholder(&self, project_id: &str, placeholder: Issue) -> bool {
        let mut index = self.inner.index.write();
        let Some(ids) = index.issues.get_mut(project_id) else {
            return false;
        };
        if !ids.contains(&placeholder.id) {
            ids.push(placeholder.id.clone());
        }
        index.touch();
        self.inner.collection.write().upsert(placeholder);
        true
    }

    /// Create the issue behind a placeholder row and swap the placeholder for
    /// the stored record.
    ///
    /// The swap happens under one write lock on the index and the collection,
    /// so readers see either the placeholder or the real issue, never both or
    /// neither.
    pub async fn quick_add(
        &self,
        workspace_id: &str,
        project_id: &str,
        placeholder: &Issue,
    ) -> Result<Issue> {
        let _permit = self.permit(&placeholder.id).await;
        let draft = IssueDraft::from(placeholder);

        debug!(project_id, placeholder_id = %placeholder.id, "quick-adding issue");
        match self.inner.service.create(workspace_id, project_id, &draft).await {
            Ok(created) => {
                let mut index = self.inner.index.write();
                let mut issues = self.inner.collection.write();
                if let Some(ids) = index.issues.get_mut(project_id) {
                    ids.retain(|id| id != &placeholder.id);
                    if !ids.contains(&created.id) {
                        ids.push(created.id.clone());
                    }
                }
                index.touch();
                issues.remove(&placeholder.id);
                issues.upsert(created.clone());
                Ok(created)
            }
            Err(err) => Err(self.fail(
                workspace_id,
                project_id,
                "quick-add",
                Some(placeholder.id.as_str()),
                err,
            )),
        }
    }

    /// Wait for every background resync started so far.
    pub async fn settle(&self) {
        loop {
            let pending = std::mem::take(&mut *self.inner.resyncs.lock());
            if pending.is_empty() {
                return;
            }
            for joined in futures::future::join_all(pending).await {
                if let Err(err) = joined {
                    warn!("background resync task did not complete: {err}");
                }
            }
        }
    }

    async fn permit(&self, issue_id: &str) -> Option<MutationPermit> {
        match &self.inner.gate {
            Some(gate) => Some(gate.acquire(issue_id).await),
            None => None,
        }
    }

    /// Log a failed mutation, schedule a resync and give the error back.
    fn fail(
        &self,
        workspace_id: &str,
        project_id: &str,
        operation: &str,
        issue_id: Option<&str>,
        err: TesseraError,
    ) -> TesseraError {
        warn!(
            project_id,
            issue_id = issue_id.unwrap_or_default(),
            "{operation} failed, resyncing project: {err}"
        );
        self.spawn_resync(workspace_id, project_id);
        err
    }

    /// Refetch a project in the background after a failed mutation.
    fn spawn_resync(&self, workspace_id: &str, project_id: &str) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(project_id, "no async runtime, skipping resync");
            return;
        };

        let this = self.clone();
        let workspace_id = workspace_id.to_string();
        let project_id = project_id.to_string();
        let task = runtime.spawn(async move {
            if let Err(err) = this
                .fetch(&workspace_id, &project_id, LoadKind::Mutation)
                .await
            {
                warn!(project_id = %project_id, "resync failed: {err}");
            }
        });

        let mut resyncs = self.inner.resyncs.lock();
        resyncs.retain(|t| !t.is_finished());
        resyncs.push(task);
    }
}

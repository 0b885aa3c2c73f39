//! In-memory issue service with failure injection and a call log.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use tessera::error::{Result, TesseraError};
use tessera::filters::QueryParams;
use tessera::remote::IssueService;
use tessera::types::{Issue, IssueDraft, IssuePatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    Create,
    Patch,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List { project_id: String, params: QueryParams },
    Create { project_id: String, name: String },
    Patch { project_id: String, issue_id: String },
    Delete { project_id: String, issue_id: String },
}

impl Call {
    pub fn op(&self) -> Op {
        match self {
            Call::List { .. } => Op::List,
            Call::Create { .. } => Op::Create,
            Call::Patch { .. } => Op::Patch,
            Call::Delete { .. } => Op::Delete,
        }
    }
}

/// Server-side truth for the tests: issues per project.
#[derive(Default)]
pub struct ScriptedIssueService {
    projects: Mutex<HashMap<String, Vec<Issue>>>,
    failures: Mutex<HashMap<Op, usize>>,
    calls: Mutex<Vec<Call>>,
    next_id: AtomicU64,
    gate: Arc<RwLock<()>>,
}

impl ScriptedIssueService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_issues(project_id: &str, issues: Vec<Issue>) -> Self {
        let service = Self::new();
        service
            .projects
            .lock()
            .insert(project_id.to_string(), issues);
        service
    }

    /// Make the next `count` calls of `op` fail with a 500.
    pub fn fail_next(&self, op: Op, count: usize) {
        self.failures.lock().insert(op, count);
    }

    /// Block every call until the returned guard is dropped. Calls are logged
    /// before they block.
    pub async fn hold(&self) -> OwnedRwLockWriteGuard<()> {
        self.gate.clone().write_owned().await
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, op: Op) -> usize {
        self.calls.lock().iter().filter(|c| c.op() == op).count()
    }

    /// Wait until `op` has been called at least `n` times.
    pub async fn wait_for(&self, op: Op, n: usize) {
        for _ in 0..500 {
            if self.count(op) >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("{op:?} was not called {n} times");
    }

    pub fn server_issue(&self, project_id: &str, issue_id: &str) -> Option<Issue> {
        self.projects
            .lock()
            .get(project_id)
            .and_then(|issues| issues.iter().find(|i| i.id == issue_id).cloned())
    }

    pub fn remove_server_issue(&self, project_id: &str, issue_id: &str) {
        if let Some(issues) = self.projects.lock().get_mut(project_id) {
            issues.retain(|i| i.id != issue_id);
        }
    }

    async fn enter(&self, call: Call) -> Result<()> {
        let op = call.op();
        self.calls.lock().push(call);
        let _ = self.gate.read().await;

        let mut failures = self.failures.lock();
        if let Some(remaining) = failures.get_mut(&op)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(TesseraError::api(500, format!("{op:?} failed")));
        }
        Ok(())
    }
}

#[async_trait]
impl IssueService for ScriptedIssueService {
    async fn list(
        &self,
        _workspace_id: &str,
        project_id: &str,
        params: &QueryParams,
    ) -> Result<Vec<Issue>> {
        self.enter(Call::List {
            project_id: project_id.to_string(),
            params: params.clone(),
        })
        .await?;
        Ok(self
            .projects
            .lock()
            .get(project_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create(
        &self,
        _workspace_id: &str,
        project_id: &str,
        draft: &IssueDraft,
    ) -> Result<Issue> {
        self.enter(Call::Create {
            project_id: project_id.to_string(),
            name: draft.name.clone(),
        })
        .await?;

        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let issue = Issue {
            id: format!("srv-{n}"),
            name: draft.name.clone(),
            project_id: Some(project_id.to_string()),
            state_id: draft.state_id.clone(),
            priority: draft.priority.unwrap_or_default(),
            sort_order: draft.sort_order.unwrap_or(65535.0),
            ..Default::default()
        };
        self.projects
            .lock()
            .entry(project_id.to_string())
            .or_default()
            .push(issue.clone());
        Ok(issue)
    }

    async fn patch(
        &self,
        _workspace_id: &str,
        project_id: &str,
        issue_id: &str,
        patch: &IssuePatch,
    ) -> Result<Issue> {
        self.enter(Call::Patch {
            project_id: project_id.to_string(),
            issue_id: issue_id.to_string(),
        })
        .await?;

        let mut projects = self.projects.lock();
        let issue = projects
            .get_mut(project_id)
            .and_then(|issues| issues.iter_mut().find(|i| i.id == issue_id))
            .ok_or_else(|| TesseraError::api(404, "Issue does not exist"))?;
        patch.apply_to(issue);
        Ok(issue.clone())
    }

    async fn delete(&self, _workspace_id: &str, project_id: &str, issue_id: &str) -> Result<()> {
        self.enter(Call::Delete {
            project_id: project_id.to_string(),
            issue_id: issue_id.to_string(),
        })
        .await?;
        self.remove_server_issue(project_id, issue_id);
        Ok(())
    }
}

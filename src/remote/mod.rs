//! Remote issue service contract.
//!
//! The controller only talks to the server through [`IssueService`], so tests
//! and alternative transports can stand in for [`HttpIssueService`].

pub mod http;

use async_trait::async_trait;

use crate::error::Result;
use crate::filters::QueryParams;
use crate::types::{Issue, IssueDraft, IssuePatch};

pub use http::HttpIssueService;

/// Issue endpoints of a project, scoped by workspace.
///
/// Every call may fail with a transport or validation error; there is no
/// partial success.
#[async_trait]
pub trait IssueService: Send + Sync {
    /// List the issues of a project matching `params`.
    async fn list(
        &self,
        workspace_id: &str,
        project_id: &str,
        params: &QueryParams,
    ) -> Result<Vec<Issue>>;

    /// Create an issue and return the stored record.
    async fn create(&self, workspace_id: &str, project_id: &str, draft: &IssueDraft)
    -> Result<Issue>;

    /// Apply a partial update and return the stored record.
    async fn patch(
        &self,
        workspace_id: &str,
        project_id: &str,
        issue_id: &str,
        patch: &IssuePatch,
    ) -> Result<Issue>;

    async fn delete(&self, workspace_id: &str, project_id: &str, issue_id: &str) -> Result<()>;
}

//! REST adapter for the issue endpoints.
//!
//! The API key is kept in a [`SecretBox`] and only exposed while building the
//! header, which is marked sensitive so reqwest's debug output redacts it.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderValue};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretBox};
use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use url::Url;

use super::IssueService;
use crate::config::Config;
use crate::error::{Result, TesseraError};
use crate::filters::QueryParams;
use crate::types::{Issue, IssueDraft, IssuePatch};

const API_KEY_HEADER: &str = "X-API-Key";
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// List endpoints answer with a bare array, a paginated envelope, or an
/// object mapping issue ids to issues.
#[derive(Deserialize)]
#[serde(untagged)]
enum IssueList {
    Plain(Vec<Issue>),
    Paged { results: Vec<Issue> },
    Keyed(KeyedIssues),
}

impl IssueList {
    fn into_issues(self) -> Vec<Issue> {
        match self {
            IssueList::Plain(issues)
            | IssueList::Paged { results: issues }
            | IssueList::Keyed(KeyedIssues(issues)) => issues,
        }
    }
}

/// Values of an id-keyed object, in the order the server wrote them.
struct KeyedIssues(Vec<Issue>);

impl<'de> Deserialize<'de> for KeyedIssues {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct KeyedVisitor;

        impl<'de> Visitor<'de> for KeyedVisitor {
            type Value = KeyedIssues;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of issues keyed by id")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<KeyedIssues, A::Error> {
                let mut issues = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((_, issue)) = map.next_entry::<String, Issue>()? {
                    issues.push(issue);
                }
                Ok(KeyedIssues(issues))
            }
        }

        deserializer.deserialize_map(KeyedVisitor)
    }
}

pub struct HttpIssueService {
    client: Client,
    base_url: Url,
    api_key: SecretBox<String>,
}

impl HttpIssueService {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(TesseraError::Config(format!(
                "API base URL '{base_url}' cannot carry a path"
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: SecretBox::new(Box::new(api_key.to_string())),
        })
    }

    /// Build the service from the `api` section of the configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let token = config.api_token().ok_or_else(|| {
            TesseraError::Config(
                "API token not configured. Set TESSERA_API_TOKEN or api.token in .tessera/config.yaml"
                    .to_string(),
            )
        })?;
        Self::new(
            &config.api.base_url,
            &token,
            Duration::from_secs(config.api.timeout_secs),
        )
    }

    /// `{base}/api/workspaces/{ws}/projects/{project}/issues/[{id}/]`
    fn issues_url(&self, workspace_id: &str, project_id: &str, issue_id: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "workspaces", workspace_id, "projects", project_id, "issues"]);
            if let Some(id) = issue_id {
                segments.push(id);
            }
            segments.push("");
        }
        url
    }

    fn api_key_header(&self) -> Result<HeaderValue> {
        let mut value = HeaderValue::from_str(self.api_key.expose_secret())
            .map_err(|_| TesseraError::Config("API token is not a valid header value".into()))?;
        value.set_sensitive(true);
        Ok(value)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> Result<reqwest::RequestBuilder> {
        Ok(self
            .client
            .request(method, url)
            .header(API_KEY_HEADER, self.api_key_header()?)
            .header(header::ACCEPT, HeaderValue::from_static("application/json")))
    }
}

/// Turn a non-success response into [`TesseraError::Api`].
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TesseraError::api(status.as_u16(), error_message(status, &body)))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    Ok(check(response).await?.json().await?)
}

/// The service reports failures as `{"error": ...}` or `{"detail": ...}`.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["error", "detail"]
                .iter()
                .find_map(|k| v.get(*k).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        })
}

#[async_trait]
impl IssueService for HttpIssueService {
    async fn list(
        &self,
        workspace_id: &str,
        project_id: &str,
        params: &QueryParams,
    ) -> Result<Vec<Issue>> {
        let mut url = self.issues_url(workspace_id, project_id, None);
        if !params.is_empty() {
            url.set_query(Some(&params.to_query_string()));
        }
        let response = self.request(reqwest::Method::GET, url)?.send().await?;
        let list: IssueList = read_json(response).await?;
        Ok(list.into_issues())
    }

    async fn create(
        &self,
        workspace_id: &str,
        project_id: &str,
        draft: &IssueDraft,
    ) -> Result<Issue> {
        let url = self.issues_url(workspace_id, project_id, None);
        let response = self
            .request(reqwest::Method::POST, url)?
            .json(draft)
            .send()
            .await?;
        read_json(response).await
    }

    async fn patch(
        &self,
        workspace_id: &str,
        project_id: &str,
        issue_id: &str,
        patch: &IssuePatch,
    ) -> Result<Issue> {
        let url = self.issues_url(workspace_id, project_id, Some(issue_id));
        let response = self
            .request(reqwest::Method::PATCH, url)?
            .json(patch)
            .send()
            .await?;
        read_json(response).await
    }

    async fn delete(&self, workspace_id: &str, project_id: &str, issue_id: &str) -> Result<()> {
        let url = self.issues_url(workspace_id, project_id, Some(issue_id));
        let response = self.request(reqwest::Method::DELETE, url)?.send().await?;
        check(response).await?;
        Ok(())
    }
}

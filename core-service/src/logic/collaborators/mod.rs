//! External Collaborators
//!
//! Narrow async interfaces to everything the pipeline does not own: the issue
//! tracker, the document store, the source-control host and the language model.
//!
//! # Components
//! - `jira.rs`: issue tracker over Jira REST v3
//! - `confluence.rs`: document store over Confluence REST v2
//! - `bitbucket.rs`: source control over Bitbucket 2.0
//! - `openai.rs`: language model over chat completions
//! - `simulated.rs`: physics-aware offline language model
//! - `fake.rs`: in-memory recording fakes

pub mod bitbucket;
pub mod confluence;
pub mod fake;
pub mod jira;
pub mod openai;
pub mod simulated;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::logic::notify::RichText;

pub use bitbucket::BitbucketClient;
pub use confluence::ConfluenceClient;
pub use jira::JiraClient;
pub use openai::OpenAiClient;
pub use simulated::SimulatedLanguageModel;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CollaboratorError {
    #[error("network error: {0}")]
    Network(String),

    #[error("{service} returned HTTP {status}")]
    Http { service: &'static str, status: u16 },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("not configured: {0}")]
    NotConfigured(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(e: reqwest::Error) -> Self {
        CollaboratorError::Network(e.to_string())
    }
}

/// Check a response status and map failures to `Http`/`Unauthorized`
pub(crate) fn check_status(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, CollaboratorError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        Err(CollaboratorError::Unauthorized(format!("{} rejected credentials", service)))
    } else {
        Err(CollaboratorError::Http {
            service,
            status: status.as_u16(),
        })
    }
}

/// Bound a collaborator call; an elapsed timer becomes `Timeout`
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, CollaboratorError>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(CollaboratorError::Timeout(limit)),
    }
}

#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn get_labels(&self, ticket_id: &str) -> Result<Vec<String>, CollaboratorError>;

    async fn get_status(&self, ticket_id: &str) -> Result<String, CollaboratorError>;

    async fn post_comment(&self, ticket_id: &str, body: &RichText) -> Result<(), CollaboratorError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a page and return its URL
    async fn create_page(&self, title: &str, html_body: &str) -> Result<String, CollaboratorError>;
}

#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Commit hash at the head of the default branch
    async fn default_branch_head(&self, repo: &str) -> Result<String, CollaboratorError>;

    async fn create_branch(&self, repo: &str, name: &str, from_hash: &str) -> Result<(), CollaboratorError>;

    async fn commit_file(
        &self,
        repo: &str,
        branch: &str,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<(), CollaboratorError>;

    /// Open a merge request and return its link
    async fn open_merge_request(
        &self,
        repo: &str,
        source_branch: &str,
        target_branch: &str,
        title: &str,
        description: &str,
    ) -> Result<String, CollaboratorError>;
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `prompt`; the answer is expected to be JSON text
    async fn complete(&self, prompt: &str) -> Result<String, CollaboratorError>;
}

//! In-memory collaborators
//!
//! Used by the offline binary mode and by tests. Every call is recorded so
//! tests can assert on what the pipeline asked for.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{CollaboratorError, DocumentStore, IssueTracker, LanguageModel, SourceControl};
use crate::logic::notify::RichText;

// ============================================================================
// ISSUE TRACKER
// ============================================================================

#[derive(Default)]
pub struct FakeTracker {
    labels: Mutex<HashMap<String, Vec<String>>>,
    statuses: Mutex<HashMap<String, String>>,
    comments: Mutex<Vec<(String, RichText)>>,
    fail_comments: AtomicBool,
}

impl FakeTracker {
    pub fn set_labels(&self, ticket_id: &str, labels: &[&str]) {
        self.labels
            .lock()
            .insert(ticket_id.to_string(), labels.iter().map(|l| l.to_string()).collect());
    }

    pub fn set_status(&self, ticket_id: &str, status: &str) {
        self.statuses.lock().insert(ticket_id.to_string(), status.to_string());
    }

    pub fn fail_comments(&self, fail: bool) {
        self.fail_comments.store(fail, Ordering::Relaxed);
    }

    pub fn comments(&self, ticket_id: &str) -> Vec<RichText> {
        self.comments
            .lock()
            .iter()
            .filter(|(t, _)| t == ticket_id)
            .map(|(_, c)| c.clone())
            .collect()
    }

    pub fn comment_titles(&self, ticket_id: &str) -> Vec<String> {
        self.comments(ticket_id).into_iter().map(|c| c.title).collect()
    }
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn get_labels(&self, ticket_id: &str) -> Result<Vec<String>, CollaboratorError> {
        Ok(self.labels.lock().get(ticket_id).cloned().unwrap_or_default())
    }

    async fn get_status(&self, ticket_id: &str) -> Result<String, CollaboratorError> {
        Ok(self
            .statuses
            .lock()
            .get(ticket_id)
            .cloned()
            .unwrap_or_else(|| "To Do".to_string()))
    }

    async fn post_comment(&self, ticket_id: &str, body: &RichText) -> Result<(), CollaboratorError> {
        if self.fail_comments.load(Ordering::Relaxed) {
            return Err(CollaboratorError::Http { service: "fake-tracker", status: 503 });
        }
        self.comments.lock().push((ticket_id.to_string(), body.clone()));
        Ok(())
    }
}

// ============================================================================
// DOCUMENT STORE
// ============================================================================

#[derive(Default)]
pub struct FakeDocuments {
    pages: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl FakeDocuments {
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    /// `(title, html_body)` of every created page
    pub fn pages(&self) -> Vec<(String, String)> {
        self.pages.lock().clone()
    }
}

#[async_trait]
impl DocumentStore for FakeDocuments {
    async fn create_page(&self, title: &str, html_body: &str) -> Result<String, CollaboratorError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(CollaboratorError::Http { service: "fake-documents", status: 500 });
        }
        let mut pages = self.pages.lock();
        pages.push((title.to_string(), html_body.to_string()));
        Ok(format!("https://wiki.example/pages/{}", pages.len()))
    }
}

// ============================================================================
// SOURCE CONTROL
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CommittedFile {
    pub branch: String,
    pub path: String,
    pub content: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenedRequest {
    pub source: String,
    pub target: String,
    pub title: String,
    pub description: String,
}

pub struct FakeSourceControl {
    head: String,
    fail_at: Mutex<Option<&'static str>>,
    calls: Mutex<Vec<&'static str>>,
    branches: Mutex<Vec<String>>,
    commits: Mutex<Vec<CommittedFile>>,
    requests: Mutex<Vec<OpenedRequest>>,
}

impl Default for FakeSourceControl {
    fn default() -> Self {
        Self {
            head: "9f8e7d6c".to_string(),
            fail_at: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            branches: Mutex::new(Vec::new()),
            commits: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl FakeSourceControl {
    /// Make the named step fail (`default_branch_head`, `create_branch`,
    /// `commit_file` or `open_merge_request`)
    pub fn fail_at(&self, step: Option<&'static str>) {
        *self.fail_at.lock() = step;
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    /// Number of deployments started
    pub fn deploy_attempts(&self) -> usize {
        self.calls.lock().iter().filter(|c| **c == "default_branch_head").count()
    }

    pub fn branches(&self) -> Vec<String> {
        self.branches.lock().clone()
    }

    pub fn commits(&self) -> Vec<CommittedFile> {
        self.commits.lock().clone()
    }

    pub fn requests(&self) -> Vec<OpenedRequest> {
        self.requests.lock().clone()
    }

    fn record(&self, step: &'static str) -> Result<(), CollaboratorError> {
        self.calls.lock().push(step);
        if *self.fail_at.lock() == Some(step) {
            return Err(CollaboratorError::Http { service: "fake-scm", status: 500 });
        }
        Ok(())
    }
}

#[async_trait]
impl SourceControl for FakeSourceControl {
    async fn default_branch_head(&self, _repo: &str) -> Result<String, CollaboratorError> {
        self.record("default_branch_head")?;
        Ok(self.head.clone())
    }

    async fn create_branch(&self, _repo: &str, name: &str, _from_hash: &str) -> Result<(), CollaboratorError> {
        self.record("create_branch")?;
        self.branches.lock().push(name.to_string());
        Ok(())
    }

    async fn commit_file(
        &self,
        _repo: &str,
        branch: &str,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<(), CollaboratorError> {
        self.record("commit_file")?;
        self.commits.lock().push(CommittedFile {
            branch: branch.to_string(),
            path: path.to_string(),
            content: content.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }

    async fn open_merge_request(
        &self,
        repo: &str,
        source_branch: &str,
        target_branch: &str,
        title: &str,
        description: &str,
    ) -> Result<String, CollaboratorError> {
        self.record("open_merge_request")?;
        let mut requests = self.requests.lock();
        requests.push(OpenedRequest {
            source: source_branch.to_string(),
            target: target_branch.to_string(),
            title: title.to_string(),
            description: description.to_string(),
        });
        Ok(format!("https://scm.example/{}/pull-requests/{}", repo, requests.len()))
    }
}

// ============================================================================
// LANGUAGE MODEL
// ============================================================================

pub struct FakeLanguageModel {
    reply: Result<String, CollaboratorError>,
    calls: AtomicUsize,
}

impl FakeLanguageModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: CollaboratorError) -> Self {
        Self {
            reply: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl LanguageModel for FakeLanguageModel {
    async fn complete(&self, _prompt: &str) -> Result<String, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.reply.clone()
    }
}

//! Bitbucket Source Control
//!
//! The access token is read from the credential store on every call, so
//! credentials saved at runtime take effect without a restart.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{check_status, CollaboratorError, SourceControl};
use crate::constants::{DEFAULT_BRANCH, SOURCE_CONTROL_TOKEN};
use crate::logic::storage::CredentialStore;

const SERVICE: &str = "bitbucket";
const API_ROOT: &str = "https://api.bitbucket.org/2.0";

pub struct BitbucketClient {
    api_root: String,
    credentials: Arc<dyn CredentialStore>,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct BranchList {
    values: Vec<Branch>,
}

#[derive(Debug, Deserialize)]
struct Branch {
    target: Target,
}

#[derive(Debug, Deserialize)]
struct Target {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    links: PullRequestLinks,
}

#[derive(Debug, Deserialize)]
struct PullRequestLinks {
    html: Href,
}

#[derive(Debug, Deserialize)]
struct Href {
    href: String,
}

impl BitbucketClient {
    pub fn new(credentials: Arc<dyn CredentialStore>, timeout_seconds: u64) -> Result<Self, CollaboratorError> {
        Self::with_api_root(API_ROOT, credentials, timeout_seconds)
    }

    pub fn with_api_root(
        api_root: &str,
        credentials: Arc<dyn CredentialStore>,
        timeout_seconds: u64,
    ) -> Result<Self, CollaboratorError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;
        Ok(Self {
            api_root: api_root.trim_end_matches('/').to_string(),
            credentials,
            http_client,
        })
    }

    fn token(&self) -> Result<String, CollaboratorError> {
        match self.credentials.get(SOURCE_CONTROL_TOKEN) {
            Ok(Some(token)) => Ok(token),
            Ok(None) => Err(CollaboratorError::NotConfigured(format!(
                "credential '{}' is not stored",
                SOURCE_CONTROL_TOKEN
            ))),
            Err(e) => Err(CollaboratorError::NotConfigured(e.to_string())),
        }
    }

    fn repo_url(&self, repo: &str) -> String {
        format!("{}/repositories/{}", self.api_root, repo)
    }
}

#[async_trait]
impl SourceControl for BitbucketClient {
    async fn default_branch_head(&self, repo: &str) -> Result<String, CollaboratorError> {
        let token = self.token()?;
        let query = format!("name=\"{}\"", DEFAULT_BRANCH);
        let response = self
            .http_client
            .get(format!("{}/refs/branches", self.repo_url(repo)))
            .bearer_auth(&token)
            .query(&[("q", query.as_str())])
            .send()
            .await?;

        let branches: BranchList = check_status(SERVICE, response)?
            .json()
            .await
            .map_err(|e| CollaboratorError::Parse(e.to_string()))?;

        branches
            .values
            .into_iter()
            .next()
            .map(|b| b.target.hash)
            .ok_or_else(|| CollaboratorError::Parse(format!("branch '{}' not found", DEFAULT_BRANCH)))
    }

    async fn create_branch(&self, repo: &str, name: &str, from_hash: &str) -> Result<(), CollaboratorError> {
        let token = self.token()?;
        let response = self
            .http_client
            .post(format!("{}/refs/branches", self.repo_url(repo)))
            .bearer_auth(&token)
            .json(&serde_json::json!({ "name": name, "target": { "hash": from_hash } }))
            .send()
            .await?;

        check_status(SERVICE, response)?;
        Ok(())
    }

    async fn commit_file(
        &self,
        repo: &str,
        branch: &str,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<(), CollaboratorError> {
        let token = self.token()?;
        let form = [("branch", branch), ("message", message), (path, content)];
        let response = self
            .http_client
            .post(format!("{}/src", self.repo_url(repo)))
            .bearer_auth(&token)
            .form(&form)
            .send()
            .await?;

        check_status(SERVICE, response)?;
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
        let token = self.token()?;
        let response = self
            .http_client
            .post(format!("{}/pullrequests", self.repo_url(repo)))
            .bearer_auth(&token)
            .json(&serde_json::json!({
                "title": title,
                "description": description,
                "source": { "branch": { "name": source_branch } },
                "destination": { "branch": { "name": target_branch } }
            }))
            .send()
            .await?;

        let pr: PullRequest = check_status(SERVICE, response)?
            .json()
            .await
            .map_err(|e| CollaboratorError::Parse(e.to_string()))?;
        Ok(pr.links.html.href)
    }
}

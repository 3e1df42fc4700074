//! Jira Issue Tracker
//!
//! REST v3 client: labels and status reads, ADF comments.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{check_status, CollaboratorError, IssueTracker};
use crate::logic::notify::RichText;

const SERVICE: &str = "jira";

#[derive(Debug, Clone)]
pub struct JiraConfig {
    /// Site root, e.g. `https://team.atlassian.net`
    pub base_url: String,
    pub email: String,
    pub api_token: String,
    pub timeout_seconds: u64,
}

pub struct JiraClient {
    config: JiraConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    fields: IssueFields,
}

#[derive(Debug, Deserialize)]
struct IssueFields {
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    status: Option<IssueStatus>,
}

#[derive(Debug, Deserialize)]
struct IssueStatus {
    name: String,
}

impl JiraClient {
    pub fn new(config: JiraConfig) -> Result<Self, CollaboratorError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { config, http_client })
    }

    fn issue_url(&self, ticket_id: &str) -> String {
        format!(
            "{}/rest/api/3/issue/{}",
            self.config.base_url.trim_end_matches('/'),
            ticket_id
        )
    }

    async fn fetch_fields(&self, ticket_id: &str, fields: &str) -> Result<IssueFields, CollaboratorError> {
        let response = self
            .http_client
            .get(self.issue_url(ticket_id))
            .basic_auth(&self.config.email, Some(&self.config.api_token))
            .query(&[("fields", fields)])
            .header("Accept", "application/json")
            .send()
            .await?;

        let issue: IssueResponse = check_status(SERVICE, response)?
            .json()
            .await
            .map_err(|e| CollaboratorError::Parse(e.to_string()))?;
        Ok(issue.fields)
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn get_labels(&self, ticket_id: &str) -> Result<Vec<String>, CollaboratorError> {
        Ok(self.fetch_fields(ticket_id, "labels").await?.labels)
    }

    async fn get_status(&self, ticket_id: &str) -> Result<String, CollaboratorError> {
        self.fetch_fields(ticket_id, "status")
            .await?
            .status
            .map(|s| s.name)
            .ok_or_else(|| CollaboratorError::Parse(format!("{} has no status field", ticket_id)))
    }

    async fn post_comment(&self, ticket_id: &str, body: &RichText) -> Result<(), CollaboratorError> {
        let url = format!("{}/comment", self.issue_url(ticket_id));
        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.config.email, Some(&self.config.api_token))
            .json(&serde_json::json!({ "body": body.to_adf() }))
            .send()
            .await?;

        check_status(SERVICE, response)?;
        Ok(())
    }
}

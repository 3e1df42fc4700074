//! Confluence Document Store

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{check_status, CollaboratorError, DocumentStore};

const SERVICE: &str = "confluence";

#[derive(Debug, Clone)]
pub struct ConfluenceConfig {
    /// Site root, e.g. `https://team.atlassian.net`
    pub base_url: String,
    pub email: String,
    pub api_token: String,
    pub space_id: String,
    pub timeout_seconds: u64,
}

pub struct ConfluenceClient {
    config: ConfluenceConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    #[serde(rename = "_links")]
    links: PageLinks,
}

#[derive(Debug, Deserialize)]
struct PageLinks {
    #[serde(default)]
    base: Option<String>,
    webui: String,
}

impl ConfluenceClient {
    pub fn new(config: ConfluenceConfig) -> Result<Self, CollaboratorError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { config, http_client })
    }
}

#[async_trait]
impl DocumentStore for ConfluenceClient {
    async fn create_page(&self, title: &str, html_body: &str) -> Result<String, CollaboratorError> {
        let base = self.config.base_url.trim_end_matches('/');
        let url = format!("{}/wiki/api/v2/pages", base);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.config.email, Some(&self.config.api_token))
            .json(&serde_json::json!({
                "spaceId": self.config.space_id,
                "status": "current",
                "title": title,
                "body": { "representation": "storage", "value": html_body }
            }))
            .send()
            .await?;

        let page: PageResponse = check_status(SERVICE, response)?
            .json()
            .await
            .map_err(|e| CollaboratorError::Parse(e.to_string()))?;

        let root = page.links.base.unwrap_or_else(|| format!("{}/wiki", base));
        Ok(format!("{}{}", root, page.links.webui))
    }
}

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{self, env_opt};
use crate::logic::collaborators::confluence::ConfluenceConfig;
use crate::logic::collaborators::jira::JiraConfig;
use crate::logic::collaborators::openai::OpenAiConfig;

// Safety Configuration (Kill-switches)
// Default state: all stages enabled
#[derive(Debug)]
pub struct SafetyConfig {
    auto_fix: AtomicBool,
    learning: AtomicBool,
    language_model: AtomicBool,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            auto_fix: AtomicBool::new(true),
            learning: AtomicBool::new(true),
            language_model: AtomicBool::new(true),
        }
    }
}

impl SafetyConfig {
    pub fn is_auto_fix_enabled(&self) -> bool {
        self.auto_fix.load(Ordering::Relaxed)
    }

    pub fn is_learning_enabled(&self) -> bool {
        self.learning.load(Ordering::Relaxed)
    }

    pub fn is_language_model_enabled(&self) -> bool {
        self.language_model.load(Ordering::Relaxed)
    }

    // Setters (operator panel or panic handler)
    pub fn set_auto_fix(&self, val: bool) { self.auto_fix.store(val, Ordering::Relaxed); }
    pub fn set_learning(&self, val: bool) { self.learning.store(val, Ordering::Relaxed); }
    pub fn set_language_model(&self, val: bool) { self.language_model.store(val, Ordering::Relaxed); }

    /// Apply the switches present in `update`, leaving the rest as they are
    pub fn apply(&self, update: &SafetyUpdate) -> SafetyStatus {
        if let Some(val) = update.auto_fix {
            self.set_auto_fix(val);
        }
        if let Some(val) = update.learning {
            self.set_learning(val);
        }
        if let Some(val) = update.language_model {
            self.set_language_model(val);
        }
        self.status()
    }

    pub fn status(&self) -> SafetyStatus {
        SafetyStatus {
            auto_fix: self.is_auto_fix_enabled(),
            learning: self.is_learning_enabled(),
            language_model: self.is_language_model_enabled(),
        }
    }
}

/// Partial kill-switch change from the operator
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SafetyUpdate {
    pub auto_fix: Option<bool>,
    pub learning: Option<bool>,
    pub language_model: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SafetyStatus {
    pub auto_fix: bool,
    pub learning: bool,
    pub language_model: bool,
}

/// Pipeline settings resolved from the environment
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub window_size: usize,
    pub model_path: Option<PathBuf>,
    pub collaborator_timeout: Duration,
    pub poll_interval: Duration,
    pub credential_secret: String,
    /// Source-control repository as `workspace/slug`
    pub repository: String,
    pub done_status: String,
    pub jira: Option<JiraConfig>,
    pub confluence: Option<ConfluenceConfig>,
    pub openai: Option<OpenAiConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: constants::get_data_dir(),
            window_size: constants::DEFAULT_WINDOW_SIZE,
            model_path: None,
            collaborator_timeout: Duration::from_secs(constants::DEFAULT_COLLABORATOR_TIMEOUT),
            poll_interval: Duration::from_millis(constants::DEFAULT_POLL_INTERVAL_MS),
            credential_secret: constants::DEFAULT_CREDENTIAL_SECRET.to_string(),
            repository: "pitwall/engineering-specs".to_string(),
            done_status: constants::DEFAULT_DONE_STATUS.to_string(),
            jira: None,
            confluence: None,
            openai: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let timeout = constants::get_collaborator_timeout();
        let timeout_seconds = timeout.as_secs().max(1);

        let poll_interval = env_opt("PITWALL_POLL_INTERVAL_MS")
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or_else(|| Duration::from_millis(constants::DEFAULT_POLL_INTERVAL_MS));

        let repository = match (env_opt("BITBUCKET_WORKSPACE"), env_opt("BITBUCKET_REPO_SLUG")) {
            (Some(ws), Some(slug)) => format!("{}/{}", ws, slug),
            _ => Self::default().repository,
        };

        // Jira and Confluence share the Atlassian site and account
        let atlassian = match (
            env_opt("JIRA_BASE_URL"),
            env_opt("JIRA_EMAIL"),
            env_opt("JIRA_API_TOKEN"),
        ) {
            (Some(url), Some(email), Some(token)) => Some((url, email, token)),
            _ => None,
        };

        let jira = atlassian.clone().map(|(base_url, email, api_token)| JiraConfig {
            base_url,
            email,
            api_token,
            timeout_seconds,
        });

        let confluence = match (atlassian, env_opt("CONFLUENCE_SPACE_ID")) {
            (Some((url, email, token)), Some(space_id)) => Some(ConfluenceConfig {
                base_url: env_opt("CONFLUENCE_BASE_URL").unwrap_or(url),
                email,
                api_token: token,
                space_id,
                timeout_seconds,
            }),
            _ => None,
        };

        let openai = env_opt("OPENAI_API_KEY").map(|api_key| OpenAiConfig {
            api_key,
            model: env_opt("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
            base_url: env_opt("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            timeout_seconds,
        });

        Self {
            data_dir: constants::get_data_dir(),
            window_size: constants::get_window_size(),
            model_path: constants::get_model_path(),
            collaborator_timeout: timeout,
            poll_interval,
            credential_secret: constants::get_credential_secret(),
            repository,
            done_status: env_opt("PITWALL_DONE_STATUS")
                .unwrap_or_else(|| constants::DEFAULT_DONE_STATUS.to_string()),
            jira,
            confluence,
            openai,
        }
    }

    /// True when every external collaborator has real settings
    pub fn is_online(&self) -> bool {
        self.jira.is_some() && self.confluence.is_some()
    }
}

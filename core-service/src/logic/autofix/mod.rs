//! Autonomous Fix Deployer
//!
//! Approved spec -> branch -> committed artifact -> merge request.
//! Each step can fail independently; the first failure aborts the deploy.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::constants::{DEFAULT_BRANCH, SOURCE_CONTROL_TOKEN};
use crate::logic::collaborators::{with_timeout, CollaboratorError, SourceControl};
use crate::logic::incident::FinalSpec;
use crate::logic::storage::{CredentialError, CredentialStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStep {
    ResolveHead,
    CreateBranch,
    CommitArtifact,
    OpenMergeRequest,
}

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("no source-control credential stored")]
    NoCredential,

    #[error("credential store: {0}")]
    Credentials(#[from] CredentialError),

    #[error("artifact serialization: {0}")]
    Artifact(#[from] serde_json::Error),

    #[error("{step:?} failed: {source}")]
    Step {
        step: DeployStep,
        #[source]
        source: CollaboratorError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deployment {
    pub branch: String,
    pub artifact_path: String,
    pub pr_link: String,
}

/// Branch name unique per ticket and millisecond
pub fn branch_name(ticket_id: &str, at: DateTime<Utc>) -> String {
    format!("fix/{}-compliance-{}", ticket_id, at.format("%Y%m%d%H%M%S%3f"))
}

pub fn artifact_path(ticket_id: &str) -> String {
    format!("engineering-specs/{}-tuned.json", ticket_id)
}

pub struct FixDeployer {
    scm: Arc<dyn SourceControl>,
    credentials: Arc<dyn CredentialStore>,
    repository: String,
    timeout: Duration,
}

impl FixDeployer {
    pub fn new(
        scm: Arc<dyn SourceControl>,
        credentials: Arc<dyn CredentialStore>,
        repository: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            scm,
            credentials,
            repository: repository.to_string(),
            timeout,
        }
    }

    pub async fn deploy(&self, ticket_id: &str, spec: &FinalSpec) -> Result<Deployment, DeployError> {
        // Fail closed without a credential
        if self.credentials.get(SOURCE_CONTROL_TOKEN)?.is_none() {
            return Err(DeployError::NoCredential);
        }

        let repo = self.repository.as_str();
        let head = with_timeout(self.timeout, self.scm.default_branch_head(repo))
            .await
            .map_err(|source| DeployError::Step { step: DeployStep::ResolveHead, source })?;

        let branch = branch_name(ticket_id, Utc::now());
        with_timeout(self.timeout, self.scm.create_branch(repo, &branch, &head))
            .await
            .map_err(|source| DeployError::Step { step: DeployStep::CreateBranch, source })?;

        let path = artifact_path(ticket_id);
        let content = serde_json::to_string_pretty(&spec.to_artifact_json())?;
        let message = format!("feat: Compliance Auto-Fix for {}", ticket_id);
        with_timeout(self.timeout, self.scm.commit_file(repo, &branch, &path, &content, &message))
            .await
            .map_err(|source| DeployError::Step { step: DeployStep::CommitArtifact, source })?;

        let title = format!("Compliance Fix: {}", ticket_id);
        let description = format!(
            "**Autonomous Compliance Fix**\n\nAdjusted based on FIA Regulations.\n\nCloses {}",
            ticket_id
        );
        let pr_link = with_timeout(
            self.timeout,
            self.scm.open_merge_request(repo, &branch, DEFAULT_BRANCH, &title, &description),
        )
        .await
        .map_err(|source| DeployError::Step { step: DeployStep::OpenMergeRequest, source })?;

        log::info!("[{}] Fix deployed on {}: {}", ticket_id, branch, pr_link);
        Ok(Deployment {
            branch,
            artifact_path: path,
            pr_link,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::collaborators::fake::FakeSourceControl;
    use crate::logic::storage::{EncryptedCredentialStore, MemoryStore, StateStore};

    fn deployer(scm: Arc<FakeSourceControl>, with_token: bool) -> FixDeployer {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let vault = Arc::new(EncryptedCredentialStore::new(store, "test-secret"));
        if with_token {
            vault.set(SOURCE_CONTROL_TOKEN, "token").unwrap();
        }
        FixDeployer::new(scm, vault, "team/specs", Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_full_deploy() {
        let scm = Arc::new(FakeSourceControl::default());
        let deployment = deployer(scm.clone(), true)
            .deploy("KAN-1", &FinalSpec::new(8.0, 480.0))
            .await
            .unwrap();

        assert!(deployment.branch.starts_with("fix/KAN-1-compliance-"));
        assert_eq!(deployment.artifact_path, "engineering-specs/KAN-1-tuned.json");
        assert_eq!(
            scm.calls(),
            vec!["default_branch_head", "create_branch", "commit_file", "open_merge_request"]
        );

        let commit = &scm.commits()[0];
        assert_eq!(commit.message, "feat: Compliance Auto-Fix for KAN-1");
        assert!(commit.content.contains("\"8.0mm\""));

        let request = &scm.requests()[0];
        assert_eq!(request.target, "main");
        assert!(request.description.contains("Closes KAN-1"));
    }

    #[tokio::test]
    async fn test_no_credential_fails_closed() {
        let scm = Arc::new(FakeSourceControl::default());
        let d = deployer(scm.clone(), false);

        assert!(matches!(d.deploy("KAN-1", &FinalSpec::new(6.0, 360.0)).await, Err(DeployError::NoCredential)));
        assert!(scm.calls().is_empty());
    }

    #[tokio::test]
    async fn test_step_failure_aborts() {
        let scm = Arc::new(FakeSourceControl::default());
        scm.fail_at(Some("commit_file"));
        let d = deployer(scm.clone(), true);

        let err = d.deploy("KAN-1", &FinalSpec::new(6.0, 360.0)).await.unwrap_err();
        assert!(matches!(err, DeployError::Step { step: DeployStep::CommitArtifact, .. }));
        assert!(!scm.calls().contains(&"open_merge_request"));
    }

    #[test]
    fn test_branch_names_differ_over_time() {
        let a = branch_name("KAN-1", Utc::now());
        let b = branch_name("KAN-1", Utc::now() + chrono::Duration::milliseconds(5));
        assert_ne!(a, b);
    }
}

//! IAM Policy Provisioner service layer
//!
//! Runs the whole flow for one invocation: make sure the AWS CLI is installed,
//! then turn the configured template into a managed IAM policy. Steps run
//! strictly in order and the first failure aborts the run.

use std::sync::Arc;

use crate::config::{EnvironmentSource, ParameterSource, ProvisionerConfig};
use crate::error::ProvisionerResult;
use crate::installer::{InstallOutcome, InstallerGuard};
use crate::policy::{AwsIamPolicyBackend, CreatedPolicy, PolicySubmitter};

/// What a completed run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The user declined to install the AWS CLI; nothing else ran.
    Cancelled,
    /// Dry run: the resolved document, not submitted.
    Resolved(String),
    Created(CreatedPolicy),
}

/// Main service struct that owns the configuration and both components.
pub struct Provisioner {
    config: ProvisionerConfig,
    guard: InstallerGuard,
    submitter: PolicySubmitter,
}

impl Provisioner {
    /// Provisioner wired to the real terminal, network, installer and
    /// process environment.
    pub fn new(config: ProvisionerConfig) -> Self {
        let guard = InstallerGuard::system(config.installer.clone(), config.artifact_path());
        let parameters: Arc<dyn ParameterSource> = Arc::new(EnvironmentSource);
        let submitter = PolicySubmitter::new(
            config.base_dir.clone(),
            parameters,
            Box::new(AwsIamPolicyBackend::new()),
        );
        Self::with_components(config, guard, submitter)
    }

    pub fn with_components(
        config: ProvisionerConfig,
        guard: InstallerGuard,
        submitter: PolicySubmitter,
    ) -> Self {
        Self {
            config,
            guard,
            submitter,
        }
    }

    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    pub async fn run(&self) -> ProvisionerResult<RunOutcome> {
        if self.config.skip_install_check {
            log::debug!("Skipping installer check");
        } else if self.guard.ensure_installed().await? == InstallOutcome::Cancelled {
            return Ok(RunOutcome::Cancelled);
        }

        let request = &self.config.request;
        let document = self.submitter.prepare(request).await?;

        if self.config.dry_run {
            log::debug!("Dry run, not submitting policy '{}'", request.name());
            return Ok(RunOutcome::Resolved(document));
        }

        let created = self.submitter.submit(&document, request).await?;
        Ok(RunOutcome::Created(created))
    }
}

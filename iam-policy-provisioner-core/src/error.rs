//! Error types for the provisioning flow.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort the provisioning flow.
///
/// A declined install prompt is not represented here; see
/// [`InstallOutcome::Cancelled`](crate::InstallOutcome::Cancelled).
#[derive(Debug, Error)]
pub enum ProvisionerError {
    /// The installer package could not be downloaded.
    #[error("Failed to download installer from {url}: {message}")]
    InstallerDownloadFailed { url: String, message: String },

    /// The native package installer failed to start or exited unsuccessfully.
    #[error("Failed to run installer: {0}")]
    InstallerRunFailed(String),

    /// The template path does not exist.
    #[error("JSON file is not valid")]
    TemplateNotFound { path: PathBuf },

    /// The template exists but reading it failed.
    #[error("JSON file is not valid")]
    TemplateUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The resolved document is not well-formed JSON.
    #[error("Policy document is not valid JSON: {0}")]
    InvalidDocument(String),

    /// Region or account id is missing from the environment.
    #[error("AWS region & accountId is not found")]
    MissingParameters,

    /// Access key id or secret access key is missing from the environment.
    #[error("AWS credential is not found")]
    MissingCredentials,

    /// IAM rejected or could not process the create-policy request.
    #[error("{message}")]
    PolicySubmissionFailed {
        message: String,
        code: Option<String>,
    },

    /// The policy request is malformed.
    #[error("Invalid policy request: {0}")]
    InvalidRequest(String),

    /// Terminal or filesystem I/O outside of template loading.
    #[error("Failed to {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProvisionerError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn download(url: &str, message: impl std::fmt::Display) -> Self {
        Self::InstallerDownloadFailed {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    /// Whether this error stems from a missing environment value.
    pub fn is_missing_environment(&self) -> bool {
        matches!(self, Self::MissingParameters | Self::MissingCredentials)
    }
}

/// Result type for provisioning operations.
pub type ProvisionerResult<T> = Result<T, ProvisionerError>;

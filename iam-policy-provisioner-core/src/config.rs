//! Configuration for a provisioning run.
//!
//! Everything the flow needs is assembled once into a [`ProvisionerConfig`].
//! Values that come from the process environment (region, account id and
//! credentials) are read through a [`ParameterSource`] at the moment they are
//! needed, so tests can supply fixed values without touching the real
//! environment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{ProvisionerError, ProvisionerResult};

pub const ENV_REGION: &str = "AWS_REGION";
pub const ENV_ACCOUNT_ID: &str = "AWS_ACCOUNT_ID";
pub const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const ENV_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";

/// Default location of the AWS CLI v2 macOS package.
pub const DEFAULT_INSTALLER_URL: &str = "https://awscli.amazonaws.com/AWSCLIV2.pkg";
pub const DEFAULT_BINARY: &str = "aws";
pub const DEFAULT_ARTIFACT_NAME: &str = "installer.pkg";

/// Lookup of named configuration values.
pub trait ParameterSource: Send + Sync {
    /// Returns the raw value for `key`, if set.
    fn get(&self, key: &str) -> Option<String>;

    /// Returns the value for `key` when it is set and non-empty.
    fn require(&self, key: &str) -> Option<String> {
        self.get(key).filter(|value| !value.is_empty())
    }
}

/// Reads values from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentSource;

impl ParameterSource for EnvironmentSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Fixed set of values, independent of the process environment.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    values: HashMap<String, String>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl ParameterSource for StaticSource {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// The two values substituted into a policy template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateParameters {
    pub region: String,
    pub account_id: String,
}

impl TemplateParameters {
    /// Both values must be present; a missing one fails the whole lookup.
    pub fn resolve(source: &dyn ParameterSource) -> ProvisionerResult<Self> {
        match (source.require(ENV_REGION), source.require(ENV_ACCOUNT_ID)) {
            (Some(region), Some(account_id)) => Ok(Self { region, account_id }),
            _ => Err(ProvisionerError::MissingParameters),
        }
    }
}

/// Static AWS credentials taken from the environment.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub region: Option<String>,
}

impl Credentials {
    pub fn resolve(source: &dyn ParameterSource) -> ProvisionerResult<Self> {
        let (Some(access_key_id), Some(secret_access_key)) = (
            source.require(ENV_ACCESS_KEY_ID),
            source.require(ENV_SECRET_ACCESS_KEY),
        ) else {
            return Err(ProvisionerError::MissingCredentials);
        };

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token: source.require(ENV_SESSION_TOKEN),
            region: source.require(ENV_REGION),
        })
    }
}

// Keep secrets out of debug logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &self.session_token.as_ref().map(|_| "** redacted **"))
            .field("region", &self.region)
            .finish()
    }
}

/// The policy to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRequest {
    name: String,
    description: Option<String>,
    template_path: PathBuf,
}

impl PolicyRequest {
    /// Builds a request, rejecting an empty policy name.
    ///
    /// An empty description is treated as absent.
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        template_path: impl Into<PathBuf>,
    ) -> ProvisionerResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ProvisionerError::InvalidRequest(
                "policy name must not be empty".to_string(),
            ));
        }

        Ok(Self {
            name,
            description: description.filter(|d| !d.is_empty()),
            template_path: template_path.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }
}

/// Settings for the AWS CLI installer guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerSettings {
    /// Binary that must resolve on `PATH`.
    pub binary: String,
    pub url: String,
    /// File name of the downloaded package inside the base directory.
    pub artifact_name: String,
    /// Skip the confirmation prompt.
    pub auto_approve: bool,
}

impl Default for InstallerSettings {
    fn default() -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            url: DEFAULT_INSTALLER_URL.to_string(),
            artifact_name: DEFAULT_ARTIFACT_NAME.to_string(),
            auto_approve: false,
        }
    }
}

/// Complete configuration of one provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
    pub request: PolicyRequest,
    /// Directory that relative template paths and the installer artifact live in.
    pub base_dir: PathBuf,
    pub installer: InstallerSettings,
    pub skip_install_check: bool,
    /// Resolve the document but do not send it.
    pub dry_run: bool,
}

impl ProvisionerConfig {
    pub fn new(request: PolicyRequest, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            request,
            base_dir: base_dir.into(),
            installer: InstallerSettings::default(),
            skip_install_check: false,
            dry_run: false,
        }
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.base_dir.join(&self.installer.artifact_name)
    }
}

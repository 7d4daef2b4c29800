//! This crate provides the core logic for IAM Policy Provisioner:
//! - AWS CLI presence check with an interactive install fallback
//! - Policy template loading and `${Region}` / `${AccountId}` substitution
//! - Managed policy creation through the AWS IAM API
//!

pub mod config;
mod error;
pub mod installer;
pub mod policy;
mod service;

// Re-exports for a small, focused public API
pub use config::{
    Credentials, EnvironmentSource, InstallerSettings, ParameterSource, PolicyRequest,
    ProvisionerConfig, StaticSource, TemplateParameters,
};
pub use error::{ProvisionerError, ProvisionerResult};
pub use installer::{InstallOutcome, InstallerGuard};
pub use policy::{CreatedPolicy, PolicySubmitter};
pub use service::{Provisioner, RunOutcome};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolving_sample_document() {
        let template = r#"{"Sid":"x","Resource":"arn:aws:s3:::bucket-${AccountId}","Region":"${Region}"}"#;
        let params = TemplateParameters {
            region: "us-east-1".into(),
            account_id: "12345".into(),
        };
        assert_eq!(
            policy::substitute(template, &params),
            r#"{"Sid":"x","Resource":"arn:aws:s3:::bucket-12345","Region":"us-east-1"}"#
        );
    }
}

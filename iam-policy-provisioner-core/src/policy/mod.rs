//! Policy submission: template → resolved document → IAM `CreatePolicy`.

pub(crate) mod iam_client;
pub(crate) mod template;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{Credentials, ParameterSource, PolicyRequest, TemplateParameters};
use crate::error::ProvisionerResult;

pub use iam_client::{AwsIamPolicyBackend, CreatePolicyInput, CreatedPolicy, PolicyBackend};
pub use template::{substitute, validate_document, ACCOUNT_ID_PLACEHOLDER, REGION_PLACEHOLDER};

pub struct PolicySubmitter {
    base_dir: PathBuf,
    parameters: Arc<dyn ParameterSource>,
    backend: Box<dyn PolicyBackend>,
}

impl PolicySubmitter {
    pub fn new(
        base_dir: impl Into<PathBuf>,
        parameters: Arc<dyn ParameterSource>,
        backend: Box<dyn PolicyBackend>,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            parameters,
            backend,
        }
    }

    /// Read the template at `path`, relative to the base directory.
    pub async fn load_template(&self, path: &Path) -> ProvisionerResult<String> {
        template::load_template(&self.base_dir, path).await
    }

    /// Substitute region and account id into `template`.
    ///
    /// Both values are looked up before any text is touched.
    pub fn resolve_parameters(&self, template: &str) -> ProvisionerResult<String> {
        let parameters = TemplateParameters::resolve(self.parameters.as_ref())?;
        Ok(substitute(template, &parameters))
    }

    /// Load, resolve and validate the document for `request`.
    pub async fn prepare(&self, request: &PolicyRequest) -> ProvisionerResult<String> {
        let template = self.load_template(request.template_path()).await?;
        let document = self.resolve_parameters(&template)?;
        validate_document(&document)?;
        Ok(document)
    }

    /// Send `document` to IAM as a new managed policy.
    ///
    /// Credentials are checked before anything is sent.
    pub async fn submit(
        &self,
        document: &str,
        request: &PolicyRequest,
    ) -> ProvisionerResult<CreatedPolicy> {
        let credentials = Credentials::resolve(self.parameters.as_ref())?;
        log::debug!("Submitting policy '{}' with {credentials:?}", request.name());

        let input = CreatePolicyInput {
            policy_name: request.name().to_string(),
            description: request.description().map(str::to_string),
            policy_document: document.to_string(),
        };
        let created = self.backend.create_policy(&credentials, &input).await?;

        log::info!(
            "Created policy '{}' ({})",
            created.policy_name,
            created.arn.as_deref().unwrap_or("unknown ARN")
        );
        Ok(created)
    }

    /// [`prepare`](Self::prepare) followed by [`submit`](Self::submit).
    pub async fn create(&self, request: &PolicyRequest) -> ProvisionerResult<CreatedPolicy> {
        let document = self.prepare(request).await?;
        self.submit(&document, request).await
    }
}

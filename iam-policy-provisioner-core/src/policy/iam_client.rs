//! AWS IAM client wrapper for managed policy creation

use async_trait::async_trait;
use aws_sdk_iam::config::Region;
use aws_sdk_iam::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_iam::Client as IamClient;

use crate::config::Credentials;
use crate::error::{ProvisionerError, ProvisionerResult};

/// IAM is global; any commercial region reaches it.
pub const DEFAULT_IAM_REGION: &str = "us-east-1";

const CREDENTIALS_PROVIDER_NAME: &str = "iam-policy-provisioner";

/// A create-policy call as sent to IAM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePolicyInput {
    pub policy_name: String,
    pub description: Option<String>,
    pub policy_document: String,
}

/// The managed policy IAM created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPolicy {
    pub policy_name: String,
    pub arn: Option<String>,
    pub policy_id: Option<String>,
}

/// Remote service that creates managed policies.
#[async_trait]
pub trait PolicyBackend: Send + Sync {
    async fn create_policy(
        &self,
        credentials: &Credentials,
        input: &CreatePolicyInput,
    ) -> ProvisionerResult<CreatedPolicy>;
}

/// [`PolicyBackend`] backed by the AWS SDK.
///
/// A client is built per call from the supplied static credentials, so nothing
/// from the default credential chain leaks in.
#[derive(Debug, Clone, Default)]
pub struct AwsIamPolicyBackend {
    endpoint_url: Option<String>,
}

impl AwsIamPolicyBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send requests to `url` instead of the regional IAM endpoint.
    pub fn with_endpoint_url(url: impl Into<String>) -> Self {
        Self {
            endpoint_url: Some(url.into()),
        }
    }

    async fn client(&self, credentials: &Credentials) -> IamClient {
        let provider = aws_credential_types::Credentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            credentials.session_token.clone(),
            None,
            CREDENTIALS_PROVIDER_NAME,
        );
        let region = credentials
            .region
            .clone()
            .unwrap_or_else(|| DEFAULT_IAM_REGION.to_string());

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region))
            .credentials_provider(provider);
        if let Some(url) = &self.endpoint_url {
            loader = loader.endpoint_url(url);
        }
        let config = loader.load().await;

        IamClient::new(&config)
    }
}

#[async_trait]
impl PolicyBackend for AwsIamPolicyBackend {
    async fn create_policy(
        &self,
        credentials: &Credentials,
        input: &CreatePolicyInput,
    ) -> ProvisionerResult<CreatedPolicy> {
        let client = self.client(credentials).await;

        let output = client
            .create_policy()
            .policy_name(&input.policy_name)
            .set_description(input.description.clone())
            .policy_document(&input.policy_document)
            .send()
            .await
            .map_err(|e| {
                let code = e.code().map(str::to_string);
                let message = match (e.code(), e.message()) {
                    (Some(code), Some(message)) => format!("{code}: {message}"),
                    _ => DisplayErrorContext(&e).to_string(),
                };
                log::debug!("CreatePolicy failed: {e:?}");
                ProvisionerError::PolicySubmissionFailed { message, code }
            })?;

        let policy = output.policy();
        Ok(CreatedPolicy {
            policy_name: input.policy_name.clone(),
            arn: policy.and_then(|p| p.arn()).map(str::to_string),
            policy_id: policy.and_then(|p| p.policy_id()).map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const IAM_XMLNS: &str = "https://iam.amazonaws.com/doc/2010-05-08/";

    fn credentials() -> Credentials {
        Credentials {
            access_key_id: "AKIDEXAMPLE".into(),
            secret_access_key: "secret".into(),
            session_token: None,
            region: Some("us-east-1".into()),
        }
    }

    fn input() -> CreatePolicyInput {
        CreatePolicyInput {
            policy_name: "deploy".into(),
            description: Some("test".into()),
            policy_document: r#"{"Version":"2012-10-17","Statement":[]}"#.into(),
        }
    }

    async fn iam_server(status: u16, body: String) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("Action=CreatePolicy"))
            .and(body_string_contains("PolicyName=deploy"))
            .respond_with(
                ResponseTemplate::new(status).set_body_raw(body.into_bytes(), "text/xml"),
            )
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_create_policy_returns_arn_and_id() {
        let body = format!(
            r#"<CreatePolicyResponse xmlns="{IAM_XMLNS}">
  <CreatePolicyResult>
    <Policy>
      <PolicyName>deploy</PolicyName>
      <Arn>arn:aws:iam::123456789012:policy/deploy</Arn>
      <PolicyId>ANPAEXAMPLE</PolicyId>
      <Path>/</Path>
    </Policy>
  </CreatePolicyResult>
  <ResponseMetadata>
    <RequestId>7a62c49f-347e-4fc4-9331-6e8eEXAMPLE</RequestId>
  </ResponseMetadata>
</CreatePolicyResponse>"#
        );
        let server = iam_server(200, body).await;

        let created = AwsIamPolicyBackend::with_endpoint_url(server.uri())
            .create_policy(&credentials(), &input())
            .await
            .unwrap();

        assert_eq!(created.policy_name, "deploy");
        assert_eq!(
            created.arn.as_deref(),
            Some("arn:aws:iam::123456789012:policy/deploy")
        );
        assert_eq!(created.policy_id.as_deref(), Some("ANPAEXAMPLE"));
    }

    #[tokio::test]
    async fn test_service_error_is_flattened_with_code() {
        let body = format!(
            r#"<ErrorResponse xmlns="{IAM_XMLNS}">
  <Error>
    <Type>Sender</Type>
    <Code>EntityAlreadyExists</Code>
    <Message>A policy called deploy already exists. Duplicate names are not allowed.</Message>
  </Error>
  <RequestId>7a62c49f-347e-4fc4-9331-6e8eEXAMPLE</RequestId>
</ErrorResponse>"#
        );
        let server = iam_server(409, body).await;

        let err = AwsIamPolicyBackend::with_endpoint_url(server.uri())
            .create_policy(&credentials(), &input())
            .await
            .unwrap_err();

        match err {
            ProvisionerError::PolicySubmissionFailed { message, code } => {
                assert_eq!(
                    message,
                    "EntityAlreadyExists: A policy called deploy already exists. \
                     Duplicate names are not allowed."
                );
                assert_eq!(code.as_deref(), Some("EntityAlreadyExists"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_client_uses_default_region_when_unset() {
        let credentials = Credentials {
            access_key_id: "AKIDEXAMPLE".into(),
            secret_access_key: "secret".into(),
            session_token: None,
            region: None,
        };
        let client = AwsIamPolicyBackend::new().client(&credentials).await;
        assert_eq!(
            client.config().region().map(|r| r.as_ref()),
            Some(DEFAULT_IAM_REGION)
        );

        let credentials = Credentials {
            region: Some("eu-central-1".into()),
            ..credentials
        };
        let client = AwsIamPolicyBackend::new().client(&credentials).await;
        assert_eq!(
            client.config().region().map(|r| r.as_ref()),
            Some("eu-central-1")
        );
    }
}

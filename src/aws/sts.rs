use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sts::Client as StsClient;
use aws_sdk_sts::error::DisplayErrorContext;
use tracing::{debug, info};

use super::{Credentials, IamRole};
use crate::constants::DEFAULT_AWS_REGION;
use crate::error::{Error, Result};

/// Exchanges a SAML assertion for temporary AWS credentials.
#[async_trait]
pub trait RoleAssumer {
    async fn assume_role_with_saml(
        &self,
        role: &IamRole,
        saml_assertion: &str,
        duration_seconds: i32,
    ) -> Result<Credentials>;
}

/// AssumeRoleWithSAML against AWS STS. The client carries no credentials: the SAML assertion
/// is the authentication.
#[derive(Debug, Clone)]
pub struct StsRoleAssumer {
    client: StsClient,
}

impl StsRoleAssumer {
    pub async fn new(region: Option<&str>) -> Self {
        let region = region.unwrap_or(DEFAULT_AWS_REGION).to_string();
        info!("Using region: {}", region);

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region))
            .no_credentials()
            .load()
            .await;

        Self {
            client: StsClient::new(&config),
        }
    }
}

#[async_trait]
impl RoleAssumer for StsRoleAssumer {
    async fn assume_role_with_saml(
        &self,
        role: &IamRole,
        saml_assertion: &str,
        duration_seconds: i32,
    ) -> Result<Credentials> {
        info!("Calling AWS STS AssumeRoleWithSAML");
        debug!("Role ARN: {}", role.role_arn);
        debug!("Principal ARN: {}", role.principal_arn);
        debug!("Duration: {} seconds", duration_seconds);

        let response = self
            .client
            .assume_role_with_saml()
            .role_arn(&role.role_arn)
            .principal_arn(&role.principal_arn)
            .saml_assertion(saml_assertion)
            .duration_seconds(duration_seconds)
            .send()
            .await
            .map_err(|e| Error::CredentialExchangeFailed(DisplayErrorContext(&e).to_string()))?;

        let sts_creds = response.credentials().ok_or_else(|| {
            Error::CredentialExchangeFailed("AWS STS returned no credentials".to_string())
        })?;

        let credentials = Credentials {
            access_key_id: sts_creds.access_key_id().to_string(),
            secret_access_key: sts_creds.secret_access_key().to_string(),
            session_token: sts_creds.session_token().to_string(),
            expiration: *sts_creds.expiration(),
        };

        info!("Successfully obtained AWS credentials");
        Ok(credentials)
    }
}

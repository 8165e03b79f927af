pub mod onelogin;

use async_trait::async_trait;

use crate::error::Result;

pub use self::onelogin::OneLoginClient;

/// Second-factor device registered with the identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MfaDevice {
    pub device_id: String,
    pub device_type: String,
}

/// Outcome of the initial SAML assertion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SamlExchangeResult {
    /// Base64 SAML assertion, no second factor required
    Success { saml: String },
    /// A second factor must be verified before the assertion is released
    PendingMfa {
        state_token: String,
        devices: Vec<MfaDevice>,
    },
}

/// Credentials submitted to obtain a SAML assertion
#[derive(Clone)]
pub struct SamlAssertionRequest {
    pub username: String,
    pub password: String,
    pub app_id: String,
    pub subdomain: String,
}

impl std::fmt::Debug for SamlAssertionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamlAssertionRequest")
            .field("username", &self.username)
            .field("password", &"***")
            .field("app_id", &self.app_id)
            .field("subdomain", &self.subdomain)
            .finish()
    }
}

/// One-time code submitted for a pending MFA challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyFactorRequest {
    pub app_id: String,
    pub device_id: String,
    pub state_token: String,
    pub otp_token: String,
}

/// Identity provider able to issue SAML assertions for an application.
#[async_trait]
pub trait SamlProvider {
    async fn generate_saml_assertion(
        &self,
        request: &SamlAssertionRequest,
    ) -> Result<SamlExchangeResult>;

    /// Returns the base64 SAML assertion once the factor is accepted.
    async fn verify_factor(&self, request: &VerifyFactorRequest) -> Result<String>;
}

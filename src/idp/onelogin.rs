use async_trait::async_trait;
use reqwest::{Client, header::AUTHORIZATION};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};
use url::Url;

use super::{
    MfaDevice, SamlAssertionRequest, SamlExchangeResult, SamlProvider, VerifyFactorRequest,
};
use crate::error::{Error, Result};

const TOKEN_PATH: &str = "auth/oauth2/v2/token";
const SAML_ASSERTION_PATH: &str = "api/1/saml_assertion";
const VERIFY_FACTOR_PATH: &str = "api/1/saml_assertion/verify_factor";

/// Status message OneLogin returns when the assertion is released without MFA
const SUCCESS_MESSAGE: &str = "Success";

// OneLogin API types (internal use only)

#[derive(Debug, Serialize)]
struct TokenRequest {
    grant_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: ApiStatus,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Serialize)]
struct SamlAssertionBody<'a> {
    username_or_email: &'a str,
    password: &'a str,
    app_id: &'a str,
    subdomain: &'a str,
}

#[derive(Debug, Serialize)]
struct VerifyFactorBody<'a> {
    app_id: &'a str,
    device_id: &'a str,
    state_token: &'a str,
    otp_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct MfaChallenge {
    state_token: String,
    #[serde(default)]
    devices: Vec<DeviceEntry>,
}

#[derive(Debug, Deserialize)]
struct DeviceEntry {
    device_id: DeviceId,
    device_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DeviceId {
    Number(u64),
    Text(String),
}

impl From<DeviceEntry> for MfaDevice {
    fn from(entry: DeviceEntry) -> Self {
        let device_id = match entry.device_id {
            DeviceId::Number(n) => n.to_string(),
            DeviceId::Text(s) => s,
        };
        Self {
            device_id,
            device_type: entry.device_type,
        }
    }
}

/// OneLogin REST API client. Authenticates with OAuth2 client credentials on first use.
pub struct OneLoginClient {
    http: Client,
    base: Url,
    client_id: String,
    client_secret: String,
    access_token: OnceCell<String>,
}

impl OneLoginClient {
    pub fn new(base_uri: &str, client_id: &str, client_secret: &str) -> Result<Self> {
        let mut base = Url::parse(base_uri)
            .map_err(|e| Error::InvalidBaseUri(format!("{base_uri}: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = Client::builder()
            .user_agent(concat!("onelogin-aws/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            access_token: OnceCell::new(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| Error::InvalidBaseUri(format!("{}: {e}", self.base)))
    }

    async fn access_token(&self) -> Result<&str> {
        self.access_token
            .get_or_try_init(|| self.request_access_token())
            .await
            .map(String::as_str)
    }

    #[instrument(skip(self))]
    async fn request_access_token(&self) -> Result<String> {
        debug!("Requesting OneLogin API access token");
        let response = self
            .http
            .post(self.endpoint(TOKEN_PATH)?)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .json(&TokenRequest {
                grant_type: "client_credentials",
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::AuthenticationFailed(format!(
                "could not obtain API access token (HTTP {status}): {}",
                failure_message(&body)
            )));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<ApiResponse> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(self.endpoint(path)?)
            .header(AUTHORIZATION, format!("bearer:{token}"))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        match serde_json::from_str::<ApiResponse>(&text) {
            Ok(api) if status.is_success() && !api.status.error => Ok(api),
            Ok(api) => Err(Error::AuthenticationFailed(api.status.message)),
            Err(_) => Err(Error::AuthenticationFailed(format!(
                "unexpected response (HTTP {status}): {}",
                failure_message(&text)
            ))),
        }
    }
}

fn failure_message(body: &str) -> String {
    serde_json::from_str::<ApiResponse>(body)
        .map(|api| api.status.message)
        .unwrap_or_else(|_| body.chars().take(200).collect())
}

fn decode<T: DeserializeOwned>(data: Value, what: &str) -> Result<T> {
    serde_json::from_value(data)
        .map_err(|e| Error::AuthenticationFailed(format!("malformed {what}: {e}")))
}

#[async_trait]
impl SamlProvider for OneLoginClient {
    #[instrument(skip_all, fields(username = %request.username, app_id = %request.app_id))]
    async fn generate_saml_assertion(
        &self,
        request: &SamlAssertionRequest,
    ) -> Result<SamlExchangeResult> {
        info!("Requesting SAML assertion");
        let api = self
            .post(
                SAML_ASSERTION_PATH,
                &SamlAssertionBody {
                    username_or_email: &request.username,
                    password: &request.password,
                    app_id: &request.app_id,
                    subdomain: &request.subdomain,
                },
            )
            .await?;

        if api.status.message == SUCCESS_MESSAGE {
            let saml: String = decode(api.data, "SAML assertion")?;
            return Ok(SamlExchangeResult::Success { saml });
        }

        debug!("Provider requested MFA: {}", api.status.message);
        let challenges: Vec<MfaChallenge> = decode(api.data, "MFA challenge")?;
        let challenge = challenges.into_iter().next().ok_or_else(|| {
            Error::AuthenticationFailed(format!(
                "{} (no MFA challenge returned)",
                api.status.message
            ))
        })?;

        if challenge.devices.is_empty() {
            return Err(Error::AuthenticationFailed(
                "MFA is required but no devices are registered".to_string(),
            ));
        }

        Ok(SamlExchangeResult::PendingMfa {
            state_token: challenge.state_token,
            devices: challenge.devices.into_iter().map(MfaDevice::from).collect(),
        })
    }

    #[instrument(skip_all, fields(device_id = %request.device_id))]
    async fn verify_factor(&self, request: &VerifyFactorRequest) -> Result<String> {
        info!("Verifying MFA factor");
        let api = self
            .post(
                VERIFY_FACTOR_PATH,
                &VerifyFactorBody {
                    app_id: &request.app_id,
                    device_id: &request.device_id,
                    state_token: &request.state_token,
                    otp_token: &request.otp_token,
                },
            )
            .await?;

        decode(api.data, "SAML assertion")
    }
}

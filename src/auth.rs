//! SAML authentication with optional MFA, modelled as an explicit state machine.
//!
//! ```text
//! Authenticating -> Authenticated ------------------------------------------> Verified
//!                \-> MfaChallenged -> DeviceSelected -> OtpSubmitted -------> Verified
//! ```
//!
//! Any provider or prompt error moves the session to `Failed` and is returned to the caller.
//! Nothing is retried: a rejected OTP means the whole invocation starts over.

use std::mem;

use tracing::{debug, info, warn};

use crate::console::Console;
use crate::error::{Error, Result};
use crate::idp::{
    MfaDevice, SamlAssertionRequest, SamlExchangeResult, SamlProvider, VerifyFactorRequest,
};

const REQUESTING_SAML: &str = "Requesting SAML assertion";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Authenticating,
    Authenticated {
        saml: String,
    },
    MfaChallenged {
        state_token: String,
        devices: Vec<MfaDevice>,
    },
    DeviceSelected {
        state_token: String,
        device: MfaDevice,
    },
    OtpSubmitted {
        state_token: String,
        device: MfaDevice,
        otp: String,
    },
    Verified {
        saml: String,
    },
    Failed,
}

impl AuthState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Verified { .. } | Self::Failed)
    }
}

pub struct AuthSession<'a, P: ?Sized, C: ?Sized> {
    provider: &'a P,
    console: &'a C,
    request: SamlAssertionRequest,
    otp: Option<String>,
    preferred_device_id: Option<String>,
    state: AuthState,
}

impl<'a, P, C> AuthSession<'a, P, C>
where
    P: SamlProvider + ?Sized,
    C: Console + ?Sized,
{
    pub fn new(provider: &'a P, console: &'a C, request: SamlAssertionRequest) -> Self {
        Self {
            provider,
            console,
            request,
            otp: None,
            preferred_device_id: None,
            state: AuthState::Authenticating,
        }
    }

    /// One-time code supplied up front; skips the OTP prompt.
    pub fn with_otp(mut self, otp: Option<String>) -> Self {
        self.otp = otp.filter(|otp| !otp.is_empty());
        self
    }

    /// Device to use when the provider offers it.
    pub fn with_preferred_device(mut self, device_id: Option<String>) -> Self {
        self.preferred_device_id = device_id.filter(|id| !id.is_empty());
        self
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Perform one transition. On error the session is left in `Failed`.
    pub async fn step(&mut self) -> Result<()> {
        let current = mem::replace(&mut self.state, AuthState::Failed);
        self.state = self.transition(current).await?;
        Ok(())
    }

    /// Drive the session to `Verified` and return the base64 SAML assertion.
    pub async fn run(mut self) -> Result<String> {
        self.console.announce_start(REQUESTING_SAML);

        loop {
            if let AuthState::Verified { saml } = &mut self.state {
                self.console.announce_success(REQUESTING_SAML);
                return Ok(mem::take(saml));
            }

            if let Err(e) = self.step().await {
                self.console.announce_failure(REQUESTING_SAML);
                return Err(e);
            }
        }
    }

    async fn transition(&mut self, state: AuthState) -> Result<AuthState> {
        let next = match state {
            AuthState::Authenticating => {
                match self.provider.generate_saml_assertion(&self.request).await? {
                    SamlExchangeResult::Success { saml } => AuthState::Authenticated { saml },
                    SamlExchangeResult::PendingMfa {
                        state_token,
                        devices,
                    } => AuthState::MfaChallenged {
                        state_token,
                        devices,
                    },
                }
            }
            AuthState::Authenticated { saml } => AuthState::Verified { saml },
            AuthState::MfaChallenged {
                state_token,
                devices,
            } => AuthState::DeviceSelected {
                state_token,
                device: self.select_device(devices)?,
            },
            AuthState::DeviceSelected {
                state_token,
                device,
            } => {
                let otp = match self.otp.take() {
                    Some(otp) => otp,
                    None => self.console.prompt_text("OTP Token:")?,
                };
                AuthState::OtpSubmitted {
                    state_token,
                    device,
                    otp,
                }
            }
            AuthState::OtpSubmitted {
                state_token,
                device,
                otp,
            } => {
                let saml = self
                    .provider
                    .verify_factor(&VerifyFactorRequest {
                        app_id: self.request.app_id.clone(),
                        device_id: device.device_id,
                        state_token,
                        otp_token: otp,
                    })
                    .await?;
                info!("MFA verification succeeded");
                AuthState::Verified { saml }
            }
            verified @ AuthState::Verified { .. } => verified,
            AuthState::Failed => {
                return Err(Error::AuthenticationFailed(
                    "authentication session already failed".to_string(),
                ));
            }
        };

        debug!("Auth state: {}", state_name(&next));
        Ok(next)
    }

    fn select_device(&self, mut devices: Vec<MfaDevice>) -> Result<MfaDevice> {
        if let Some(id) = &self.preferred_device_id {
            if let Some(index) = devices.iter().position(|d| &d.device_id == id) {
                debug!("Using configured OTP device {}", id);
                return Ok(devices.swap_remove(index));
            }
            warn!("Configured OTP device {} was not offered", id);
        }

        match devices.len() {
            0 => Err(Error::AuthenticationFailed(
                "no MFA devices offered".to_string(),
            )),
            1 => Ok(devices.remove(0)),
            _ => {
                let items: Vec<String> = devices
                    .iter()
                    .map(|d| format!("[{}]: {}", d.device_id, d.device_type))
                    .collect();
                let index = self
                    .console
                    .prompt_choice("Select your OTP Device:", &items)?;
                if index >= devices.len() {
                    return Err(Error::AuthenticationFailed(
                        "no MFA device selected".to_string(),
                    ));
                }
                let device = devices.swap_remove(index);
                self.console
                    .announce_success(&format!("Select your OTP Device: {}", device.device_type));
                Ok(device)
            }
        }
    }
}

fn state_name(state: &AuthState) -> &'static str {
    match state {
        AuthState::Authenticating => "Authenticating",
        AuthState::Authenticated { .. } => "Authenticated",
        AuthState::MfaChallenged { .. } => "MfaChallenged",
        AuthState::DeviceSelected { .. } => "DeviceSelected",
        AuthState::OtpSubmitted { .. } => "OtpSubmitted",
        AuthState::Verified { .. } => "Verified",
        AuthState::Failed => "Failed",
    }
}

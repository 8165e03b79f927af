//! Test doubles for the login pipeline's collaborators.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use aws_smithy_types::DateTime;

use crate::aws::{Credentials, IamRole, RoleAssumer};
use crate::console::Console;
use crate::error::{Error, Result};
use crate::idp::{
    MfaDevice, SamlAssertionRequest, SamlExchangeResult, SamlProvider, VerifyFactorRequest,
};

pub fn device(id: &str, kind: &str) -> MfaDevice {
    MfaDevice {
        device_id: id.to_string(),
        device_type: kind.to_string(),
    }
}

/// Identity provider returning canned responses and recording every call.
pub struct FakeProvider {
    initial: std::result::Result<SamlExchangeResult, String>,
    verified: std::result::Result<String, String>,
    assertion_requests: Mutex<Vec<SamlAssertionRequest>>,
    verify_requests: Mutex<Vec<VerifyFactorRequest>>,
}

impl FakeProvider {
    pub fn success(saml: &str) -> Self {
        Self {
            initial: Ok(SamlExchangeResult::Success {
                saml: saml.to_string(),
            }),
            verified: Err("verify_factor not expected".to_string()),
            assertion_requests: Mutex::default(),
            verify_requests: Mutex::default(),
        }
    }

    pub fn mfa(state_token: &str, devices: Vec<MfaDevice>, saml: &str) -> Self {
        Self {
            initial: Ok(SamlExchangeResult::PendingMfa {
                state_token: state_token.to_string(),
                devices,
            }),
            verified: Ok(saml.to_string()),
            assertion_requests: Mutex::default(),
            verify_requests: Mutex::default(),
        }
    }

    pub fn rejecting(message: &str) -> Self {
        Self {
            initial: Err(message.to_string()),
            ..Self::success("")
        }
    }

    pub fn rejecting_otp(self, message: &str) -> Self {
        Self {
            verified: Err(message.to_string()),
            ..self
        }
    }

    pub fn assertion_calls(&self) -> usize {
        self.assertion_requests.lock().unwrap().len()
    }

    pub fn assertion_requests(&self) -> Vec<SamlAssertionRequest> {
        self.assertion_requests.lock().unwrap().clone()
    }

    pub fn verify_calls(&self) -> Vec<VerifyFactorRequest> {
        self.verify_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SamlProvider for FakeProvider {
    async fn generate_saml_assertion(
        &self,
        request: &SamlAssertionRequest,
    ) -> Result<SamlExchangeResult> {
        self.assertion_requests
            .lock()
            .unwrap()
            .push(request.clone());
        self.initial.clone().map_err(Error::AuthenticationFailed)
    }

    async fn verify_factor(&self, request: &VerifyFactorRequest) -> Result<String> {
        self.verify_requests.lock().unwrap().push(request.clone());
        self.verified.clone().map_err(Error::AuthenticationFailed)
    }
}

/// STS stand-in returning fixed credentials.
#[derive(Default)]
pub struct FakeAssumer {
    fail_with: Option<String>,
    calls: Mutex<Vec<(IamRole, String, i32)>>,
}

impl FakeAssumer {
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            calls: Mutex::default(),
        }
    }

    pub fn calls(&self) -> Vec<(IamRole, String, i32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RoleAssumer for FakeAssumer {
    async fn assume_role_with_saml(
        &self,
        role: &IamRole,
        saml_assertion: &str,
        duration_seconds: i32,
    ) -> Result<Credentials> {
        self.calls.lock().unwrap().push((
            role.clone(),
            saml_assertion.to_string(),
            duration_seconds,
        ));

        if let Some(message) = &self.fail_with {
            return Err(Error::CredentialExchangeFailed(message.clone()));
        }

        Ok(Credentials {
            access_key_id: "ASIAFAKE".to_string(),
            secret_access_key: "fake/secret".to_string(),
            session_token: "fake-token==".to_string(),
            expiration: DateTime::from_secs(1_700_000_000),
        })
    }
}

/// Console answering prompts from queues and recording announcements.
#[derive(Default)]
pub struct ScriptedConsole {
    texts: Mutex<VecDeque<String>>,
    secrets: Mutex<VecDeque<String>>,
    choices: Mutex<VecDeque<usize>>,
    events: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedConsole {
    pub fn with_texts<const N: usize>(self, answers: [&str; N]) -> Self {
        self.texts
            .lock()
            .unwrap()
            .extend(answers.iter().map(|s| s.to_string()));
        self
    }

    pub fn with_secrets<const N: usize>(self, answers: [&str; N]) -> Self {
        self.secrets
            .lock()
            .unwrap()
            .extend(answers.iter().map(|s| s.to_string()));
        self
    }

    pub fn with_choices<const N: usize>(self, answers: [usize; N]) -> Self {
        self.choices.lock().unwrap().extend(answers);
        self
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn count(&self, kind: &str) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.starts_with(kind))
            .count()
    }

    pub fn texts_prompted(&self) -> usize {
        self.count("text:")
    }

    pub fn secrets_prompted(&self) -> usize {
        self.count("secret:")
    }

    pub fn choices_prompted(&self) -> usize {
        self.count("choice:")
    }

    fn answer<T>(&self, kind: &str, prompt: &str, queue: &Mutex<VecDeque<T>>) -> Result<T> {
        self.prompts
            .lock()
            .unwrap()
            .push(format!("{kind}: {prompt}"));
        queue
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Prompt(format!("no scripted answer for `{prompt}`")))
    }
}

impl Console for ScriptedConsole {
    fn announce_start(&self, message: &str) {
        self.events.lock().unwrap().push(format!("start: {message}"));
    }

    fn announce_success(&self, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("success: {message}"));
    }

    fn announce_failure(&self, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("failure: {message}"));
    }

    fn prompt_text(&self, prompt: &str) -> Result<String> {
        self.answer("text", prompt, &self.texts)
    }

    fn prompt_secret(&self, prompt: &str) -> Result<String> {
        self.answer("secret", prompt, &self.secrets)
    }

    fn prompt_choice(&self, prompt: &str, _items: &[String]) -> Result<usize> {
        self.answer("choice", prompt, &self.choices)
    }
}

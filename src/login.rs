use std::path::PathBuf;

use aws_smithy_types::{DateTime, date_time::Format};
use chrono::{Local, TimeZone, Utc};
use tracing::info;

use crate::auth::AuthSession;
use crate::aws::{IamRole, ProfileStore, RoleAssumer, roles};
use crate::config::EffectiveConfig;
use crate::console::Console;
use crate::error::Result;
use crate::idp::{SamlAssertionRequest, SamlProvider};
use crate::saml;

const SAVING_CREDENTIALS: &str = "Saving credentials";

/// What a successful login produced.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub profile: String,
    pub role: IamRole,
    pub expiration: DateTime,
    pub credentials_path: PathBuf,
}

impl LoginOutcome {
    /// Expiry in local time, e.g. `2024-05-01 9:30:00+02:00`
    pub fn expires_local(&self) -> String {
        match Utc.timestamp_opt(self.expiration.secs(), 0).single() {
            Some(utc) => utc
                .with_timezone(&Local)
                .format("%Y-%m-%d %-H:%M:%S%:z")
                .to_string(),
            None => self
                .expiration
                .fmt(Format::DateTime)
                .unwrap_or_else(|_| "unknown".to_string()),
        }
    }
}

/// Run the whole exchange: authenticate, pick a role, assume it and store the credentials.
pub async fn login<P, A, C>(
    config: &EffectiveConfig,
    provider: &P,
    assumer: &A,
    console: &C,
    store: &ProfileStore,
) -> Result<LoginOutcome>
where
    P: SamlProvider + ?Sized,
    A: RoleAssumer + ?Sized,
    C: Console + ?Sized,
{
    let username = match config.username() {
        Some(username) => username.to_string(),
        None => console.prompt_text("OneLogin Username:")?,
    };
    console.announce_success(&format!("OneLogin Username: {username}"));

    let password = match config.password() {
        Some(password) => password.to_string(),
        None => console.prompt_secret("OneLogin Password:")?,
    };
    console.announce_success("OneLogin Password: [input is masked]");

    let request = SamlAssertionRequest {
        username: username.clone(),
        password,
        app_id: config.aws_app_id().to_string(),
        subdomain: config.subdomain().to_string(),
    };
    let saml = AuthSession::new(provider, console, request)
        .with_otp(config.otp().map(str::to_string))
        .with_preferred_device(config.otp_device_id().map(str::to_string))
        .run()
        .await?;

    let candidates = saml::extract_roles(&saml)?;
    let (role, profile) = roles::select_role(
        candidates,
        config.role_arn(),
        config.profile(),
        &username,
        console,
    )?;

    console.announce_start(SAVING_CREDENTIALS);
    let saved: Result<_> = async {
        let credentials = assumer
            .assume_role_with_saml(&role, &saml, config.duration_seconds())
            .await?;
        store.upsert(&profile, &credentials).await?;
        Ok(credentials)
    }
    .await;

    let credentials = match saved {
        Ok(credentials) => {
            console.announce_success(SAVING_CREDENTIALS);
            credentials
        }
        Err(e) => {
            console.announce_failure(SAVING_CREDENTIALS);
            return Err(e);
        }
    };

    info!("Login complete for profile {}", profile);
    Ok(LoginOutcome {
        profile,
        role,
        expiration: credentials.expiration,
        credentials_path: store.path().to_path_buf(),
    })
}

use std::env;
use std::io::{self, BufRead, IsTerminal};

use anyhow::{Context, Result};
use clap::Args;
use tracing::{debug, info};

use crate::{
    aws::{ProfileStore, StsRoleAssumer},
    config::{self, CliOverrides, ConfigFile},
    console::TerminalConsole,
    idp::OneLoginClient,
    login,
};

#[derive(Debug, Clone, Args)]
pub struct LoginCommand {}

impl LoginCommand {
    pub async fn execute(self, overrides: CliOverrides) -> Result<()> {
        let file = ConfigFile::load_default()?;
        if let Some(name) = &overrides.config_name {
            file.validate_config_name(name)?;
        }

        let piped = read_piped_line().context("Failed to read standard input")?;
        let config = config::resolve(&file, |key| env::var(key).ok(), &overrides, piped.as_deref())
            .with_context(|| format!("Invalid configuration in {}", file.path().display()))?;
        debug!("Effective configuration: {:?}", config);

        let provider =
            OneLoginClient::new(config.base_uri(), config.client_id(), config.client_secret())?;
        let assumer = StsRoleAssumer::new(config.region()).await;
        let store = ProfileStore::from_default_path()?;
        let console = TerminalConsole::new();

        let outcome = login::login(&config, &provider, &assumer, &console, &store).await?;

        info!("Assumed role {}", outcome.role.role_arn);
        println!("  ❯ Credentials cached in '{}'", outcome.credentials_path.display());
        println!("  ❯ Expires at {}", outcome.expires_local());
        println!("  ❯ Use aws cli with --profile {}", outcome.profile);

        Ok(())
    }
}

/// First line of standard input when it is piped, `None` when interactive.
fn read_piped_line() -> io::Result<Option<String>> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    Ok(Some(line))
}

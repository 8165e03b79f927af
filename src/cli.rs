use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::commands::{CompletionsCommand, LoginCommand};
use crate::config::CliOverrides;

#[derive(Debug, Clone, Parser)]
#[command(name = "onelogin-aws", version, about = "Exchange a OneLogin SAML session for temporary AWS credentials", long_about = None)]
pub struct Cli {
    #[arg(
        short = 'C',
        visible_short_alias = 'c',
        long,
        global = true,
        help = "Switch configuration name within config file"
    )]
    pub config_name: Option<String>,

    #[arg(short = 'p', long, global = true, help = "AWS profile name")]
    pub profile: Option<String>,

    #[arg(short = 'u', long, global = true, help = "OneLogin username")]
    pub username: Option<String>,

    #[arg(
        short = 'r',
        long,
        global = true,
        help = "AWS region used for the STS request"
    )]
    pub region: Option<String>,

    #[arg(short = 'v', long, global = true, action = ArgAction::Count, help = "Increase verbosity (-v info, -vv debug, -vvv trace)")]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    #[command(about = "Log in through OneLogin and store temporary AWS credentials")]
    Login(LoginCommand),
    #[command(about = "Generate shell completion scripts for onelogin-aws")]
    Completions(CompletionsCommand),
}

impl Cli {
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            config_name: self.config_name.clone(),
            profile: self.profile.clone(),
            username: self.username.clone(),
            region: self.region.clone(),
        }
    }

    pub async fn execute(self) -> Result<()> {
        let overrides = self.overrides();
        let command = self.command.unwrap_or(Commands::Login(LoginCommand {}));

        match command {
            Commands::Login(cmd) => cmd.execute(overrides).await,
            Commands::Completions(cmd) => {
                cmd.execute();
                Ok(())
            }
        }
    }
}

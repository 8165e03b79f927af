use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while exchanging a OneLogin session for AWS credentials.
///
/// Every variant is terminal for the current invocation; nothing is retried.
#[derive(Error, Debug)]
pub enum Error {
    #[error("config file not found: {}", .0.display())]
    ConfigFileNotFound(PathBuf),

    #[error("missing required settings: {}", .0.join(", "))]
    MissingRequiredSettings(Vec<&'static str>),

    #[error("given config name `{0}` does not exist in your config file")]
    UnknownConfigName(String),

    #[error("invalid duration_seconds `{0}`: expected a positive number of seconds")]
    InvalidDuration(String),

    #[error("invalid credentials on standard input: {0}")]
    InvalidPipedInput(String),

    #[error("invalid base_uri {0}")]
    InvalidBaseUri(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("identity provider request failed: {0}")]
    IdentityProvider(#[from] reqwest::Error),

    #[error("failed to parse SAML assertion: {0}")]
    SamlParse(String),

    #[error("invalid role: {0}")]
    InvalidRole(String),

    #[error("role {role} matches several identity providers: {}", .principals.join(", "))]
    AmbiguousRole {
        role: String,
        principals: Vec<String>,
    },

    #[error("can't generate profile name for role {role} and username {username}")]
    ProfileNameDerivationFailed { role: String, username: String },

    #[error("failed to assume role with SAML: {0}")]
    CredentialExchangeFailed(String),

    #[error("failed to read input: {0}")]
    Prompt(String),

    #[error("could not determine home directory")]
    HomeDirNotFound,

    #[error("failed to parse {}: {source}", .path.display())]
    Ini {
        path: PathBuf,
        source: ini::ParseError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

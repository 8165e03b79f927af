use std::{env, path::PathBuf};

/// Application config file name under the user's home directory
pub const CONFIG_FILE_NAME: &str = ".onelogin-aws.config";

/// Section always applied first when present
pub const DEFAULTS_SECTION: &str = "defaults";

/// AWS configuration directory name
pub const AWS_CONFIG_DIR_NAME: &str = ".aws";

/// AWS shared credentials file name
pub const AWS_CREDENTIALS_FILE_NAME: &str = "credentials";

/// Environment variable selecting a named config section
pub const ENV_CONFIG_NAME: &str = "ONELOGIN_AWS_CLI_CONFIG_NAME";

/// Environment variable overriding the local profile name
pub const ENV_PROFILE: &str = "ONELOGIN_AWS_CLI_PROFILE";

/// Environment variable overriding the OneLogin username
pub const ENV_USERNAME: &str = "ONELOGIN_AWS_CLI_USERNAME";

/// Environment variable overriding the requested session duration
pub const ENV_DURATION_SECONDS: &str = "ONELOGIN_AWS_CLI_DURATION_SECONDS";

/// Session duration used when no layer sets one
pub const DEFAULT_DURATION_SECONDS: &str = "3600";

/// SAML attribute carrying `role_arn,principal_arn` pairs
pub const AWS_ROLE_ATTRIBUTE: &str = "https://aws.amazon.com/SAML/Attributes/Role";

/// Default AWS region for STS operations when no region is configured
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Keys written into a credentials profile
pub const AWS_ACCESS_KEY_ID: &str = "aws_access_key_id";
pub const AWS_SECRET_ACCESS_KEY: &str = "aws_secret_access_key";
pub const AWS_SESSION_TOKEN: &str = "aws_session_token";

/// Get the application config file path (`~/.onelogin-aws.config`)
pub fn get_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
}

/// Get the AWS credentials file path
/// Respects AWS_SHARED_CREDENTIALS_FILE environment variable if set
pub fn get_aws_credentials_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("AWS_SHARED_CREDENTIALS_FILE") {
        return Some(PathBuf::from(path));
    }

    dirs::home_dir().map(|home| {
        home.join(AWS_CONFIG_DIR_NAME)
            .join(AWS_CREDENTIALS_FILE_NAME)
    })
}

use std::{
    fmt,
    path::{Path, PathBuf},
};

use ini::{Ini, Properties};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    constants::{
        self, DEFAULT_DURATION_SECONDS, DEFAULTS_SECTION, ENV_CONFIG_NAME, ENV_DURATION_SECONDS,
        ENV_PROFILE, ENV_USERNAME,
    },
    error::{Error, Result},
};

/// Parsed `~/.onelogin-aws.config`. Read-only for the whole invocation.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
    ini: Ini,
}

impl ConfigFile {
    /// Load the config file from its fixed location under the home directory.
    pub fn load_default() -> Result<Self> {
        let path = constants::get_config_path().ok_or(Error::HomeDirNotFound)?;
        Self::load(&path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigFileNotFound(path.to_path_buf()));
        }

        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(e) => Error::Io(e),
            ini::Error::Parse(source) => Error::Ini {
                path: path.to_path_buf(),
                source,
            },
        })?;

        debug!("Loaded config file: {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            ini,
        })
    }

    /// Build from in-memory contents; `path` is only used in error messages.
    pub fn parse(path: impl Into<PathBuf>, contents: &str) -> Result<Self> {
        let path = path.into();
        let ini = Ini::load_from_str(contents).map_err(|source| Error::Ini {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path, ini })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of every section in the file, in file order.
    pub fn section_names(&self) -> Vec<&str> {
        self.ini.sections().flatten().collect()
    }

    /// Reject config names that do not name a section of this file.
    pub fn validate_config_name(&self, name: &str) -> Result<()> {
        if self.section_names().contains(&name) {
            Ok(())
        } else {
            Err(Error::UnknownConfigName(name.to_string()))
        }
    }

    fn section(&self, name: &str) -> Option<ConfigLayer> {
        self.ini.section(Some(name)).map(ConfigLayer::from_ini_section)
    }

    fn named_section(&self, name: &str) -> Result<ConfigLayer> {
        self.section(name)
            .ok_or_else(|| Error::UnknownConfigName(name.to_string()))
    }
}

/// One sparse configuration source. `None` and empty strings mean "not supplied".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub base_uri: Option<String>,
    pub subdomain: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub otp: Option<String>,
    pub otp_device_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub profile: Option<String>,
    pub duration_seconds: Option<String>,
    pub aws_app_id: Option<String>,
    pub role_arn: Option<String>,
    pub region: Option<String>,
}

impl ConfigLayer {
    fn from_ini_section(section: &Properties) -> Self {
        let get = |key: &str| section.get(key).map(str::to_string);

        Self {
            base_uri: get("base_uri"),
            subdomain: get("subdomain"),
            username: get("username"),
            otp_device_id: get("otp_device_id"),
            client_id: get("client_id"),
            client_secret: get("client_secret"),
            profile: get("profile"),
            duration_seconds: get("duration_seconds"),
            aws_app_id: get("aws_app_id"),
            role_arn: get("role_arn"),
            region: get("region"),
            ..Self::default()
        }
    }

    fn from_env(env: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            profile: env(ENV_PROFILE),
            username: env(ENV_USERNAME),
            duration_seconds: env(ENV_DURATION_SECONDS),
            ..Self::default()
        }
    }

    fn from_cli(cli: &CliOverrides) -> Self {
        Self {
            profile: cli.profile.clone(),
            username: cli.username.clone(),
            region: cli.region.clone(),
            ..Self::default()
        }
    }

    /// Parse the single JSON line piped on stdin. Keys are case-insensitive and only
    /// `Username`, `Password` and `OTP` are honoured.
    pub fn from_json(line: &str) -> Result<Self> {
        let object: Map<String, Value> =
            serde_json::from_str(line).map_err(|e| Error::InvalidPipedInput(e.to_string()))?;

        let mut layer = Self::default();
        for (key, value) in object {
            let value = match value {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => {
                    return Err(Error::InvalidPipedInput(format!(
                        "`{key}` must be a string, got {other}"
                    )));
                }
            };

            match key.to_ascii_lowercase().as_str() {
                "username" => layer.username = value,
                "password" => layer.password = value,
                "otp" => layer.otp = value,
                _ => debug!("Ignoring unknown key on stdin: {}", key),
            }
        }

        Ok(layer)
    }

    /// Apply `upper` on top of `self`, field by field. Only non-empty values win.
    pub fn overlay(&mut self, upper: ConfigLayer) {
        fn set(slot: &mut Option<String>, value: Option<String>) {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                *slot = Some(value);
            }
        }

        set(&mut self.base_uri, upper.base_uri);
        set(&mut self.subdomain, upper.subdomain);
        set(&mut self.username, upper.username);
        set(&mut self.password, upper.password);
        set(&mut self.otp, upper.otp);
        set(&mut self.otp_device_id, upper.otp_device_id);
        set(&mut self.client_id, upper.client_id);
        set(&mut self.client_secret, upper.client_secret);
        set(&mut self.profile, upper.profile);
        set(&mut self.duration_seconds, upper.duration_seconds);
        set(&mut self.aws_app_id, upper.aws_app_id);
        set(&mut self.role_arn, upper.role_arn);
        set(&mut self.region, upper.region);
    }

    fn build(self) -> Result<EffectiveConfig> {
        let required = [
            ("base_uri", &self.base_uri),
            ("subdomain", &self.subdomain),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("aws_app_id", &self.aws_app_id),
        ];
        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, value)| value.as_deref().is_none_or(str::is_empty))
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingRequiredSettings(missing));
        }

        let duration = self
            .duration_seconds
            .unwrap_or_else(|| DEFAULT_DURATION_SECONDS.to_string());
        let duration_seconds = parse_duration(&duration)?;

        Ok(EffectiveConfig {
            base_uri: self.base_uri.unwrap_or_default(),
            subdomain: self.subdomain.unwrap_or_default(),
            client_id: self.client_id.unwrap_or_default(),
            client_secret: self.client_secret.unwrap_or_default(),
            aws_app_id: self.aws_app_id.unwrap_or_default(),
            duration_seconds,
            role_arn: self.role_arn,
            profile: self.profile,
            region: self.region,
            username: self.username,
            password: self.password,
            otp: self.otp,
            otp_device_id: self.otp_device_id,
        })
    }
}

fn parse_duration(value: &str) -> Result<i32> {
    match value.trim().parse::<i32>() {
        Ok(seconds) if seconds > 0 => Ok(seconds),
        _ => Err(Error::InvalidDuration(value.to_string())),
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_name: Option<String>,
    pub profile: Option<String>,
    pub username: Option<String>,
    pub region: Option<String>,
}

/// The merged, validated configuration for one invocation.
#[derive(Clone)]
pub struct EffectiveConfig {
    base_uri: String,
    subdomain: String,
    client_id: String,
    client_secret: String,
    aws_app_id: String,
    duration_seconds: i32,
    role_arn: Option<String>,
    profile: Option<String>,
    region: Option<String>,
    username: Option<String>,
    password: Option<String>,
    otp: Option<String>,
    otp_device_id: Option<String>,
}

impl EffectiveConfig {
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn subdomain(&self) -> &str {
        &self.subdomain
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn aws_app_id(&self) -> &str {
        &self.aws_app_id
    }

    pub fn duration_seconds(&self) -> i32 {
        self.duration_seconds
    }

    pub fn role_arn(&self) -> Option<&str> {
        self.role_arn.as_deref()
    }

    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn otp(&self) -> Option<&str> {
        self.otp.as_deref()
    }

    pub fn otp_device_id(&self) -> Option<&str> {
        self.otp_device_id.as_deref()
    }
}

impl fmt::Debug for EffectiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |v: &Option<String>| v.as_ref().map(|_| "***");

        f.debug_struct("EffectiveConfig")
            .field("base_uri", &self.base_uri)
            .field("subdomain", &self.subdomain)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("aws_app_id", &self.aws_app_id)
            .field("duration_seconds", &self.duration_seconds)
            .field("role_arn", &self.role_arn)
            .field("profile", &self.profile)
            .field("region", &self.region)
            .field("username", &self.username)
            .field("password", &redacted(&self.password))
            .field("otp", &redacted(&self.otp))
            .field("otp_device_id", &self.otp_device_id)
            .finish()
    }
}

/// Merge every configuration source, lowest precedence first:
/// `[defaults]` section, the section named by the environment and then by `--config-name`,
/// environment variables, CLI flags, and finally the JSON line piped on stdin.
pub fn resolve(
    file: &ConfigFile,
    env: impl Fn(&str) -> Option<String>,
    cli: &CliOverrides,
    piped: Option<&str>,
) -> Result<EffectiveConfig> {
    let mut merged = ConfigLayer::default();

    if let Some(defaults) = file.section(DEFAULTS_SECTION) {
        merged.overlay(defaults);
    }

    let env_config_name = env(ENV_CONFIG_NAME).filter(|name| !name.is_empty());
    let cli_config_name = cli.config_name.as_deref().filter(|name| !name.is_empty());
    for name in [env_config_name.as_deref(), cli_config_name]
        .into_iter()
        .flatten()
    {
        debug!("Applying config section: {}", name);
        merged.overlay(file.named_section(name)?);
    }

    merged.overlay(ConfigLayer::from_env(&env));
    merged.overlay(ConfigLayer::from_cli(cli));

    if let Some(line) = piped.map(str::trim).filter(|line| !line.is_empty()) {
        debug!("Applying credentials from standard input");
        merged.overlay(ConfigLayer::from_json(line)?);
    }

    merged.build()
}

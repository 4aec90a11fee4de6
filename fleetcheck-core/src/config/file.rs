//! Fleet configuration file
//!
//! The on-disk layout is deserialized into raw `*Spec` types first, then
//! validated into immutable [`TargetDescriptor`]s and [`CheckDefinition`]s.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use secrecy::SecretString;
use serde::Deserialize;

use super::settings::{
    DEFAULT_SMTP_PORT, NotifySettings, RunSettings, SmtpSettings, resolve_env_value,
};
use crate::checks::{CheckDefinition, CommandProbe, Thresholds};
use crate::error::{ConfigError, ConfigResult};
use crate::models::{AuthMethod, AuthRef, DEFAULT_SSH_PORT, TargetDescriptor, Verdict};
use crate::orchestrator::{validate_checks, validate_targets};
use crate::trace_operation;
use crate::tracing::span_names;

/// Configuration file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "fleet.toml";

/// `<config_dir>/fleetcheck/fleet.toml`, if a config directory exists
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("fleetcheck").join(CONFIG_FILE_NAME))
}

/// Serialization format of a configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.toml`
    Toml,
    /// `.yaml` or `.yml`
    Yaml,
    /// `.json`
    Json,
}

impl ConfigFormat {
    /// Picks the format from the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedFormat`] for any other extension.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("toml") => Ok(Self::Toml),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Toml => "toml",
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }
}

/// A validated fleet configuration, fixed for the whole run
pub struct FleetConfig {
    /// Targets, ids unique
    pub targets: Vec<TargetDescriptor>,
    /// Checks, names unique
    pub checks: Vec<CheckDefinition>,
    /// Run limits
    pub run: RunSettings,
    /// Notification recipients
    pub notify: NotifySettings,
    /// Mail relay, if configured
    pub smtp: Option<SmtpSettings>,
}

impl fmt::Debug for FleetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FleetConfig")
            .field("targets", &self.targets.len())
            .field(
                "checks",
                &self.checks.iter().map(CheckDefinition::name).collect::<Vec<_>>(),
            )
            .field("run", &self.run)
            .field("notify", &self.notify)
            .field("smtp", &self.smtp)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FleetFile {
    #[serde(default)]
    run: RunSettings,
    #[serde(default)]
    notify: NotifySettings,
    #[serde(default)]
    smtp: Option<SmtpSpec>,
    #[serde(default, alias = "servers")]
    targets: Vec<TargetSpec>,
    #[serde(default)]
    checks: Option<Vec<CheckSpec>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TargetSpec {
    id: String,
    host: String,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default, alias = "username")]
    user: Option<String>,
    #[serde(default)]
    auth: Option<AuthSpec>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default, alias = "admin_email")]
    admin_contact: Option<String>,
    #[serde(default, alias = "display_name")]
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
enum AuthSpec {
    Agent,
    Key { path: String },
    PasswordEnv { var: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum CheckKind {
    Cpu,
    Memory,
    Swap,
    Disk,
    Load,
    Uptime,
    Service,
    Command,
}

impl CheckKind {
    const fn name(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Memory => "memory",
            Self::Swap => "swap",
            Self::Disk => "disk",
            Self::Load => "load",
            Self::Uptime => "uptime",
            Self::Service => "service",
            Self::Command => "command",
        }
    }

    const fn default_thresholds(self) -> Thresholds {
        match self {
            Self::Memory => Thresholds::MEMORY,
            Self::Swap => Thresholds::SWAP,
            Self::Disk => Thresholds::DISK,
            Self::Load => Thresholds::LOAD,
            _ => Thresholds::CPU,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CheckSpec {
    #[serde(default)]
    name: Option<String>,
    kind: CheckKind,
    #[serde(default)]
    warn: Option<f64>,
    #[serde(default)]
    critical: Option<f64>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    on_mismatch: Option<Verdict>,
    #[serde(default)]
    min_uptime_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SmtpSpec {
    server: String,
    #[serde(default = "default_smtp_port")]
    port: u16,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    from: String,
    #[serde(default = "default_starttls")]
    starttls: bool,
}

const fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

const fn default_starttls() -> bool {
    true
}

/// Loads and validates a fleet configuration, resolving `${VAR}` references
/// from the process environment.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed or validated.
pub fn load_fleet_config(path: &Path) -> ConfigResult<FleetConfig> {
    load_fleet_config_with(path, |name| std::env::var(name).ok())
}

/// Like [`load_fleet_config`], with an explicit variable lookup.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed or validated.
pub fn load_fleet_config_with<F>(path: &Path, lookup: F) -> ConfigResult<FleetConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let _span = trace_operation!(span_names::CONFIG_LOAD, path = %path.display()).entered();

    let format = ConfigFormat::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_fleet_config(&content, format, lookup)?;

    tracing::info!(
        targets = config.targets.len(),
        checks = config.checks.len(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Parses and validates configuration text.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed text and the matching
/// validation error for well-formed but invalid content.
pub fn parse_fleet_config<F>(
    content: &str,
    format: ConfigFormat,
    lookup: F,
) -> ConfigResult<FleetConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let parse_error = |message: String| ConfigError::Parse {
        format: format.name(),
        message,
    };
    let file: FleetFile = match format {
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string()))?,
        ConfigFormat::Yaml => {
            serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))?
        }
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| parse_error(e.to_string()))?
        }
    };
    file.into_config(&lookup)
}

impl FleetFile {
    fn into_config<F>(self, lookup: &F) -> ConfigResult<FleetConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.run.validate()?;

        let targets = self
            .targets
            .into_iter()
            .map(TargetSpec::into_descriptor)
            .collect::<ConfigResult<Vec<_>>>()?;
        validate_targets(&targets)?;

        let checks = match self.checks {
            Some(specs) => specs
                .into_iter()
                .map(CheckSpec::into_definition)
                .collect::<ConfigResult<Vec<_>>>()?,
            None => CheckDefinition::defaults(),
        };
        validate_checks(&checks)?;

        let smtp = self.smtp.map(|s| s.resolve(lookup)).transpose()?;

        Ok(FleetConfig {
            targets,
            checks,
            run: self.run,
            notify: self.notify,
            smtp,
        })
    }
}

impl TargetSpec {
    fn into_descriptor(self) -> ConfigResult<TargetDescriptor> {
        let invalid = |reason: &str| ConfigError::InvalidTarget {
            id: self.id.clone(),
            reason: reason.to_string(),
        };
        if self.host.trim().is_empty() {
            return Err(invalid("host must not be empty"));
        }
        let port = self.port.unwrap_or(DEFAULT_SSH_PORT);
        if port == 0 {
            return Err(invalid("port must not be zero"));
        }

        let method = match self.auth {
            None | Some(AuthSpec::Agent) => AuthMethod::Agent,
            Some(AuthSpec::Key { path }) => {
                AuthMethod::KeyFile(PathBuf::from(shellexpand::tilde(&path).into_owned()))
            }
            Some(AuthSpec::PasswordEnv { var }) => {
                if var.trim().is_empty() {
                    return Err(invalid("password_env needs a variable name"));
                }
                AuthMethod::PasswordEnv(var)
            }
        };

        let mut target = TargetDescriptor::new(self.id, self.host)
            .with_port(port)
            .with_auth(AuthRef {
                user: self.user,
                method,
            });
        target.tags = self.tags.into_iter().collect::<BTreeSet<_>>();
        target.admin_contact = self.admin_contact.filter(|c| !c.trim().is_empty());
        target.label = self.label;
        Ok(target)
    }
}

impl CheckSpec {
    fn into_definition(self) -> ConfigResult<CheckDefinition> {
        let name = self
            .name
            .clone()
            .or_else(|| match self.kind {
                CheckKind::Service => self.unit.clone(),
                CheckKind::Command => None,
                kind => Some(kind.name().to_string()),
            })
            .ok_or_else(|| ConfigError::InvalidCheck {
                name: self.kind.name().to_string(),
                reason: "a name is required".to_string(),
            })?;
        let invalid = |reason: String| ConfigError::InvalidCheck {
            name: name.clone(),
            reason,
        };

        let thresholds = {
            let defaults = self.kind.default_thresholds();
            let thresholds = Thresholds::new(
                self.warn.unwrap_or(defaults.warn),
                self.critical.unwrap_or(defaults.critical),
            );
            thresholds.validate().map_err(&invalid)?;
            thresholds
        };

        let definition = match self.kind {
            CheckKind::Cpu => CheckDefinition::cpu(thresholds),
            CheckKind::Memory => CheckDefinition::memory(thresholds),
            CheckKind::Swap => CheckDefinition::swap(thresholds),
            CheckKind::Disk => CheckDefinition::disk(thresholds),
            CheckKind::Load => CheckDefinition::load(thresholds),
            CheckKind::Uptime => CheckDefinition::uptime(self.min_uptime_secs),
            CheckKind::Service => {
                let unit = self
                    .unit
                    .as_deref()
                    .filter(|u| is_unit_name(u))
                    .ok_or_else(|| invalid("service checks need a valid 'unit'".to_string()))?;
                CheckDefinition::service(name.clone(), unit)
            }
            CheckKind::Command => {
                let command = self
                    .command
                    .filter(|c| !c.trim().is_empty())
                    .ok_or_else(|| invalid("command checks need a 'command'".to_string()))?;
                let pattern = self
                    .pattern
                    .as_deref()
                    .ok_or_else(|| invalid("command checks need a 'pattern'".to_string()))?;
                let pattern =
                    Regex::new(pattern).map_err(|e| invalid(format!("bad pattern: {e}")))?;
                let on_mismatch = self.on_mismatch.unwrap_or(Verdict::Critical);
                CheckDefinition::new(
                    name.clone(),
                    command,
                    Arc::new(CommandProbe::new(pattern, on_mismatch)),
                )
            }
        };
        Ok(definition.with_name(name))
    }
}

fn is_unit_name(unit: &str) -> bool {
    !unit.is_empty()
        && unit
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@' | ':'))
}

impl SmtpSpec {
    fn resolve<F>(self, lookup: &F) -> ConfigResult<SmtpSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server = resolve_env_value(&self.server, lookup)?;
        if server.trim().is_empty() {
            return Err(ConfigError::InvalidSettings(
                "smtp.server must not be empty".to_string(),
            ));
        }
        Ok(SmtpSettings {
            server,
            port: self.port,
            username: self
                .username
                .map(|u| resolve_env_value(&u, lookup))
                .transpose()?,
            password: self
                .password
                .map(|p| resolve_env_value(&p, lookup).map(SecretString::from))
                .transpose()?,
            from: resolve_env_value(&self.from, lookup)?,
            starttls: self.starttls,
        })
    }
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{trace, warn};

use crate::{ResourceKind, alerts::ChannelKind, error::ConfigError};

/// Location `vofo init` installs the validated configuration to, relative to
/// the user's home directory.
pub const INSTALLED_CONFIG_PATH: &str = ".vofo/config.json";

/// Absolute path of the installed configuration.
///
/// Falls back to the working directory when no home directory is known.
pub fn installed_config_path() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(INSTALLED_CONFIG_PATH),
        None => {
            warn!("no home directory found, using {INSTALLED_CONFIG_PATH} in the working directory");
            PathBuf::from(INSTALLED_CONFIG_PATH)
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    pub cpu_threshold: f64,
    pub ram_threshold: f64,
    pub disk_threshold: f64,

    /// Sample interval in seconds.
    #[serde(default = "default_interval")]
    pub interval: f64,

    /// Seconds a breach must persist before an alert fires.
    #[serde(default, alias = "alert_grace_period")]
    pub alert_threshold: f64,

    #[serde(default = "default_alert_method")]
    pub alert_method: String,
    #[serde(default)]
    pub email_recipient: Option<String>,
    #[serde(default)]
    pub slack_webhook: Option<String>,
    #[serde(default)]
    pub discord_webhook: Option<String>,
    #[serde(default)]
    pub discord_user_id: Option<String>,
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Service restarted by the heal module.
    #[serde(default)]
    pub service_name: String,

    #[serde(default = "default_mount_point")]
    pub disk_mount_point: PathBuf,
}

fn default_interval() -> f64 {
    10.0
}

fn default_alert_method() -> String {
    String::from("email")
}

fn default_mount_point() -> PathBuf {
    PathBuf::from("/")
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in ResourceKind::ALL {
            let threshold = self.threshold(kind);
            if !(threshold > 0.0 && threshold <= 100.0) {
                return Err(ConfigError::Invalid(format!(
                    "{kind} threshold must be within (0, 100], got {threshold}"
                )));
            }
        }

        if !self.interval.is_finite() || self.interval <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "interval must be a positive number of seconds, got {}",
                self.interval
            )));
        }

        if !self.alert_threshold.is_finite() || self.alert_threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "alert threshold must be a non-negative number of seconds, got {}",
                self.alert_threshold
            )));
        }

        if let Err(e) = self.alert_method.parse::<ChannelKind>() {
            warn!("{e}; alerts will fail to dispatch");
        }

        Ok(())
    }

    pub fn threshold(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Cpu => self.cpu_threshold,
            ResourceKind::Memory => self.ram_threshold,
            ResourceKind::Disk => self.disk_threshold,
        }
    }

    pub fn thresholds(&self, kind: ResourceKind) -> Result<ThresholdConfig, ConfigError> {
        ThresholdConfig::new(
            self.threshold(kind),
            Duration::try_from_secs_f64(self.alert_threshold)
                .map_err(|e| ConfigError::Invalid(format!("alert threshold: {e}")))?,
            Duration::try_from_secs_f64(self.interval)
                .map_err(|e| ConfigError::Invalid(format!("interval: {e}")))?,
        )
    }

    pub fn alert_channel(&self) -> AlertChannelConfig {
        AlertChannelConfig {
            method: self.alert_method.clone(),
            email_recipient: self.email_recipient.clone(),
            slack_webhook: self.slack_webhook.clone(),
            discord_webhook: self.discord_webhook.clone(),
            discord_user_id: self.discord_user_id.clone(),
            webhook_url: self.webhook_url.clone(),
        }
    }
}

/// Per-loop limits. Only constructible through [`ThresholdConfig::new`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdConfig {
    resource_threshold: f64,
    alert_grace_period: Duration,
    sample_interval: Duration,
}

impl ThresholdConfig {
    pub fn new(
        resource_threshold: f64,
        alert_grace_period: Duration,
        sample_interval: Duration,
    ) -> Result<Self, ConfigError> {
        if !(resource_threshold > 0.0 && resource_threshold <= 100.0) {
            return Err(ConfigError::Invalid(format!(
                "threshold must be within (0, 100], got {resource_threshold}"
            )));
        }
        if sample_interval.is_zero() {
            return Err(ConfigError::Invalid(String::from(
                "sample interval must be greater than zero",
            )));
        }

        Ok(Self {
            resource_threshold,
            alert_grace_period,
            sample_interval,
        })
    }

    pub fn resource_threshold(&self) -> f64 {
        self.resource_threshold
    }

    pub fn alert_grace_period(&self) -> Duration {
        self.alert_grace_period
    }

    pub fn sample_interval(&self) -> Duration {
        self.sample_interval
    }
}

/// Destination settings for alerts. The method is resolved at dispatch time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertChannelConfig {
    pub method: String,
    pub email_recipient: Option<String>,
    pub slack_webhook: Option<String>,
    pub discord_webhook: Option<String>,
    pub discord_user_id: Option<String>,
    pub webhook_url: Option<String>,
}

pub fn read_config_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let file_content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: Config = serde_json::from_str(&file_content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    trace!("loaded config: {config:?}");
    Ok(config)
}

/// Load the configuration monitoring runs with.
///
/// An explicit path wins; otherwise the configuration installed at
/// `installed` is used and its absence is reported as [`ConfigError::Missing`].
pub fn load_config(explicit: Option<&Path>, installed: &Path) -> Result<Config, ConfigError> {
    match explicit {
        Some(path) => read_config_file(path),
        None => {
            if !installed.exists() {
                return Err(ConfigError::Missing(installed.to_path_buf()));
            }
            read_config_file(installed)
        }
    }
}

/// Write a validated configuration to `path`, creating parent directories.
pub fn install_config(config: &Config, path: impl AsRef<Path>) -> anyhow::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(config)?)?;
    trace!("installed config at {}", path.display());
    Ok(())
}

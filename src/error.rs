//! Error types shared across the monitor
//!
//! Sampling and configuration errors are fatal to the affected loop (or to
//! startup). Dispatch errors are always recoverable: they are logged and the
//! loop keeps sampling.

use std::path::PathBuf;

use thiserror::Error;

use crate::ResourceKind;

/// A platform read failed.
#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("resource sampling is not supported on this platform")]
    UnsupportedPlatform,

    #[error("{kind} usage is unavailable: {reason}")]
    Unavailable { kind: ResourceKind, reason: String },

    #[error("no filesystem mounted at {0}")]
    MountNotFound(PathBuf),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("configuration not initialized (expected {0}, run `vofo init <config-path>` first)")]
    Missing(PathBuf),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unsupported alert channel '{0}'")]
    UnsupportedChannel(String),

    #[error("alert channel '{channel}' requires '{field}' to be set")]
    MissingDestination {
        channel: &'static str,
        field: &'static str,
    },

    #[error("failed to deliver alert via {channel}: {reason}")]
    Transport {
        channel: &'static str,
        reason: String,
    },
}

impl DispatchError {
    pub fn transport(channel: &'static str, reason: impl ToString) -> Self {
        DispatchError::Transport {
            channel,
            reason: reason.to_string(),
        }
    }
}

/// Terminal error of a monitor loop.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("{kind} monitoring: {source}")]
    Sampling {
        kind: ResourceKind,
        #[source]
        source: SamplingError,
    },

    #[error("monitor task failed: {0}")]
    TaskFailed(String),
}

#[derive(Debug, Error)]
pub enum HealError {
    #[error("no service name configured for healing")]
    MissingServiceName,
}

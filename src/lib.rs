pub mod alerts;
pub mod config;
pub mod discord;
pub mod email;
pub mod error;
pub mod heal;
pub mod monitors;
pub mod sampler;
pub mod util;

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Cpu,
    Memory,
    Disk,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Cpu, ResourceKind::Memory, ResourceKind::Disk];

    /// Label used in log lines and alert messages.
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Cpu => "CPU",
            ResourceKind::Memory => "RAM",
            ResourceKind::Disk => "Disk",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(ResourceKind::Cpu),
            "mem" | "memory" | "ram" => Ok(ResourceKind::Memory),
            "disk" => Ok(ResourceKind::Disk),
            other => Err(format!("unknown resource '{other}' (expected cpu, disk or mem)")),
        }
    }
}

/// A single utilization sample for one resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceReading {
    pub kind: ResourceKind,
    pub percent_used: f64,
    pub timestamp: DateTime<Utc>,
    pub capacity: Option<Capacity>,
    pub top_consumers: Vec<TopConsumer>,
}

impl ResourceReading {
    pub fn new(kind: ResourceKind, percent_used: f64) -> Self {
        Self {
            kind,
            percent_used,
            timestamp: Utc::now(),
            capacity: None,
            top_consumers: Vec::new(),
        }
    }

    pub fn with_capacity(mut self, used: u64, total: u64) -> Self {
        self.capacity = Some(Capacity { used, total });
        self
    }

    pub fn with_top_consumers(mut self, top_consumers: Vec<TopConsumer>) -> Self {
        self.top_consumers = top_consumers;
        self
    }
}

/// Absolute usage in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    pub used: u64,
    pub total: u64,
}

/// One entry of a ranked consumer list (e.g. a process and its resident memory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopConsumer {
    pub id: u32,
    pub label: String,
    pub magnitude: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_kind_parsing() {
        assert_eq!("cpu".parse::<ResourceKind>(), Ok(ResourceKind::Cpu));
        assert_eq!("MEM".parse::<ResourceKind>(), Ok(ResourceKind::Memory));
        assert_eq!("ram".parse::<ResourceKind>(), Ok(ResourceKind::Memory));
        assert_eq!(" disk ".parse::<ResourceKind>(), Ok(ResourceKind::Disk));
        assert!("gpu".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_resource_kind_labels() {
        assert_eq!(ResourceKind::Cpu.to_string(), "CPU");
        assert_eq!(ResourceKind::Memory.to_string(), "RAM");
        assert_eq!(ResourceKind::Disk.to_string(), "Disk");
    }
}

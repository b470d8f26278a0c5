//! Platform sampling for CPU, memory and disk utilization
//!
//! Each sampler wraps a single `sysinfo` handle and turns it into a
//! [`ResourceReading`]. Samplers are synchronous: they are called from their
//! own monitor task and never suspend.

use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use sysinfo::{
    CpuRefreshKind, Disks, MINIMUM_CPU_UPDATE_INTERVAL, ProcessRefreshKind, ProcessesToUpdate,
    RefreshKind, System,
};
use tracing::trace;

use crate::{
    ResourceKind, ResourceReading, TopConsumer, config::Config, error::SamplingError,
    util::percent_of,
};

/// Number of processes reported alongside a memory reading.
pub const TOP_CONSUMERS: usize = 3;

pub trait Sampler: Send {
    fn kind(&self) -> ResourceKind;

    fn sample(&mut self) -> Result<ResourceReading, SamplingError>;
}

impl<S: Sampler + ?Sized> Sampler for Box<S> {
    fn kind(&self) -> ResourceKind {
        (**self).kind()
    }

    fn sample(&mut self) -> Result<ResourceReading, SamplingError> {
        (**self).sample()
    }
}

/// Build the sysinfo-backed sampler for `kind`.
pub fn sampler_for(kind: ResourceKind, config: &Config) -> Result<Box<dyn Sampler>, SamplingError> {
    if !sysinfo::IS_SUPPORTED_SYSTEM {
        return Err(SamplingError::UnsupportedPlatform);
    }

    let sampler: Box<dyn Sampler> = match kind {
        ResourceKind::Cpu => Box::new(CpuSampler::new()),
        ResourceKind::Memory => Box::new(MemorySampler::new()),
        ResourceKind::Disk => Box::new(DiskSampler::new(config.disk_mount_point.clone())),
    };
    Ok(sampler)
}

/// Global CPU usage across all cores.
///
/// Usage is computed over the time between two refreshes, so the handle is
/// kept between samples. It is primed on construction, and a sample taken
/// sooner than [`MINIMUM_CPU_UPDATE_INTERVAL`] after the previous refresh
/// blocks until that window has passed.
pub struct CpuSampler {
    system: System,
    last_refresh: Instant,
}

impl CpuSampler {
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::nothing().with_cpu(CpuRefreshKind::everything()),
        );
        Self {
            system,
            last_refresh: Instant::now(),
        }
    }
}

impl Default for CpuSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Time still to wait before a refresh yields a meaningful CPU reading.
pub fn cpu_settle_time(since_refresh: Duration) -> Duration {
    MINIMUM_CPU_UPDATE_INTERVAL.saturating_sub(since_refresh)
}

impl Sampler for CpuSampler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Cpu
    }

    fn sample(&mut self) -> Result<ResourceReading, SamplingError> {
        let wait = cpu_settle_time(self.last_refresh.elapsed());
        if !wait.is_zero() {
            trace!("waiting {wait:?} for the cpu usage window");
            std::thread::sleep(wait);
        }

        self.system.refresh_cpu_usage();
        self.last_refresh = Instant::now();
        if self.system.cpus().is_empty() {
            return Err(SamplingError::Unavailable {
                kind: ResourceKind::Cpu,
                reason: String::from("no CPUs reported"),
            });
        }

        let usage = self.system.global_cpu_usage() as f64;
        trace!("sampled cpu usage {usage}");
        Ok(ResourceReading::new(ResourceKind::Cpu, usage))
    }
}

pub struct MemorySampler {
    system: System,
}

impl MemorySampler {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for MemorySampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for MemorySampler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Memory
    }

    fn sample(&mut self) -> Result<ResourceReading, SamplingError> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        let used = self.system.used_memory();
        let usage = percent_of(used, total).ok_or_else(|| SamplingError::Unavailable {
            kind: ResourceKind::Memory,
            reason: String::from("total memory reported as zero"),
        })?;

        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );

        let mut processes: Vec<TopConsumer> = self
            .system
            .processes()
            .values()
            .map(|process| TopConsumer {
                id: process.pid().as_u32(),
                label: process.name().to_string_lossy().to_string(),
                magnitude: process.memory(),
            })
            .collect();
        // the process table is unordered; pid order stands in for discovery order
        processes.sort_by_key(|process| process.id);

        Ok(ResourceReading::new(ResourceKind::Memory, usage)
            .with_capacity(used, total)
            .with_top_consumers(rank_top_consumers(processes, TOP_CONSUMERS)))
    }
}

/// The `n` largest consumers, biggest first. Ties keep their input order.
pub fn rank_top_consumers(mut consumers: Vec<TopConsumer>, n: usize) -> Vec<TopConsumer> {
    consumers.sort_by(|a, b| b.magnitude.cmp(&a.magnitude));
    consumers.truncate(n);
    consumers
}

/// Used space of the filesystem mounted at a fixed mount point.
pub struct DiskSampler {
    disks: Disks,
    mount_point: PathBuf,
}

impl DiskSampler {
    pub fn new(mount_point: impl Into<PathBuf>) -> Self {
        Self {
            disks: Disks::new_with_refreshed_list(),
            mount_point: mount_point.into(),
        }
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }
}

impl Sampler for DiskSampler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Disk
    }

    fn sample(&mut self) -> Result<ResourceReading, SamplingError> {
        self.disks.refresh(true);

        let disk = self
            .disks
            .list()
            .iter()
            .find(|disk| disk.mount_point() == self.mount_point)
            .ok_or_else(|| SamplingError::MountNotFound(self.mount_point.clone()))?;

        let total = disk.total_space();
        let used = total.saturating_sub(disk.available_space());
        let usage = percent_of(used, total).ok_or_else(|| SamplingError::Unavailable {
            kind: ResourceKind::Disk,
            reason: format!("{} reports zero capacity", self.mount_point.display()),
        })?;

        Ok(ResourceReading::new(ResourceKind::Disk, usage).with_capacity(used, total))
    }
}

//! Helper types for integration tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use vofo::{
    ResourceKind, ResourceReading,
    alerts::{AlertEvent, Dispatcher},
    config::{AlertChannelConfig, ThresholdConfig},
    error::{DispatchError, SamplingError},
    sampler::Sampler,
};

/// Replays a fixed list of percentages, then fails.
pub struct ScriptedSampler {
    kind: ResourceKind,
    readings: VecDeque<f64>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedSampler {
    pub fn new(kind: ResourceKind, readings: &[f64]) -> Self {
        Self {
            kind,
            readings: readings.iter().copied().collect(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl Sampler for ScriptedSampler {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn sample(&mut self) -> Result<ResourceReading, SamplingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.readings
            .pop_front()
            .map(|percent| ResourceReading::new(self.kind, percent))
            .ok_or_else(|| SamplingError::Unavailable {
                kind: self.kind,
                reason: String::from("script exhausted"),
            })
    }
}

/// Records every dispatched event together with the (virtual) time it was sent.
pub struct RecordingDispatcher {
    started: Instant,
    events: Mutex<Vec<(Duration, AlertEvent)>>,
    fail: bool,
}

impl RecordingDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            started: Instant::now(),
            events: Mutex::new(Vec::new()),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            started: Instant::now(),
            events: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn events(&self) -> Vec<(Duration, AlertEvent)> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn dispatch(
        &self,
        event: &AlertEvent,
        _channel: &AlertChannelConfig,
    ) -> Result<(), DispatchError> {
        self.events
            .lock()
            .unwrap()
            .push((self.started.elapsed(), event.clone()));

        if self.fail {
            return Err(DispatchError::transport("test", "delivery refused"));
        }
        Ok(())
    }
}

pub fn thresholds(threshold: f64, grace_secs: u64, interval_secs: u64) -> ThresholdConfig {
    ThresholdConfig::new(
        threshold,
        Duration::from_secs(grace_secs),
        Duration::from_secs(interval_secs),
    )
    .unwrap()
}

pub fn channel(method: &str) -> Arc<AlertChannelConfig> {
    Arc::new(AlertChannelConfig {
        method: method.to_string(),
        ..Default::default()
    })
}

//! Per-resource monitor loop
//!
//! ```text
//! Sampling ──reading──▶ Evaluating ──gate open──▶ Alerting ──▶ Sleeping
//!    │                      │                                     │
//!    │ error: fatal         └──────────gate closed───────────────▶│
//!    ▼                                                            │
//!  (exit)  ◀── cancelled ── checked before Sampling and while ◀───┘
//! ```
//!
//! The tracker re-arms as soon as the gate opens, whatever the outcome of the
//! dispatch. Dispatch failures are logged and never end the loop.

use std::{sync::Arc, time::Duration};

use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    ResourceKind, ResourceReading,
    alerts::{AlertEvent, Dispatcher},
    config::{AlertChannelConfig, ThresholdConfig},
    error::MonitorError,
    sampler::Sampler,
    util::{to_gib, to_mib},
};

use super::breach::{BreachEvaluation, BreachState, should_alert};

/// Result of evaluating one reading.
#[derive(Debug, Clone)]
pub struct Observation {
    pub evaluation: BreachEvaluation,
    pub breach_duration: Duration,
    pub alert: Option<AlertEvent>,
}

pub struct ResourceMonitor<S> {
    kind: ResourceKind,
    sampler: S,
    thresholds: ThresholdConfig,
    channel: Arc<AlertChannelConfig>,
    dispatcher: Arc<dyn Dispatcher>,
    state: BreachState,
}

impl<S: Sampler> ResourceMonitor<S> {
    pub fn new(
        sampler: S,
        thresholds: ThresholdConfig,
        channel: Arc<AlertChannelConfig>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            kind: sampler.kind(),
            sampler,
            thresholds,
            channel,
            dispatcher,
            state: BreachState::default(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn state(&self) -> BreachState {
        self.state
    }

    /// Run the Evaluating step for `reading` observed at `now`.
    ///
    /// Advances the breach state and, when the gate opens, re-arms it and
    /// returns the alert to dispatch.
    pub fn observe(&mut self, reading: &ResourceReading, now: Instant) -> Observation {
        let threshold = self.thresholds.resource_threshold();
        let step = self.state.track(reading.percent_used, threshold, now);
        self.state = step.state;

        let alert = should_alert(
            self.state.is_active(),
            step.duration,
            self.thresholds.alert_grace_period(),
        )
        .then(|| {
            self.state.rearm();
            AlertEvent::new(self.kind, reading.percent_used, threshold, step.duration)
        });

        Observation {
            evaluation: step.evaluation,
            breach_duration: step.duration,
            alert,
        }
    }

    /// Sample, evaluate and alert every `sample_interval` until cancelled.
    ///
    /// Returns `Ok(())` on cancellation and an error on the first failed sample.
    #[instrument(skip_all, fields(resource = %self.kind))]
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), MonitorError> {
        info!("starting {} monitoring", self.kind);

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let reading = match self.sampler.sample() {
                Ok(reading) => reading,
                Err(e) => {
                    error!("failed to get {} usage: {e}", self.kind);
                    return Err(MonitorError::Sampling {
                        kind: self.kind,
                        source: e,
                    });
                }
            };
            log_reading(&reading);

            let observation = self.observe(&reading, Instant::now());
            self.log_observation(&reading, &observation);

            if let Some(event) = observation.alert {
                match self.dispatcher.dispatch(&event, &self.channel).await {
                    Ok(()) => info!("{} alert sent successfully", self.kind),
                    Err(e) => error!("failed to send alert: {e}"),
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(self.thresholds.sample_interval()) => {}
            }
        }

        debug!("{} monitoring stopped", self.kind);
        Ok(())
    }

    fn log_observation(&self, reading: &ResourceReading, observation: &Observation) {
        let threshold = self.thresholds.resource_threshold();
        match observation.evaluation {
            BreachEvaluation::Started | BreachEvaluation::Ongoing => warn!(
                "{} usage ({:.2}%) exceeds threshold ({threshold:.2}%) for {:.2} seconds",
                self.kind,
                reading.percent_used,
                observation.breach_duration.as_secs_f64()
            ),
            BreachEvaluation::Recovered => info!("{} usage returned to normal", self.kind),
            BreachEvaluation::Normal => {}
        }
    }
}

fn log_reading(reading: &ResourceReading) {
    let kind = reading.kind;
    match (kind, reading.capacity) {
        (ResourceKind::Memory, Some(capacity)) => info!(
            "{kind} Usage: {:.2}% (Used: {} MB, Total: {} MB)",
            reading.percent_used,
            to_mib(capacity.used),
            to_mib(capacity.total)
        ),
        (ResourceKind::Disk, Some(capacity)) => info!(
            "{kind} Usage: {:.2}% (Used: {} GB, Total: {} GB)",
            reading.percent_used,
            to_gib(capacity.used),
            to_gib(capacity.total)
        ),
        _ => info!("{kind} Usage: {:.2}%", reading.percent_used),
    }

    for (rank, consumer) in reading.top_consumers.iter().enumerate() {
        info!(
            "Top Process {}: PID={}, Name={}, Mem={} MB",
            rank + 1,
            consumer.id,
            consumer.label,
            to_mib(consumer.magnitude)
        );
    }
}

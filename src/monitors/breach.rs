//! Breach tracking and the alert gate
//!
//! ```text
//! percent > threshold:
//!   inactive → Started   (started_at = now, duration 0)
//!   active   → Ongoing   (duration = now - started_at)
//!
//! percent <= threshold:
//!   active   → Recovered (inactive, duration 0)
//!   inactive → Normal    (inactive, duration 0)
//! ```
//!
//! Durations are elapsed wall-clock time, not sample counts. After the gate
//! fires the caller re-arms the state, so a breach that keeps going has to
//! accumulate a full grace period again before the next alert.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreachEvaluation {
    Normal,
    Started,
    Ongoing,
    Recovered,
}

/// Breach state of a single monitor. Active exactly when a start is recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BreachState {
    started_at: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreachStep {
    pub state: BreachState,
    pub evaluation: BreachEvaluation,
    pub duration: Duration,
}

impl BreachState {
    pub fn is_active(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn track(self, percent_used: f64, threshold: f64, now: Instant) -> BreachStep {
        if percent_used > threshold {
            return match self.started_at {
                None => BreachStep {
                    state: BreachState {
                        started_at: Some(now),
                    },
                    evaluation: BreachEvaluation::Started,
                    duration: Duration::ZERO,
                },
                Some(started_at) => BreachStep {
                    state: self,
                    evaluation: BreachEvaluation::Ongoing,
                    duration: now.saturating_duration_since(started_at),
                },
            };
        }

        BreachStep {
            state: BreachState::default(),
            evaluation: if self.is_active() {
                BreachEvaluation::Recovered
            } else {
                BreachEvaluation::Normal
            },
            duration: Duration::ZERO,
        }
    }

    /// Forget the current breach after an alert fired.
    pub fn rearm(&mut self) {
        self.started_at = None;
    }
}

pub fn should_alert(breach_active: bool, breach_duration: Duration, grace_period: Duration) -> bool {
    breach_active && breach_duration >= grace_period
}

//! Resource monitoring
//!
//! ```text
//! Sampler → BreachState::track → should_alert → Dispatcher
//!    ↑                                              │
//!    └──────────── sleep(sample_interval) ──────────┘
//! ```
//!
//! Every resource runs its own [`resource::ResourceMonitor`] task; a
//! [`group::MonitorGroup`] spawns them, cancels the siblings on the first
//! fatal error and joins all of them.

pub mod breach;
pub mod group;
pub mod resource;

//! End-to-end tests for a single monitor loop
//!
//! Time is paused, so sleeping advances the clock instantly and breach
//! durations are exact multiples of the sample interval.

use std::sync::atomic::Ordering;
use std::time::Duration;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;
use vofo::{
    ResourceKind,
    alerts::AlertDispatcher,
    error::{MonitorError, SamplingError},
    monitors::resource::ResourceMonitor,
};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

#[tokio::test(start_paused = true)]
async fn test_alert_fires_when_grace_period_reached() {
    // threshold 80, grace 30s, interval 10s, samples [85, 87, 90, 92]
    let dispatcher = RecordingDispatcher::new();
    let sampler = ScriptedSampler::new(ResourceKind::Cpu, &[85.0, 87.0, 90.0, 92.0]);

    let monitor = ResourceMonitor::new(
        sampler,
        thresholds(80.0, 30, 10),
        channel("webhook"),
        dispatcher.clone(),
    );
    let result = monitor.run(CancellationToken::new()).await;
    assert_matches!(result, Err(MonitorError::Sampling { .. }));

    let events = dispatcher.events();
    assert_eq!(events.len(), 1);

    let (sent_at, event) = &events[0];
    assert_eq!(*sent_at, Duration::from_secs(30));
    assert_eq!(event.percent_used, 92.0);
    assert_eq!(event.breach_duration, Duration::from_secs(30));
    assert_eq!(
        event.message,
        "Alert: CPU usage (92.00%) exceeded threshold (80.00%) for 30.00 seconds"
    );
}

#[tokio::test(start_paused = true)]
async fn test_permanent_breach_alerts_once_per_cycle() {
    let dispatcher = RecordingDispatcher::new();
    let sampler = ScriptedSampler::new(ResourceKind::Memory, &[95.0; 9]);

    let monitor = ResourceMonitor::new(
        sampler,
        thresholds(80.0, 30, 10),
        channel("webhook"),
        dispatcher.clone(),
    );
    let _ = monitor.run(CancellationToken::new()).await;

    let sent_at: Vec<Duration> = dispatcher.events().into_iter().map(|(at, _)| at).collect();
    assert_eq!(sent_at, vec![Duration::from_secs(30), Duration::from_secs(70)]);
}

#[tokio::test(start_paused = true)]
async fn test_recovery_prevents_alert() {
    let dispatcher = RecordingDispatcher::new();
    let sampler = ScriptedSampler::new(ResourceKind::Disk, &[85.0, 87.0, 70.0, 90.0, 91.0]);

    let monitor = ResourceMonitor::new(
        sampler,
        thresholds(80.0, 30, 10),
        channel("webhook"),
        dispatcher.clone(),
    );
    let _ = monitor.run(CancellationToken::new()).await;

    assert!(dispatcher.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_long_interval_crosses_grace_in_one_step() {
    let dispatcher = RecordingDispatcher::new();
    let sampler = ScriptedSampler::new(ResourceKind::Cpu, &[85.0, 85.0]);

    let monitor = ResourceMonitor::new(
        sampler,
        thresholds(80.0, 30, 120),
        channel("webhook"),
        dispatcher.clone(),
    );
    let _ = monitor.run(CancellationToken::new()).await;

    let events = dispatcher.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].1.breach_duration, Duration::from_secs(120));
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_channel_keeps_sampling() {
    let sampler = ScriptedSampler::new(ResourceKind::Cpu, &[95.0, 95.0, 95.0]);
    let calls = sampler.calls();

    let monitor = ResourceMonitor::new(
        sampler,
        thresholds(80.0, 0, 10),
        channel("sms"),
        std::sync::Arc::new(AlertDispatcher::new("test-host", None).unwrap()),
    );
    let result = monitor.run(CancellationToken::new()).await;

    // three readings plus the failing fourth call
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_matches!(
        result,
        Err(MonitorError::Sampling {
            kind: ResourceKind::Cpu,
            source: SamplingError::Unavailable { .. }
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_dispatch_still_rearms() {
    let dispatcher = RecordingDispatcher::failing();
    let sampler = ScriptedSampler::new(ResourceKind::Cpu, &[95.0; 7]);

    let monitor = ResourceMonitor::new(
        sampler,
        thresholds(80.0, 20, 10),
        channel("webhook"),
        dispatcher.clone(),
    );
    let _ = monitor.run(CancellationToken::new()).await;

    // a new breach starts at 30s and reaches the grace period at 50s
    let sent_at: Vec<Duration> = dispatcher.events().into_iter().map(|(at, _)| at).collect();
    assert_eq!(sent_at, vec![Duration::from_secs(20), Duration::from_secs(50)]);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_sleep() {
    let dispatcher = RecordingDispatcher::new();
    let sampler = ScriptedSampler::new(ResourceKind::Cpu, &[10.0; 100]);
    let calls = sampler.calls();

    let monitor = ResourceMonitor::new(
        sampler,
        thresholds(80.0, 30, 10),
        channel("webhook"),
        dispatcher.clone(),
    );

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(monitor.run(cancel.clone()));

    tokio::time::sleep(Duration::from_secs(25)).await;
    cancel.cancel();

    assert!(handle.await.unwrap().is_ok());
    // samples at 0s, 10s and 20s
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_alert_delivered_to_webhook() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = vofo::config::AlertChannelConfig {
        method: String::from("webhook"),
        ..Default::default()
    };
    config.webhook_url = Some(mock_server.uri());

    let monitor = ResourceMonitor::new(
        ScriptedSampler::new(ResourceKind::Disk, &[99.0]),
        vofo::config::ThresholdConfig::new(90.0, Duration::ZERO, Duration::from_millis(10))
            .unwrap(),
        std::sync::Arc::new(config),
        std::sync::Arc::new(AlertDispatcher::new("test-host", None).unwrap()),
    );
    let _ = monitor.run(CancellationToken::new()).await;

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["host"], "test-host");
    assert_eq!(body["resource"], "disk");
}

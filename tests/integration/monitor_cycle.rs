//! Integration tests for a full monitoring cycle
//!
//! These tests verify that:
//! - Resource and topic findings are turned into alerts in order
//! - Resource alerts respect the cooldown while topic alerts repeat
//! - Consumers opened for lag checks are released after the cycle

use std::sync::atomic::Ordering;
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::{TimeDelta, Utc};
use kafka_monitoring::monitor::{CycleOutcome, STARTUP_MESSAGE};
use pretty_assertions::assert_eq;

use crate::helpers::*;

/// Three topics: one without partitions, one lagging with long retention and
/// one healthy without readable configuration
fn busy_cluster() -> FakeBroker {
    FakeBroker::default()
        .with_topic("empty", vec![])
        .with_topic("orders", vec![(0, 1500, 200), (1, 900, 100)])
        .with_config("orders", &[("retention.ms", "302400000"), ("retention.bytes", "-1")])
        .with_topic("payments", vec![(0, 10, 10)])
}

#[tokio::test]
async fn test_cycle_emits_resource_then_topic_alerts() {
    let broker = busy_cluster();
    let host = FakeHost::new(91.3, &[("/", 50.0), ("/data", 85.0)]);
    let notifier = RecordingNotifier::default();
    let mut monitor = create_monitor(&broker, &host, &notifier, test_thresholds(&["/", "/data"]));

    let outcome = monitor.tick(local(12, 0, 0)).await;

    assert_eq!(
        outcome,
        Some(CycleOutcome::Completed {
            topics: 3,
            alerts_sent: 5,
            report_sent: false,
        })
    );

    let alerts = notifier.alerts();
    assert_eq!(alerts.len(), 5);
    assert!(alerts[0].starts_with("⚠️ Memory Usage Warning:\n   - Current Usage: 91.3%"));
    assert!(alerts[1].starts_with("⚠️ Disk Usage Warning for /data:\n   - Current Usage: 85.0%"));
    assert_eq!(
        alerts[2..].to_vec(),
        vec![
            "⚠️ Topic Alert: empty\nPartition count (0) is below threshold",
            "⚠️ Consumer Lag Alert: orders\nCurrent lag: 2100 messages",
            "📢 Retention Warning for Topic: orders\n⚠️ Retention time (3.5 days) exceeds threshold (3.0 days)",
        ]
    );
    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn test_healthy_cluster_sends_nothing() {
    let broker = FakeBroker::default()
        .with_topic("orders", vec![(0, 100, 100), (1, 50, 40)])
        .with_config("orders", &[("retention.ms", "86400000")]);
    let host = FakeHost::new(30.0, &[("/", 40.0)]);
    let notifier = RecordingNotifier::default();
    let mut monitor = create_monitor(&broker, &host, &notifier, test_thresholds(&["/"]));

    let outcome = monitor.tick(local(12, 0, 0)).await;

    assert_eq!(
        outcome,
        Some(CycleOutcome::Completed {
            topics: 1,
            alerts_sent: 0,
            report_sent: false,
        })
    );
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn test_resource_alerts_are_deduped_across_ticks() {
    let broker = FakeBroker::default().with_topic("orders", vec![(0, 5000, 0)]);
    let host = FakeHost::new(95.0, &[("/", 90.0)]);
    let notifier = RecordingNotifier::default();
    let mut monitor = create_monitor(&broker, &host, &notifier, test_thresholds(&["/"]));

    let start = local(12, 0, 0);
    monitor.tick(start).await;
    assert_eq!(notifier.alerts().len(), 3);
    notifier.clear();

    // within the cooldown only the lag alert repeats
    for minutes in [5, 30, 60] {
        let outcome = monitor.tick(start + TimeDelta::minutes(minutes)).await;
        assert_matches!(outcome, Some(CycleOutcome::Completed { alerts_sent: 1, .. }));
    }
    assert_eq!(
        notifier.alerts(),
        vec!["⚠️ Consumer Lag Alert: orders\nCurrent lag: 5000 messages"; 3]
    );
    notifier.clear();

    let outcome = monitor.tick(start + TimeDelta::seconds(3601)).await;
    assert_matches!(outcome, Some(CycleOutcome::Completed { alerts_sent: 3, .. }));
    assert_eq!(
        monitor.deduper().last_sent("memory"),
        Some((start + TimeDelta::seconds(3601)).with_timezone(&Utc))
    );
}

#[tokio::test]
async fn test_cooldown_is_tracked_per_disk() {
    let broker = FakeBroker::default();
    let host = FakeHost::new(10.0, &[("/", 90.0), ("/data", 10.0)]);
    let notifier = RecordingNotifier::default();
    let mut monitor = create_monitor(&broker, &host, &notifier, test_thresholds(&["/", "/data"]));

    let start = local(12, 0, 0);
    monitor.tick(start).await;
    host.state.lock().unwrap().disks.insert("/data".into(), 95.0);
    monitor.tick(start + TimeDelta::minutes(5)).await;

    let alerts = notifier.alerts();
    assert_eq!(alerts.len(), 2);
    assert!(alerts[0].starts_with("⚠️ Disk Usage Warning for /:"));
    assert!(alerts[1].starts_with("⚠️ Disk Usage Warning for /data:"));
}

#[tokio::test]
async fn test_unreadable_path_does_not_hide_other_paths() {
    let broker = FakeBroker::default();
    let host = FakeHost::new(10.0, &[("/", 85.0)]);
    let notifier = RecordingNotifier::default();
    let mut monitor = create_monitor(
        &broker,
        &host,
        &notifier,
        test_thresholds(&["/mnt/missing", "/"]),
    );

    monitor.tick(local(12, 0, 0)).await;

    let alerts = notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].starts_with("⚠️ Disk Usage Warning for /:"));
}

#[tokio::test]
async fn test_consumers_are_released_after_cycle() {
    let broker = busy_cluster();
    let host = FakeHost::new(10.0, &[]);
    let notifier = RecordingNotifier::default();
    let mut monitor = create_monitor(&broker, &host, &notifier, test_thresholds(&[]));

    monitor.tick(local(12, 0, 0)).await;
    monitor.tick(local(12, 5, 0)).await;

    assert_eq!(broker.consumers_opened.load(Ordering::SeqCst), 6);
    assert_eq!(broker.consumers_live.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_lag_never_underflows() {
    // committed position ahead of the watermark after a truncation
    let broker = FakeBroker::default().with_topic("orders", vec![(0, 100, 400), (1, 1200, 100)]);
    let host = FakeHost::new(10.0, &[]);
    let notifier = RecordingNotifier::default();
    let mut monitor = create_monitor(&broker, &host, &notifier, test_thresholds(&[]));

    monitor.tick(local(12, 0, 0)).await;

    assert_eq!(
        notifier.alerts(),
        vec!["⚠️ Consumer Lag Alert: orders\nCurrent lag: 1100 messages"]
    );
}

#[tokio::test]
async fn test_run_announces_start() {
    let broker = FakeBroker::default();
    let host = FakeHost::new(10.0, &[]);
    let notifier = RecordingNotifier::default();
    let monitor = create_monitor(&broker, &host, &notifier, test_thresholds(&[]));

    let handle = tokio::spawn(monitor.run());
    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.abort();

    assert_eq!(notifier.messages().first().map(String::as_str), Some(STARTUP_MESSAGE));
    assert_eq!(broker.cluster.lock().unwrap().metadata_calls, 2);
}

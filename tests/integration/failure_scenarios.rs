//! Integration tests for failure handling
//!
//! These tests verify that:
//! - An unreachable cluster yields a single alert and skips topic checks
//! - Errors and timeouts inside a cycle become a monitoring error alert
//! - A failing notification channel never stops the loop

use std::sync::atomic::Ordering;
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::TimeDelta;
use kafka_monitoring::monitor::CycleOutcome;

use crate::helpers::*;

#[tokio::test]
async fn test_unreachable_broker_skips_topic_evaluation() {
    let broker = FakeBroker::default().with_topic("orders", vec![(0, 5000, 0)]);
    broker.set_unreachable(true);
    let host = FakeHost::new(10.0, &[]);
    let notifier = RecordingNotifier::default();
    let mut monitor = create_monitor(&broker, &host, &notifier, test_thresholds(&[]));

    let outcome = monitor.tick(local(12, 0, 0)).await;

    assert_eq!(outcome, Some(CycleOutcome::BrokerUnavailable));
    let alerts = notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].starts_with("❌ Kafka Cluster Alert: Failed to connect to brokers:"));
    assert_eq!(broker.cluster.lock().unwrap().metadata_calls, 1);
    assert_eq!(broker.consumers_opened.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_resource_alerts_still_sent_while_broker_down() {
    let broker = FakeBroker::default();
    broker.set_unreachable(true);
    let host = FakeHost::new(92.0, &[]);
    let notifier = RecordingNotifier::default();
    let mut monitor = create_monitor(&broker, &host, &notifier, test_thresholds(&[]));

    monitor.tick(local(12, 0, 0)).await;

    let alerts = notifier.alerts();
    assert_eq!(alerts.len(), 2);
    assert!(alerts[0].starts_with("⚠️ Memory Usage Warning:"));
    assert!(alerts[1].starts_with("❌ Kafka Cluster Alert:"));
}

#[tokio::test]
async fn test_broker_alert_repeats_every_cycle() {
    let broker = FakeBroker::default();
    broker.set_unreachable(true);
    let host = FakeHost::new(10.0, &[]);
    let notifier = RecordingNotifier::default();
    let mut monitor = create_monitor(&broker, &host, &notifier, test_thresholds(&[]));

    let start = local(12, 0, 0);
    for minutes in 0..3 {
        monitor.tick(start + TimeDelta::minutes(minutes)).await;
    }
    assert_eq!(notifier.alerts().len(), 3);

    broker.set_unreachable(false);
    let outcome = monitor.tick(start + TimeDelta::minutes(3)).await;
    assert_matches!(outcome, Some(CycleOutcome::Completed { topics: 0, .. }));
    assert_eq!(notifier.alerts().len(), 3);
}

#[tokio::test]
async fn test_listing_failure_becomes_monitoring_error() {
    let broker = FakeBroker::default().with_topic("orders", vec![(0, 10, 0)]);
    broker.cluster.lock().unwrap().failing_after = Some(1);
    let host = FakeHost::new(10.0, &[]);
    let notifier = RecordingNotifier::default();
    let mut monitor = create_monitor(&broker, &host, &notifier, test_thresholds(&[]));

    let outcome = monitor.tick(local(12, 0, 0)).await;

    assert_eq!(outcome, None);
    let alerts = notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].starts_with("❌ Monitoring Error:"));
    assert_eq!(broker.consumers_opened.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_slow_cycle_is_cut_off() {
    let broker = FakeBroker::default().with_topic("orders", vec![(0, 10, 0)]);
    broker.cluster.lock().unwrap().metadata_delay = Some(Duration::from_millis(500));
    let host = FakeHost::new(10.0, &[]);
    let notifier = RecordingNotifier::default();
    let mut thresholds = test_thresholds(&[]);
    thresholds.cycle_timeout = Duration::from_millis(50);
    let mut monitor = create_monitor(&broker, &host, &notifier, thresholds);

    let outcome = monitor.tick(local(12, 0, 0)).await;

    assert_eq!(outcome, None);
    assert_eq!(
        notifier.alerts(),
        vec!["❌ Monitoring Error: monitoring cycle did not finish within 50ms"]
    );

    // the next cycle is unaffected once the cluster answers again
    broker.cluster.lock().unwrap().metadata_delay = None;
    let outcome = monitor.tick(local(12, 5, 0)).await;
    assert_matches!(outcome, Some(CycleOutcome::Completed { topics: 1, .. }));
}

#[tokio::test]
async fn test_failing_notifier_does_not_abort_cycle() {
    let broker = FakeBroker::default().with_topic("orders", vec![(0, 5000, 0)]);
    let host = FakeHost::new(95.0, &[]);
    let notifier = RecordingNotifier::default();
    notifier.set_failing(true);
    let mut monitor = create_monitor(&broker, &host, &notifier, test_thresholds(&[]));

    let start = local(12, 0, 0);
    let outcome = monitor.tick(start).await;

    assert_eq!(
        outcome,
        Some(CycleOutcome::Completed {
            topics: 1,
            alerts_sent: 0,
            report_sent: false,
        })
    );
    assert!(notifier.sent().is_empty());

    // the memory alert counted against its cooldown even though delivery failed
    notifier.set_failing(false);
    monitor.tick(start + TimeDelta::minutes(5)).await;
    assert_eq!(
        notifier.alerts(),
        vec!["⚠️ Consumer Lag Alert: orders\nCurrent lag: 5000 messages"]
    );
}

#[tokio::test]
async fn test_unreadable_topic_config_is_quiet() {
    let broker = FakeBroker::default()
        .with_topic("orders", vec![(0, 10, 0)])
        .with_config("orders", &[("retention.ms", "forever")]);
    let host = FakeHost::new(10.0, &[]);
    let notifier = RecordingNotifier::default();
    let mut monitor = create_monitor(&broker, &host, &notifier, test_thresholds(&[]));

    let outcome = monitor.tick(local(12, 0, 0)).await;

    assert_matches!(outcome, Some(CycleOutcome::Completed { alerts_sent: 0, .. }));
    assert!(notifier.sent().is_empty());
}

//! Alert evaluation and deduplication
//!
//! Every finding of a cycle becomes an [`Alert`]. Alerts with a
//! [`Alert::dedupe_key`] pass through the [`AlertDeduper`] before they are
//! sent; the others fire on every cycle in which their condition holds.
//!
//! ```text
//! memory            -> "memory"        (deduped)
//! disk <path>       -> "disk:<path>"   (deduped)
//! broker / topic    -> none            (sent every cycle)
//! cycle failure     -> none            (sent every cycle)
//! ```

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, trace};

use crate::{
    DiskInformation, DiskStatus, MemoryInformation, ResourceSnapshot, TopicInfo,
    config::Thresholds,
    util::{bytes_to_gb, bytes_to_mb},
};

/// Per-key cooldown tracking
///
/// State lives only in process memory; a restart starts a fresh cooldown
/// window for every key.
#[derive(Debug, Clone)]
pub struct AlertDeduper {
    cooldown: TimeDelta,
    last_sent: HashMap<String, DateTime<Utc>>,
}

impl AlertDeduper {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown: TimeDelta::from_std(cooldown).unwrap_or(TimeDelta::MAX),
            last_sent: HashMap::new(),
        }
    }

    /// Returns true and records `now` if `key` has never been sent or its
    /// last send lies more than the cooldown in the past
    pub fn should_send(&mut self, key: &str, now: DateTime<Utc>) -> bool {
        if let Some(last) = self.last_sent.get(key)
            && now.signed_duration_since(*last) <= self.cooldown
        {
            trace!("{key}: still in cooldown since {last}");
            return false;
        }

        self.last_sent.insert(key.to_string(), now);
        true
    }

    pub fn last_sent(&self, key: &str) -> Option<DateTime<Utc>> {
        self.last_sent.get(key).copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    Memory(MemoryInformation),
    Disk {
        path: String,
        usage: DiskInformation,
    },
    BrokerUnreachable {
        detail: String,
    },
    LowPartitionCount {
        topic: String,
        partitions: usize,
    },
    ConsumerLag {
        topic: String,
        lag: u64,
    },
    Retention {
        topic: String,
        warnings: Vec<String>,
    },
    CycleFailure {
        error: String,
    },
}

impl Alert {
    /// Key under which the alert is rate limited, if any
    pub fn dedupe_key(&self) -> Option<String> {
        match self {
            Alert::Memory(_) => Some(String::from("memory")),
            Alert::Disk { path, .. } => Some(format!("disk:{path}")),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Alert::Memory(memory) => format!(
                "⚠️ Memory Usage Warning:\n   - Current Usage: {:.1}%\n   - Available: {:.1} MB\n   - Total: {:.1} MB",
                memory.used_percent,
                bytes_to_mb(memory.available),
                bytes_to_mb(memory.total)
            ),
            Alert::Disk { path, usage } => format!(
                "⚠️ Disk Usage Warning for {path}:\n   - Current Usage: {:.1}%\n   - Free Space: {:.1} GB\n   - Total Space: {:.1} GB",
                usage.used_percent,
                bytes_to_gb(usage.free),
                bytes_to_gb(usage.total)
            ),
            Alert::BrokerUnreachable { detail } => format!("❌ Kafka Cluster Alert: {detail}"),
            Alert::LowPartitionCount { topic, partitions } => format!(
                "⚠️ Topic Alert: {topic}\nPartition count ({partitions}) is below threshold"
            ),
            Alert::ConsumerLag { topic, lag } => {
                format!("⚠️ Consumer Lag Alert: {topic}\nCurrent lag: {lag} messages")
            }
            Alert::Retention { topic, warnings } => format!(
                "📢 Retention Warning for Topic: {topic}\n{}",
                warnings.join("\n")
            ),
            Alert::CycleFailure { error } => format!("❌ Monitoring Error: {error}"),
        }
    }
}

/// Memory and disk findings of a resource snapshot
pub fn evaluate_resources(snapshot: &ResourceSnapshot, thresholds: &Thresholds) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if snapshot.memory.used_percent > thresholds.memory_percent {
        debug!(
            "memory usage {:.1}% exceeds {}%",
            snapshot.memory.used_percent, thresholds.memory_percent
        );
        alerts.push(Alert::Memory(snapshot.memory));
    }

    for reading in &snapshot.disks {
        if let DiskStatus::Usage(usage) = reading.status
            && usage.used_percent > thresholds.disk_percent
        {
            debug!(
                "{}: disk usage {:.1}% exceeds {}%",
                reading.path, usage.used_percent, thresholds.disk_percent
            );
            alerts.push(Alert::Disk {
                path: reading.path.clone(),
                usage,
            });
        }
    }

    alerts
}

/// Partition, lag and retention findings for one topic
pub fn evaluate_topic(topic: &str, info: &TopicInfo, thresholds: &Thresholds) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if info.partition_count <= thresholds.min_partitions {
        alerts.push(Alert::LowPartitionCount {
            topic: topic.to_string(),
            partitions: info.partition_count,
        });
    }

    if info.consumer_lag > thresholds.lag {
        alerts.push(Alert::ConsumerLag {
            topic: topic.to_string(),
            lag: info.consumer_lag,
        });
    }

    if !info.retention_warnings.is_empty() {
        alerts.push(Alert::Retention {
            topic: topic.to_string(),
            warnings: info.retention_warnings.clone(),
        });
    }

    alerts
}

//! Human-readable reports
//!
//! All functions here are pure: the same snapshot always renders to the same
//! text.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::{
    DiskStatus, ResourceSnapshot, TopicInfo,
    config::Thresholds,
    util::{bytes_to_gb, bytes_to_mb, ms_to_days},
};

pub fn resource_report(snapshot: &ResourceSnapshot) -> String {
    let memory = &snapshot.memory;
    let mut lines = vec![
        String::from("💻 Resource Usage Report:"),
        String::new(),
        String::from("🧠 Memory Usage:"),
        format!("   - Used: {:.1}%", memory.used_percent),
        format!("   - Available: {:.1} MB", bytes_to_mb(memory.available)),
        format!("   - Total: {:.1} MB", bytes_to_mb(memory.total)),
        String::new(),
        String::from("💾 Disk Usage:"),
    ];

    for reading in &snapshot.disks {
        match &reading.status {
            DiskStatus::Usage(disk) => lines.extend([
                String::new(),
                format!("   📁 {}:", reading.path),
                format!("      - Used: {:.1}%", disk.used_percent),
                format!("      - Free: {:.1} GB", bytes_to_gb(disk.free)),
                format!("      - Total: {:.1} GB", bytes_to_gb(disk.total)),
            ]),
            DiskStatus::Failed(reason) => {
                lines.push(format!("   ❌ Error checking {}: {reason}", reading.path))
            }
        }
    }

    lines.join("\n")
}

/// Daily digest of cluster health, per-topic details and host resources
pub fn daily_report(
    at: NaiveDateTime,
    cluster_healthy: bool,
    topics: &BTreeMap<String, TopicInfo>,
    resources: &ResourceSnapshot,
) -> String {
    let status = if cluster_healthy {
        "✅ Healthy"
    } else {
        "❌ Unhealthy"
    };

    let mut lines = vec![
        String::from("📊 Kafka Monitor Daily Report"),
        format!("📅 Date: {}", at.format("%Y-%m-%d")),
        format!("🕒 Time: {}", at.format("%H:%M:%S")),
        String::new(),
        format!("🖥️ Cluster Status: {status}"),
        format!("📚 Total Topics: {}", topics.len()),
        String::new(),
        String::from("📈 Topic Details:"),
    ];

    for (name, info) in topics {
        lines.extend([
            String::new(),
            format!("🔹 Topic: {name}"),
            format!("   - Partitions: {}", info.partition_count),
            format!("   - Consumer Lag: {} messages", info.consumer_lag),
        ]);

        if !info.retention_warnings.is_empty() {
            lines.push(String::from("   - Retention Warnings:"));
            lines.extend(
                info.retention_warnings
                    .iter()
                    .map(|warning| format!("     {warning}")),
            );
        }
    }

    lines.push(String::new());
    lines.push(resource_report(resources));

    lines.join("\n")
}

/// Message sent by `--test-notification` to verify the notification channel
pub fn connection_test_message(thresholds: &Thresholds) -> String {
    let retention = if thresholds.retention.enabled {
        format!(
            "- Retention Time: {:.1} days\n- Retention Size: {:.1} MB per topic",
            ms_to_days(thresholds.retention.time_ms),
            bytes_to_mb(thresholds.retention.size_bytes.max(0) as u64)
        )
    } else {
        String::from("- Retention monitoring: disabled")
    };

    format!(
        "🔔 Kafka Monitor Connection Test\n\n\
         ✅ Telegram connection works!\n\
         📝 Configuration:\n\
         {retention}\n\
         - Consumer Lag Threshold: {} messages\n\
         - Memory Threshold: {}%\n\
         - Disk Threshold: {}%\n\
         - Check Interval: {}s",
        thresholds.lag,
        thresholds.memory_percent,
        thresholds.disk_percent,
        thresholds.interval.as_secs()
    )
}

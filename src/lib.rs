pub mod alerts;
pub mod broker;
pub mod config;
pub mod monitor;
pub mod monitors;
pub mod notifier;
pub mod report;
pub mod telegram;
pub mod util;

use std::collections::BTreeMap;

/// Health information about a single topic, rebuilt every cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicInfo {
    pub partition_count: usize,
    pub consumer_lag: u64,
    pub retention_warnings: Vec<String>,
}

/// State of the cluster as observed during one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSnapshot {
    pub healthy: bool,
    pub detail: String,
    pub topics: BTreeMap<String, TopicInfo>,
}

/// Host resource usage as observed during one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSnapshot {
    pub memory: MemoryInformation,
    /// One reading per configured path, in configuration order.
    pub disks: Vec<DiskReading>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryInformation {
    pub used_percent: f64,
    pub available: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiskReading {
    pub path: String,
    pub status: DiskStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiskStatus {
    Usage(DiskInformation),
    /// The path could not be read; holds the reason.
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiskInformation {
    pub used_percent: f64,
    pub free: u64,
    pub total: u64,
}

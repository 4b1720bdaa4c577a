//! Broker introspection
//!
//! The monitor never speaks the Kafka protocol itself. Everything it needs
//! from the cluster goes through the [`BrokerAdminClient`] capability, which
//! is injected into [`health::BrokerHealthChecker`]. The production
//! implementation lives in [`kafka`]; tests use in-memory fakes.

pub mod error;
pub mod health;
pub mod kafka;

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;

pub use error::{BrokerError, BrokerResult};

/// Topic configuration entries as reported by the broker (`retention.ms`, ...)
pub type TopicConfig = HashMap<String, String>;

/// Cluster metadata as returned by a topic listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterMetadata {
    pub topics: BTreeMap<String, TopicMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicMetadata {
    /// Partition ids of the topic
    pub partitions: Vec<i32>,
}

impl TopicMetadata {
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }
}

/// Administrative access to the broker cluster
///
/// Implementations must be `Send + Sync`; the monitor loop only ever issues
/// one call at a time.
#[async_trait]
pub trait BrokerAdminClient: Send + Sync {
    /// Fetch metadata for all topics, giving up after `timeout`
    async fn list_topics_metadata(&self, timeout: Duration) -> BrokerResult<ClusterMetadata>;

    /// Fetch the configuration entries of a topic
    async fn describe_topic_config(&self, topic: &str) -> BrokerResult<TopicConfig>;

    /// Open a short-lived consumer bound to the monitoring group and
    /// assigned to every partition of `topic`
    ///
    /// The handle is released when dropped and must not outlive the check
    /// that opened it.
    async fn open_consumer(&self, topic: &str) -> BrokerResult<Box<dyn PartitionOffsets>>;
}

/// Offset queries on a consumer opened by [`BrokerAdminClient::open_consumer`]
#[async_trait]
pub trait PartitionOffsets: Send + Sync {
    async fn assigned_partitions(&self) -> BrokerResult<Vec<i32>>;

    /// Highest offset available to read in `partition`
    async fn high_watermark(&self, partition: i32) -> BrokerResult<i64>;

    /// Position of the monitoring group in `partition`
    async fn current_position(&self, partition: i32) -> BrokerResult<i64>;
}

//! Cluster health checks built on top of [`BrokerAdminClient`]
//!
//! Only [`BrokerHealthChecker::list_topics`] propagates errors: it gates the
//! rest of a cycle. Every other check is fail-quiet and reports a neutral
//! value (unhealthy, zero lag, no warnings) after logging the cause.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, instrument, trace, warn};

use crate::TopicInfo;
use crate::config::RetentionLimits;
use crate::util::{bytes_to_mb, ms_to_days};

use super::{BrokerAdminClient, BrokerError, BrokerResult, TopicConfig, TopicMetadata};

const RETENTION_MS: &str = "retention.ms";
const RETENTION_BYTES: &str = "retention.bytes";

/// Result of probing the brokers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerStatus {
    pub healthy: bool,
    pub detail: String,
}

pub struct BrokerHealthChecker<C> {
    client: C,
    timeout: Duration,
    retention: RetentionLimits,
}

impl<C> BrokerHealthChecker<C>
where
    C: BrokerAdminClient,
{
    pub fn new(client: C, timeout: Duration, retention: RetentionLimits) -> Self {
        Self {
            client,
            timeout,
            retention,
        }
    }

    /// Check whether the brokers answer a metadata request in time
    #[instrument(skip(self))]
    pub async fn check_broker_status(&self) -> BrokerStatus {
        match self.client.list_topics_metadata(self.timeout).await {
            Ok(_) => BrokerStatus {
                healthy: true,
                detail: String::from("Brokers are healthy"),
            },
            Err(e) => {
                warn!("broker status check failed: {e}");
                BrokerStatus {
                    healthy: false,
                    detail: format!("Failed to connect to brokers: {e}"),
                }
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn list_topics(&self) -> BrokerResult<BTreeMap<String, TopicMetadata>> {
        let metadata = self.client.list_topics_metadata(self.timeout).await?;
        trace!("listed {} topics", metadata.topics.len());
        Ok(metadata.topics)
    }

    /// Total lag of the monitoring group over all partitions of `topic`
    ///
    /// Returns 0 when the lag cannot be determined. This hides real lag
    /// while the cluster is in trouble; the failure is only visible in the
    /// logs.
    #[instrument(skip(self))]
    pub async fn consumer_lag(&self, topic: &str) -> u64 {
        match self.try_consumer_lag(topic).await {
            Ok(lag) => lag,
            Err(e) => {
                warn!("error checking consumer lag for topic {topic}: {e}");
                0
            }
        }
    }

    async fn try_consumer_lag(&self, topic: &str) -> BrokerResult<u64> {
        let consumer = self.client.open_consumer(topic).await?;

        let mut total = 0u64;
        for partition in consumer.assigned_partitions().await? {
            let high = consumer.high_watermark(partition).await?;
            let position = consumer.current_position(partition).await?;
            let lag = (high - position).max(0) as u64;
            trace!("{topic}/{partition}: watermark {high}, position {position}, lag {lag}");
            total += lag;
        }

        Ok(total)
    }

    /// Warnings for retention settings of `topic` exceeding the configured
    /// limits. Empty when the configuration cannot be read.
    #[instrument(skip(self))]
    pub async fn retention_warnings(&self, topic: &str) -> Vec<String> {
        let result = match self.client.describe_topic_config(topic).await {
            Ok(config) => evaluate_retention(&config, &self.retention),
            Err(e) => Err(e),
        };

        result.unwrap_or_else(|e| {
            warn!("error checking retention for topic {topic}: {e}");
            Vec::new()
        })
    }

    /// Gather partition count, lag and retention warnings for every topic,
    /// one topic at a time
    #[instrument(skip_all)]
    pub async fn collect_topics(
        &self,
        topics: &BTreeMap<String, TopicMetadata>,
    ) -> BTreeMap<String, TopicInfo> {
        let mut infos = BTreeMap::new();

        for (name, metadata) in topics {
            let consumer_lag = self.consumer_lag(name).await;
            let retention_warnings = if self.retention.enabled {
                self.retention_warnings(name).await
            } else {
                Vec::new()
            };

            debug!(
                "{name}: {} partitions, lag {consumer_lag}, {} retention warnings",
                metadata.partition_count(),
                retention_warnings.len()
            );

            infos.insert(
                name.clone(),
                TopicInfo {
                    partition_count: metadata.partition_count(),
                    consumer_lag,
                    retention_warnings,
                },
            );
        }

        infos
    }
}

/// Compare the retention entries of a topic configuration with `limits`
///
/// A missing `retention.ms` counts as 0 and a missing `retention.bytes` as
/// -1 (unbounded), so neither produces a warning.
pub fn evaluate_retention(
    config: &TopicConfig,
    limits: &RetentionLimits,
) -> BrokerResult<Vec<String>> {
    let retention_ms = config_value(config, RETENTION_MS, 0)?;
    let retention_bytes = config_value(config, RETENTION_BYTES, -1)?;

    let mut warnings = Vec::new();

    if retention_ms > limits.time_ms {
        warnings.push(format!(
            "⚠️ Retention time ({:.1} days) exceeds threshold ({:.1} days)",
            ms_to_days(retention_ms),
            ms_to_days(limits.time_ms)
        ));
    }

    if retention_bytes != -1 && retention_bytes > limits.size_bytes {
        warnings.push(format!(
            "⚠️ Retention size ({:.1} MB) exceeds threshold ({:.1} MB)",
            bytes_to_mb(retention_bytes.max(0) as u64),
            bytes_to_mb(limits.size_bytes.max(0) as u64)
        ));
    }

    Ok(warnings)
}

fn config_value(config: &TopicConfig, key: &str, default: i64) -> BrokerResult<i64> {
    let Some(raw) = config.get(key).filter(|value| !value.is_empty()) else {
        return Ok(default);
    };

    raw.trim()
        .parse()
        .map_err(|_| BrokerError::InvalidConfigValue {
            key: key.to_string(),
            value: raw.clone(),
        })
}

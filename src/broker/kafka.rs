//! [`BrokerAdminClient`] backed by librdkafka
//!
//! Metadata and offset requests are blocking librdkafka calls and run on the
//! blocking pool so that they never stall the runtime.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, ResourceSpecifier};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::error::KafkaError;
use rdkafka::{Offset, TopicPartitionList};
use tokio::task;
use tracing::{debug, instrument, trace};

use crate::config::KafkaConfig;

use super::{
    BrokerAdminClient, BrokerError, BrokerResult, ClusterMetadata, PartitionOffsets, TopicConfig,
    TopicMetadata,
};

/// Prefix of broker-internal topics such as `__consumer_offsets`
const INTERNAL_TOPIC_PREFIX: &str = "__";

pub struct KafkaAdminClient {
    /// Configuration for the short-lived lag consumers
    consumer_config: ClientConfig,

    admin: AdminClient<DefaultClientContext>,

    /// Long-lived consumer used only for metadata requests
    metadata: Arc<BaseConsumer>,

    timeout: Duration,
}

impl KafkaAdminClient {
    pub fn new(config: &KafkaConfig) -> BrokerResult<Self> {
        let mut consumer_config = ClientConfig::new();
        consumer_config
            .set("bootstrap.servers", &config.bootstrap_servers)
            .set("group.id", &config.consumer_group)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest");

        let admin: AdminClient<DefaultClientContext> = ClientConfig::new()
            .set("bootstrap.servers", &config.bootstrap_servers)
            .create()?;
        let metadata: BaseConsumer = consumer_config.create()?;

        debug!(
            "created kafka admin client for {} (group {})",
            config.bootstrap_servers, config.consumer_group
        );

        Ok(Self {
            consumer_config,
            admin,
            metadata: Arc::new(metadata),
            timeout: config.timeout,
        })
    }
}

#[async_trait]
impl BrokerAdminClient for KafkaAdminClient {
    #[instrument(skip(self))]
    async fn list_topics_metadata(&self, timeout: Duration) -> BrokerResult<ClusterMetadata> {
        let consumer = Arc::clone(&self.metadata);

        blocking(move || {
            let metadata = consumer.fetch_metadata(None, timeout)?;

            let topics = metadata
                .topics()
                .iter()
                .filter(|topic| !topic.name().starts_with(INTERNAL_TOPIC_PREFIX))
                .map(|topic| {
                    let partitions = topic.partitions().iter().map(|p| p.id()).collect();
                    (topic.name().to_string(), TopicMetadata { partitions })
                })
                .collect();

            Ok(ClusterMetadata { topics })
        })
        .await
    }

    #[instrument(skip(self))]
    async fn describe_topic_config(&self, topic: &str) -> BrokerResult<TopicConfig> {
        let resource = ResourceSpecifier::Topic(topic);
        let options = AdminOptions::new().request_timeout(Some(self.timeout));

        let results = self.admin.describe_configs([&resource], &options).await?;

        let resource = results
            .into_iter()
            .next()
            .ok_or_else(|| BrokerError::UnknownTopic(topic.to_string()))?
            .map_err(|code| BrokerError::Kafka(KafkaError::AdminOp(code)))?;

        trace!("{topic}: {} config entries", resource.entries.len());

        Ok(resource
            .entries
            .into_iter()
            .filter_map(|entry| entry.value.map(|value| (entry.name, value)))
            .collect())
    }

    #[instrument(skip(self))]
    async fn open_consumer(&self, topic: &str) -> BrokerResult<Box<dyn PartitionOffsets>> {
        let consumer: Arc<BaseConsumer> = Arc::new(self.consumer_config.create()?);
        let timeout = self.timeout;

        let assign_consumer = Arc::clone(&consumer);
        let assign_topic = topic.to_string();
        blocking(move || {
            let metadata = assign_consumer.fetch_metadata(Some(&assign_topic), timeout)?;
            let partitions = metadata
                .topics()
                .iter()
                .find(|t| t.name() == assign_topic)
                .map(|t| t.partitions().iter().map(|p| p.id()).collect::<Vec<_>>())
                .ok_or_else(|| BrokerError::UnknownTopic(assign_topic.clone()))?;

            let mut assignment = TopicPartitionList::new();
            for partition in partitions {
                assignment.add_partition(&assign_topic, partition);
            }
            assign_consumer.assign(&assignment)?;
            Ok(())
        })
        .await?;

        Ok(Box::new(KafkaPartitionOffsets {
            consumer,
            topic: topic.to_string(),
            timeout,
        }))
    }
}

/// Consumer assigned to every partition of one topic; closed on drop
struct KafkaPartitionOffsets {
    consumer: Arc<BaseConsumer>,
    topic: String,
    timeout: Duration,
}

#[async_trait]
impl PartitionOffsets for KafkaPartitionOffsets {
    async fn assigned_partitions(&self) -> BrokerResult<Vec<i32>> {
        let consumer = Arc::clone(&self.consumer);
        let topic = self.topic.clone();

        blocking(move || {
            let assignment = consumer.assignment()?;
            Ok(assignment
                .elements_for_topic(&topic)
                .iter()
                .map(|elem| elem.partition())
                .collect())
        })
        .await
    }

    async fn high_watermark(&self, partition: i32) -> BrokerResult<i64> {
        let consumer = Arc::clone(&self.consumer);
        let topic = self.topic.clone();
        let timeout = self.timeout;

        blocking(move || {
            let (_low, high) = consumer.fetch_watermarks(&topic, partition, timeout)?;
            Ok(high)
        })
        .await
    }

    /// Committed offset of the group; a partition the group never committed
    /// for is read from the beginning, matching `auto.offset.reset=earliest`
    async fn current_position(&self, partition: i32) -> BrokerResult<i64> {
        let consumer = Arc::clone(&self.consumer);
        let topic = self.topic.clone();
        let timeout = self.timeout;

        blocking(move || {
            let mut request = TopicPartitionList::new();
            request.add_partition(&topic, partition);

            let committed = consumer.committed_offsets(request, timeout)?;
            let offset = committed
                .find_partition(&topic, partition)
                .map(|elem| elem.offset());

            match offset {
                Some(Offset::Offset(position)) => Ok(position),
                _ => {
                    let (low, _high) = consumer.fetch_watermarks(&topic, partition, timeout)?;
                    Ok(low)
                }
            }
        })
        .await
    }
}

async fn blocking<T, F>(f: F) -> BrokerResult<T>
where
    F: FnOnce() -> BrokerResult<T> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(f).await?
}

//! Error types for broker operations

use std::fmt;

use rdkafka::error::KafkaError;

/// Result type alias for broker operations
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Errors that can occur while talking to the broker cluster
#[derive(Debug)]
pub enum BrokerError {
    /// The Kafka client reported an error (connection, timeout, auth, ...)
    Kafka(KafkaError),

    /// The requested topic is not present in the cluster metadata
    UnknownTopic(String),

    /// A topic configuration entry could not be interpreted
    InvalidConfigValue { key: String, value: String },

    /// A blocking client call could not be completed on the worker pool
    TaskFailed(String),
}

impl fmt::Display for BrokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokerError::Kafka(err) => write!(f, "kafka error: {}", err),
            BrokerError::UnknownTopic(topic) => write!(f, "unknown topic: {}", topic),
            BrokerError::InvalidConfigValue { key, value } => {
                write!(f, "invalid value for {}: {:?}", key, value)
            }
            BrokerError::TaskFailed(msg) => write!(f, "broker task failed: {}", msg),
        }
    }
}

impl std::error::Error for BrokerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BrokerError::Kafka(err) => Some(err),
            _ => None,
        }
    }
}

impl From<KafkaError> for BrokerError {
    fn from(err: KafkaError) -> Self {
        BrokerError::Kafka(err)
    }
}

impl From<tokio::task::JoinError> for BrokerError {
    fn from(err: tokio::task::JoinError) -> Self {
        BrokerError::TaskFailed(err.to_string())
    }
}

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use chrono::NaiveTime;
use tracing::trace;

const KAFKA_BOOTSTRAP_SERVERS: &str = "KAFKA_BOOTSTRAP_SERVERS";
const KAFKA_CONSUMER_GROUP: &str = "KAFKA_CONSUMER_GROUP";
const BROKER_TIMEOUT_SECS: &str = "BROKER_TIMEOUT_SECS";
const ALERT_THRESHOLD_LAG: &str = "ALERT_THRESHOLD_LAG";
const ALERT_THRESHOLD_PARTITION_COUNT: &str = "ALERT_THRESHOLD_PARTITION_COUNT";
const MONITOR_RETENTION_ENABLED: &str = "MONITOR_RETENTION_ENABLED";
const RETENTION_WARNING_THRESHOLD_MS: &str = "RETENTION_WARNING_THRESHOLD_MS";
const RETENTION_WARNING_THRESHOLD_BYTES: &str = "RETENTION_WARNING_THRESHOLD_BYTES";
const MEMORY_WARNING_THRESHOLD: &str = "MEMORY_WARNING_THRESHOLD";
const DISK_WARNING_THRESHOLD: &str = "DISK_WARNING_THRESHOLD";
const MONITOR_PATHS: &str = "MONITOR_PATHS";
const DAILY_REPORT_ENABLED: &str = "DAILY_REPORT_ENABLED";
const DAILY_REPORT_TIME: &str = "DAILY_REPORT_TIME";
const CHECK_INTERVAL: &str = "CHECK_INTERVAL";
const ALERT_COOLDOWN_SECS: &str = "ALERT_COOLDOWN_SECS";
const CYCLE_TIMEOUT_SECS: &str = "CYCLE_TIMEOUT_SECS";
const TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
const TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
const TELEGRAM_API_URL: &str = "TELEGRAM_API_URL";

const DEFAULT_BOOTSTRAP_SERVERS: &str = "localhost:9092";
const DEFAULT_CONSUMER_GROUP: &str = "kafka-monitor";
const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
const DEFAULT_REPORT_TIME: &str = "00:00";

#[derive(Debug, Clone)]
pub struct Config {
    pub kafka: KafkaConfig,
    pub telegram: TelegramConfig,
    pub thresholds: Thresholds,
}

#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub bootstrap_servers: String,
    pub consumer_group: String,
    /// Upper bound for a single metadata or offset request.
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_url: String,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Limits and schedule the monitor evaluates every cycle. Loaded once at
/// startup and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    pub lag: u64,
    /// A topic with this many partitions or fewer is reported.
    pub min_partitions: usize,
    pub retention: RetentionLimits,
    pub memory_percent: f64,
    pub disk_percent: f64,
    pub alert_cooldown: Duration,
    pub daily_report: DailyReportConfig,
    pub interval: Duration,
    pub cycle_timeout: Duration,
    pub paths: Vec<String>,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            lag: 1000,
            min_partitions: 0,
            retention: RetentionLimits::default(),
            memory_percent: 80.0,
            disk_percent: 80.0,
            alert_cooldown: Duration::from_secs(3600),
            daily_report: DailyReportConfig::default(),
            interval: Duration::from_secs(300),
            cycle_timeout: Duration::from_secs(120),
            paths: vec![String::from("/")],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionLimits {
    pub enabled: bool,
    pub time_ms: i64,
    pub size_bytes: i64,
}

impl Default for RetentionLimits {
    fn default() -> Self {
        Self {
            enabled: true,
            time_ms: 259_200_000,
            size_bytes: 268_435_456,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyReportConfig {
    pub enabled: bool,
    /// Local wall-clock time; only hour and minute are compared.
    pub at: NaiveTime,
}

impl Default for DailyReportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            at: NaiveTime::MIN,
        }
    }
}

impl Config {
    /// Read the configuration from the process environment.
    pub fn from_env() -> anyhow::Result<Config> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);

        let kafka = KafkaConfig {
            bootstrap_servers: env.string_or(KAFKA_BOOTSTRAP_SERVERS, DEFAULT_BOOTSTRAP_SERVERS),
            consumer_group: env.string_or(KAFKA_CONSUMER_GROUP, DEFAULT_CONSUMER_GROUP),
            timeout: Duration::from_secs(env.parse_or(BROKER_TIMEOUT_SECS, 10)?),
        };

        let telegram = TelegramConfig {
            bot_token: env.required(TELEGRAM_BOT_TOKEN)?,
            chat_id: env.required(TELEGRAM_CHAT_ID)?,
            api_url: env.string_or(TELEGRAM_API_URL, DEFAULT_TELEGRAM_API_URL),
        };

        let defaults = Thresholds::default();
        let thresholds = Thresholds {
            lag: env.parse_or(ALERT_THRESHOLD_LAG, defaults.lag)?,
            min_partitions: env.parse_or(ALERT_THRESHOLD_PARTITION_COUNT, defaults.min_partitions)?,
            retention: RetentionLimits {
                enabled: env.flag_or(MONITOR_RETENTION_ENABLED, defaults.retention.enabled),
                time_ms: env.parse_or(RETENTION_WARNING_THRESHOLD_MS, defaults.retention.time_ms)?,
                size_bytes: env
                    .parse_or(RETENTION_WARNING_THRESHOLD_BYTES, defaults.retention.size_bytes)?,
            },
            memory_percent: env.parse_or(MEMORY_WARNING_THRESHOLD, defaults.memory_percent)?,
            disk_percent: env.parse_or(DISK_WARNING_THRESHOLD, defaults.disk_percent)?,
            alert_cooldown: Duration::from_secs(
                env.parse_or(ALERT_COOLDOWN_SECS, defaults.alert_cooldown.as_secs())?,
            ),
            daily_report: DailyReportConfig {
                enabled: env.flag_or(DAILY_REPORT_ENABLED, defaults.daily_report.enabled),
                at: parse_report_time(&env.string_or(DAILY_REPORT_TIME, DEFAULT_REPORT_TIME))?,
            },
            interval: Duration::from_secs(
                env.parse_or(CHECK_INTERVAL, defaults.interval.as_secs())?,
            ),
            cycle_timeout: Duration::from_secs(
                env.parse_or(CYCLE_TIMEOUT_SECS, defaults.cycle_timeout.as_secs())?,
            ),
            paths: match env.get(MONITOR_PATHS) {
                Some(raw) => serde_json::from_str(&raw)
                    .with_context(|| format!("{MONITOR_PATHS} must be a JSON array of paths"))?,
                None => defaults.paths,
            },
        };

        let config = Config {
            kafka,
            telegram,
            thresholds,
        };
        trace!("loaded config: {config:?}");
        Ok(config)
    }
}

fn parse_report_time(raw: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .with_context(|| format!("{DAILY_REPORT_TIME} must use HH:MM, got {raw:?}"))
}

struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn string_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, key: &str) -> anyhow::Result<String> {
        self.get(key)
            .ok_or_else(|| anyhow!("missing required configuration {key}"))
    }

    fn flag_or(&self, key: &str, default: bool) -> bool {
        self.get(key)
            .map_or(default, |value| value.trim().eq_ignore_ascii_case("true"))
    }

    fn parse_or<T>(&self, key: &str, default: T) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("invalid value for {key}: {raw:?}")),
            None => Ok(default),
        }
    }
}

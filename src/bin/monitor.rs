use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use kafka_monitoring::{
    broker::{health::BrokerHealthChecker, kafka::KafkaAdminClient},
    config::Config,
    monitor::MonitorLoop,
    monitors::resources::{ResourceProbe, SystemHost},
    notifier::Notifier,
    report::connection_test_message,
    telegram::TelegramNotifier,
};
use tracing::{debug, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Env file to load before reading the environment
    #[arg(long, default_value = "config/config.env")]
    env_file: PathBuf,

    /// Send a single test message to the notification channel and exit
    #[arg(long)]
    test_notification: bool,
}

fn init() {
    let filter = filter::Targets::new()
        .with_targets(vec![
            ("kafka_monitoring", LevelFilter::TRACE),
            ("kafka_monitor", LevelFilter::TRACE),
        ])
        .with_default(LevelFilter::INFO);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    if let Err(e) = dotenv::from_path(&args.env_file) {
        debug!("no env file loaded from {}: {e}", args.env_file.display());
    }

    let config = Config::from_env()?;
    let notifier = TelegramNotifier::new(config.telegram.clone())?;

    if args.test_notification {
        notifier
            .send_message(&connection_test_message(&config.thresholds))
            .await
            .context("test notification failed")?;
        info!("test notification sent");
        return Ok(());
    }

    let client = KafkaAdminClient::new(&config.kafka).context("failed to create Kafka client")?;
    let checker = BrokerHealthChecker::new(client, config.kafka.timeout, config.thresholds.retention);
    let probe = ResourceProbe::new(SystemHost::new(), config.thresholds.paths.clone());

    MonitorLoop::new(checker, probe, notifier, config.thresholds)
        .run()
        .await;

    Ok(())
}

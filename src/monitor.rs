//! Polling loop
//!
//! One cycle runs to completion before the next one starts:
//!
//! ```text
//! SAMPLING ── broker down ──> alert ─────────────────────┐
//!    │                                                   │
//!    └─> EVALUATING ─> NOTIFYING ─> daily report? ─> SLEEPING ─> SAMPLING
//! ```
//!
//! Cycles never overlap, so the alert and report state needs no locking.
//! Any error escaping a cycle is reported as a single alert and the loop
//! carries on with the next interval.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Timelike, Utc};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::{
    ClusterSnapshot,
    alerts::{Alert, AlertDeduper, evaluate_resources, evaluate_topic},
    broker::{BrokerAdminClient, health::BrokerHealthChecker},
    config::{DailyReportConfig, Thresholds},
    monitors::resources::{HostStats, ResourceProbe},
    notifier::Notifier,
    report::daily_report,
};

pub const STARTUP_MESSAGE: &str = "🚀 Kafka monitoring service started!";

/// Tracks whether today's digest has been sent
#[derive(Debug, Clone)]
pub struct DailyReportState {
    config: DailyReportConfig,
    last_sent: Option<NaiveDate>,
}

impl DailyReportState {
    pub fn new(config: DailyReportConfig) -> Self {
        Self {
            config,
            last_sent: None,
        }
    }

    /// True at most once per calendar day, during the configured minute
    pub fn should_send(&mut self, now: NaiveDateTime) -> bool {
        if !self.config.enabled {
            trace!("daily report is disabled");
            return false;
        }

        let at = self.config.at;
        if now.hour() != at.hour() || now.minute() != at.minute() {
            return false;
        }

        let today = now.date();
        if self.last_sent.is_some_and(|last| today <= last) {
            return false;
        }

        info!("It's time to send the daily report");
        self.last_sent = Some(today);
        true
    }

    pub fn last_sent(&self) -> Option<NaiveDate> {
        self.last_sent
    }
}

/// How a cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The brokers did not answer; topics were not evaluated
    BrokerUnavailable,
    Completed {
        topics: usize,
        alerts_sent: usize,
        report_sent: bool,
    },
}

pub struct MonitorLoop<C, H, N> {
    checker: BrokerHealthChecker<C>,
    probe: ResourceProbe<H>,
    notifier: N,
    thresholds: Thresholds,
    deduper: AlertDeduper,
    daily_report: DailyReportState,
}

impl<C, H, N> MonitorLoop<C, H, N>
where
    C: BrokerAdminClient,
    H: HostStats,
    N: Notifier,
{
    pub fn new(
        checker: BrokerHealthChecker<C>,
        probe: ResourceProbe<H>,
        notifier: N,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            checker,
            probe,
            notifier,
            deduper: AlertDeduper::new(thresholds.alert_cooldown),
            daily_report: DailyReportState::new(thresholds.daily_report),
            thresholds,
        }
    }

    /// Run forever: announce the start, then tick and sleep
    pub async fn run(mut self) {
        info!("Starting Kafka monitoring service...");
        self.notify(STARTUP_MESSAGE).await;

        loop {
            self.tick(Local::now()).await;

            trace!("sleeping for {:?}", self.thresholds.interval);
            sleep(self.thresholds.interval).await;
        }
    }

    /// Run one cycle within the cycle budget, turning any failure into an
    /// alert
    #[instrument(skip(self))]
    pub async fn tick(&mut self, now: DateTime<Local>) -> Option<CycleOutcome> {
        let budget = self.thresholds.cycle_timeout;

        let failure = match timeout(budget, self.run_cycle(now)).await {
            Ok(Ok(outcome)) => {
                debug!("cycle finished: {outcome:?}");
                return Some(outcome);
            }
            Ok(Err(e)) => format!("{e:#}"),
            Err(_) => format!("monitoring cycle did not finish within {budget:?}"),
        };

        error!("Error in monitoring: {failure}");
        self.alert(&Alert::CycleFailure { error: failure }).await;
        None
    }

    /// One sampling, evaluation and notification pass
    pub async fn run_cycle(&mut self, now: DateTime<Local>) -> anyhow::Result<CycleOutcome> {
        let resources = self.probe.sample();
        let mut alerts_sent = self
            .dispatch(evaluate_resources(&resources, &self.thresholds), now.with_timezone(&Utc))
            .await;

        let status = self.checker.check_broker_status().await;
        if !status.healthy {
            warn!("{}", status.detail);
            self.alert(&Alert::BrokerUnreachable {
                detail: status.detail,
            })
            .await;
            return Ok(CycleOutcome::BrokerUnavailable);
        }

        let metadata = self.checker.list_topics().await?;
        let cluster = ClusterSnapshot {
            healthy: status.healthy,
            detail: status.detail,
            topics: self.checker.collect_topics(&metadata).await,
        };

        let findings: Vec<Alert> = cluster
            .topics
            .iter()
            .flat_map(|(name, info)| evaluate_topic(name, info, &self.thresholds))
            .collect();
        alerts_sent += self.dispatch(findings, now.with_timezone(&Utc)).await;

        let report_sent = if self.daily_report.should_send(now.naive_local()) {
            let report = daily_report(now.naive_local(), cluster.healthy, &cluster.topics, &resources);
            let sent = self.notify(&report).await;
            if sent {
                info!("Daily report sent successfully");
            }
            sent
        } else {
            false
        };

        Ok(CycleOutcome::Completed {
            topics: cluster.topics.len(),
            alerts_sent,
            report_sent,
        })
    }

    /// Send every alert that passes its cooldown; returns how many went out
    async fn dispatch(&mut self, alerts: Vec<Alert>, now: DateTime<Utc>) -> usize {
        let mut sent = 0;

        for alert in alerts {
            if let Some(key) = alert.dedupe_key()
                && !self.deduper.should_send(&key, now)
            {
                debug!("suppressing {key} alert during cooldown");
                continue;
            }

            if self.alert(&alert).await {
                sent += 1;
            }
        }

        sent
    }

    async fn alert(&self, alert: &Alert) -> bool {
        match self.notifier.send_alert(&alert.message()).await {
            Ok(()) => true,
            Err(e) => {
                error!("failed to send alert: {e:#}");
                false
            }
        }
    }

    async fn notify(&self, text: &str) -> bool {
        match self.notifier.send_message(text).await {
            Ok(()) => true,
            Err(e) => {
                error!("failed to send message: {e:#}");
                false
            }
        }
    }

    pub fn deduper(&self) -> &AlertDeduper {
        &self.deduper
    }

    pub fn daily_report_state(&self) -> &DailyReportState {
        &self.daily_report
    }
}

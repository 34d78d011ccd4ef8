use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use common::models::Alert;
use futures_util::future::join_all;
use market_data::PriceSource;
use storage::{AlertStore, RecordError, SupervisorRecord};
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::services::notification_service::Notifier;
use crate::services::sound_service::{SoundPlayer, spawn_playback};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Idle -> Alerting
    Entered,
    /// Alerting -> Alerting
    Held,
    /// Alerting -> Idle
    Cleared,
    /// Idle -> Idle
    Quiet,
}

impl Transition {
    /// Every cycle spent in the alerting state notifies, not only the edge.
    pub fn notifies(self) -> bool {
        matches!(self, Transition::Entered | Transition::Held)
    }
}

/// Symbols whose last evaluated price satisfied their alert. Process-local.
#[derive(Debug, Default, Clone)]
pub struct MonitorState {
    alerting: HashSet<String>,
}

impl MonitorState {
    pub fn apply(&mut self, symbol: &str, triggered: bool) -> Transition {
        match (triggered, self.alerting.contains(symbol)) {
            (true, false) => {
                self.alerting.insert(symbol.to_string());
                Transition::Entered
            }
            (true, true) => Transition::Held,
            (false, true) => {
                self.alerting.remove(symbol);
                Transition::Cleared
            }
            (false, false) => Transition::Quiet,
        }
    }

    #[cfg(test)]
    pub fn is_alerting(&self, symbol: &str) -> bool {
        self.alerting.contains(symbol)
    }

    pub fn len(&self) -> usize {
        self.alerting.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.alerting.is_empty()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub evaluated: usize,
    pub unavailable: usize,
    pub notified: usize,
}

pub struct MonitorLoop {
    store: AlertStore,
    source: Arc<dyn PriceSource>,
    notifier: Arc<dyn Notifier>,
    player: Arc<dyn SoundPlayer>,
    record: Arc<dyn SupervisorRecord>,
    interval: Duration,
}

impl MonitorLoop {
    pub fn new(
        store: AlertStore,
        source: Arc<dyn PriceSource>,
        notifier: Arc<dyn Notifier>,
        player: Arc<dyn SoundPlayer>,
        record: Arc<dyn SupervisorRecord>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            source,
            notifier,
            player,
            record,
            interval,
        }
    }

    /// Runs until SIGINT/SIGTERM, then cleans up. A signal mid-cycle abandons
    /// the remaining evaluations of that cycle.
    pub async fn run(self) -> anyhow::Result<()> {
        self.notifier
            .toast("🚀 Starting price monitoring in background...")
            .await;
        info!(
            "Monitoring process {} started, polling every {:?}",
            std::process::id(),
            self.interval
        );

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        let mut state = MonitorState::default();
        let mut alerts: Vec<Alert> = Vec::new();

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = self.tick(&mut state, &mut alerts) => {}
            }
        }

        self.cleanup().await;
        Ok(())
    }

    async fn tick(&self, state: &mut MonitorState, alerts: &mut Vec<Alert>) {
        match self.store.load() {
            Ok(latest) => *alerts = latest,
            Err(e) => warn!("{}. Keeping the previous {} alerts.", e, alerts.len()),
        }

        let report = self.run_cycle(state, alerts).await;
        debug!(
            "Cycle done: {} evaluated, {} unavailable, {} notified, {} alerting",
            report.evaluated,
            report.unavailable,
            report.notified,
            state.len()
        );

        time::sleep(self.interval).await;
    }

    /// One pass over `alerts`. Prices are fetched concurrently, once per
    /// distinct symbol; evaluation and notification follow list order.
    pub async fn run_cycle(&self, state: &mut MonitorState, alerts: &[Alert]) -> CycleReport {
        let mut report = CycleReport::default();

        let mut symbols: Vec<&str> = Vec::new();
        for alert in alerts {
            if !symbols.contains(&alert.symbol.as_str()) {
                symbols.push(&alert.symbol);
            }
        }

        let quotes = join_all(symbols.iter().map(|s| self.source.fetch_price(s))).await;
        let prices: HashMap<&str, Option<f64>> = symbols
            .iter()
            .copied()
            .zip(quotes.into_iter().map(Result::ok))
            .collect();

        for alert in alerts {
            let Some(price) = prices.get(alert.symbol.as_str()).copied().flatten() else {
                report.unavailable += 1;
                continue;
            };
            report.evaluated += 1;

            let transition = state.apply(&alert.symbol, alert.evaluate(price));
            match transition {
                Transition::Entered => debug!("{} entered alerting at {}", alert, price),
                Transition::Cleared => debug!("{} cleared at {}", alert, price),
                _ => {}
            }

            if transition.notifies() {
                self.notifier.notify(&alert.trigger_message(price)).await;
                spawn_playback(self.player.clone(), alert.sound_file.clone());
                report.notified += 1;
            }
        }

        report
    }

    async fn cleanup(&self) {
        self.notifier.toast("🛑 Stopping price monitoring...").await;
        info!("Monitoring process stopped by signal.");

        // Only drop the record if it still names us; a restart may have replaced it.
        let own_pid = std::process::id() as i32;
        match self.record.read() {
            Ok(pid) if pid == own_pid => self.remove_record(),
            Ok(pid) => info!("Supervisor record belongs to PID {}, leaving it.", pid),
            Err(RecordError::Missing(_)) => debug!("Supervisor record already removed."),
            Err(RecordError::InvalidPid(content)) => {
                warn!("Supervisor record is corrupt ({:?}), removing it.", content);
                self.remove_record();
            }
            Err(e) => error!("Cannot read supervisor record during cleanup: {}", e),
        }
    }

    fn remove_record(&self) {
        match self.record.remove() {
            Ok(()) => info!("Supervisor record removed."),
            Err(e) => error!("Failed to remove supervisor record: {}", e),
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("Received Ctrl+C, stopping monitor..."),
        _ = terminate => warn!("Received SIGTERM, stopping monitor..."),
    }
}

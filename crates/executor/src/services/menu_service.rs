use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::models::{Alert, Condition, TradingPair, parse_threshold};
use market_data::PriceSource;
use storage::AlertStore;
use tracing::{error, info};

use crate::actors::supervisor::ProcessSupervisor;
use crate::services::dialog_service::Prompter;
use crate::services::notification_service::Notifier;
use crate::services::sound_service::list_sound_files;

const APP_TITLE: &str = "Termux-Crypto-Alert";
const DEFAULT_EXPORT_FILE: &str = "crypto_alerts_backup.json";

const APP_INFO: &str = "Termux-Crypto-Alert

App for managing crypto
price alerts in Termux

Prices: KuCoin public ticker
Monitor runs in the background
and notifies every cycle while
an alert condition holds.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    AddAlert,
    RemoveAlert,
    ListAlerts,
    CheckPrice,
    StartMonitoring,
    StopMonitoring,
    RestartMonitoring,
    ExportAlerts,
    ImportAlerts,
    AppInfo,
    Exit,
}

impl MenuAction {
    pub const ALL: [MenuAction; 11] = [
        MenuAction::AddAlert,
        MenuAction::RemoveAlert,
        MenuAction::ListAlerts,
        MenuAction::CheckPrice,
        MenuAction::StartMonitoring,
        MenuAction::StopMonitoring,
        MenuAction::RestartMonitoring,
        MenuAction::ExportAlerts,
        MenuAction::ImportAlerts,
        MenuAction::AppInfo,
        MenuAction::Exit,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MenuAction::AddAlert => "➕ Add Alert",
            MenuAction::RemoveAlert => "🗑️ Remove Alert",
            MenuAction::ListAlerts => "📋 List Alerts",
            MenuAction::CheckPrice => "💱 Check Price",
            MenuAction::StartMonitoring => "🚀 Start Monitoring",
            MenuAction::StopMonitoring => "⏹️ Stop Monitoring",
            MenuAction::RestartMonitoring => "🔄 Restart Monitoring",
            MenuAction::ExportAlerts => "📤 Export Alerts",
            MenuAction::ImportAlerts => "📥 Import Alerts",
            MenuAction::AppInfo => "ℹ️ App Info",
            MenuAction::Exit => "❌ Exit",
        }
    }
}

/// The interactive foreground flow: alert CRUD plus monitor control.
pub struct AlertMenu {
    store: AlertStore,
    alerts: Vec<Alert>,
    prompter: Arc<dyn Prompter>,
    notifier: Arc<dyn Notifier>,
    source: Arc<dyn PriceSource>,
    supervisor: ProcessSupervisor,
    sound_dir: PathBuf,
}

impl AlertMenu {
    pub fn new(
        store: AlertStore,
        prompter: Arc<dyn Prompter>,
        notifier: Arc<dyn Notifier>,
        source: Arc<dyn PriceSource>,
        supervisor: ProcessSupervisor,
        sound_dir: PathBuf,
    ) -> Self {
        let alerts = store.load_or_default();
        info!("Loaded {} alerts from {}", alerts.len(), store.path().display());
        Self {
            store,
            alerts,
            prompter,
            notifier,
            source,
            supervisor,
            sound_dir,
        }
    }

    #[cfg(test)]
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub async fn run(&mut self) {
        let labels: Vec<String> = MenuAction::ALL
            .iter()
            .map(|a| a.label().to_string())
            .collect();

        loop {
            // A cancelled menu exits, as does the Exit entry.
            let action = self
                .prompter
                .choose(APP_TITLE, &labels)
                .await
                .and_then(|i| MenuAction::ALL.get(i).copied())
                .unwrap_or(MenuAction::Exit);

            if action == MenuAction::Exit {
                break;
            }
            self.handle(action).await;
        }

        self.notifier.toast("👋 Goodbye!").await;
    }

    pub async fn handle(&mut self, action: MenuAction) {
        match action {
            MenuAction::AddAlert => self.add_alert().await,
            MenuAction::RemoveAlert => self.remove_alert().await,
            MenuAction::ListAlerts => self.list_alerts().await,
            MenuAction::CheckPrice => self.check_price().await,
            MenuAction::StartMonitoring => {
                let outcome = self.supervisor.start();
                self.notifier.toast(&outcome.to_string()).await;
            }
            MenuAction::StopMonitoring => {
                let outcome = self.supervisor.stop();
                self.notifier.toast(&outcome.to_string()).await;
            }
            MenuAction::RestartMonitoring => {
                let (stopped, started) = self.supervisor.restart();
                if let Some(stopped) = stopped.filter(|s| !s.is_success()) {
                    self.notifier.toast(&stopped.to_string()).await;
                }
                self.notifier.toast(&started.to_string()).await;
            }
            MenuAction::ExportAlerts => self.export_alerts().await,
            MenuAction::ImportAlerts => self.import_alerts().await,
            MenuAction::AppInfo => self.prompter.show_text("ℹ️ App Info", APP_INFO).await,
            MenuAction::Exit => {}
        }
    }

    async fn add_alert(&mut self) {
        let Some(pair_input) = self
            .prompter
            .input("Enter trading pair (e.g., BTC/USDT):", "BTC/USDT")
            .await
        else {
            return;
        };
        let pair = match pair_input.parse::<TradingPair>() {
            Ok(pair) => pair,
            Err(e) => return self.notifier.toast(&e.to_string()).await,
        };

        let prompt = format!("Enter price threshold ({}):", pair.quote);
        let Some(price_input) = self.prompter.input(&prompt, "").await else {
            return;
        };
        let price = match parse_threshold(&price_input) {
            Ok(price) => price,
            Err(_) => return self.notifier.toast("Invalid price value").await,
        };

        let conditions = vec!["⬆️ above".to_string(), "⬇️ below".to_string()];
        let condition = match self.prompter.choose("Alert when price is", &conditions).await {
            Some(0) => Condition::Above,
            Some(_) => Condition::Below,
            None => return,
        };

        let mut alert = match Alert::from_pair(&pair.name(), condition, price) {
            Ok(alert) => alert,
            Err(e) => return self.notifier.toast(&e.to_string()).await,
        };
        if let Some(sound) = self.pick_sound().await {
            alert = alert.with_sound(sound);
        }

        let summary = format!("✅ Added alert for {}", alert);
        let mut updated = self.alerts.clone();
        updated.push(alert);
        if self.commit(updated).await {
            self.notifier.toast(&summary).await;
        }
    }

    async fn pick_sound(&self) -> Option<PathBuf> {
        if !self
            .prompter
            .confirm("🔔 Do you want to set a custom alert sound from the sound folder?")
            .await
        {
            return None;
        }

        let files = list_sound_files(&self.sound_dir);
        if files.is_empty() {
            self.notifier.toast("No sound files found in sound folder.").await;
            return None;
        }

        let names: Vec<String> = files.iter().map(|p| file_label(p)).collect();

        match self
            .prompter
            .choose("Select Alert Sound from Folder", &names)
            .await
        {
            Some(i) => files.into_iter().nth(i),
            None => {
                self.notifier.toast("No sound file selected, using default.").await;
                None
            }
        }
    }

    async fn remove_alert(&mut self) {
        if self.alerts.is_empty() {
            return self.notifier.toast("No alerts to remove").await;
        }

        let choices: Vec<String> = self
            .alerts
            .iter()
            .enumerate()
            .map(|(i, a)| format!("{}. {}", i + 1, a))
            .collect();

        let Some(index) = self
            .prompter
            .choose("Remove which alert?", &choices)
            .await
            .filter(|i| *i < self.alerts.len())
        else {
            return self.notifier.toast("❌ Invalid selection").await;
        };

        let mut updated = self.alerts.clone();
        let removed = updated.remove(index);
        if self.commit(updated).await {
            self.notifier
                .toast(&format!("🗑️ Removed alert for {}", removed.name))
                .await;
        }
    }

    async fn list_alerts(&self) {
        if self.alerts.is_empty() {
            return self.notifier.toast("No active alerts").await;
        }

        let mut text = String::from("Active Alerts:\n\n");
        for (i, alert) in self.alerts.iter().enumerate() {
            text.push_str(&format!("{}. {}\n", i + 1, alert));
        }
        self.prompter.show_text("📋 Active Alerts", &text).await;
    }

    async fn check_price(&self) {
        let Some(input) = self
            .prompter
            .input("Enter trading pair (e.g., BTC/USDT):", "BTC/USDT")
            .await
        else {
            return;
        };
        let pair = match input.parse::<TradingPair>() {
            Ok(pair) => pair,
            Err(e) => return self.notifier.toast(&e.to_string()).await,
        };

        let message = match self.source.fetch_price(&pair.symbol()).await {
            Ok(price) => format!("💱 {} = {} {}", pair.name(), price, pair.quote),
            Err(e) => format!("Error fetching price for {}: {}", pair.symbol(), e),
        };
        self.notifier.toast(&message).await;
    }

    async fn export_alerts(&self) {
        if self.alerts.is_empty() {
            return self.notifier.toast("No alerts to export").await;
        }
        let Some(target) = self
            .prompter
            .input("Export alerts to file:", DEFAULT_EXPORT_FILE)
            .await
        else {
            return;
        };

        let target = PathBuf::from(target);
        let message = match self.store.export_to(&self.alerts, &target) {
            Ok(()) => format!(
                "📤 Exported {} alerts to {}",
                self.alerts.len(),
                target.display()
            ),
            Err(e) => {
                error!("Export failed: {}", e);
                format!("Error exporting alerts: {}", e)
            }
        };
        self.notifier.toast(&message).await;
    }

    async fn import_alerts(&mut self) {
        let Some(source) = self
            .prompter
            .input("Import alerts from file:", DEFAULT_EXPORT_FILE)
            .await
        else {
            return;
        };

        let imported = match AlertStore::import_from(Path::new(&source)) {
            Ok(alerts) => alerts,
            Err(e) => {
                error!("Import failed: {}", e);
                return self
                    .notifier
                    .toast(&format!("Error importing alerts: {}", e))
                    .await;
            }
        };

        let question = format!(
            "Replace {} current alerts with {} imported alerts?",
            self.alerts.len(),
            imported.len()
        );
        if !self.prompter.confirm(&question).await {
            return;
        }

        let count = imported.len();
        if self.commit(imported).await {
            self.notifier
                .toast(&format!("📥 Imported {} alerts", count))
                .await;
        }
    }

    /// Persists `alerts` and adopts them; on failure the old list stays.
    async fn commit(&mut self, alerts: Vec<Alert>) -> bool {
        match self.store.save(&alerts) {
            Ok(()) => {
                self.alerts = alerts;
                true
            }
            Err(e) => {
                error!("Failed to save alerts: {}", e);
                self.notifier
                    .toast(&format!("Error saving alerts: {}", e))
                    .await;
                false
            }
        }
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

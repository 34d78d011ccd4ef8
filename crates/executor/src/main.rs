use std::env;
use std::sync::Arc;

use anyhow::Context;
use common::config::{Settings, UiMode};
use common::logger;
use market_data::KucoinClient;
use storage::{AlertStore, PidFile};
use tracing::{debug, info};

use crate::actors::monitor::MonitorLoop;
use crate::actors::supervisor::{DetachedProcess, MONITOR_MODE_ARG, ProcessSupervisor};
use crate::services::dialog_service::{ConsolePrompter, Prompter, TermuxDialog};
use crate::services::menu_service::AlertMenu;
use crate::services::notification_service::{ConsoleNotifier, Notifier, TermuxNotifier};
use crate::services::sound_service::MpvPlayer;

mod actors;
mod services;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load();
    logger::setup_logger();
    debug!("Settings: {:?}", settings);

    match env::args().nth(1).as_deref() {
        Some(MONITOR_MODE_ARG) => run_monitor(settings).await,
        _ => run_menu(settings).await,
    }
}

fn notifier_for(mode: UiMode) -> Arc<dyn Notifier> {
    match mode {
        UiMode::Termux => Arc::new(TermuxNotifier),
        UiMode::Console => Arc::new(ConsoleNotifier),
    }
}

async fn run_monitor(settings: Settings) -> anyhow::Result<()> {
    let source = KucoinClient::new(settings.price_api_url.clone())
        .context("Failed to build HTTP client")?;

    let monitor = MonitorLoop::new(
        AlertStore::new(settings.alerts_file.clone()),
        Arc::new(source),
        notifier_for(settings.ui_mode),
        Arc::new(MpvPlayer::new(settings.default_sound.clone())),
        Arc::new(PidFile::new(settings.pid_file.clone())),
        settings.poll_interval,
    );

    monitor.run().await
}

async fn run_menu(settings: Settings) -> anyhow::Result<()> {
    info!("Starting interactive menu...");

    let source = KucoinClient::new(settings.price_api_url.clone())
        .context("Failed to build HTTP client")?;
    let control = DetachedProcess::current(settings.monitor_log_file.clone())
        .context("Failed to locate the current executable")?;
    let supervisor = ProcessSupervisor::new(
        Arc::new(PidFile::new(settings.pid_file.clone())),
        Arc::new(control),
    );

    let prompter: Arc<dyn Prompter> = match settings.ui_mode {
        UiMode::Termux => Arc::new(TermuxDialog),
        UiMode::Console => Arc::new(ConsolePrompter::new()),
    };

    let mut menu = AlertMenu::new(
        AlertStore::new(settings.alerts_file.clone()),
        prompter,
        notifier_for(settings.ui_mode),
        Arc::new(source),
        supervisor,
        settings.sound_dir.clone(),
    );
    menu.run().await;

    info!("Shutdown complete");
    Ok(())
}

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{error, info};

const NOTIFICATION_TITLE: &str = "Crypto Alert";

/// Device-level user feedback. Implementations swallow their own failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// High-priority notification for a triggered alert.
    async fn notify(&self, message: &str);

    /// Short-lived status message.
    async fn toast(&self, message: &str);
}

pub struct TermuxNotifier;

#[async_trait]
impl Notifier for TermuxNotifier {
    async fn notify(&self, message: &str) {
        let result = Command::new("termux-notification")
            .args(["--title", NOTIFICATION_TITLE])
            .args(["--content", message])
            .args(["--priority", "high"])
            .status()
            .await;

        match result {
            Ok(status) if status.success() => info!("Notification sent: {}", message),
            Ok(status) => {
                error!("termux-notification exited with {}", status);
                self.toast(&format!("Error sending notification: {}", status)).await;
            }
            Err(e) => {
                error!("Failed to run termux-notification: {}", e);
                self.toast(&format!("Error sending notification: {}", e)).await;
            }
        }
    }

    async fn toast(&self, message: &str) {
        let result = Command::new("termux-toast")
            .args(["-g", "middle", message])
            .status()
            .await;

        if let Err(e) = result {
            // No toast to report a broken toast; the log is all we have.
            error!("Failed to run termux-toast ({}): {}", e, message);
        }
    }
}

/// Plain-terminal fallback used outside Termux.
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, message: &str) {
        info!("Notification: {}", message);
        println!("\x07[{}] {}", NOTIFICATION_TITLE, message);
    }

    async fn toast(&self, message: &str) {
        println!("{}", message);
    }
}

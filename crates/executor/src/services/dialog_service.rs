use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, error};

/// Interactive prompt primitives. `None`/`false` means the user cancelled.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Prompter: Send + Sync {
    async fn choose(&self, title: &str, options: &[String]) -> Option<usize>;

    async fn input(&self, title: &str, hint: &str) -> Option<String>;

    async fn confirm(&self, title: &str) -> bool;

    async fn show_text(&self, title: &str, text: &str);
}

#[derive(Deserialize, Debug, Default)]
struct DialogResult {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    text: String,
    #[serde(default)]
    index: Option<usize>,
}

const DIALOG_CANCELLED: i32 = -2;

impl DialogResult {
    fn parse(stdout: &str) -> Option<Self> {
        match serde_json::from_str::<DialogResult>(stdout.trim()) {
            Ok(result) if result.code != DIALOG_CANCELLED => Some(result),
            Ok(_) => None,
            Err(e) => {
                error!("Error parsing dialog output: {} (raw: {:?})", e, stdout);
                None
            }
        }
    }
}

/// termux-dialog backed prompts (requires the termux-api package).
pub struct TermuxDialog;

impl TermuxDialog {
    async fn run(&self, args: &[&str]) -> Option<DialogResult> {
        let output = match Command::new("termux-dialog").args(args).output().await {
            Ok(output) => output,
            Err(e) => {
                error!("termux-dialog not available ({}). Is termux-api installed?", e);
                return None;
            }
        };

        if !output.status.success() {
            error!(
                "termux-dialog exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            );
            return None;
        }

        DialogResult::parse(&String::from_utf8_lossy(&output.stdout))
    }
}

// termux-dialog splits its -v list on commas.
fn dialog_values(options: &[String]) -> String {
    options
        .iter()
        .map(|o| o.replace(',', ";"))
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait]
impl Prompter for TermuxDialog {
    async fn choose(&self, title: &str, options: &[String]) -> Option<usize> {
        let values = dialog_values(options);
        let result = self.run(&["radio", "-t", title, "-v", &values]).await?;
        debug!("Dialog selection: {:?}", result);
        result.index.filter(|i| *i < options.len())
    }

    async fn input(&self, title: &str, hint: &str) -> Option<String> {
        let result = self.run(&["text", "-t", title, "-i", hint]).await?;
        let text = result.text.trim().to_string();
        (!text.is_empty()).then_some(text)
    }

    async fn confirm(&self, title: &str) -> bool {
        self.run(&["confirm", "-t", title])
            .await
            .map(|r| r.text == "yes")
            .unwrap_or(false)
    }

    async fn show_text(&self, title: &str, text: &str) {
        let _ = self.run(&["text", "-t", title, "-i", text]).await;
    }
}

/// Line-based prompts on stdin/stdout.
pub struct ConsolePrompter {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl ConsolePrompter {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    async fn read_line(&self, prompt: &str) -> Option<String> {
        let mut stdout = tokio::io::stdout();
        let _ = stdout.write_all(prompt.as_bytes()).await;
        let _ = stdout.flush().await;

        match self.lines.lock().await.next_line().await {
            Ok(Some(line)) => Some(line.trim().to_string()),
            Ok(None) => None,
            Err(e) => {
                error!("Failed to read from stdin: {}", e);
                None
            }
        }
    }
}

impl Default for ConsolePrompter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Prompter for ConsolePrompter {
    async fn choose(&self, title: &str, options: &[String]) -> Option<usize> {
        println!("\n{}", title);
        for (i, option) in options.iter().enumerate() {
            println!("  {}. {}", i + 1, option);
        }
        loop {
            let line = self.read_line("> ").await?;
            match line.parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Some(n - 1),
                _ if line.is_empty() => return None,
                _ => println!("Invalid selection, enter 1-{}", options.len()),
            }
        }
    }

    async fn input(&self, title: &str, hint: &str) -> Option<String> {
        let prompt = if hint.is_empty() {
            format!("{} ", title)
        } else {
            format!("{} [{}] ", title, hint)
        };
        self.read_line(&prompt).await.filter(|l| !l.is_empty())
    }

    async fn confirm(&self, title: &str) -> bool {
        self.read_line(&format!("{} [y/N] ", title))
            .await
            .map(|l| matches!(l.to_lowercase().as_str(), "y" | "yes"))
            .unwrap_or(false)
    }

    async fn show_text(&self, title: &str, text: &str) {
        println!("\n{}\n{}", title, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_radio_selection() {
        let raw = r#"{"code": -1, "text": "📋 List Alerts", "index": 2}"#;
        let r = DialogResult::parse(raw).unwrap();
        assert_eq!(r.index, Some(2));
        assert_eq!(r.text, "📋 List Alerts");
    }

    #[test]
    fn cancelled_dialog_is_none() {
        assert!(DialogResult::parse(r#"{"code": -2, "text": ""}"#).is_none());
    }

    #[test]
    fn garbage_output_is_none() {
        assert!(DialogResult::parse("termux-api not running").is_none());
    }

    #[test]
    fn commas_are_stripped_from_dialog_values() {
        let options = vec!["1. BTC/USDT: above 1,000".to_string(), "Exit".to_string()];
        assert_eq!(dialog_values(&options), "1. BTC/USDT: above 1;000,Exit");
    }
}

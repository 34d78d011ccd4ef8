use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_ALERTS_FILE: &str = ".crypto_alerts.json";
const DEFAULT_PID_FILE: &str = "crypto_monitor.pid";
const DEFAULT_PRICE_API_URL: &str = "https://api.kucoin.com";
const DEFAULT_SOUND_NAME: &str = "alertcoin.mp3";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiMode {
    Termux,
    Console,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub alerts_file: PathBuf,
    pub pid_file: PathBuf,
    pub poll_interval: Duration,
    pub price_api_url: String,
    pub sound_dir: PathBuf,
    pub default_sound: PathBuf,
    pub monitor_log_file: Option<PathBuf>,
    pub ui_mode: UiMode,
}

impl Settings {
    pub fn load() -> Self {
        // Loads .env if present (no crash if missing)
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup so defaults can be tested
    /// without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let alerts_file = var("ALERTS_FILE").map(PathBuf::from).unwrap_or_else(|| {
            var("HOME")
                .map(|home| Path::new(&home).join(DEFAULT_ALERTS_FILE))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ALERTS_FILE))
        });

        let pid_file = var("PID_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PID_FILE));

        let poll_interval = var("POLL_INTERVAL_SECS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|secs| *secs >= 1)
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);

        let price_api_url = var("PRICE_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_PRICE_API_URL.to_string());

        let sound_dir = var("SOUND_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(executable_dir);

        let default_sound = var("DEFAULT_SOUND")
            .map(PathBuf::from)
            .unwrap_or_else(|| sound_dir.join(DEFAULT_SOUND_NAME));

        let monitor_log_file = var("MONITOR_LOG_FILE").map(PathBuf::from);

        let ui_mode = match var("UI_MODE").map(|m| m.to_lowercase()).as_deref() {
            Some("console") => UiMode::Console,
            _ => UiMode::Termux,
        };

        Settings {
            alerts_file,
            pid_file,
            poll_interval: Duration::from_secs(poll_interval),
            price_api_url,
            sound_dir,
            default_sound,
            monitor_log_file,
            ui_mode,
        }
    }
}

fn executable_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_with(vars: &[(&str, &str)]) -> Settings {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let s = settings_with(&[("HOME", "/home/user")]);
        assert_eq!(s.alerts_file, PathBuf::from("/home/user/.crypto_alerts.json"));
        assert_eq!(s.pid_file, PathBuf::from("crypto_monitor.pid"));
        assert_eq!(s.poll_interval, Duration::from_secs(30));
        assert_eq!(s.price_api_url, "https://api.kucoin.com");
        assert_eq!(s.default_sound, s.sound_dir.join("alertcoin.mp3"));
        assert_eq!(s.monitor_log_file, None);
        assert_eq!(s.ui_mode, UiMode::Termux);
    }

    #[test]
    fn overrides_are_honoured() {
        let s = settings_with(&[
            ("ALERTS_FILE", "/tmp/alerts.json"),
            ("PID_FILE", "/tmp/monitor.pid"),
            ("POLL_INTERVAL_SECS", "5"),
            ("PRICE_API_URL", "http://localhost:8080/"),
            ("SOUND_DIR", "/sounds"),
            ("MONITOR_LOG_FILE", "/tmp/monitor.log"),
            ("UI_MODE", "Console"),
        ]);
        assert_eq!(s.alerts_file, PathBuf::from("/tmp/alerts.json"));
        assert_eq!(s.pid_file, PathBuf::from("/tmp/monitor.pid"));
        assert_eq!(s.poll_interval, Duration::from_secs(5));
        assert_eq!(s.price_api_url, "http://localhost:8080");
        assert_eq!(s.default_sound, PathBuf::from("/sounds/alertcoin.mp3"));
        assert_eq!(s.monitor_log_file, Some(PathBuf::from("/tmp/monitor.log")));
        assert_eq!(s.ui_mode, UiMode::Console);
    }

    #[test]
    fn invalid_interval_falls_back_to_default() {
        assert_eq!(
            settings_with(&[("POLL_INTERVAL_SECS", "0")]).poll_interval,
            Duration::from_secs(30)
        );
        assert_eq!(
            settings_with(&[("POLL_INTERVAL_SECS", "soon")]).poll_interval,
            Duration::from_secs(30)
        );
    }
}

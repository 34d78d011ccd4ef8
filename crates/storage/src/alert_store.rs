use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use common::models::Alert;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Alert file I/O error ({path}): {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Alert file is not a valid alert list ({path}): {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Durable, ordered list of alerts kept in a single JSON file.
///
/// The file is rewritten wholesale on every save. There is no locking between
/// the menu process and the background monitor; the monitor re-reads it every
/// cycle and the last writer wins.
#[derive(Debug, Clone)]
pub struct AlertStore {
    path: PathBuf,
}

impl AlertStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty list; a malformed one is an error.
    pub fn load(&self) -> Result<Vec<Alert>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => parse_alerts(&self.path, &content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Like [`load`](Self::load), but degrades every failure to an empty list.
    pub fn load_or_default(&self) -> Vec<Alert> {
        self.load().unwrap_or_else(|e| {
            warn!("{}. Starting with an empty alert list.", e);
            Vec::new()
        })
    }

    pub fn save(&self, alerts: &[Alert]) -> Result<(), StoreError> {
        write_alerts(&self.path, alerts)?;
        debug!("Saved {} alerts to {}", alerts.len(), self.path.display());
        Ok(())
    }

    pub fn export_to(&self, alerts: &[Alert], target: &Path) -> Result<(), StoreError> {
        write_alerts(target, alerts)
    }

    /// Reads an exported list. The caller decides whether to replace the store with it.
    pub fn import_from(source: &Path) -> Result<Vec<Alert>, StoreError> {
        let content = fs::read_to_string(source).map_err(|e| StoreError::Io {
            path: source.to_path_buf(),
            source: e,
        })?;
        parse_alerts(source, &content)
    }
}

fn parse_alerts(path: &Path, content: &str) -> Result<Vec<Alert>, StoreError> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(content).map_err(|source| StoreError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

// Written to a sibling file first and renamed, so a concurrent reader sees
// either the old list or the new one, never half of it.
fn write_alerts(path: &Path, alerts: &[Alert]) -> Result<(), StoreError> {
    let io_err = |source: io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let json = serde_json::to_string_pretty(alerts).map_err(|source| StoreError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = fs::File::create(&tmp).map_err(io_err)?;
    file.write_all(json.as_bytes()).map_err(io_err)?;
    file.write_all(b"\n").map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    drop(file);

    fs::rename(&tmp, path).map_err(io_err)
}

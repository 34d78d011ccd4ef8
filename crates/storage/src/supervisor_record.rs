use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("No supervisor record at {0}")]
    Missing(PathBuf),
    #[error("Invalid PID in supervisor record: '{0}'")]
    InvalidPid(String),
    #[error("Supervisor record I/O error: {0}")]
    Io(#[from] io::Error),
}

/// The durable marker that a background monitor is (believed to be) running.
///
/// Presence means active, absence means inactive. It is the only state shared
/// by the foreground and background processes besides the alert file.
pub trait SupervisorRecord: Send + Sync {
    fn exists(&self) -> bool;

    fn read(&self) -> Result<i32, RecordError>;

    fn write(&self, pid: u32) -> Result<(), RecordError>;

    /// Removing an absent record is not an error.
    fn remove(&self) -> Result<(), RecordError>;
}

/// Single-line PID file, relative to the working directory by default.
#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SupervisorRecord for PidFile {
    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn read(&self) -> Result<i32, RecordError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(RecordError::Missing(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let trimmed = content.trim();
        match trimmed.parse::<i32>() {
            Ok(pid) if pid > 0 => Ok(pid),
            _ => Err(RecordError::InvalidPid(trimmed.to_string())),
        }
    }

    fn write(&self, pid: u32) -> Result<(), RecordError> {
        fs::write(&self.path, format!("{}\n", pid))?;
        Ok(())
    }

    fn remove(&self) -> Result<(), RecordError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

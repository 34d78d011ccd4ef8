use std::fmt;
use std::fs::OpenOptions;
use std::io;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;

use nix::errno::Errno;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use storage::{RecordError, SupervisorRecord};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Argument that makes the binary run the monitor loop instead of the menu.
pub const MONITOR_MODE_ARG: &str = "monitor";

#[derive(Error, Debug, PartialEq)]
pub enum SignalError {
    #[error("process not found")]
    NotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("signal failed: {0}")]
    Other(Errno),
}

impl From<Errno> for SignalError {
    fn from(errno: Errno) -> Self {
        match errno {
            Errno::ESRCH => SignalError::NotFound,
            Errno::EPERM => SignalError::PermissionDenied,
            other => SignalError::Other(other),
        }
    }
}

/// OS-facing half of the supervisor: launching and signalling the monitor.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessControl: Send + Sync {
    /// Starts a detached monitor and returns its PID.
    fn launch(&self) -> io::Result<u32>;

    /// Liveness check on the process group led by `pid`.
    fn probe(&self, pid: i32) -> Result<(), SignalError>;

    /// SIGTERM to the process group led by `pid`.
    fn terminate(&self, pid: i32) -> Result<(), SignalError>;
}

/// Re-executes the current binary in monitor mode, in its own process group
/// so it outlives the terminal that started it.
pub struct DetachedProcess {
    executable: PathBuf,
    log_file: Option<PathBuf>,
}

impl DetachedProcess {
    pub fn new(executable: PathBuf, log_file: Option<PathBuf>) -> Self {
        Self {
            executable,
            log_file,
        }
    }

    pub fn current(log_file: Option<PathBuf>) -> io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?, log_file))
    }

    fn stderr(&self) -> Stdio {
        let Some(path) = &self.log_file else {
            return Stdio::null();
        };
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Stdio::from(file),
            Err(e) => {
                warn!("Cannot open monitor log {}: {}", path.display(), e);
                Stdio::null()
            }
        }
    }
}

impl ProcessControl for DetachedProcess {
    fn launch(&self) -> io::Result<u32> {
        let mut child = Command::new(&self.executable)
            .arg(MONITOR_MODE_ARG)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(self.stderr())
            .process_group(0)
            .spawn()?;

        let pid = child.id();

        // Reap the child when it exits so it does not linger as a zombie
        // for the lifetime of the menu.
        thread::spawn(move || match child.wait() {
            Ok(status) => debug!("Monitor process {} exited with {}", pid, status),
            Err(e) => debug!("Failed to wait on monitor process {}: {}", pid, e),
        });

        Ok(pid)
    }

    fn probe(&self, pid: i32) -> Result<(), SignalError> {
        killpg(Pid::from_raw(pid), None::<Signal>).map_err(SignalError::from)
    }

    fn terminate(&self, pid: i32) -> Result<(), SignalError> {
        killpg(Pid::from_raw(pid), Signal::SIGTERM).map_err(SignalError::from)
    }
}

#[derive(Debug, PartialEq)]
pub enum StartOutcome {
    Started(u32),
    AlreadyRunning,
    Failed(String),
}

impl fmt::Display for StartOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartOutcome::Started(_) => write!(f, "🚀 Monitoring started in background"),
            StartOutcome::AlreadyRunning => write!(
                f,
                "Monitoring is already running. Stop it first to restart."
            ),
            StartOutcome::Failed(reason) => write!(f, "Error starting monitoring: {}", reason),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum StopOutcome {
    Stopped(i32),
    NotRunning,
    /// The recorded process was gone; the record has been removed.
    StaleRecord(i32),
    /// Record kept so the stop can be retried with more privileges.
    PermissionDenied(i32),
    /// Unparsable record; it has been removed.
    InvalidRecord(String),
    Failed(String),
}

impl StopOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StopOutcome::Stopped(_) | StopOutcome::StaleRecord(_))
    }
}

impl fmt::Display for StopOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopOutcome::Stopped(_) => write!(f, "⏹️ Monitoring stopped."),
            StopOutcome::NotRunning => write!(f, "Monitoring is not running."),
            StopOutcome::StaleRecord(_) => write!(
                f,
                "Warning: Monitoring process not found (PID from file). PID file removed."
            ),
            StopOutcome::PermissionDenied(_) => write!(
                f,
                "Error: Permission denied to stop monitoring process."
            ),
            StopOutcome::InvalidRecord(_) => {
                write!(f, "Error: Invalid PID in file. PID file removed.")
            }
            StopOutcome::Failed(reason) => {
                write!(f, "Error stopping monitoring process: {}", reason)
            }
        }
    }
}

/// Starts and stops the background monitor, tracked through a [`SupervisorRecord`].
///
/// Never fails: every OS or file error becomes an outcome the caller can show.
pub struct ProcessSupervisor {
    record: Arc<dyn SupervisorRecord>,
    control: Arc<dyn ProcessControl>,
}

impl ProcessSupervisor {
    pub fn new(record: Arc<dyn SupervisorRecord>, control: Arc<dyn ProcessControl>) -> Self {
        Self { record, control }
    }

    pub fn start(&self) -> StartOutcome {
        if self.record.exists() {
            info!("Start requested but a supervisor record already exists.");
            return StartOutcome::AlreadyRunning;
        }

        let pid = match self.control.launch() {
            Ok(pid) => pid,
            Err(e) => {
                error!("Error starting background monitoring: {}", e);
                return StartOutcome::Failed(e.to_string());
            }
        };

        if let Err(e) = self.record.write(pid) {
            // An unrecorded monitor could never be stopped from here.
            error!("Failed to record monitor PID {}: {}", pid, e);
            if let Err(kill_err) = self.control.terminate(pid as i32) {
                error!("Failed to terminate unrecorded monitor {}: {}", pid, kill_err);
            }
            return StartOutcome::Failed(e.to_string());
        }

        info!("Background monitoring started with PID {}.", pid);
        StartOutcome::Started(pid)
    }

    pub fn stop(&self) -> StopOutcome {
        if !self.record.exists() {
            info!("Monitoring is not running (no supervisor record).");
            return StopOutcome::NotRunning;
        }

        let pid = match self.record.read() {
            Ok(pid) => pid,
            Err(RecordError::Missing(_)) => {
                warn!("Supervisor record vanished before it could be read.");
                return StopOutcome::NotRunning;
            }
            Err(RecordError::InvalidPid(content)) => {
                error!("Invalid PID {:?} in supervisor record, removing it.", content);
                self.remove_record();
                return StopOutcome::InvalidRecord(content);
            }
            Err(e) => {
                error!("Error reading supervisor record: {}", e);
                return StopOutcome::Failed(e.to_string());
            }
        };

        debug!("Attempting to stop monitoring process {}.", pid);
        let signalled = self
            .control
            .probe(pid)
            .and_then(|()| self.control.terminate(pid));

        match signalled {
            Ok(()) => {
                self.remove_record();
                info!("Monitoring process {} stopped.", pid);
                StopOutcome::Stopped(pid)
            }
            Err(SignalError::NotFound) => {
                warn!("Monitoring process {} not found, removing stale record.", pid);
                self.remove_record();
                StopOutcome::StaleRecord(pid)
            }
            Err(SignalError::PermissionDenied) => {
                error!("Permission denied to stop monitoring process {}.", pid);
                StopOutcome::PermissionDenied(pid)
            }
            Err(e) => {
                error!("Error stopping monitoring process {}: {}", pid, e);
                StopOutcome::Failed(e.to_string())
            }
        }
    }

    /// Stops first when a record exists; the start still runs even if the
    /// stop failed, and then reports `AlreadyRunning`.
    pub fn restart(&self) -> (Option<StopOutcome>, StartOutcome) {
        let stopped = self.record.exists().then(|| self.stop());
        (stopped, self.start())
    }

    fn remove_record(&self) {
        if let Err(e) = self.record.remove() {
            error!("Failed to remove supervisor record: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use storage::PidFile;

    fn pid_file() -> Arc<PidFile> {
        let path = std::env::temp_dir().join(format!("monitor_{}.pid", uuid::Uuid::new_v4()));
        Arc::new(PidFile::new(path))
    }

    fn supervisor(record: Arc<PidFile>, control: MockProcessControl) -> ProcessSupervisor {
        ProcessSupervisor::new(record, Arc::new(control))
    }

    #[test]
    fn start_launches_and_records_pid() {
        let record = pid_file();
        let mut control = MockProcessControl::new();
        control.expect_launch().times(1).returning(|| Ok(31337));

        let outcome = supervisor(record.clone(), control).start();

        assert_eq!(outcome, StartOutcome::Started(31337));
        assert_eq!(record.read().unwrap(), 31337);
        record.remove().unwrap();
    }

    #[test]
    fn start_with_existing_record_launches_nothing() {
        let record = pid_file();
        record.write(1111).unwrap();
        let mut control = MockProcessControl::new();
        control.expect_launch().never();

        let outcome = supervisor(record.clone(), control).start();

        assert_eq!(outcome, StartOutcome::AlreadyRunning);
        assert_eq!(fs::read_to_string(record.path()).unwrap(), "1111\n");
        record.remove().unwrap();
    }

    #[test]
    fn failed_launch_leaves_no_record() {
        let record = pid_file();
        let mut control = MockProcessControl::new();
        control
            .expect_launch()
            .returning(|| Err(io::Error::new(io::ErrorKind::NotFound, "no binary")));

        let outcome = supervisor(record.clone(), control).start();

        assert!(matches!(outcome, StartOutcome::Failed(_)));
        assert!(!record.exists());
    }

    #[test]
    fn stop_without_record_is_not_running() {
        let mut control = MockProcessControl::new();
        control.expect_probe().never();
        control.expect_terminate().never();

        assert_eq!(supervisor(pid_file(), control).stop(), StopOutcome::NotRunning);
    }

    #[test]
    fn stop_signals_group_and_removes_record() {
        let record = pid_file();
        record.write(2222).unwrap();
        let mut control = MockProcessControl::new();
        control.expect_probe().withf(|pid| *pid == 2222).times(1).returning(|_| Ok(()));
        control.expect_terminate().withf(|pid| *pid == 2222).times(1).returning(|_| Ok(()));

        let outcome = supervisor(record.clone(), control).stop();

        assert_eq!(outcome, StopOutcome::Stopped(2222));
        assert!(outcome.is_success());
        assert!(!record.exists());
    }

    #[test]
    fn stop_with_dead_process_removes_stale_record() {
        let record = pid_file();
        record.write(3333).unwrap();
        let mut control = MockProcessControl::new();
        control.expect_probe().returning(|_| Err(SignalError::NotFound));
        control.expect_terminate().never();

        let outcome = supervisor(record.clone(), control).stop();

        assert_eq!(outcome, StopOutcome::StaleRecord(3333));
        assert!(!record.exists());
    }

    #[test]
    fn stop_without_permission_keeps_record() {
        let record = pid_file();
        record.write(1).unwrap();
        let mut control = MockProcessControl::new();
        control.expect_probe().returning(|_| Ok(()));
        control.expect_terminate().returning(|_| Err(SignalError::PermissionDenied));

        let outcome = supervisor(record.clone(), control).stop();

        assert_eq!(outcome, StopOutcome::PermissionDenied(1));
        assert!(!outcome.is_success());
        assert_eq!(record.read().unwrap(), 1);
        record.remove().unwrap();
    }

    #[test]
    fn stop_with_corrupt_record_removes_it() {
        let record = pid_file();
        fs::write(record.path(), "garbage").unwrap();
        let mut control = MockProcessControl::new();
        control.expect_probe().never();

        let outcome = supervisor(record.clone(), control).stop();

        assert_eq!(outcome, StopOutcome::InvalidRecord("garbage".to_string()));
        assert!(!record.exists());
    }

    #[test]
    fn restart_stops_then_starts() {
        let record = pid_file();
        record.write(4444).unwrap();
        let mut control = MockProcessControl::new();
        control.expect_probe().returning(|_| Ok(()));
        control.expect_terminate().times(1).returning(|_| Ok(()));
        control.expect_launch().times(1).returning(|| Ok(5555));

        let (stopped, started) = supervisor(record.clone(), control).restart();

        assert_eq!(stopped, Some(StopOutcome::Stopped(4444)));
        assert_eq!(started, StartOutcome::Started(5555));
        assert_eq!(record.read().unwrap(), 5555);
        record.remove().unwrap();
    }

    #[test]
    fn restart_without_record_only_starts() {
        let record = pid_file();
        let mut control = MockProcessControl::new();
        control.expect_probe().never();
        control.expect_launch().times(1).returning(|| Ok(6666));

        let (stopped, started) = supervisor(record.clone(), control).restart();

        assert_eq!(stopped, None);
        assert_eq!(started, StartOutcome::Started(6666));
        record.remove().unwrap();
    }

    #[test]
    fn errno_maps_to_signal_error() {
        assert_eq!(SignalError::from(Errno::ESRCH), SignalError::NotFound);
        assert_eq!(SignalError::from(Errno::EPERM), SignalError::PermissionDenied);
        assert_eq!(SignalError::from(Errno::EINVAL), SignalError::Other(Errno::EINVAL));
    }

    #[test]
    fn probing_a_nonexistent_group_reports_not_found() {
        let control = DetachedProcess::new(PathBuf::from("/bin/true"), None);
        // Above the kernel's pid_max, so no such group can exist.
        assert_eq!(control.probe(i32::MAX - 1), Err(SignalError::NotFound));
    }
}

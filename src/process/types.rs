use std::fmt;
use std::process::ExitStatus;
use std::time::{Duration, SystemTime};

/// State of the current instance of one restart cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Starting,
    Running { pid: u32 },
    Exited { pid: u32, exit: ExitInfo },
}

impl ProcessState {
    pub fn pid(&self) -> Option<u32> {
        match self {
            ProcessState::Starting => None,
            ProcessState::Running { pid } | ProcessState::Exited { pid, .. } => Some(*pid),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ProcessState::Running { .. })
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessState::Starting => write!(f, "starting"),
            ProcessState::Running { pid } => write!(f, "running (pid {})", pid),
            ProcessState::Exited { pid, exit } => write!(f, "exited (pid {}, {})", pid, exit),
        }
    }
}

/// How a child terminated
///
/// On Unix a child killed by a signal has no exit code; the signal number is
/// kept instead. Both are `None` when the wait itself failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl ExitInfo {
    pub fn unknown() -> Self {
        Self {
            code: None,
            signal: None,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for ExitInfo {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

impl fmt::Display for ExitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "code {}", code),
            (None, Some(signal)) => write!(f, "signal {}", signal_name(signal)),
            (None, None) => write!(f, "unknown status"),
        }
    }
}

#[cfg(unix)]
fn signal_name(signal: i32) -> String {
    match nix::sys::signal::Signal::try_from(signal) {
        Ok(sig) => sig.as_str().to_string(),
        Err(_) => signal.to_string(),
    }
}

#[cfg(not(unix))]
fn signal_name(signal: i32) -> String {
    signal.to_string()
}

/// Counters for one restart cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleStats {
    /// Successful launches, including the first one
    pub launches: u64,
    /// Exits observed; every one is followed by a relaunch
    pub restarts: u64,
    /// Launch attempts the OS refused
    pub launch_failures: u64,
    pub last_started: Option<SystemTime>,
}

impl CycleStats {
    pub fn new() -> Self {
        Self {
            launches: 0,
            restarts: 0,
            launch_failures: 0,
            last_started: None,
        }
    }

    pub fn record_launch(&mut self) {
        self.launches += 1;
        self.last_started = Some(SystemTime::now());
    }

    pub fn record_exit(&mut self) {
        self.restarts += 1;
    }

    pub fn record_launch_failure(&mut self) {
        self.launch_failures += 1;
    }

    /// Time since the current instance was started
    pub fn uptime(&self) -> Option<Duration> {
        self.last_started
            .map(|t| SystemTime::now().duration_since(t).unwrap_or_default())
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot published by a restart cycle after every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSnapshot {
    pub state: ProcessState,
    pub stats: CycleStats,
}

/// Notification emitted for every observable supervision event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    Started {
        index: usize,
        pid: u32,
    },
    Exited {
        index: usize,
        pid: u32,
        exit: ExitInfo,
    },
    LaunchFailed {
        index: usize,
        error: String,
        retry_in: Duration,
    },
}

impl SupervisorEvent {
    /// Index of the spec the event belongs to
    pub fn index(&self) -> usize {
        match self {
            SupervisorEvent::Started { index, .. }
            | SupervisorEvent::Exited { index, .. }
            | SupervisorEvent::LaunchFailed { index, .. } => *index,
        }
    }
}

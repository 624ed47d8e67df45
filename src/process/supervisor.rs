use crate::error::Result;
use crate::process::restart::LaunchRetryPolicy;
use crate::process::spawner::{launch, SpawnedProcess};
use crate::process::spec::{validate_all, ProcessSpec};
use crate::process::types::{CycleSnapshot, CycleStats, ExitInfo, ProcessState, SupervisorEvent};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Keeps every configured process alive for as long as it runs
///
/// Each spec gets its own restart cycle: launch, wait for exit, launch again.
/// Cycles share nothing, so a crash loop in one never affects another.
#[derive(Debug, Clone)]
pub struct Supervisor {
    specs: Arc<[ProcessSpec]>,
    retry_policy: LaunchRetryPolicy,
    events: Option<mpsc::UnboundedSender<SupervisorEvent>>,
}

impl Supervisor {
    /// Create a supervisor for a non-empty set of valid specs
    pub fn new(specs: Vec<ProcessSpec>) -> Result<Self> {
        validate_all(&specs)?;

        Ok(Self {
            specs: specs.into(),
            retry_policy: LaunchRetryPolicy::default(),
            events: None,
        })
    }

    /// Also publish every event on `events`
    pub fn with_events(mut self, events: mpsc::UnboundedSender<SupervisorEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: LaunchRetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn specs(&self) -> &[ProcessSpec] {
        &self.specs
    }

    /// Start one restart cycle per spec, in configuration order
    pub fn start(&self) -> Vec<SupervisionHandle> {
        (0..self.specs.len())
            .filter_map(|index| self.supervise(index))
            .collect()
    }

    /// Start the restart cycle for the spec at `index`
    ///
    /// The first instance is launched before this returns; everything after
    /// that happens on a background task. Must be called from within a tokio
    /// runtime. Returns `None` if there is no spec at `index`.
    pub fn supervise(&self, index: usize) -> Option<SupervisionHandle> {
        let spec = self.specs.get(index)?.clone();
        let (state_tx, state_rx) = watch::channel(CycleSnapshot {
            state: ProcessState::Starting,
            stats: CycleStats::new(),
        });

        let mut cycle = RestartCycle {
            index,
            spec: spec.clone(),
            retry_policy: self.retry_policy.clone(),
            events: self.events.clone(),
            state: state_tx,
            stats: CycleStats::new(),
            consecutive_failures: 0,
        };

        let first = cycle.try_launch();
        let task = tokio::spawn(cycle.run(first));

        Some(SupervisionHandle {
            index,
            spec,
            snapshot: state_rx,
            task,
        })
    }

    /// Start every cycle and block until the host is asked to stop
    ///
    /// Supervision itself never ends; this only returns on Ctrl-C or SIGTERM.
    /// Children keep running after the supervisor exits.
    pub async fn run_until_shutdown(&self) -> Result<()> {
        info!("Starting process watchdog for {} process(es)", self.specs.len());
        let handles = self.start();

        wait_for_shutdown_signal().await?;

        info!("Shutdown requested, leaving {} process(es) running", handles.len());
        for handle in &handles {
            handle.abort();
        }

        Ok(())
    }
}

/// Read-only view of one restart cycle
#[derive(Debug)]
pub struct SupervisionHandle {
    index: usize,
    spec: ProcessSpec,
    snapshot: watch::Receiver<CycleSnapshot>,
    task: JoinHandle<()>,
}

impl SupervisionHandle {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn spec(&self) -> &ProcessSpec {
        &self.spec
    }

    pub fn state(&self) -> ProcessState {
        self.snapshot.borrow().state
    }

    pub fn stats(&self) -> CycleStats {
        self.snapshot.borrow().stats
    }

    /// PID of the current (or most recently exited) instance
    pub fn pid(&self) -> Option<u32> {
        self.state().pid()
    }

    /// Subscribe to state changes of this cycle
    pub fn subscribe(&self) -> watch::Receiver<CycleSnapshot> {
        self.snapshot.clone()
    }

    /// Stop watching this cycle; the current child is left running
    pub fn abort(&self) {
        self.task.abort();
    }
}

/// State owned by the task that drives a single spec
struct RestartCycle {
    index: usize,
    spec: ProcessSpec,
    retry_policy: LaunchRetryPolicy,
    events: Option<mpsc::UnboundedSender<SupervisorEvent>>,
    state: watch::Sender<CycleSnapshot>,
    stats: CycleStats,
    consecutive_failures: u32,
}

impl RestartCycle {
    async fn run(mut self, first: Option<SpawnedProcess>) {
        let mut next = first;

        loop {
            let spawned = match next.take() {
                Some(spawned) => spawned,
                None => self.launch_with_retry().await,
            };

            let (pid, exit) = self.wait_for_exit(spawned).await;
            self.on_exit(pid, exit);
            next = self.try_launch();
        }
    }

    /// One launch attempt; failures are logged and counted
    fn try_launch(&mut self) -> Option<SpawnedProcess> {
        self.publish(ProcessState::Starting);

        match launch(&self.spec) {
            Ok(spawned) => {
                self.consecutive_failures = 0;
                self.stats.record_launch();
                info!(
                    index = self.index,
                    pid = spawned.pid,
                    "Process '{}' started with PID {}",
                    self.spec.label(),
                    spawned.pid
                );
                self.publish(ProcessState::Running { pid: spawned.pid });
                self.emit(SupervisorEvent::Started {
                    index: self.index,
                    pid: spawned.pid,
                });
                Some(spawned)
            }
            Err(e) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                self.stats.record_launch_failure();
                let retry_in = self.retry_policy.delay_after(self.consecutive_failures);
                error!(
                    index = self.index,
                    attempt = self.consecutive_failures,
                    "Failed to launch '{}': {} (retrying in {:?})",
                    self.spec.label(),
                    e,
                    retry_in
                );
                self.publish(ProcessState::Starting);
                self.emit(SupervisorEvent::LaunchFailed {
                    index: self.index,
                    error: e.to_string(),
                    retry_in,
                });
                None
            }
        }
    }

    async fn launch_with_retry(&mut self) -> SpawnedProcess {
        loop {
            sleep(self.retry_policy.delay_after(self.consecutive_failures)).await;

            if let Some(spawned) = self.try_launch() {
                return spawned;
            }
        }
    }

    async fn wait_for_exit(&self, mut spawned: SpawnedProcess) -> (u32, ExitInfo) {
        match spawned.child.wait().await {
            Ok(status) => (spawned.pid, ExitInfo::from(status)),
            Err(e) => {
                // Never let two instances of the same spec coexist
                error!(
                    index = self.index,
                    pid = spawned.pid,
                    "Lost track of process '{}': {}, killing it",
                    self.spec.label(),
                    e
                );
                if let Err(e) = spawned.kill().await {
                    error!(index = self.index, pid = spawned.pid, "{}", e);
                }
                (spawned.pid, ExitInfo::unknown())
            }
        }
    }

    fn on_exit(&mut self, pid: u32, exit: ExitInfo) {
        self.stats.record_exit();
        warn!(
            index = self.index,
            pid,
            "Process '{}' PID {} exited with {} --> restarting",
            self.spec.label(),
            pid,
            exit
        );
        self.publish(ProcessState::Exited { pid, exit });
        self.emit(SupervisorEvent::Exited {
            index: self.index,
            pid,
            exit,
        });
    }

    fn publish(&self, state: ProcessState) {
        // Nobody watching is fine
        self.state.send_replace(CycleSnapshot {
            state,
            stats: self.stats,
        });
    }

    fn emit(&self, event: SupervisorEvent) {
        if let Some(ref events) = self.events {
            let _ = events.send(event);
        }
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = sigterm.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

// Process module - specs, launching and the restart cycles

pub mod restart;
pub mod spawner;
pub mod spec;
mod supervisor;
pub mod types;

pub use restart::{BackoffStrategy, LaunchRetryPolicy};
pub use spawner::{launch, SpawnedProcess};
pub use spec::{validate_all, ProcessSpec};
pub use supervisor::{SupervisionHandle, Supervisor};
pub use types::{CycleSnapshot, CycleStats, ExitInfo, ProcessState, SupervisorEvent};

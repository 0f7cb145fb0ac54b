pub mod backup;
pub mod config;
pub mod docker;
pub mod error;
pub mod lock;
pub mod process;
pub mod runner;
pub mod transfer;

pub use backup::BackupManager;
pub use config::{DbConnection, Mode, RunConfig};
pub use docker::ContainerRunner;
pub use error::{BackupError, BackupResult, LockError, ToolError};
pub use lock::{InstanceLock, LockGuard};
pub use process::{CommandRunner, Invocation, ProcessRunner};
pub use runner::{execute, RunSummary};
pub use transfer::{TransferOutcome, TransferStep};

/// One run, start to finish: lock, dispatch, transfer, release

use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

use crate::core::backup::BackupManager;
use crate::core::config::{Mode, RunConfig};
use crate::core::error::BackupResult;
use crate::core::lock::InstanceLock;
use crate::core::process::CommandRunner;
use crate::core::transfer::{TransferOutcome, TransferStep};
use crate::utils::{format_bytes, format_duration};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub mode: Mode,
    /// Artifact written (backup) or read (restore)
    pub archive: PathBuf,
    pub size: Option<u64>,
    /// None for restores
    pub transfer: Option<TransferOutcome>,
    pub failed_steps: Vec<String>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn log(&self) {
        info!("Run summary: mode={}", self.mode);
        match self.size {
            Some(size) => info!("  archive: {} ({})", self.archive.display(), format_bytes(size)),
            None => info!("  archive: {}", self.archive.display()),
        }
        match &self.transfer {
            Some(TransferOutcome::Transferred { destination }) => info!("  transfer: {}", destination),
            Some(TransferOutcome::Failed { destination }) => info!("  transfer: FAILED ({})", destination),
            Some(TransferOutcome::Skipped) => info!("  transfer: skipped"),
            None => {}
        }
        if !self.failed_steps.is_empty() {
            info!("  failed steps: {}", self.failed_steps.join(", "));
        }
        info!("  elapsed: {}", format_duration(self.elapsed.as_secs()));
    }
}

/// Execute the configured operation under the instance lock.
///
/// `tools` runs backup/restore steps (host or container); `host` runs the
/// transfer, which always happens on the host. The lock is released when
/// this returns, on success and on error.
pub async fn execute<'a>(
    config: &'a RunConfig,
    tools: Box<dyn CommandRunner + 'a>,
    host: Box<dyn CommandRunner + 'a>,
) -> BackupResult<RunSummary> {
    let started = Instant::now();
    let lock = InstanceLock::from_config(config);
    // Acquiring may poll for a killed holder to exit
    let guard = tokio::task::spawn_blocking(move || lock.acquire())
        .await
        .map_err(std::io::Error::from)??;
    info!("Lock acquired (PID {})", guard.owner());

    tools.preflight().await?;

    let manager = BackupManager::new(config, tools);
    let summary = match config.mode {
        Mode::Restore => {
            let outcome = manager.restore().await?;
            RunSummary {
                mode: Mode::Restore,
                size: std::fs::metadata(&outcome.source).ok().map(|m| m.len()),
                archive: outcome.source,
                transfer: None,
                failed_steps: outcome.failed_steps,
                elapsed: started.elapsed(),
            }
        }
        Mode::Backup => {
            let outcome = manager.backup().await?;
            let transfer = TransferStep::new(config, host).run(&outcome.archive).await?;
            RunSummary {
                mode: Mode::Backup,
                archive: outcome.archive,
                size: outcome.size,
                transfer: Some(transfer),
                failed_steps: outcome.failed_steps,
                elapsed: started.elapsed(),
            }
        }
    };

    Ok(summary)
}

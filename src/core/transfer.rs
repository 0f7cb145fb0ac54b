/// Remote transfer of backup artifacts over scp

use std::path::Path;
use tracing::{error, info, warn};

use crate::core::config::RunConfig;
use crate::core::error::{BackupResult, ToolError};
use crate::core::process::{CommandRunner, Invocation};
use crate::utils::{FailurePolicy, SKIP_TRANSFER_MESSAGE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// No remote destination configured
    Skipped,
    Transferred { destination: String },
    /// Copy failed under the `continue` policy
    Failed { destination: String },
}

pub struct TransferStep<'a> {
    config: &'a RunConfig,
    runner: Box<dyn CommandRunner + 'a>,
}

impl<'a> TransferStep<'a> {
    pub fn new(config: &'a RunConfig, runner: Box<dyn CommandRunner + 'a>) -> Self {
        Self { config, runner }
    }

    /// Push `archive` to the configured remote destination
    pub async fn run(&self, archive: &Path) -> BackupResult<TransferOutcome> {
        let destination = match self.config.remote.as_deref() {
            Some(remote) if !remote.trim().is_empty() => remote.to_string(),
            _ => {
                info!("{}", SKIP_TRANSFER_MESSAGE);
                return Ok(TransferOutcome::Skipped);
            }
        };

        info!("Transferring backup to remote server {}...", destination);
        let scp = Invocation::new(&self.config.tools.scp)
            .arg(archive.display().to_string())
            .arg(&destination);

        let failure = match self.runner.run(&scp).await {
            Ok(Some(0)) => {
                info!("Backup transferred to {}", destination);
                return Ok(TransferOutcome::Transferred { destination });
            }
            Ok(code) => ToolError::Failed {
                step: "scp".to_string(),
                code,
            },
            Err(e) => e,
        };

        match self.config.failure_policy {
            FailurePolicy::Abort => {
                error!("Transfer to {} failed: {}", destination, failure);
                Err(failure.into())
            }
            FailurePolicy::Continue => {
                warn!("Transfer to {} failed: {} (continuing)", destination, failure);
                Ok(TransferOutcome::Failed { destination })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::tests::sample_config;
    use crate::core::process::MockCommandRunner;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_skips_without_remote() {
        let root = TempDir::new().unwrap();
        let config = sample_config(root.path());
        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(0);

        let outcome = TransferStep::new(&config, Box::new(runner))
            .run(&config.artifact_path())
            .await
            .unwrap();
        assert_eq!(outcome, TransferOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_blank_remote_counts_as_unset() {
        let root = TempDir::new().unwrap();
        let mut config = sample_config(root.path());
        config.remote = Some("   ".to_string());
        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(0);

        let outcome = TransferStep::new(&config, Box::new(runner))
            .run(&config.artifact_path())
            .await
            .unwrap();
        assert_eq!(outcome, TransferOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_copies_archive_to_remote() {
        let root = TempDir::new().unwrap();
        let mut config = sample_config(root.path());
        config.remote = Some("backup@vault:/srv/db".to_string());
        let archive = PathBuf::from("/var/backups/mysql/full-backup-1.tar.gz");

        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|inv| {
                inv.program == "scp"
                    && inv.args == ["/var/backups/mysql/full-backup-1.tar.gz", "backup@vault:/srv/db"]
            })
            .times(1)
            .returning(|_| Ok(Some(0)));

        let outcome = TransferStep::new(&config, Box::new(runner)).run(&archive).await.unwrap();
        assert_eq!(
            outcome,
            TransferOutcome::Transferred {
                destination: "backup@vault:/srv/db".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_failed_copy_respects_policy() {
        let root = TempDir::new().unwrap();
        let mut config = sample_config(root.path());
        config.remote = Some("backup@vault:/srv/db".to_string());

        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|_| Ok(Some(1)));
        let err = TransferStep::new(&config, Box::new(runner))
            .run(&config.artifact_path())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("scp failed"));

        config.failure_policy = FailurePolicy::Continue;
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|_| Ok(Some(1)));
        let outcome = TransferStep::new(&config, Box::new(runner))
            .run(&config.artifact_path())
            .await
            .unwrap();
        assert!(matches!(outcome, TransferOutcome::Failed { .. }));
    }
}

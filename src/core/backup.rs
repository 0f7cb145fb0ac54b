/// Backup and restore pipelines
///
/// Backup: `mariadb-backup --backup` into `full-backup-<ts>/`, archive it to
/// `full-backup-<ts>.tar.gz`, drop the directory.
///
/// Restore: extract the archive, `mariadb-backup --prepare`, then
/// `--copy-back`, then drop the extracted directory.
///
/// In containerized mode every step runs inside the container and paths are
/// the container's; the artifact is expected to appear in the host backup
/// directory through a bind mount.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::core::config::RunConfig;
use crate::core::error::{BackupError, BackupResult, ToolError};
use crate::core::process::{CommandRunner, Invocation};
use crate::utils::{extracted_dir_name, FailurePolicy};

/// Result of a backup run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOutcome {
    /// Host path of the artifact
    pub archive: PathBuf,
    /// Artifact size, if it is visible on the host
    pub size: Option<u64>,
    /// Steps that failed under the `continue` policy
    pub failed_steps: Vec<String>,
}

/// Result of a restore run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOutcome {
    pub source: PathBuf,
    pub failed_steps: Vec<String>,
}

pub struct BackupManager<'a> {
    config: &'a RunConfig,
    runner: Box<dyn CommandRunner + 'a>,
}

impl<'a> BackupManager<'a> {
    pub fn new(config: &'a RunConfig, runner: Box<dyn CommandRunner + 'a>) -> Self {
        Self { config, runner }
    }

    fn mariadb_backup(&self) -> Invocation {
        Invocation::new(&self.config.tools.mariadb_backup)
    }

    fn tar(&self) -> Invocation {
        Invocation::new(&self.config.tools.tar)
    }

    /// Run one step, applying the failure policy to a bad exit
    async fn step(&self, name: &str, invocation: Invocation, failed: &mut Vec<String>) -> BackupResult<()> {
        info!("{}: {}", name, invocation.display());

        let result = match self.runner.run(&invocation).await {
            Ok(Some(0)) => return Ok(()),
            Ok(code) => ToolError::Failed {
                step: name.to_string(),
                code,
            },
            Err(e) => e,
        };

        match self.config.failure_policy {
            FailurePolicy::Abort => {
                error!("{}", result);
                Err(result.into())
            }
            FailurePolicy::Continue => {
                warn!("{} (continuing)", result);
                failed.push(name.to_string());
                Ok(())
            }
        }
    }

    async fn make_dir(&self, dir: &Path, failed: &mut Vec<String>) -> BackupResult<()> {
        if self.config.is_containerized() {
            let mkdir = Invocation::new("mkdir").arg("-p").arg(dir.display().to_string());
            self.step("Create backup directory", mkdir, failed).await
        } else {
            fs::create_dir_all(dir)?;
            Ok(())
        }
    }

    async fn remove_dir(&self, dir: &Path, failed: &mut Vec<String>) -> BackupResult<()> {
        info!("Removing intermediate directory {}", dir.display());
        if self.config.is_containerized() {
            let rm = Invocation::new("rm").arg("-rf").arg(dir.display().to_string());
            self.step("Remove intermediate directory", rm, failed).await
        } else {
            match fs::remove_dir_all(dir) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!("{} does not exist", dir.display());
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        }
    }

    /// Full backup into this run's artifact
    pub async fn backup(&self) -> BackupResult<BackupOutcome> {
        let config = self.config;
        let mut failed = Vec::new();

        let work_dir = config.working_backup_dir().to_path_buf();
        let dir_name = config.backup_dir_name();
        let target_dir = work_dir.join(&dir_name);
        let archive_in_work_dir = work_dir.join(format!("{}.tar.gz", dir_name));
        let archive = config.artifact_path();

        match &config.container {
            Some(container) => info!("Starting full backup in container {}...", container),
            None => info!("Starting full backup of {}:{}...", config.db.host, config.db.port),
        }

        self.make_dir(&work_dir, &mut failed).await?;

        let mut dump = self
            .mariadb_backup()
            .arg("--backup")
            .arg(format!("--target-dir={}", target_dir.display()));
        if !config.is_containerized() {
            dump = dump
                .arg(format!("--host={}", config.db.host))
                .arg(format!("--port={}", config.db.port));
        }
        dump = dump.arg(format!("--user={}", config.db.user));
        if !config.db.password.is_empty() {
            dump = dump.arg(format!("--password={}", config.db.password));
        }
        self.step("mariadb-backup --backup", dump, &mut failed).await?;

        info!("Compressing backup to {}", archive_in_work_dir.display());
        let compress = self
            .tar()
            .arg("czvf")
            .arg(archive_in_work_dir.display().to_string())
            .arg("-C")
            .arg(work_dir.display().to_string())
            .arg(&dir_name);
        self.step("tar czvf", compress, &mut failed).await?;

        self.remove_dir(&target_dir, &mut failed).await?;

        let size = fs::metadata(&archive).ok().map(|m| m.len());
        if size.is_none() {
            warn!("Backup archive {} not visible on the host", archive.display());
        }

        info!("Backup completed: {}", archive.display());
        Ok(BackupOutcome {
            archive,
            size,
            failed_steps: failed,
        })
    }

    /// Full restore from `config.restore_file`
    pub async fn restore(&self) -> BackupResult<RestoreOutcome> {
        let config = self.config;
        let mut failed = Vec::new();

        let source = match &config.restore_file {
            Some(path) if path.is_file() => path.clone(),
            Some(path) => {
                error!("Restore file not found: {}", path.display());
                return Err(BackupError::MissingRestoreFile(path.clone()));
            }
            None => {
                error!("No restore file given. Use --file <archive>");
                return Err(BackupError::MissingRestoreFile(PathBuf::new()));
            }
        };

        let dir_name = extracted_dir_name(&source).ok_or_else(|| {
            BackupError::Config(format!("Cannot derive a directory name from {}", source.display()))
        })?;
        let work_dir = config.working_backup_dir().to_path_buf();
        let archive = if config.is_containerized() {
            // Same file name, seen through the container's backup mount
            let file_name = source.file_name().unwrap_or_default();
            work_dir.join(file_name)
        } else {
            source.clone()
        };
        let target_dir = work_dir.join(&dir_name);

        info!("Starting restore from {}...", source.display());
        self.make_dir(&work_dir, &mut failed).await?;

        let extract = self
            .tar()
            .arg("xzvf")
            .arg(archive.display().to_string())
            .arg("-C")
            .arg(work_dir.display().to_string());
        self.step("tar xzvf", extract, &mut failed).await?;

        info!("Preparing backup in {}", target_dir.display());
        let prepare = self
            .mariadb_backup()
            .arg("--prepare")
            .arg(format!("--target-dir={}", target_dir.display()));
        self.step("mariadb-backup --prepare", prepare, &mut failed).await?;

        info!("Copying back into the data directory");
        let copy_back = self
            .mariadb_backup()
            .arg("--copy-back")
            .arg(format!("--target-dir={}", target_dir.display()));
        self.step("mariadb-backup --copy-back", copy_back, &mut failed).await?;

        self.remove_dir(&target_dir, &mut failed).await?;

        info!("Restore completed from {}", source.display());
        Ok(RestoreOutcome {
            source,
            failed_steps: failed,
        })
    }
}

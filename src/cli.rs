/// CLI argument parsing

use clap::{CommandFactory, Parser};
use std::path::PathBuf;

use crate::core::{BackupError, BackupResult, DbConnection, Mode, RunConfig};
use crate::utils::AppConfig;

// Build timestamp injected at compile time
pub const VERSION_WITH_BUILD: &str = concat!(env!("CARGO_PKG_VERSION"), " (built: ", env!("BUILD_TIMESTAMP"), ")");

/// Backup or restore a MariaDB/MySQL server with mariadb-backup
#[derive(Parser, Debug)]
#[command(name = "mariadb-backup-cli")]
#[command(author, version = VERSION_WITH_BUILD, about, long_about = None)]
#[command(args_override_self = true)]
pub struct Cli {
    /// Run a full backup
    #[arg(long)]
    pub backup: bool,

    /// Restore from the archive given with --file (wins over --backup)
    #[arg(long)]
    pub restore: bool,

    /// Backup archive to restore from
    #[arg(long, value_name = "ARCHIVE", allow_hyphen_values = true)]
    pub file: Option<PathBuf>,

    /// scp destination for the finished archive
    #[arg(long, value_name = "USER@HOST:PATH", allow_hyphen_values = true)]
    pub remote: Option<String>,

    /// Run inside this container (enables containerized mode)
    #[arg(long, value_name = "NAME", allow_hyphen_values = true)]
    pub container_name: Option<String>,

    /// Database host
    #[arg(long, allow_hyphen_values = true)]
    pub host: Option<String>,

    /// Database port
    #[arg(long)]
    pub port: Option<u16>,

    /// Database user
    #[arg(long, allow_hyphen_values = true)]
    pub user: Option<String>,

    /// Database password (prefer MYSQL_PASSWORD in the environment)
    #[arg(long, allow_hyphen_values = true)]
    pub password: Option<String>,

    /// Directory for run logs
    #[arg(long, value_name = "DIR", allow_hyphen_values = true)]
    pub log_dir: Option<PathBuf>,

    /// Directory for backup archives
    #[arg(long, value_name = "DIR", allow_hyphen_values = true)]
    pub backup_dir: Option<PathBuf>,

    /// Kill a running instance instead of giving up
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// Requested mode; restore wins when both flags are present
    pub fn mode(&self) -> Option<Mode> {
        if self.restore {
            Some(Mode::Restore)
        } else if self.backup {
            Some(Mode::Backup)
        } else {
            None
        }
    }

    /// Both --backup and --restore were passed
    pub fn mode_is_ambiguous(&self) -> bool {
        self.backup && self.restore
    }

    /// Full help text, printed on usage errors
    pub fn usage() -> String {
        Cli::command().render_help().to_string()
    }

    /// Layer the flags over the settings file and environment.
    ///
    /// Precedence, lowest first: built-in defaults, settings file,
    /// `env_password`, command line.
    pub fn into_run_config(
        self,
        settings: AppConfig,
        env_password: Option<String>,
        timestamp: String,
    ) -> BackupResult<RunConfig> {
        let mode = self
            .mode()
            .ok_or_else(|| BackupError::Config("Specify --backup or --restore".to_string()))?;

        let kill_timeout = humantime::parse_duration(&settings.kill_timeout).map_err(|e| {
            BackupError::Config(format!("Invalid kill_timeout {:?}: {}", settings.kill_timeout, e))
        })?;

        let password = self
            .password
            .or(env_password)
            .or(settings.password)
            .unwrap_or_default();

        Ok(RunConfig {
            mode,
            backup_dir: self.backup_dir.unwrap_or(settings.backup_dir),
            log_dir: self.log_dir.unwrap_or(settings.log_dir),
            container_backup_dir: settings.container_backup_dir,
            db: DbConnection {
                host: self.host.unwrap_or(settings.host),
                port: self.port.unwrap_or(settings.port),
                user: self.user.unwrap_or(settings.user),
                password,
            },
            container: self
                .container_name
                .or(settings.container_name)
                .filter(|name| !name.is_empty()),
            remote: self.remote.or(settings.remote).filter(|r| !r.is_empty()),
            restore_file: self.file,
            force: self.force,
            timestamp,
            lock_dir: settings.lock_dir.unwrap_or_else(std::env::temp_dir),
            kill_timeout,
            failure_policy: settings.failure_policy,
            tools: settings.tools,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use std::time::Duration;

    fn parse(args: &[&str]) -> Cli {
        let argv = std::iter::once("mariadb-backup-cli").chain(args.iter().copied());
        Cli::try_parse_from(argv).unwrap()
    }

    fn resolve(cli: Cli) -> RunConfig {
        cli.into_run_config(AppConfig::default(), None, "20260101-000000".to_string())
            .unwrap()
    }

    #[test]
    fn test_backup_mode() {
        let cli = parse(&["--backup"]);
        assert_eq!(cli.mode(), Some(Mode::Backup));
        assert!(!cli.mode_is_ambiguous());
    }

    #[test]
    fn test_restore_wins_over_backup_in_any_order() {
        for args in [["--backup", "--restore"], ["--restore", "--backup"]] {
            let cli = parse(&args);
            assert_eq!(cli.mode(), Some(Mode::Restore));
            assert!(cli.mode_is_ambiguous());
        }
    }

    #[test]
    fn test_missing_mode() {
        let cli = parse(&["--host", "db"]);
        assert_eq!(cli.mode(), None);
        let err = cli
            .into_run_config(AppConfig::default(), None, "ts".to_string())
            .unwrap_err();
        assert!(matches!(err, BackupError::Config(_)));
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        let err = Cli::try_parse_from(["mariadb-backup-cli", "--backup", "--compress"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_stray_positional_is_rejected() {
        assert!(Cli::try_parse_from(["mariadb-backup-cli", "--backup", "extra"]).is_err());
    }

    #[test]
    fn test_values_taken_verbatim() {
        let cli = parse(&["--backup", "--password", "-p@ss word", "--user", "admin"]);
        assert_eq!(cli.password.as_deref(), Some("-p@ss word"));
        assert_eq!(cli.user.as_deref(), Some("admin"));
    }

    #[test]
    fn test_repeated_flags_last_wins() {
        let cli = parse(&["--backup", "--backup", "--host", "a", "--host", "b"]);
        assert_eq!(cli.host.as_deref(), Some("b"));
    }

    #[test]
    fn test_container_name_enables_containerized_mode() {
        let config = resolve(parse(&["--backup", "--container-name", "mariadb"]));
        assert!(config.is_containerized());
        assert_eq!(config.container.as_deref(), Some("mariadb"));

        let config = resolve(parse(&["--backup"]));
        assert!(!config.is_containerized());
    }

    #[test]
    fn test_defaults_applied() {
        let config = resolve(parse(&["--backup"]));
        assert_eq!(config.backup_dir, PathBuf::from("/var/backups/mysql"));
        assert_eq!(config.log_dir, PathBuf::from("/var/log/mysql-backup"));
        assert_eq!(config.db.host, "localhost");
        assert_eq!(config.db.port, 3306);
        assert_eq!(config.db.user, "root");
        assert_eq!(config.db.password, "");
        assert_eq!(config.remote, None);
        assert_eq!(config.kill_timeout, Duration::from_secs(5));
        assert_eq!(config.lock_dir, std::env::temp_dir());
        assert!(!config.force);
    }

    #[test]
    fn test_flag_overrides_settings_and_env() {
        let settings = AppConfig {
            host: "settings-host".to_string(),
            password: Some("from-settings".to_string()),
            remote: Some("a@b:/c".to_string()),
            ..AppConfig::default()
        };

        let cli = parse(&["--backup", "--host", "flag-host", "--force", "--port", "3310"]);
        let config = cli
            .into_run_config(settings.clone(), Some("from-env".to_string()), "ts".to_string())
            .unwrap();
        assert_eq!(config.db.host, "flag-host");
        assert_eq!(config.db.port, 3310);
        assert_eq!(config.db.password, "from-env");
        assert_eq!(config.remote.as_deref(), Some("a@b:/c"));
        assert!(config.force);

        let cli = parse(&["--backup", "--password", "from-flag"]);
        let config = cli
            .into_run_config(settings, Some("from-env".to_string()), "ts".to_string())
            .unwrap();
        assert_eq!(config.db.password, "from-flag");
    }

    #[test]
    fn test_bad_kill_timeout() {
        let settings = AppConfig {
            kill_timeout: "soon".to_string(),
            ..AppConfig::default()
        };
        let err = parse(&["--backup"])
            .into_run_config(settings, None, "ts".to_string())
            .unwrap_err();
        assert!(err.to_string().contains("kill_timeout"));
    }

    #[test]
    fn test_usage_lists_flags() {
        let usage = Cli::usage();
        for flag in ["--backup", "--restore", "--file", "--remote", "--container-name", "--force"] {
            assert!(usage.contains(flag), "usage missing {}", flag);
        }
    }
}

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;
use tracing::{error, info, warn};

use mariadb_backup_cli::cli::Cli;
use mariadb_backup_cli::core::{execute, BackupError, CommandRunner, ContainerRunner, Mode, ProcessRunner};
use mariadb_backup_cli::utils::{generate_timestamp, logging, AppConfig, PASSWORD_ENV};

#[tokio::main]
async fn main() -> ExitCode {
    // Optional .env next to the working directory, e.g. MYSQL_PASSWORD
    dotenv::dotenv().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return usage_error(e),
    };

    if cli.mode().is_none() {
        eprintln!("{} specify --backup or --restore\n", "error:".red().bold());
        eprintln!("{}", Cli::usage());
        return ExitCode::from(1);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if tracing::dispatcher::has_been_set() {
                error!("{:#}", e);
            } else {
                eprintln!("{} {:#}", "error:".red().bold(), e);
            }
            let code = e
                .downcast_ref::<BackupError>()
                .map(BackupError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

fn usage_error(e: clap::Error) -> ExitCode {
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = e.print();
            ExitCode::SUCCESS
        }
        _ => {
            let _ = e.print();
            eprintln!();
            eprintln!("{}", Cli::usage());
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let ambiguous = cli.mode_is_ambiguous();
    let settings = AppConfig::load()?;
    let env_password = std::env::var(PASSWORD_ENV).ok();
    let config = cli.into_run_config(settings, env_password, generate_timestamp())?;

    logging::init(&config.log_file())?;

    if ambiguous {
        warn!("Both --backup and --restore given; running restore");
    }
    info!("Starting {} (log: {})", config.mode, config.log_file().display());

    let tools: Box<dyn CommandRunner> = match &config.container {
        Some(container) => {
            info!("Containerized mode: using container {}", container);
            Box::new(ContainerRunner::connect(container, &config.tools.shell)?)
        }
        None => Box::new(ProcessRunner::new()),
    };

    let summary = execute(&config, tools, Box::new(ProcessRunner::new())).await?;
    summary.log();

    match config.mode {
        Mode::Backup => info!("Backup process completed."),
        Mode::Restore => info!("Restore process completed."),
    }

    Ok(())
}

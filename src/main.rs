use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use kiln_core::config::CONFIG_FILE_NAME;
use kiln_core::logger::Logger;
use kiln_core::parser::LogLevel;
use kiln_core::{
    Cli, Commands, Config, PublishResult, Release, ReleaseError, ReleaseReport, ReleaseRequest,
    StageResult, VersionStore,
};

const INTERRUPTED_EXIT_CODE: i32 = 1;

fn init_config(cli: &Cli) -> Result<()> {
    let config_path = cli.source_directory()?.join(CONFIG_FILE_NAME);

    if config_path.exists() {
        anyhow::bail!(
            "{} already exists at {}. Remove it first if you want to reinitialize.",
            CONFIG_FILE_NAME,
            config_path.display()
        );
    }

    Config::default()
        .save_to_file(&config_path)
        .with_context(|| format!("Failed to save {}", CONFIG_FILE_NAME))?;

    println!("Created {} at {}", CONFIG_FILE_NAME, config_path.display());

    Ok(())
}

fn list_boards(config: &Config) {
    println!("Supported environments:");
    for board in config.registry().boards() {
        println!(
            "  {:<28} {:<10} {}",
            board.target, board.chip_family, board.slot
        );
    }
}

fn show_version(config: &Config, root: &Path) {
    let store = VersionStore::new(config.layout(root).version_file);
    println!("v{}", store.read());
}

fn print_summary(report: &ReleaseReport, logger: &Logger) {
    logger.section("Release Summary");
    logger.info(&format!("Board:        {}", report.board.target));
    logger.info(&format!("Chip family:  {}", report.board.chip_family));
    logger.info(&format!("Distributor:  {}", report.distribution_dir.display()));

    let version_note = if report.version_changed { "" } else { " (unchanged)" };
    logger.info(&format!("Version:      v{}{}", report.version, version_note));

    for (stage, result) in &report.stages {
        match result {
            StageResult::Success { duration, .. } => {
                logger.info(&format!("  ✓ {:<18} {:.1}s", stage.to_string(), duration));
            }
            StageResult::Skipped { reason } => {
                logger.info(&format!("  - {:<18} skipped ({})", stage.to_string(), reason));
            }
        }
    }

    if let PublishResult::Skipped(reason) = &report.publication {
        logger.info(&format!("  - {:<18} skipped ({})", "Publish", reason));
    }
}

async fn run_release(cli: &Cli, config: &Config, root: &Path, logger: Arc<Logger>) -> Result<()> {
    let request = ReleaseRequest {
        target: cli
            .env
            .clone()
            .unwrap_or_else(|| config.release.default_target.clone()),
        policy: cli.increment_policy(),
    };

    let layout = config.layout(root);
    let release = Release::new(
        config.registry(),
        VersionStore::new(layout.version_file.clone()),
        layout,
        config.tools.clone(),
        Arc::clone(&logger),
    );

    logger.debug(&format!(
        "Releasing {} (version policy: {})",
        request.target, request.policy
    ));

    let report = tokio::select! {
        result = release.run(&request) => result?,
        _ = tokio::signal::ctrl_c() => {
            println!();
            logger.warn("Build interrupted by user");
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    };

    print_summary(&report, &logger);

    Ok(())
}

async fn run_rebuild(
    command: &Commands,
    config: &Config,
    root: &Path,
    logger: Arc<Logger>,
) -> Result<()> {
    let Some(request) = command.rebuild_request() else {
        return Ok(());
    };

    let layout = config.layout(root);
    let registry = config.registry();
    let tools = config.tools.clone();

    tokio::select! {
        result = kiln_core::rebuild(&request, &registry, &layout, &tools, Arc::clone(&logger)) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            println!();
            logger.warn("Build interrupted by user");
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    }

    Ok(())
}

/// Reports `err` and returns the process exit code.
fn report_error(err: &anyhow::Error, logger: &Logger) -> i32 {
    let Some(release_err) = err.downcast_ref::<ReleaseError>() else {
        logger.error(&format!("Unexpected error: {:#}", err));
        return 1;
    };

    match release_err {
        ReleaseError::UnknownTarget { supported, .. } => {
            logger.error(&release_err.to_string());
            println!("Supported environments:");
            for target in supported {
                println!("  - {}", target);
            }
        }
        ReleaseError::StageFailure { .. } => {
            println!();
            logger.error(&release_err.to_string());
        }
        _ => logger.error(&release_err.to_string()),
    }

    release_err.exit_code()
}

async fn run(cli: &Cli, logger: &mut Arc<Logger>) -> Result<()> {
    if let Some(Commands::Init) = &cli.command {
        return init_config(cli);
    }

    let config = Config::load_from_cli(cli)?;
    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        config.logging.level
    };
    *logger = Arc::new(Logger::new().with_level(level));

    let root = cli.source_directory()?;

    match &cli.command {
        Some(Commands::Boards) => {
            list_boards(&config);
            Ok(())
        }
        Some(Commands::Version) => {
            show_version(&config, &root);
            Ok(())
        }
        Some(command @ Commands::Rebuild { .. }) => {
            run_rebuild(command, &config, &root, Arc::clone(logger)).await
        }
        Some(Commands::Init) => Ok(()),
        None => run_release(cli, &config, &root, Arc::clone(logger)).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let mut logger = Arc::new(Logger::new());

    let code = match run(&cli, &mut logger).await {
        Ok(()) => 0,
        Err(err) => report_error(&err, &logger),
    };

    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_logger() -> Logger {
        Logger::new().with_colors(false).with_level(LogLevel::Fatal)
    }

    #[test]
    fn test_stage_failure_exit_code_reaches_process() {
        let err = anyhow::Error::from(ReleaseError::StageFailure {
            command: "/usr/bin/pio run -e esp32-dev".to_string(),
            exit_code: Some(3),
        });
        assert_eq!(report_error(&err, &quiet_logger()), 3);

        let signalled = anyhow::Error::from(ReleaseError::StageFailure {
            command: "/usr/bin/pio run -e esp32-dev".to_string(),
            exit_code: None,
        });
        assert_eq!(report_error(&signalled, &quiet_logger()), 1);
    }

    #[test]
    fn test_other_failures_exit_with_one() {
        let unknown = anyhow::Error::from(ReleaseError::UnknownTarget {
            target: "esp8266".to_string(),
            supported: vec!["esp32-dev".to_string()],
        });
        assert_eq!(report_error(&unknown, &quiet_logger()), 1);

        let missing = anyhow::Error::from(ReleaseError::MissingTool {
            tool: "node".to_string(),
            hint: "Please install Node.js".to_string(),
        });
        assert_eq!(report_error(&missing, &quiet_logger()), 1);

        let config = anyhow::anyhow!("Failed to parse config file: kiln.toml");
        assert_eq!(report_error(&config, &quiet_logger()), 1);
    }

    #[test]
    fn test_context_keeps_release_error_exit_code() {
        let err = anyhow::Error::from(ReleaseError::StageFailure {
            command: "npm install".to_string(),
            exit_code: Some(254),
        })
        .context("Release failed");
        assert_eq!(report_error(&err, &quiet_logger()), 254);
    }
}

use anyhow::{Context, Result};
use log::LevelFilter;
use simplelog::{ColorChoice, Config, ConfigBuilder, TermLogger, TerminalMode};

/// Install a terminal logger for applications embedding the collector.
///
/// Fails if a global logger is already set.
pub fn init_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(log_level, logger_config(), TerminalMode::Mixed, ColorChoice::Auto)
        .context("Failed to initialize logger")?;
    Ok(())
}

/// Logger config shared by the terminal logger and tests
pub fn logger_config() -> Config {
    ConfigBuilder::new()
        .set_target_level(LevelFilter::Error)
        .set_time_format_rfc3339()
        .build()
}

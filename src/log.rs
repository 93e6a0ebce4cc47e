//! Logging configuration.
//!
//! The log level is taken from the `REDAP_LOG_LEVEL` environment variable if present, falling
//! back to the level in the program settings. Output goes to stderr with timestamps.
use anyhow::{Context, Result};
use fern::colors::{Color, ColoredLevelConfig};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};

/// The default program log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// The environment variable which can be used to override the configured log level
const LOG_LEVEL_ENV_VAR: &str = "REDAP_LOG_LEVEL";

/// Whether `init` has completed successfully
static LOGGER_INITIALISED: AtomicBool = AtomicBool::new(false);

/// Whether the logger has been set up
pub fn is_logger_initialised() -> bool {
    LOGGER_INITIALISED.load(Ordering::Relaxed)
}

/// Initialise the program logger using the `fern` logging library.
///
/// # Arguments
///
/// * `settings_log_level` - The log level from the program settings, used unless the
///   `REDAP_LOG_LEVEL` environment variable is set
pub fn init(settings_log_level: &str) -> Result<()> {
    let level = match env::var(LOG_LEVEL_ENV_VAR) {
        Ok(value) => value,
        Err(_) => settings_log_level.to_string(),
    };
    let level: log::LevelFilter = level
        .parse()
        .with_context(|| format!("Invalid log level: {level}"))?;

    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Cyan)
        .trace(Color::BrightBlack);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                colors.color(record.level()),
                record.target(),
                message
            ));
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .context("Logger already initialised")?;

    LOGGER_INITIALISED.store(true, Ordering::Relaxed);

    Ok(())
}

//! Logger setup. The dispatch is installed before the config is read so that
//! config fallbacks are reported, then the configured level takes over.

use std::path::Path;
use crate::utils::config::Config;

/// Level used until the config has been read
pub const STARTUP_LEVEL: log::LevelFilter = log::LevelFilter::Info;

/// Timestamped dispatch with no outputs. Filtering is left to `log::max_level`
/// so the level can change after the logger is installed.
pub fn dispatch() -> fern::Dispatch {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Utc::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Trace)
}

/// Install the global logger writing to `output` at the startup level
pub fn init(output: impl Into<fern::Output>) -> Result<(), log::SetLoggerError> {
    dispatch().chain(output).apply()?;
    log::set_max_level(STARTUP_LEVEL);
    Ok(())
}

/// Stdout plus `log_path`
pub fn setup_logging(log_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let outputs = fern::Dispatch::new()
        .chain(std::io::stdout())
        .chain(fern::log_file(log_path)?);
    init(outputs)?;
    Ok(())
}

/// Read the config with the logger live, then apply its level
pub fn load_config(path: Option<&Path>) -> Config {
    let config = Config::load(path);
    log::set_max_level(config.log_level_filter());
    log::debug!("Log level set to {}", config.log_level_filter());
    config
}

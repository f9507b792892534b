use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use std::path::Path;

use crate::error::{Error, Result};

/// Install the global logger: colored console output and an optional log file.
///
/// The file sink uses `"{timestamp} {LEVEL}: {message} [in {target}]"` so request
/// failures can be traced back to the module that logged them.
pub fn setup_logging(
    console_level: LevelFilter,
    log_file: Option<&Path>,
    file_level: LevelFilter,
) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Cyan)
        .trace(Color::BrightBlack);

    let console = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} {:<5} [{}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(console_level)
        .level_for("sqlx", LevelFilter::Warn)
        .chain(std::io::stdout());

    let mut dispatch = fern::Dispatch::new().chain(console);

    if let Some(path) = log_file {
        let file = fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "{} {}: {} [in {}]",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
                    record.level(),
                    message,
                    record.target()
                ))
            })
            .level(file_level)
            .level_for("sqlx", LevelFilter::Warn)
            .chain(fern::log_file(path)?);
        dispatch = dispatch.chain(file);
    }

    dispatch
        .apply()
        .map_err(|e| Error::Config(format!("logger already installed: {e}")))
}

use std::path::PathBuf;

use clap::Parser;

use gigboard::app::{build_router, connect_database};
use gigboard::logging::setup_logging;
use gigboard::router::AppState;
use gigboard::settings::Settings;
use gigboard::template::set_display_logs;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "GIGBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Console log level (default: info)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// File log level (default: warn)
    #[arg(long, default_value = "warn")]
    log_file_level: log::LevelFilter,

    /// Path to log file
    #[arg(long, env = "GIGBOARD_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Port to listen on, overriding the config file
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> gigboard::Result<()> {
    let args = Args::parse();
    setup_logging(args.log_level, args.log_file.as_deref(), args.log_file_level)?;

    log::debug!("Loading configuration");
    let settings = match &args.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };
    let mut settings = settings.with_env_overrides()?;
    if let Some(port) = args.port {
        settings.port = port;
    }
    set_display_logs(settings.template.debug);

    let db = connect_database(&settings).await?;
    let router = build_router(AppState::new(db, settings));
    router.run().await
}

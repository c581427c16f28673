pub mod acquisition;
pub mod calibration;
pub mod channel;
pub mod config;
pub mod pipeline;
pub mod resolver;
pub mod sink;

use crate::config::PipelineConfig;
use crate::pipeline::PipelineHandle;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = PipelineConfig::load(config_path)
        .await
        .map_err(|e| eyre!("Failed to load configuration: {}", e))?;

    let reader = acquisition::build_reader(&config.hardware)
        .map_err(|e| eyre!("Failed to open sample reader: {}", e))?;
    let sink = sink::build_sink(&config.sink);

    let handle = PipelineHandle::spawn(&config, reader, sink)
        .map_err(|e| eyre!("Failed to spawn pipeline: {}", e))?;

    info!("Press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    let stats = handle.shutdown().await?;
    info!(
        "Final stats: {} accepted, {} dropped, {} read failures, {} emitted, {} sink failures, {} calibrations",
        stats.accepted,
        stats.dropped,
        stats.read_failures,
        stats.emitted,
        stats.sink_failures,
        stats.calibrations
    );
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging();
    Ok(())
}

fn setup_logging() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}

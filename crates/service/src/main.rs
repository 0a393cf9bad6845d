//! VPIN service entry point.
//!
//! Reads tick messages as JSON lines on stdin and writes VPIN results as JSON
//! lines on stdout. Logs go to stderr.
//!
//! Usage: `vpin-service [config.json]`

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use vpin_core::Config;
use vpin_engine::VpinEngine;
use vpin_service::{init_logging, run_publisher, spawn_line_reader, ChannelSink, TickListener};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = match std::env::args().nth(1) {
        Some(path) => Config::from_json_file(&path)
            .with_context(|| format!("loading config from {path}"))?,
        None => Config::default(),
    };
    config
        .apply_env_overrides()
        .context("applying environment overrides")?;

    init_logging(&config.service.log_filter);
    info!(
        bucket_volume = config.vpin.bucket_volume,
        window_size = config.vpin.window_size,
        workers = config.service.workers,
        "starting VPIN service"
    );

    let (sink, rx) = ChannelSink::channel();
    let publisher = tokio::spawn(run_publisher(rx, tokio::io::stdout()));

    let engine = Arc::new(VpinEngine::with_sink(config.vpin.clone(), Arc::new(sink))?);
    let listener = TickListener::spawn(Arc::clone(&engine), &config.service)?;

    // Stdin is read on its own thread so ctrl-c never waits on a pending read.
    let lines = spawn_line_reader(
        std::io::BufReader::new(std::io::stdin()),
        config.service.channel_capacity,
    );

    tokio::select! {
        res = listener.run_channel(lines) => {
            let dispatched = res.context("reading tick stream")?;
            info!(dispatched, "input closed");
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, draining queued ticks");
        }
    }

    listener.shutdown().await;
    info!(instruments = engine.instrument_count(), "engine stopped");

    // Dropping the engine releases the last sender and lets the publisher finish.
    drop(engine);
    let published = publisher.await.context("publisher task panicked")??;
    info!(published, "VPIN service stopped");
    Ok(())
}

//! `watch` command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use client_reader::{ClientReader, HttpEventSource, ViewerMessage, ViewerState};
use config_loader::ConfigLoader;
use contracts::ReaderConfig;
use tracing::info;

use super::shutdown_signal;
use crate::cli::WatchArgs;

/// Execute the `watch` command
pub async fn run_watch(args: &WatchArgs) -> Result<()> {
    let config = reader_config(args)?;
    info!(url = %config.url, "Watching bridge event stream");

    let source = HttpEventSource::new(config.url.clone()).context("Invalid event stream URL")?;
    let reader = Arc::new(ClientReader::new(source, config));

    let state = ViewerState::new();
    reader.add_handler(state.handler());
    let json = args.json;
    reader.add_handler(move |message: &ViewerMessage| print_message(message, json));

    let handle = reader.start();
    shutdown_signal().await;
    handle.stop();
    handle.join().await;

    let snapshot = state.snapshot();
    info!(
        events_seen = snapshot.events_seen,
        last_keepalive = ?snapshot.last_keepalive,
        "Watch finished"
    );
    Ok(())
}

/// Reader settings from the optional config file, then `--url`
fn reader_config(args: &WatchArgs) -> Result<ReaderConfig> {
    let mut config = match args.config {
        Some(ref path) => {
            ConfigLoader::parse_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
                .reader
        }
        None => ReaderConfig::default(),
    };
    if let Some(ref url) = args.url {
        config.url = url.clone();
    }
    ConfigLoader::validate_reader(&config).context("Invalid reader configuration")?;
    Ok(config)
}

fn print_message(message: &ViewerMessage, json: bool) {
    match message {
        ViewerMessage::Ping(ping) => {
            if !json {
                println!("· keepalive {}", ping.ping);
            }
        }
        ViewerMessage::Event(value) if json => println!("{value}"),
        ViewerMessage::Event(_) => match message.sensor_update() {
            Some(Ok(update)) => println!(
                "{:<12} {}",
                update.label(),
                update.resource_id().unwrap_or("-")
            ),
            Some(Err(e)) => println!("undecodable event: {e}"),
            None => {}
        },
    }
}

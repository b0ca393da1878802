mod config;
mod tui;
mod ws;

use clap::Parser;
use config::{Cli, ClientConfig};
use tokio::sync::mpsc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // The TUI owns stdout, so only warnings go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter("quill_client=warn")
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::load(&cli.config)?;
    let url = cli.url.unwrap_or(config.server.url);
    info!("Connecting to {url}");

    let (answer_tx, answer_rx) = mpsc::channel(64);
    let (event_tx, event_rx) = mpsc::channel(64);
    let socket = tokio::spawn(async move { ws::run(&url, answer_rx, event_tx).await });

    let ui_result = tui::run(event_rx, answer_tx).await;

    // The terminal is restored by now, so socket failures can be reported.
    if socket.is_finished() {
        match socket.await {
            Ok(Err(e)) => warn!("Connection failed: {e}"),
            Err(e) => warn!("Socket task panicked: {e}"),
            Ok(Ok(())) => {}
        }
    } else {
        socket.abort();
    }
    ui_result
}

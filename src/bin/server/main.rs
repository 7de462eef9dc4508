//! linplayer-remote: standalone host for the TV remote-control endpoint
//!
//! This binary:
//! - Loads the server store and the host configuration
//! - Starts the HTTP endpoint and prints the URL to encode as a QR code
//! - Optionally attaches a simulated player for the playback controls
//! - Stops cleanly on Ctrl+C

mod config;
mod player;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use linplayer_remote::proxy::ProxyPrefs;
use linplayer_remote::store::{ConfigStore, ServerStore};
use linplayer_remote::{AppState, RemoteServer, playback_channel};

use config::Config;
use player::SimulatedPlayer;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load_or_default("linplayer-remote.toml")?;

    let store = Arc::new(ServerStore::load_or_default(&config.store_path)?);
    if let Some(port) = config.port {
        store.set_port(port)?;
    }

    let (bridge, scheduler) = playback_channel();
    scheduler.spawn()?;

    if let Some(title) = &config.demo_title {
        let player = SimulatedPlayer::new(Duration::from_secs(42 * 60));
        bridge.attach(Box::new(player), title.clone());
        tracing::info!("attached simulated player: {}", title);
    }

    let state = AppState::new(store, Arc::new(ProxyPrefs::new()), bridge)
        .with_app_info(config.app_info());
    let server = RemoteServer::new(state);

    let info = server.ensure_started().await?;
    let url = info.first_remote_url();

    println!("╔════════════════════════════════════════╗");
    println!("║         linplayer remote control       ║");
    println!("╠════════════════════════════════════════╣");
    println!("║ Port: {:<33}║", info.port);
    println!("║ Token: {:<32}║", info.token);
    println!("╚════════════════════════════════════════╝");
    if url.is_empty() {
        println!("No LAN address found; open http://<this-host>:{}/?token={}", info.port, info.token);
    } else {
        println!("Scan or open: {}", url);
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    server.stop().await;
    Ok(())
}

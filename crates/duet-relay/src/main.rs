//! duet-relay: WebSocket signaling broker for two-person rooms.
//!
//! Accepts WebSocket connections, admits them into rooms of at most two
//! participants, and relays chat, playback and call signaling between
//! the pair. Media never passes through the broker.

mod connection;
mod peers;
mod server;
mod settings;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use duet_common::Result;
use duet_room::Coordinator;
use tokio::net::TcpListener;

use crate::connection::RelayContext;
use crate::peers::PeerMap;
use crate::settings::{room_policy, ConnectionSettings};

#[derive(Parser)]
#[command(name = "duet-relay", about = "Signaling broker for two-person rooms")]
struct Args {
    /// Path to a config file (defaults to $DUET_CONFIG, then the platform config dir).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on, overriding the config.
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind, overriding the config.
    #[arg(long)]
    bind: Option<String>,

    /// Print the effective config as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = duet_config::load_config(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = u32::from(port);
    }
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if args.print_config {
        println!("{}", duet_config::config_to_json(&config));
        return Ok(());
    }

    let level = config.logging.level.as_filter();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("duet_relay={level},duet_room={level}").into()),
        )
        .init();

    let ctx = RelayContext {
        coordinator: Coordinator::new(room_policy(&config)),
        peers: PeerMap::new(),
        settings: Arc::new(ConnectionSettings::from_config(&config)),
    };

    let addr = config.server.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("duet-relay listening on {}", addr);

    // Periodic occupancy report.
    let stats_ctx = ctx.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(60)).await;
            let stats = stats_ctx.coordinator.stats().await;
            let peers = stats_ctx.peers.count().await;
            tracing::debug!(
                rooms = stats.rooms,
                sessions = stats.sessions,
                peers,
                "Stats tick"
            );
        }
    });

    server::serve(listener, ctx).await;
    Ok(())
}

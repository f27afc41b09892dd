mod table;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use colored::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use voxmesh::engine::{
    LocalIdentity, MeshConfig, MeshHandle, SignalingConfig, WebRtcTransportFactory,
    WsSignalingChannel,
};
use voxmesh::model::TurnConfig;

#[derive(Parser)]
#[command(name = "voxmesh")]
#[command(about = "Join a voice room mesh and watch its peers")]
struct Cli {
    /// Relay endpoint, `ws://` or `wss://`.
    #[arg(long, env = "VOXMESH_URL")]
    url: String,

    #[arg(long, env = "VOXMESH_TOKEN")]
    token: Option<String>,

    #[arg(long)]
    peer_id: String,

    #[arg(long, default_value = "player")]
    peer_type: String,

    #[arg(long)]
    room: Option<String>,

    /// Skip the audio-state data channel.
    #[arg(long)]
    no_data_channel: bool,

    #[arg(long, requires_all = ["turn_username", "turn_password"])]
    turn_url: Option<String>,

    #[arg(long)]
    turn_username: Option<String>,

    #[arg(long, env = "VOXMESH_TURN_PASSWORD")]
    turn_password: Option<String>,

    /// Log SDP bodies and candidates.
    #[arg(short, long)]
    verbose: bool,

    /// Seconds between peer table refreshes.
    #[arg(long, default_value_t = 2)]
    interval: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let identity = LocalIdentity::new(cli.peer_id.as_str(), cli.peer_type.as_str());

    let mut signaling = SignalingConfig::new(&cli.url);
    signaling.token = cli.token.clone();
    signaling.room = cli.room.clone();

    let mut config = MeshConfig::new(identity.clone());
    config.enable_data_channel = !cli.no_data_channel;
    config.verbose = cli.verbose;
    if let Some(turn) = turn_config(&cli) {
        config.transport.add_ice_server(turn.into());
    }

    let (channel, events) = WsSignalingChannel::new(signaling, identity);
    let (mesh, task) = MeshHandle::spawn(
        config,
        Arc::new(channel),
        events,
        Arc::new(WebRtcTransportFactory),
    );

    println!(
        "{} {} {}",
        "Joining".green().bold(),
        cli.url,
        format!("as {}", cli.peer_id).dimmed()
    );
    mesh.join()
        .await
        .with_context(|| format!("Failed to join {}", cli.url))?;

    let mut ticker = tokio::time::interval(Duration::from_secs(cli.interval.max(1)));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, leaving");
                break;
            }
            _ = ticker.tick() => table::print(mesh.view()),
        }
    }

    if let Err(e) = mesh.leave().await {
        warn!("Leave failed: {}", e);
    }
    mesh.shutdown().await?;
    task.await.context("Mesh task panicked")?;

    println!("{}", "Left the room.".green().bold());
    Ok(())
}

fn turn_config(cli: &Cli) -> Option<TurnConfig> {
    Some(TurnConfig {
        url: cli.turn_url.clone()?,
        username: cli.turn_username.clone()?,
        password: cli.turn_password.clone()?,
    })
}

fn init_tracing(verbose: bool) -> Result<()> {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!(e))
}

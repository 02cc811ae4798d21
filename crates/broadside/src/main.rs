use std::path::PathBuf;
use std::time::Duration;

use broadside::prelude::*;
use broadside_protocol::simulate_corruption;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Two-player Battleship server.
#[derive(Debug, Parser)]
#[command(name = "broadside-server", version, about)]
struct Cli {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:5005")]
    bind: String,

    /// Seconds a player has to fire before the turn is skipped.
    #[arg(long, default_value_t = 10)]
    turn_timeout: u64,

    /// Seconds a dropped player has to come back.
    #[arg(long, default_value_t = 60)]
    reconnect_timeout: u64,

    /// Keep match snapshots as JSON files in this directory instead of
    /// in memory.
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Caesar shift applied to payload letters. 0 sends plain text.
    #[arg(long, default_value_t = 13)]
    shift: u8,

    /// Don't offer spectators a seat when a match ends.
    #[arg(long)]
    no_recruit: bool,

    /// Don't ask players for another game when a match ends.
    #[arg(long)]
    no_rematch: bool,

    /// Run the checksum self-check with this per-frame corruption rate
    /// (0.0 to 1.0) before serving.
    #[arg(long, value_name = "RATE")]
    simulate_errors: Option<f64>,

    /// Number of frames the self-check sends.
    #[arg(long, default_value_t = 1000)]
    simulate_frames: usize,
}

#[tokio::main]
async fn main() -> Result<(), BroadsideError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let codec = match cli.shift {
        0 => FrameCodec::new(Identity),
        shift => FrameCodec::new(CaesarShift::new(shift)),
    };

    if let Some(rate) = cli.simulate_errors {
        let report = simulate_corruption(&codec, &mut rand::rng(), cli.simulate_frames, rate);
        tracing::info!(
            sent = report.sent,
            corrupted = report.corrupted,
            detected = report.detected,
            undetected = report.undetected(),
            detection_rate = report.detection_rate(),
            "checksum self-check finished"
        );
    }

    let match_config = MatchConfig {
        turn_timeout: Duration::from_secs(cli.turn_timeout),
        reconnect_timeout: Duration::from_secs(cli.reconnect_timeout),
        ..MatchConfig::default()
    };
    let lobby_config = LobbyConfig {
        recruit_spectators: !cli.no_recruit,
        rematch: !cli.no_rematch,
        ..LobbyConfig::default()
    };

    let mut builder = BroadsideServer::builder()
        .bind(&cli.bind)
        .codec(codec)
        .match_config(match_config)
        .lobby_config(lobby_config);
    if let Some(dir) = cli.snapshot_dir {
        tracing::info!(dir = %dir.display(), "storing snapshots on disk");
        builder = builder.snapshot_store(FileSnapshotStore::open(dir).await?);
    }

    let server = builder.build().await?;
    let handle = server.handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => handle.shutdown(),
            Err(e) => tracing::error!(error = %e, "cannot listen for ctrl-c"),
        }
    });

    server.run().await
}

use clap::Parser;
use log::{error, info};
use server::network::{Server, ServerMessage};
use shared::{NetcodeConfig, RoundGate, World};
use std::path::PathBuf;
use std::sync::Arc;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Tick rate override (ticks per second)
    #[clap(short, long)]
    tick_rate: Option<f32>,
    /// Maximum number of connected clients
    #[clap(short, long, default_value = "16")]
    max_clients: usize,
    /// TOML file with netcode settings
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// Start with combat disabled until the round opens
    #[clap(long)]
    warmup: bool,
}

/// Parses arguments, loads configuration and runs the authoritative server
/// until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    let mut config = NetcodeConfig::load_or_default(args.config.as_deref())?;
    if let Some(tick_rate) = args.tick_rate {
        config.tick_rate = tick_rate;
    }
    info!(
        "Tick rate {} Hz, history {} ticks, extrapolation limit {}s",
        config.tick_rate, config.buffer_capacity, config.extrapolation_limit
    );

    let gate = RoundGate::new(!args.warmup);
    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::new(
        &address,
        config,
        World::arena(),
        Arc::new(gate.clone()),
        args.max_clients,
    )
    .await?;

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully...");
            if shutdown.send(ServerMessage::Shutdown).is_err() {
                error!("Server loop already stopped");
            }
        }
    });

    if args.warmup {
        // Warmup lasts a fixed ten seconds when no round controller is attached.
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(10)).await;
            info!("Round started, combat enabled");
            gate.open();
        });
    }

    server.run().await?;
    Ok(())
}

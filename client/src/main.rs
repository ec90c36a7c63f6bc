use clap::Parser;
use client::game::ClientGame;
use client::input::{InputSource, KeyboardInput};
use client::network::{NetworkConditions, Transport};
use client::rendering::Renderer;
use log::{error, info};
use macroquad::prelude::*;
use shared::protocol::timestamp_millis;
use shared::{NetcodeConfig, RoundGate, World};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Simulate network latency in milliseconds (round trip)
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    /// Probability of dropping each datagram, 0.0 to 1.0
    #[arg(short = 'p', long, default_value = "0.0")]
    packet_loss: f32,

    /// Window width
    #[arg(short = 'w', long, default_value = "800")]
    width: usize,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "600")]
    height: usize,

    /// TOML file with netcode settings; must match the server's
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,
}

fn window_conf() -> Conf {
    let args = Args::parse();
    Conf {
        window_title: "Arena netcode client".to_string(),
        window_width: args.width as i32,
        window_height: args.height as i32,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    if let Err(e) = run(Args::parse()).await {
        error!("Client stopped: {}", e);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = NetcodeConfig::load_or_default(args.config.as_deref())?;

    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    if args.fake_ping > 0 || args.packet_loss > 0.0 {
        info!(
            "Simulating {}ms latency, {:.0}% packet loss",
            args.fake_ping,
            args.packet_loss * 100.0
        );
    }
    info!("Controls: WASD to move, Q/E to turn, Space to jump, mouse or F to fire, G for debug poses");

    let conditions = NetworkConditions {
        fake_ping_ms: args.fake_ping,
        packet_loss: args.packet_loss.clamp(0.0, 1.0),
    };
    let mut transport = Transport::start(&args.server, conditions)?;
    let mut game = ClientGame::new(config, World::arena(), RoundGate::new(true), transport.outbox());
    let mut input = KeyboardInput::new();
    let mut renderer = Renderer::new(args.width, args.height);

    game.connect();

    loop {
        let dt = get_frame_time();

        for packet in transport.poll() {
            game.handle_packet(packet);
        }

        let frame = input.sample(dt);
        if frame.quit {
            break;
        }
        if frame.toggle_debug {
            renderer.show_debug = !renderer.show_debug;
        }

        game.frame(dt, &frame, timestamp_millis(), None);
        renderer.render(&game, args.fake_ping);

        next_frame().await;
    }

    game.disconnect();
    drop(game);
    transport.shutdown();

    Ok(())
}

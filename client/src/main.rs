use clap::Parser;
use client::appearance::Appearance;
use client::game::World;
use client::input::InputManager;
use client::network::udp_connector;
use client::rendering::Renderer;
use client::transport::Transport;
use log::{error, info, warn};
use macroquad::prelude::*;
use shared::{AvatarConfig, TileGrid};
use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::time::Instant;

/// Longest frame step fed to the simulation, so a stalled window does not
/// tunnel the ball through walls
const MAX_FRAME_TIME: f32 = 0.1;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:3001")]
    server: String,

    /// Display name, at most 16 characters are kept
    #[arg(short = 'n', long, default_value = "Player")]
    name: String,

    #[arg(long, default_value = "body-1")]
    body: String,

    #[arg(long, default_value = "outfit-blue")]
    outfit: String,

    #[arg(long, default_value = "hair-short")]
    hair: String,

    /// Accessory item, "none" for nothing
    #[arg(long, default_value = "none")]
    accessory: String,

    /// Window width
    #[arg(short = 'w', long, default_value = "1024")]
    width: i32,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "560")]
    height: i32,
}

fn window_conf() -> Conf {
    let args = Args::parse();
    Conf {
        window_title: "Pixel World".to_string(),
        window_width: args.width,
        window_height: args.height,
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
        error!("Client error: {}", e);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let server_addr = args
        .server
        .to_socket_addrs()?
        .next()
        .ok_or("server address did not resolve")?;

    info!("Starting client...");
    info!("Connecting to: {}", server_addr);
    info!("Controls: WASD/arrows to move, Shift to sprint, hold Space to charge a kick");

    let avatar = AvatarConfig {
        body: args.body,
        outfit: args.outfit,
        hair: args.hair,
        accessory: args.accessory,
    };

    let grid = Arc::new(TileGrid::town_and_field());
    let mut transport = Transport::new(udp_connector(server_addr));
    let mut world = World::new(grid, &args.name, avatar.clone());
    let renderer = Renderer::new(&world, Appearance::for_player(0, &avatar));
    let mut input = InputManager::new();

    world.attach(&mut transport);
    world.connect(&mut transport)?;

    loop {
        let (player_input, commands) = input.update();

        if commands.reconnect {
            info!("Reconnecting...");
            world.disconnect(&mut transport);
            if let Err(e) = world.connect(&mut transport) {
                warn!("Reconnect failed: {}", e);
            }
        }
        if let Some(text) = commands.chat {
            world.send_chat(&mut transport, &text);
        }

        let dt = get_frame_time().min(MAX_FRAME_TIME);
        world.frame(&player_input, dt, &mut transport, Instant::now());

        renderer.render(&world, input.chat(), transport.state());
        next_frame().await;
    }
}

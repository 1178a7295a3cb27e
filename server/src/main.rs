use clap::Parser;
use log::info;
use server::network::Server;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Pixel world session server", long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "3001")]
    port: u16,

    /// Maximum number of concurrent connections
    #[arg(short, long, default_value = "32")]
    max_clients: usize,

    /// Seconds of silence before a connection is dropped
    #[arg(short, long, default_value = "5")]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);

    info!("Starting server on {}", address);
    info!(
        "Max clients: {}, connection timeout: {}s",
        args.max_clients, args.timeout_secs
    );

    let mut server = Server::new(
        &address,
        args.max_clients,
        Duration::from_secs(args.timeout_secs),
    )
    .await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

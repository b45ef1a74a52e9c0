use clap::Parser;
use env_logger::Env;
use log::info;
use server::config::GameConfig;
use server::network::Server;
use std::path::PathBuf;

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
    /// Tick rate (updates per second), overrides the config file
    #[clap(short, long)]
    tick_rate: Option<u32>,
    /// Maximum players per room, overrides the config file
    #[clap(short, long)]
    max_players: Option<usize>,
    /// JSON file with game and balance settings
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// Fixed map seed for every room
    #[clap(short, long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    if let Some(tick_rate) = args.tick_rate {
        config.tick_rate = tick_rate;
    }
    if let Some(max_players) = args.max_players {
        config.max_players_per_room = max_players;
    }
    if args.seed.is_some() {
        config.map_seed = args.seed;
    }

    info!(
        "Starting server: {} Hz, {} players per room, {}x{} maps",
        config.tick_rate, config.max_players_per_room, config.map_size, config.map_size
    );

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::bind(&address, config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

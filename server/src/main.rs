use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::network::Server;
use tokio::net::TcpListener;

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
    /// Number of player slots
    #[clap(short, long, default_value_t = shared::DEFAULT_MAX_PLAYERS)]
    max_players: usize,
    /// Tick rate (updates per second)
    #[clap(short, long, default_value = "60")]
    tick_rate: u32,
    /// Arena width
    #[clap(long, default_value_t = shared::GRID_WIDTH)]
    width: f64,
    /// Arena height
    #[clap(long, default_value_t = shared::GRID_HEIGHT)]
    height: f64,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            grid_width: self.width,
            grid_height: self.height,
            max_players: self.max_players,
            tick_rate: self.tick_rate,
            ..ServerConfig::default()
        }
    }
}

/// Parses command-line arguments, then serves the arena until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);
    let config = args.into_config();

    info!(
        "Starting arena {}x{} with {} slots at {}Hz",
        config.grid_width, config.grid_height, config.max_players, config.tick_rate
    );

    let listener = TcpListener::bind(&address).await?;
    let server = Server::new(config);

    tokio::select! {
        result = server.run(listener) => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    server.shutdown().await;
    Ok(())
}

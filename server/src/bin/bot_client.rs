use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use shared::{ClientCommand, Direction, ServerMessage, VehicleState, WorldSnapshot};
use std::time::Duration;
use tokio::time::{interval, Instant};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Scripted player for poking at a running server
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server WebSocket URL
    #[clap(short, long, default_value = "ws://127.0.0.1:8080")]
    url: String,
    /// How long to play, in seconds
    #[clap(short, long, default_value = "30")]
    duration: u64,
    /// Milliseconds between state requests
    #[clap(short, long, default_value = "50")]
    poll_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let (socket, _) = connect_async(args.url.as_str()).await?;
    let (mut sink, mut stream) = socket.split();
    info!("Connected to {}", args.url);

    let mut rng = rand::thread_rng();
    let mut poll = interval(Duration::from_millis(args.poll_ms.max(1)));
    let mut act = interval(Duration::from_millis(750));
    let deadline = Instant::now() + Duration::from_secs(args.duration);
    let mut snapshots = 0u64;

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => break,
            _ = poll.tick() => {
                sink.send(Message::Text(ClientCommand::RequestState.to_string())).await?;
            }
            _ = act.tick() => {
                // Spawns are ignored by the server while our bike is alive,
                // so asking again is how a crashed bot gets back in
                let command = if rng.gen_bool(0.3) {
                    ClientCommand::Spawn {
                        x: rng.gen_range(0.0..shared::GRID_WIDTH),
                        y: rng.gen_range(0.0..shared::GRID_HEIGHT),
                    }
                } else {
                    let direction = Direction::ALL
                        .choose(&mut rng)
                        .copied()
                        .unwrap_or(Direction::Up);
                    ClientCommand::Turn(direction)
                };
                debug!("Sending {}", command);
                sink.send(Message::Text(command.to_string())).await?;
            }
            frame = stream.next() => {
                let Some(frame) = frame else {
                    info!("Server closed the connection");
                    break;
                };
                let Message::Text(text) = frame? else {
                    continue;
                };
                match ServerMessage::parse(&text) {
                    Ok(ServerMessage::NewState(json)) => {
                        snapshots += 1;
                        if snapshots % 20 == 0 {
                            report(&json);
                        }
                    }
                    Ok(ServerMessage::GameFull) => {
                        warn!("Server is full");
                        break;
                    }
                    Ok(ServerMessage::DisplayMessage(hint)) if !hint.is_empty() => {
                        info!("Server says: {}", hint);
                    }
                    Ok(other) => debug!("Received {:?}", other),
                    Err(_) => debug!("Server echoed: {}", text),
                }
            }
        }
    }

    sink.close().await?;
    info!("Received {} snapshots", snapshots);
    Ok(())
}

fn report(json: &str) {
    match WorldSnapshot::from_json(json) {
        Ok(snapshot) => {
            let alive = snapshot
                .bikes
                .iter()
                .filter(|bike| bike.state != VehicleState::Dead)
                .count();
            info!(
                "{} bikes ({} alive), {} trails",
                snapshot.bikes.len(),
                alive,
                snapshot.trails.len()
            );
        }
        Err(e) => warn!("Unreadable snapshot: {}", e),
    }
}

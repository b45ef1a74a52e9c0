use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use shared::{
    ClientMessage, Faction, GameEventKind, ServerMessage, StateSnapshot,
};
use std::time::Duration;
use tokio::time::sleep;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Headless client that joins a room, readies up and drives its units
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server WebSocket URL
    #[clap(short, long, default_value = "ws://127.0.0.1:8080")]
    url: String,
    /// Room to join
    #[clap(short, long, default_value = "TEST01")]
    room: String,
    /// Display name
    #[clap(short, long, default_value = "bot")]
    name: String,
    /// Ask the server to start once joined
    #[clap(short, long)]
    start: bool,
    /// Seconds to stay connected
    #[clap(short, long, default_value = "30")]
    duration: u64,
}

fn encode(message: &ClientMessage) -> Result<Message, serde_json::Error> {
    Ok(Message::Text(serde_json::to_string(message)?))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!("Connecting to {}", args.url);
    let (ws, _) = connect_async(args.url.as_str()).await?;
    let (mut sink, mut source) = ws.split();

    sink.send(encode(&ClientMessage::JoinRoom {
        room_code: args.room.clone(),
        username: Some(args.name.clone()),
    })?)
    .await?;
    sink.send(encode(&ClientMessage::UpdatePlayer {
        room_code: args.room.clone(),
        faction: Some(Faction::Kingdom),
        ready: Some(true),
    })?)
    .await?;
    if args.start {
        // Give the other players a moment to ready up
        sleep(Duration::from_secs(1)).await;
        sink.send(encode(&ClientMessage::StartGame {
            room_code: args.room.clone(),
        })?)
        .await?;
    }

    let mut player_id = String::new();
    let mut state = StateSnapshot::default();
    let mut ordered = false;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(args.duration);

    loop {
        let frame = tokio::select! {
            frame = source.next() => frame,
            _ = tokio::time::sleep_until(deadline) => {
                println!("Done");
                break;
            }
        };
        let text = match frame {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                println!("Connection error: {}", e);
                break;
            }
            None => {
                println!("Server closed the connection");
                break;
            }
        };

        let message: ServerMessage = match serde_json::from_str(&text) {
            Ok(message) => message,
            Err(e) => {
                println!("Unreadable message ({}): {}", e, text);
                continue;
            }
        };

        match message {
            ServerMessage::RoomJoined {
                player_id: id,
                reconnect_token,
                ..
            } => {
                println!("Joined as {} (token {})", id, reconnect_token);
                player_id = id;
            }
            ServerMessage::RoomUpdate { room } => {
                println!(
                    "Room {}: {} players, started: {}",
                    room.room_code,
                    room.players.len(),
                    room.started
                );
            }
            ServerMessage::GameStart { game_data } => {
                println!("Game started on {} ({}x{})", game_data.map_id, game_data.map_size, game_data.map_size);
            }
            ServerMessage::StateUpdate { tick, changes } => {
                state.apply(&changes);
                if tick % 20 == 0 || changes.full {
                    println!(
                        "Tick {}: {} units, {} buildings, resources {:?}",
                        tick,
                        state.units.len(),
                        state.buildings.len(),
                        state.resources.get(&player_id)
                    );
                }

                if !ordered {
                    let mine: Vec<_> = state
                        .units
                        .values()
                        .filter(|unit| unit.owner == player_id)
                        .collect();
                    if let Some(first) = mine.first() {
                        let target_x = (first.x.round() as i32 + 3).max(0);
                        let target_y = first.y.round() as i32;
                        sink.send(encode(&ClientMessage::GameEvent {
                            room_code: args.room.clone(),
                            event: GameEventKind::UnitMove {
                                unit_ids: mine.iter().map(|unit| unit.id).collect(),
                                target_x,
                                target_y,
                            },
                        })?)
                        .await?;
                        ordered = true;
                    }
                }
            }
            ServerMessage::Ping { timestamp } => {
                sink.send(encode(&ClientMessage::Pong {
                    room_code: args.room.clone(),
                    timestamp,
                })?)
                .await?;
            }
            ServerMessage::Error { message } => println!("Server error: {}", message),
            other => println!("Received: {:?}", other),
        }
    }

    sink.send(encode(&ClientMessage::LeaveRoom {
        room_code: args.room.clone(),
    })?)
    .await?;
    let _ = sink.close().await;
    Ok(())
}

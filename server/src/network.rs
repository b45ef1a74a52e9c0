//! Server network layer handling WebSocket connections and game loop coordination

use crate::config::GameConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{ProtocolError, ServerError};
use crate::scheduler::TickScheduler;
use crate::utils::get_timestamp;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{ClientId, ServerMessage};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::interval;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// How often disconnected players are checked against the grace window.
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Messages sent from connection tasks to the main server loop
#[derive(Debug)]
pub enum NetworkEvent {
    Connected {
        client_id: ClientId,
        tx: mpsc::UnboundedSender<String>,
    },
    Frame {
        client_id: ClientId,
        text: String,
    },
    Disconnected {
        client_id: ClientId,
    },
}

/// Main server coordinating networking and game simulation
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    config: Arc<GameConfig>,
    dispatcher: Dispatcher,
    scheduler: TickScheduler,

    // Communication channels
    event_tx: mpsc::UnboundedSender<NetworkEvent>,
    event_rx: mpsc::UnboundedReceiver<NetworkEvent>,
}

impl Server {
    pub async fn bind(addr: &str, config: GameConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        let config = Arc::new(config);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            local_addr,
            dispatcher: Dispatcher::new(Arc::clone(&config)),
            scheduler: TickScheduler::from_config(&config),
            config,
            event_tx,
            event_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Spawns task that accepts TCP connections and hands each to its own
    /// connection task
    fn spawn_acceptor(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let event_tx = self.event_tx.clone();
        let next_client_id = Arc::new(AtomicU32::new(1));

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        let client_id = next_client_id.fetch_add(1, Ordering::Relaxed);
                        let event_tx = event_tx.clone();
                        tokio::spawn(serve_connection(stream, peer, client_id, event_tx));
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    fn handle_event(&mut self, event: NetworkEvent) {
        match event {
            NetworkEvent::Connected { client_id, tx } => self.dispatcher.connect(client_id, tx),
            NetworkEvent::Frame { client_id, text } => self.dispatcher.handle_text(client_id, &text),
            NetworkEvent::Disconnected { client_id } => {
                self.dispatcher.disconnect(client_id, Instant::now())
            }
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), ServerError> {
        self.spawn_acceptor();
        self.scheduler.start();

        let mut sweep_interval = interval(SWEEP_INTERVAL);
        let mut ping_interval = interval(Duration::from_secs(self.config.ping_interval_secs.max(1)));

        info!("Server started successfully");

        loop {
            tokio::select! {
                // Handle network events
                event = self.event_rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                // Handle server tick events
                dt = self.scheduler.next_tick() => {
                    self.scheduler.fire(self.dispatcher.rooms_mut(), dt);

                    if self.scheduler.ticks() % 600 == 0 {
                        debug!(
                            "Tick {}: {} clients, {} rooms",
                            self.scheduler.ticks(),
                            self.dispatcher.client_count(),
                            self.dispatcher.rooms().len()
                        );
                    }
                },

                _ = sweep_interval.tick() => {
                    self.dispatcher.sweep(Instant::now());
                },

                _ = ping_interval.tick() => {
                    self.dispatcher.send_pings(get_timestamp());
                },
            }
        }

        self.scheduler.stop();
        Ok(())
    }
}

/// Performs the WebSocket handshake, then pumps frames between the socket and
/// the server loop until either side closes.
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    client_id: ClientId,
    events: mpsc::UnboundedSender<NetworkEvent>,
) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", peer, e);
            return;
        }
    };
    info!("Client {} connected from {}", client_id, peer);

    let (mut sink, mut source) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let reply = tx.clone();
    if events.send(NetworkEvent::Connected { client_id, tx }).is_err() {
        return;
    }

    let writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if let Err(e) = sink.send(Message::Text(text)).await {
                debug!("Failed to send to client {}: {}", client_id, e);
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                if events.send(NetworkEvent::Frame { client_id, text }).is_err() {
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                warn!("Binary frame from client {}", client_id);
                let message = ServerMessage::error(ProtocolError::UnsupportedFrame.to_string());
                if let Ok(text) = serde_json::to_string(&message) {
                    let _ = reply.send(text);
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Error reading from client {}: {}", client_id, e);
                break;
            }
        }
    }

    let _ = events.send(NetworkEvent::Disconnected { client_id });
    writer.abort();
    info!("Client {} connection closed", client_id);
}

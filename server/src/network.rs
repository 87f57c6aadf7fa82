//! Server network layer: admission into player slots and the WebSocket
//! accept loop

use crate::arena::Arena;
use crate::client_manager::{ClientManager, SlotLease, Termination};
use crate::config::ServerConfig;
use crate::error::AdmitError;
use crate::session;
use crate::transport::{split_websocket, Inbound, Outbound};
use crate::utils::identity_for_slot;
use log::{debug, error, info, warn};
use shared::ServerMessage;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::accept_async;

/// Arena server owning the slot table and the arena every session plays in
#[derive(Clone)]
pub struct Server {
    config: ServerConfig,
    arena: Arena,
    clients: Arc<Mutex<ClientManager>>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        let arena = Arena::new(&config);
        Self::with_arena(config, arena)
    }

    pub fn with_arena(config: ServerConfig, arena: Arena) -> Self {
        Self {
            clients: Arc::new(Mutex::new(ClientManager::new(config.max_players))),
            config,
            arena,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Admits a connection into the first free slot and starts its session.
    ///
    /// When every slot is taken the connection gets `GAME_FULL` and is
    /// closed without any session state being created.
    pub async fn admit<I, O>(
        &self,
        inbound: I,
        mut outbound: O,
        peer: impl Into<String>,
    ) -> Result<usize, AdmitError>
    where
        I: Inbound,
        O: Outbound,
    {
        let peer = peer.into();
        let termination = Termination::new();
        let admitted = {
            let mut clients = self.clients.lock().await;
            clients
                .admit(peer.clone(), termination.clone())
                .map(|slot| (slot, clients.admissions(slot)))
        };

        let Some((slot, admission)) = admitted else {
            warn!("Rejecting {}: all {} slots taken", peer, self.config.max_players);
            if let Err(e) = outbound.send(ServerMessage::GameFull.to_string()).await {
                debug!("Could not tell {} the game is full: {}", peer, e);
            }
            outbound.close().await;
            return Err(AdmitError::GameFull {
                capacity: self.config.max_players,
            });
        };

        let lease = SlotLease::new(slot, termination, Arc::clone(&self.clients));
        session::start(
            lease,
            identity_for_slot(slot, admission),
            self.arena.clone(),
            inbound,
            outbound,
            self.config.outbound_queue,
        );
        Ok(slot)
    }

    /// Number of occupied slots
    pub async fn connected(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Ends every session. Each slot is released exactly once, either here
    /// or by a session that was already on its way out.
    pub async fn shutdown(&self) -> usize {
        let freed = self.clients.lock().await.drain();
        info!("Shut down {} sessions", freed.len());
        freed.len()
    }

    /// Accepts WebSocket connections until the task is dropped.
    pub async fn run(&self, listener: TcpListener) -> std::io::Result<()> {
        info!("Server listening on {}", listener.local_addr()?);

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let server = self.clone();
                    tokio::spawn(async move {
                        server.handle_connection(stream, addr).await;
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }

    async fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let socket = match accept_async(stream).await {
            Ok(socket) => socket,
            Err(e) => {
                warn!("WebSocket handshake with {} failed: {}", addr, e);
                return;
            }
        };

        let (inbound, outbound) = split_websocket(socket);
        if let Err(e) = self.admit(inbound, outbound, addr.to_string()).await {
            info!("Turned away {}: {}", addr, e);
        }
    }
}

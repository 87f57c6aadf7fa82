//! Per-connection session.
//!
//! Each admitted connection runs two tasks. The read loop decodes commands
//! and forwards them to the arena; the write loop drains a bounded queue of
//! [`ServerMessage`]s onto the transport. Either loop ending ends the
//! session's [`SlotLease`], which stops the other loop and frees the slot.

use crate::arena::Arena;
use crate::client_manager::SlotLease;
use crate::trail::Point;
use crate::transport::{Inbound, Outbound};
use crate::vehicle::{Identity, VehicleId};
use log::{debug, error, info, warn};
use shared::{ClientCommand, Direction, ServerMessage};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

pub const SPAWN_PROMPT: &str = "Press [SPACEBAR] To Spawn!";
pub const NO_ROOM_HINT: &str = "No room to spawn, try again!";

pub struct Session {
    lease: SlotLease,
    identity: Identity,
    arena: Arena,
    vehicle: Option<VehicleId>,
    outgoing: mpsc::Sender<ServerMessage>,
}

impl Session {
    pub fn new(
        lease: SlotLease,
        identity: Identity,
        arena: Arena,
        outgoing: mpsc::Sender<ServerMessage>,
    ) -> Self {
        Self {
            identity,
            lease,
            arena,
            vehicle: None,
            outgoing,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The bike this session spawned last, dead or alive.
    pub fn vehicle(&self) -> Option<VehicleId> {
        self.vehicle
    }

    /// Handles one inbound text frame.
    pub async fn handle(&mut self, text: &str) {
        let command = match ClientCommand::parse(text) {
            Ok(command) => command,
            Err(e) => {
                warn!(
                    "Dropping malformed command from {}: {}",
                    self.identity.name, e
                );
                return;
            }
        };

        match command {
            ClientCommand::RequestState => {
                self.reply(ServerMessage::NewState(self.arena.latest_snapshot()));
            }
            ClientCommand::Spawn { x, y } => self.spawn(Point::new(x, y)).await,
            ClientCommand::Turn(direction) => self.turn(direction).await,
            ClientCommand::Unknown(raw) => {
                debug!("Echoing unknown command from {}: {}", self.identity.name, raw);
                self.reply(ServerMessage::Echo(raw));
            }
        }
    }

    async fn spawn(&mut self, hint: Point) {
        if let Some(id) = self.vehicle {
            if self.arena.is_alive(id).await {
                debug!("{} already has a live bike, ignoring spawn", self.identity.name);
                return;
            }
        }

        match self.arena.spawn(self.identity.clone(), Some(hint)).await {
            Ok(id) => {
                self.vehicle = Some(id);
                self.reply(ServerMessage::DisplayMessage(String::new()));
            }
            Err(e) => {
                warn!("Could not spawn {}: {}", self.identity.name, e);
                self.reply(ServerMessage::DisplayMessage(NO_ROOM_HINT.to_string()));
            }
        }
    }

    async fn turn(&mut self, direction: Direction) {
        let Some(id) = self.vehicle else {
            debug!("{} has no bike to turn", self.identity.name);
            return;
        };
        if !self.arena.turn(id, direction).await {
            debug!(
                "{} turn {} ignored",
                self.identity.name,
                direction.token()
            );
        }
    }

    /// Queues a message without waiting. A full queue drops the message.
    fn reply(&self, message: ServerMessage) {
        match self.outgoing.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Outbound queue for {} is full, dropping message", self.identity.name);
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Outbound queue for {} is closed", self.identity.name);
            }
        }
    }
}

/// Starts the read and write loops of an admitted connection.
pub fn start<I, O>(
    lease: SlotLease,
    identity: Identity,
    arena: Arena,
    inbound: I,
    outbound: O,
    queue: usize,
) -> (JoinHandle<()>, JoinHandle<()>)
where
    I: Inbound,
    O: Outbound,
{
    let (outgoing, pending) = mpsc::channel(queue.max(1));
    let session = Session::new(lease.clone(), identity, arena, outgoing);
    let name = session.identity.name.clone();

    let reader = tokio::spawn(read_loop(session, inbound));
    let writer = tokio::spawn(write_loop(outbound, pending, lease, name));
    (reader, writer)
}

async fn read_loop<I: Inbound>(mut session: Session, mut inbound: I) {
    let lease = session.lease.clone();

    loop {
        tokio::select! {
            _ = lease.termination().fired() => break,
            frame = inbound.recv() => match frame {
                Some(Ok(text)) => session.handle(&text).await,
                Some(Err(e)) => {
                    error!("Read from {} failed: {}", session.identity.name, e);
                    break;
                }
                None => {
                    info!("{} closed the connection", session.identity.name);
                    break;
                }
            }
        }
    }

    lease.end().await;
}

async fn write_loop<O: Outbound>(
    mut outbound: O,
    mut pending: mpsc::Receiver<ServerMessage>,
    lease: SlotLease,
    name: String,
) {
    let greeting = [
        ServerMessage::Connected,
        ServerMessage::DisplayMessage(SPAWN_PROMPT.to_string()),
    ];
    let mut healthy = true;
    for message in greeting {
        if let Err(e) = outbound.send(message.to_string()).await {
            error!("Write to {} failed: {}", name, e);
            healthy = false;
            break;
        }
    }

    while healthy {
        let message = tokio::select! {
            _ = lease.termination().fired() => break,
            message = pending.recv() => match message {
                Some(message) => message,
                None => break,
            }
        };

        if let Err(e) = outbound.send(message.to_string()).await {
            error!("Write to {} failed: {}", name, e);
            healthy = false;
        }
    }

    lease.end().await;
    outbound.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client_manager::{ClientManager, Termination};
    use crate::config::ServerConfig;
    use crate::utils::identity_for_slot;
    use shared::WorldSnapshot;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use tokio::time::timeout;

    struct Harness {
        clients: Arc<Mutex<ClientManager>>,
        termination: Termination,
        to_server: mpsc::Sender<String>,
        from_server: mpsc::Receiver<String>,
        loops: (JoinHandle<()>, JoinHandle<()>),
    }

    async fn connect() -> Harness {
        let (to_server, inbound) = mpsc::channel(16);
        let (outbound, from_server) = mpsc::channel(16);
        connect_with(inbound, outbound, from_server, to_server).await
    }

    async fn connect_with(
        inbound: mpsc::Receiver<String>,
        outbound: mpsc::Sender<String>,
        from_server: mpsc::Receiver<String>,
        to_server: mpsc::Sender<String>,
    ) -> Harness {
        let config = ServerConfig::default();
        let clients = Arc::new(Mutex::new(ClientManager::new(config.max_players)));
        let termination = Termination::new();
        let slot = clients
            .lock()
            .await
            .admit("test", termination.clone())
            .unwrap();
        let lease = SlotLease::new(slot, termination.clone(), Arc::clone(&clients));
        let identity = identity_for_slot(slot, 1);
        let loops = start(lease, identity, Arena::new(&config), inbound, outbound, 8);

        Harness {
            clients,
            termination,
            to_server,
            from_server,
            loops,
        }
    }

    async fn next_message(rx: &mut mpsc::Receiver<String>) -> String {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for server")
            .expect("server closed the channel")
    }

    async fn connect_and_skip_greeting() -> Harness {
        let mut harness = connect().await;
        next_message(&mut harness.from_server).await;
        next_message(&mut harness.from_server).await;
        harness
    }

    async fn wait_for_release(clients: &Arc<Mutex<ClientManager>>) {
        timeout(Duration::from_secs(1), async {
            while !clients.lock().await.is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("slot was never released");
    }

    #[tokio::test]
    async fn test_greeting() {
        let mut harness = connect().await;
        assert_eq!(next_message(&mut harness.from_server).await, "CONNECTED");
        assert_eq!(
            next_message(&mut harness.from_server).await,
            "DISPLAY_MESSAGE:Press [SPACEBAR] To Spawn!"
        );
    }

    #[tokio::test]
    async fn test_request_state_on_empty_arena() {
        let mut harness = connect_and_skip_greeting().await;
        harness.to_server.send("REQUEST_STATE".into()).await.unwrap();

        let reply = next_message(&mut harness.from_server).await;
        assert_eq!(reply, r#"NEW_STATE:{"BIKES":[],"TRAILS":[]}"#);
    }

    #[tokio::test]
    async fn test_spawn_then_state() {
        let mut harness = connect_and_skip_greeting().await;
        harness.to_server.send("SPAWN:100:100".into()).await.unwrap();
        assert_eq!(
            next_message(&mut harness.from_server).await,
            "DISPLAY_MESSAGE:"
        );

        harness.to_server.send("REQUEST_STATE".into()).await.unwrap();
        let reply = next_message(&mut harness.from_server).await;
        let json = reply.strip_prefix("NEW_STATE:").unwrap();
        let snapshot = WorldSnapshot::from_json(json).unwrap();

        assert_eq!(snapshot.bikes.len(), 1);
        assert_eq!(snapshot.bikes[0].name, "player1");
        assert_eq!(snapshot.bikes[0].colour, "blue");
        assert_eq!(snapshot.trails.len(), 1);
        assert_eq!(snapshot.trails[0].start_x, 100.0);
        assert_eq!(snapshot.trails[0].start_y, 100.0);
    }

    #[tokio::test]
    async fn test_second_spawn_while_alive_is_ignored() {
        let mut harness = connect_and_skip_greeting().await;
        harness.to_server.send("SPAWN:100:100".into()).await.unwrap();
        harness.to_server.send("SPAWN:300:300".into()).await.unwrap();
        harness.to_server.send("REQUEST_STATE".into()).await.unwrap();

        assert_eq!(
            next_message(&mut harness.from_server).await,
            "DISPLAY_MESSAGE:"
        );
        let reply = next_message(&mut harness.from_server).await;
        let snapshot = WorldSnapshot::from_json(reply.strip_prefix("NEW_STATE:").unwrap()).unwrap();
        assert_eq!(snapshot.bikes.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_command_is_echoed() {
        let mut harness = connect_and_skip_greeting().await;
        harness.to_server.send("HELLO:v2".into()).await.unwrap();
        assert_eq!(next_message(&mut harness.from_server).await, "HELLO:v2");
    }

    #[tokio::test]
    async fn test_malformed_command_is_dropped() {
        let mut harness = connect_and_skip_greeting().await;
        harness.to_server.send("SPAWN:1".into()).await.unwrap();
        harness.to_server.send("TURN:SIDEWAYS".into()).await.unwrap();
        harness.to_server.send("".into()).await.unwrap();
        harness.to_server.send("REQUEST_STATE".into()).await.unwrap();

        let reply = next_message(&mut harness.from_server).await;
        assert!(reply.starts_with("NEW_STATE:"));
    }

    #[tokio::test]
    async fn test_turn_without_bike_is_ignored() {
        let mut harness = connect_and_skip_greeting().await;
        harness.to_server.send("TURN:UP".into()).await.unwrap();
        harness.to_server.send("REQUEST_STATE".into()).await.unwrap();

        let reply = next_message(&mut harness.from_server).await;
        assert!(reply.starts_with("NEW_STATE:"));
    }

    #[tokio::test]
    async fn test_client_close_releases_slot() {
        let harness = connect().await;
        assert_eq!(harness.clients.lock().await.len(), 1);

        drop(harness.to_server);
        wait_for_release(&harness.clients).await;

        let (reader, writer) = harness.loops;
        reader.await.unwrap();
        writer.await.unwrap();
        assert!(harness.termination.is_fired());
    }

    #[tokio::test]
    async fn test_write_failure_ends_session() {
        let (to_server, inbound) = mpsc::channel(16);
        let (outbound, from_server) = mpsc::channel::<String>(16);
        drop(from_server);
        let (_, unused) = mpsc::channel(1);

        let harness = connect_with(inbound, outbound, unused, to_server).await;
        wait_for_release(&harness.clients).await;

        // The read loop stops too even though the client never closed
        let (reader, _) = harness.loops;
        timeout(Duration::from_secs(1), reader)
            .await
            .expect("read loop kept running")
            .unwrap();
    }

    #[tokio::test]
    async fn test_external_termination_stops_both_loops() {
        let harness = connect_and_skip_greeting().await;
        assert!(harness.termination.fire());

        let (reader, writer) = harness.loops;
        timeout(Duration::from_secs(1), async {
            reader.await.unwrap();
            writer.await.unwrap();
        })
        .await
        .expect("loops kept running");

        // Whoever fired the signal owns the release, so the slot is untouched
        assert_eq!(harness.clients.lock().await.len(), 1);
    }
}

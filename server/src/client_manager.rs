//! Player slot table for the arena server
//!
//! This module tracks which of the server's fixed number of player slots are
//! taken, and by whom. It covers:
//! - Slot allocation on connect (lowest free index first)
//! - Slot release on disconnect, with double release reported but harmless
//! - The one-shot termination signal shared by a session's two loops
//!
//! A slot index doubles as the player's number: it picks the rider's name
//! and colour and is only reused once the previous session released it.
//! Each slot also counts how often it has been handed out, so a returning
//! player can be told apart from a previous occupant whose bike still rides.

use log::{info, warn};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// One-shot signal that ends a session.
///
/// Cloned into both of a session's loops. Whoever fires it first owns the
/// job of releasing the session's slot.
#[derive(Clone, Debug)]
pub struct Termination {
    signal: Arc<watch::Sender<bool>>,
}

impl Termination {
    pub fn new() -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            signal: Arc::new(signal),
        }
    }

    /// Fires the signal. Returns true only for the call that fired it.
    pub fn fire(&self) -> bool {
        !self.signal.send_replace(true)
    }

    pub fn is_fired(&self) -> bool {
        *self.signal.borrow()
    }

    /// Resolves once the signal has fired, immediately if it already has.
    pub async fn fired(&self) {
        let mut receiver = self.signal.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = receiver.wait_for(|fired| *fired).await;
    }
}

impl Default for Termination {
    fn default() -> Self {
        Self::new()
    }
}

/// An occupied slot
#[derive(Debug)]
pub struct Client {
    /// Remote address or other label, for logs
    pub peer: String,
    pub termination: Termination,
}

/// Fixed-size table of player slots
pub struct ClientManager {
    slots: Vec<Option<Client>>,
    admissions: Vec<u32>,
    connected: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            slots: (0..max_clients).map(|_| None).collect(),
            admissions: vec![0; max_clients],
            connected: 0,
        }
    }

    /// Binds a connection to the first free slot.
    ///
    /// Returns None if every slot is taken.
    pub fn admit(&mut self, peer: impl Into<String>, termination: Termination) -> Option<usize> {
        let slot = self.slots.iter().position(Option::is_none)?;
        let peer = peer.into();

        info!("Client {} connected from {}", slot, peer);
        self.slots[slot] = Some(Client { peer, termination });
        self.admissions[slot] += 1;
        self.connected += 1;

        Some(slot)
    }

    /// Frees a slot. Returns false, and logs a warning, if it was already
    /// free or out of range.
    pub fn release(&mut self, slot: usize) -> bool {
        match self.slots.get_mut(slot).and_then(Option::take) {
            Some(client) => {
                self.connected -= 1;
                info!("Client {} ({}) disconnected", slot, client.peer);
                true
            }
            None => {
                warn!("Release of slot {} which is not occupied", slot);
                false
            }
        }
    }

    /// Fires every session's termination and frees the slots whose session
    /// had not ended yet. Returns the freed slots.
    pub fn drain(&mut self) -> Vec<usize> {
        let fired: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(slot, client)| {
                client
                    .as_ref()
                    .filter(|client| client.termination.fire())
                    .map(|_| slot)
            })
            .collect();

        for &slot in &fired {
            self.release(slot);
        }
        fired
    }

    pub fn peer(&self, slot: usize) -> Option<&str> {
        self.slots
            .get(slot)
            .and_then(Option::as_ref)
            .map(|client| client.peer.as_str())
    }

    /// How many times `slot` has been handed out, the current session
    /// included.
    pub fn admissions(&self, slot: usize) -> u32 {
        self.admissions.get(slot).copied().unwrap_or(0)
    }

    /// Returns the number of currently connected clients
    pub fn len(&self) -> usize {
        self.connected
    }

    pub fn is_empty(&self) -> bool {
        self.connected == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_full(&self) -> bool {
        self.connected == self.slots.len()
    }
}

/// A session's claim on its slot.
///
/// Both of a session's loops hold a clone. Ending the lease fires the
/// termination and, if this call was the one that fired it, frees the slot.
#[derive(Clone)]
pub struct SlotLease {
    slot: usize,
    termination: Termination,
    clients: Arc<Mutex<ClientManager>>,
}

impl SlotLease {
    pub fn new(slot: usize, termination: Termination, clients: Arc<Mutex<ClientManager>>) -> Self {
        Self {
            slot,
            termination,
            clients,
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn termination(&self) -> &Termination {
        &self.termination
    }

    /// Returns true if this call released the slot.
    pub async fn end(&self) -> bool {
        if !self.termination.fire() {
            return false;
        }
        self.clients.lock().await.release(self.slot)
    }
}

//! Connection table for the session server
//!
//! This module tracks every UDP peer that completed the connect handshake:
//! - Connection lifecycle (connect, disconnect, timeout)
//! - Liveness tracking from heartbeats and any other traffic
//! - Capacity enforcement and address lookup for outbound routing
//!
//! A connection exists before its player joins the world and is what chat
//! and `player:left` broadcasts are addressed to.

use crate::session::Recipients;
use log::info;
use shared::PlayerId;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// One connected peer
#[derive(Debug)]
pub struct Client {
    /// Connection identity, also used as the player id
    pub id: PlayerId,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
}

impl Client {
    pub fn new(id: PlayerId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
        }
    }

    /// Checks if the client has exceeded the connection timeout
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all connected clients
///
/// Enforces the connection bound so a flood of handshakes cannot grow the
/// table without limit, and hands out monotonically increasing ids.
pub struct ClientManager {
    clients: BTreeMap<PlayerId, Client>,
    next_client_id: PlayerId,
    max_clients: usize,
    timeout: Duration,
}

impl ClientManager {
    pub fn new(max_clients: usize, timeout: Duration) -> Self {
        Self {
            clients: BTreeMap::new(),
            next_client_id: 1,
            max_clients,
            timeout,
        }
    }

    /// Attempts to add a new client connection
    ///
    /// Returns Some(client_id) if successful, None if server is at capacity.
    pub fn add_client(&mut self, addr: SocketAddr) -> Option<PlayerId> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients.insert(client_id, Client::new(client_id, addr));

        Some(client_id)
    }

    /// Removes a client. Returns false if they were already gone.
    pub fn remove_client(&mut self, client_id: &PlayerId) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!("Client {} disconnected", client.id);
            true
        } else {
            false
        }
    }

    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<PlayerId> {
        self.clients
            .values()
            .find(|client| client.addr == addr)
            .map(|client| client.id)
    }

    /// Records activity from a client. Returns false for unknown ids.
    pub fn touch(&mut self, client_id: PlayerId) -> bool {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.last_seen = Instant::now();
            true
        } else {
            false
        }
    }

    /// Removes and returns the ids of clients silent for longer than the
    /// configured timeout.
    pub fn check_timeouts(&mut self) -> Vec<PlayerId> {
        let timed_out: Vec<PlayerId> = self
            .clients
            .values()
            .filter(|client| client.is_timed_out(self.timeout))
            .map(|client| client.id)
            .collect();

        for client_id in &timed_out {
            info!("Client {} timed out", client_id);
            self.remove_client(client_id);
        }

        timed_out
    }

    /// Resolves a recipient set to concrete addresses
    pub fn addrs_for(&self, recipients: Recipients) -> Vec<(PlayerId, SocketAddr)> {
        self.clients
            .values()
            .filter(|client| recipients.includes(client.id))
            .map(|client| (client.id, client.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

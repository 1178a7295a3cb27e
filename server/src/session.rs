//! Authoritative roster of joined players and fan-out of their actions
//!
//! The registry is the only writer of player sessions. Each operation
//! mutates the roster (or not) and returns the packets that must go out,
//! tagged with who should receive them. Delivery is the network layer's job,
//! which keeps this module free of sockets and trivially testable.
//!
//! Events are handled strictly one at a time by the server loop, so the
//! registry needs no internal locking.

use log::{debug, info};
use shared::{clamp_name, AvatarConfig, Packet, PlayerData, PlayerId};
use std::collections::BTreeMap;

/// Server-side record of one joined player
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSession {
    pub id: PlayerId,
    pub name: String,
    pub avatar: AvatarConfig,
    pub x: f32,
    pub y: f32,
    /// Sequence number of the last applied move
    pub last_move_seq: u32,
}

impl PlayerSession {
    pub fn to_data(&self) -> PlayerData {
        PlayerData {
            id: self.id,
            name: self.name.clone(),
            avatar: self.avatar.clone(),
            x: self.x,
            y: self.y,
        }
    }
}

/// Who an outbound packet is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipients {
    Only(PlayerId),
    AllExcept(PlayerId),
    All,
}

impl Recipients {
    pub fn includes(&self, client_id: PlayerId) -> bool {
        match *self {
            Recipients::Only(id) => id == client_id,
            Recipients::AllExcept(id) => id != client_id,
            Recipients::All => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub recipients: Recipients,
    pub packet: Packet,
}

impl Outbound {
    fn new(recipients: Recipients, packet: Packet) -> Self {
        Self { recipients, packet }
    }
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<PlayerId, PlayerSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates (or overwrites) the session for `id`.
    ///
    /// The joiner receives the full roster, itself included; everyone else
    /// receives the new session. No validation beyond truncating the name.
    pub fn join(
        &mut self,
        id: PlayerId,
        name: &str,
        avatar: AvatarConfig,
        x: f32,
        y: f32,
    ) -> Vec<Outbound> {
        let session = PlayerSession {
            id,
            name: clamp_name(name),
            avatar,
            x,
            y,
            last_move_seq: 0,
        };
        info!("Player {} joined as {:?} at ({}, {})", id, session.name, x, y);

        let joined = session.to_data();
        self.sessions.insert(id, session);

        vec![
            Outbound::new(
                Recipients::Only(id),
                Packet::PlayersExisting {
                    players: self.roster(),
                },
            ),
            Outbound::new(Recipients::AllExcept(id), Packet::PlayerJoined { player: joined }),
        ]
    }

    /// Applies a position update, last write wins.
    ///
    /// Moves from connections without a session and moves whose sequence
    /// number is not newer than the last applied one are dropped.
    pub fn move_player(&mut self, id: PlayerId, seq: u32, x: f32, y: f32) -> Vec<Outbound> {
        let Some(session) = self.sessions.get_mut(&id) else {
            debug!("Ignoring move from player {} without a session", id);
            return Vec::new();
        };

        if seq <= session.last_move_seq {
            debug!(
                "Dropping stale move {} from player {} (last {})",
                seq, id, session.last_move_seq
            );
            return Vec::new();
        }

        session.x = x;
        session.y = y;
        session.last_move_seq = seq;

        vec![Outbound::new(
            Recipients::AllExcept(id),
            Packet::PlayerMoved { id, seq, x, y },
        )]
    }

    /// Removes the session of a departed connection.
    ///
    /// Removal is announced to every remaining connection even when the
    /// connection never joined; receivers treat unknown ids as a no-op.
    pub fn leave(&mut self, id: PlayerId) -> Vec<Outbound> {
        if let Some(session) = self.sessions.remove(&id) {
            info!("Player {} ({}) left", id, session.name);
        }

        vec![Outbound::new(
            Recipients::AllExcept(id),
            Packet::PlayerLeft { id },
        )]
    }

    /// Relays a chat line to everyone, the sender included.
    pub fn relay_chat(&self, id: PlayerId, text: &str, sender: &str) -> Vec<Outbound> {
        debug!("Chat from {} ({}): {}", id, sender, text);
        vec![Outbound::new(
            Recipients::All,
            Packet::ChatMessage {
                id,
                text: text.to_string(),
                sender: sender.to_string(),
            },
        )]
    }

    /// Snapshot of all sessions, ordered by id
    pub fn roster(&self) -> Vec<PlayerData> {
        self.sessions.values().map(PlayerSession::to_data).collect()
    }

    pub fn get(&self, id: PlayerId) -> Option<&PlayerSession> {
        self.sessions.get(&id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

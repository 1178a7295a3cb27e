//! Wire protocol between the client transport and the session server.
//!
//! Every datagram carries exactly one bincode-encoded [`Packet`]. The first
//! group of variants manages the connection itself; the rest are the world
//! events, each with a stable wire name (see [`Packet::event_name`]).

use crate::{MAX_NAME_LEN, MAX_PACKET_SIZE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Connection identity assigned by the server on `Connected`.
pub type PlayerId = u32;

/// Avatar selection. Opaque item identifiers, never interpreted by the
/// simulation or the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AvatarConfig {
    pub body: String,
    pub outfit: String,
    pub hair: String,
    pub accessory: String,
}

/// One player as seen on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerData {
    pub id: PlayerId,
    pub name: String,
    pub avatar: AvatarConfig,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    Connect {
        client_version: u32,
    },
    Connected {
        client_id: PlayerId,
    },
    Heartbeat,
    Disconnect,
    Disconnected {
        reason: String,
    },

    PlayerJoin {
        avatar: AvatarConfig,
        name: String,
        x: f32,
        y: f32,
    },
    PlayersExisting {
        players: Vec<PlayerData>,
    },
    PlayerJoined {
        player: PlayerData,
    },
    PlayerMove {
        seq: u32,
        x: f32,
        y: f32,
    },
    PlayerMoved {
        id: PlayerId,
        seq: u32,
        x: f32,
        y: f32,
    },
    PlayerLeft {
        id: PlayerId,
    },
    ChatSend {
        text: String,
        sender: String,
    },
    ChatMessage {
        id: PlayerId,
        text: String,
        sender: String,
    },
}

impl Packet {
    /// Wire name of the event, used for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            Packet::Connect { .. } => "connect",
            Packet::Connected { .. } => "connected",
            Packet::Heartbeat => "heartbeat",
            Packet::Disconnect => "disconnect",
            Packet::Disconnected { .. } => "disconnected",
            Packet::PlayerJoin { .. } => "player:join",
            Packet::PlayersExisting { .. } => "players:existing",
            Packet::PlayerJoined { .. } => "player:joined",
            Packet::PlayerMove { .. } => "player:move",
            Packet::PlayerMoved { .. } => "player:moved",
            Packet::PlayerLeft { .. } => "player:left",
            Packet::ChatSend { .. } | Packet::ChatMessage { .. } => "chat:message",
        }
    }

    /// Converts a server-to-client world packet into the event delivered to
    /// client listeners. Connection management and client-to-server packets
    /// yield `None`.
    pub fn into_server_event(self) -> Option<ServerEvent> {
        match self {
            Packet::PlayersExisting { players } => Some(ServerEvent::PlayersExisting(players)),
            Packet::PlayerJoined { player } => Some(ServerEvent::PlayerJoined(player)),
            Packet::PlayerMoved { id, seq, x, y } => Some(ServerEvent::PlayerMoved { id, seq, x, y }),
            Packet::PlayerLeft { id } => Some(ServerEvent::PlayerLeft { id }),
            Packet::ChatMessage { id, text, sender } => {
                Some(ServerEvent::ChatMessage { id, text, sender })
            }
            _ => None,
        }
    }
}

/// Closed set of inbound event kinds a client can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PlayersExisting,
    PlayerJoined,
    PlayerMoved,
    PlayerLeft,
    ChatMessage,
}

/// Inbound world event, as delivered to client listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    PlayersExisting(Vec<PlayerData>),
    PlayerJoined(PlayerData),
    PlayerMoved {
        id: PlayerId,
        seq: u32,
        x: f32,
        y: f32,
    },
    PlayerLeft {
        id: PlayerId,
    },
    ChatMessage {
        id: PlayerId,
        text: String,
        sender: String,
    },
}

impl ServerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ServerEvent::PlayersExisting(_) => EventKind::PlayersExisting,
            ServerEvent::PlayerJoined(_) => EventKind::PlayerJoined,
            ServerEvent::PlayerMoved { .. } => EventKind::PlayerMoved,
            ServerEvent::PlayerLeft { .. } => EventKind::PlayerLeft,
            ServerEvent::ChatMessage { .. } => EventKind::ChatMessage,
        }
    }
}

/// Goal side. A ball entering the left goal scores for `Right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("packet codec failure: {0}")]
    Codec(#[from] bincode::Error),
    #[error("encoded packet is {0} bytes, limit is {}", MAX_PACKET_SIZE)]
    TooLarge(usize),
}

pub fn encode(packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
    let data = bincode::serialize(packet)?;
    if data.len() > MAX_PACKET_SIZE {
        return Err(ProtocolError::TooLarge(data.len()));
    }
    Ok(data)
}

pub fn decode(data: &[u8]) -> Result<Packet, ProtocolError> {
    Ok(bincode::deserialize(data)?)
}

/// Truncates a display name to [`MAX_NAME_LEN`] characters.
pub fn clamp_name(name: &str) -> String {
    name.chars().take(MAX_NAME_LEN).collect()
}

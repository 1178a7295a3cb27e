//! Client transport: hides connection timing from the rest of the client
//!
//! Callers send whenever they like. While the session is not established,
//! messages wait in a bounded FIFO queue that is flushed, oldest first, once
//! per successful handshake. Position updates go through a throttle that
//! collapses bursts to at most one datagram per interval. Inbound world
//! events are dispatched to typed listeners, which live here rather than on
//! the link and so survive reconnects.

use crate::events::{EventBus, Handler, Subscription};
use log::{debug, info, warn};
use shared::{
    AvatarConfig, EventKind, Packet, PlayerId, ProtocolError, ServerEvent, PROTOCOL_VERSION,
};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Minimum spacing between two position updates on the wire
pub const POSITION_SEND_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound on messages held while not connected
pub const MAX_QUEUED_MESSAGES: usize = 256;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("link is closed")]
    Closed,
    #[error("failed to open link: {0}")]
    Connect(String),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A bidirectional packet pipe to the server
pub trait Link: Send {
    fn send(&mut self, packet: Packet) -> Result<(), TransportError>;

    /// Next packet received from the server, if any is pending
    fn try_recv(&mut self) -> Option<Packet>;
}

/// Opens a fresh link for every `connect()`
pub type Connector = Box<dyn FnMut() -> Result<Box<dyn Link>, TransportError> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// Handshake sent, waiting for `Connected`
    Connecting,
    Connected { client_id: PlayerId },
}

/// Suppresses redundant and too-frequent position updates.
///
/// Both checks compare against the last update actually sent.
#[derive(Debug, Default)]
struct PositionThrottle {
    last_sent: Option<(i32, i32)>,
    last_send_time: Option<Instant>,
    seq: u32,
}

impl PositionThrottle {
    /// Returns the rounded position and its sequence number if an update
    /// should go out now.
    fn admit(&mut self, x: f32, y: f32, now: Instant) -> Option<(u32, i32, i32)> {
        let rounded = (x.round() as i32, y.round() as i32);

        if self.last_sent == Some(rounded) {
            return None;
        }
        if let Some(last) = self.last_send_time {
            if now.saturating_duration_since(last) < POSITION_SEND_INTERVAL {
                return None;
            }
        }

        self.last_sent = Some(rounded);
        self.last_send_time = Some(now);
        self.seq += 1;
        Some((self.seq, rounded.0, rounded.1))
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

pub struct Transport {
    connector: Connector,
    link: Option<Box<dyn Link>>,
    state: ConnectionState,
    queue: VecDeque<Packet>,
    throttle: PositionThrottle,
    listeners: EventBus<ServerEvent>,
}

impl Transport {
    pub fn new(connector: Connector) -> Self {
        Self {
            connector,
            link: None,
            state: ConnectionState::Disconnected,
            queue: VecDeque::new(),
            throttle: PositionThrottle::default(),
            listeners: EventBus::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected { .. })
    }

    /// Our connection id, once the server has assigned one
    pub fn client_id(&self) -> Option<PlayerId> {
        match self.state {
            ConnectionState::Connected { client_id } => Some(client_id),
            _ => None,
        }
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Opens a link and starts the handshake. Does nothing if a link is
    /// already open or opening.
    pub fn connect(&mut self) -> Result<(), TransportError> {
        if self.link.is_some() {
            return Ok(());
        }

        info!("Connecting to server...");
        let mut link = (self.connector)()?;
        link.send(Packet::Connect {
            client_version: PROTOCOL_VERSION,
        })?;

        self.link = Some(link);
        self.state = ConnectionState::Connecting;
        Ok(())
    }

    /// Closes the link and drops everything still queued. Queued messages
    /// are never redelivered after a later reconnect.
    pub fn disconnect(&mut self) {
        let Some(mut link) = self.link.take() else {
            return;
        };

        if self.is_connected() {
            // Best effort, the server times us out otherwise
            let _ = link.send(Packet::Disconnect);
        }

        if !self.queue.is_empty() {
            debug!("Dropping {} queued messages on disconnect", self.queue.len());
        }
        self.queue.clear();
        self.throttle.reset();
        self.state = ConnectionState::Disconnected;
        info!("Disconnected");
    }

    /// Sends immediately when connected, queues otherwise.
    pub fn send(&mut self, packet: Packet) {
        if self.is_connected() {
            if let Some(link) = self.link.as_mut() {
                debug!("-> {}", packet.event_name());
                if let Err(e) = link.send(packet) {
                    warn!("Send failed: {}", e);
                }
                return;
            }
        }

        if self.queue.len() >= MAX_QUEUED_MESSAGES {
            warn!(
                "Outbound queue full, dropping {}",
                packet.event_name()
            );
            return;
        }
        self.queue.push_back(packet);
    }

    pub fn join(&mut self, avatar: AvatarConfig, name: &str, x: f32, y: f32) {
        self.send(Packet::PlayerJoin {
            avatar,
            name: name.to_string(),
            x,
            y,
        });
    }

    pub fn send_chat(&mut self, text: &str, sender: &str) {
        self.send(Packet::ChatSend {
            text: text.to_string(),
            sender: sender.to_string(),
        });
    }

    /// Throttled position update. Returns true if a message was sent or
    /// queued.
    pub fn send_position_update(&mut self, x: f32, y: f32, now: Instant) -> bool {
        if self.link.is_none() {
            return false;
        }

        match self.throttle.admit(x, y, now) {
            Some((seq, x, y)) => {
                self.send(Packet::PlayerMove {
                    seq,
                    x: x as f32,
                    y: y as f32,
                });
                true
            }
            None => false,
        }
    }

    pub fn on(&mut self, kind: EventKind, handler: Handler<ServerEvent>) -> Subscription<EventKind> {
        self.listeners.subscribe(kind, handler)
    }

    pub fn off(&mut self, subscription: Subscription<EventKind>) -> bool {
        self.listeners.unsubscribe(subscription)
    }

    /// Drains everything the link has received. Returns the number of
    /// packets handled.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while let Some(packet) = self.link.as_mut().and_then(|link| link.try_recv()) {
            self.handle_packet(packet);
            handled += 1;
        }
        handled
    }

    pub fn handle_packet(&mut self, packet: Packet) {
        if self.link.is_none() {
            debug!("Ignoring {} while disconnected", packet.event_name());
            return;
        }

        match packet {
            Packet::Connected { client_id } => {
                if self.is_connected() {
                    debug!("Duplicate handshake reply ignored");
                    return;
                }
                info!("Connected! Client ID: {}", client_id);
                self.state = ConnectionState::Connected { client_id };
                self.flush_queue();
            }
            Packet::Disconnected { reason } => {
                warn!("Disconnected by server: {}", reason);
                self.disconnect();
            }
            other => {
                let name = other.event_name();
                match other.into_server_event() {
                    Some(event) => {
                        debug!("<- {}", name);
                        self.listeners.emit(&event);
                    }
                    None => warn!("Unexpected {} packet from server", name),
                }
            }
        }
    }

    fn flush_queue(&mut self) {
        let Some(link) = self.link.as_mut() else {
            return;
        };

        if !self.queue.is_empty() {
            info!("Flushing {} queued messages", self.queue.len());
        }
        while let Some(packet) = self.queue.pop_front() {
            if let Err(e) = link.send(packet) {
                warn!("Send failed while flushing queue: {}", e);
            }
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.disconnect();
    }
}

//! Server network layer handling UDP communications and event dispatch

use crate::client_manager::ClientManager;
use crate::session::{Outbound, SessionRegistry};
use log::{debug, error, info, warn};
use shared::{decode, encode, Packet, PlayerId, MAX_PACKET_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

pub type ServerError = Box<dyn std::error::Error + Send + Sync>;

/// Messages sent from network tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ClientTimeout { client_id: PlayerId },
    Shutdown,
}

/// Messages sent from the main loop to the sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
    /// One packet to connections resolved when it was queued
    Broadcast {
        packet: Packet,
        targets: Vec<(PlayerId, SocketAddr)>,
    },
}

/// Session server: owns the socket, the connection table and the registry.
///
/// Inbound datagrams are funnelled through one channel and handled one at a
/// time, so the registry is only ever touched from the main loop.
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    sessions: SessionRegistry,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        max_clients: usize,
        client_timeout: Duration,
    ) -> Result<Self, ServerError> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients, client_timeout))),
            sessions: SessionRegistry::new(),
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Handle for stopping a running server with [`ServerMessage::Shutdown`]
    pub fn control(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = vec![0u8; MAX_PACKET_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match decode(&buffer[..len]) {
                        Ok(packet) => {
                            if server_tx
                                .send(ServerMessage::PacketReceived { packet, addr })
                                .is_err()
                            {
                                debug!("Main loop gone, stopping receiver");
                                break;
                            }
                        }
                        Err(e) => warn!("Dropping malformed datagram from {}: {}", addr, e),
                    },
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes the outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::Broadcast { packet, targets } => {
                        for (client_id, addr) in targets {
                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts()
                };

                for client_id in timed_out {
                    if server_tx
                        .send(ServerMessage::ClientTimeout { client_id })
                        .is_err()
                    {
                        return;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), ServerError> {
        let data = encode(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    /// Queues registry output. Recipients are resolved against the
    /// connection table as it is now, so a connection added later never
    /// receives packets produced before it existed.
    async fn deliver(&self, outbound: Vec<Outbound>) {
        let clients = self.clients.read().await;

        for outbound in outbound {
            let targets = clients.addrs_for(outbound.recipients);
            debug!(
                "-> {} to {:?} ({} targets)",
                outbound.packet.event_name(),
                outbound.recipients,
                targets.len()
            );
            if targets.is_empty() {
                continue;
            }

            let message = GameMessage::Broadcast {
                packet: outbound.packet,
                targets,
            };
            if let Err(e) = self.game_tx.send(message) {
                error!("Failed to queue outbound packet: {}", e);
            }
        }
    }

    async fn handle_connect(&mut self, client_version: u32, addr: SocketAddr) {
        info!(
            "Client connecting from {} (version: {})",
            addr, client_version
        );

        if client_version != PROTOCOL_VERSION {
            self.send_packet(
                Packet::Disconnected {
                    reason: "Protocol version mismatch".to_string(),
                },
                addr,
            );
            return;
        }

        // A repeated handshake from a connected address gets its id again
        let existing_client_id = {
            let mut clients = self.clients.write().await;
            let existing = clients.find_client_by_addr(addr);
            if let Some(id) = existing {
                clients.touch(id);
            }
            existing
        };

        if let Some(client_id) = existing_client_id {
            debug!("Repeated connect from client {} at {}", client_id, addr);
            self.send_packet(Packet::Connected { client_id }, addr);
            return;
        }

        let client_id = {
            let mut clients = self.clients.write().await;
            clients.add_client(addr)
        };

        match client_id {
            Some(client_id) => self.send_packet(Packet::Connected { client_id }, addr),
            None => {
                warn!("Rejecting {}: server full", addr);
                self.send_packet(
                    Packet::Disconnected {
                        reason: "Server full".to_string(),
                    },
                    addr,
                );
            }
        }
    }

    /// Routes one inbound packet to the registry
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        if let Packet::Connect { client_version } = packet {
            self.handle_connect(client_version, addr).await;
            return;
        }

        let client_id = {
            let mut clients = self.clients.write().await;
            let client_id = clients.find_client_by_addr(addr);
            if let Some(id) = client_id {
                clients.touch(id);
            }
            client_id
        };

        let Some(client_id) = client_id else {
            debug!(
                "Ignoring {} from unconnected peer {}",
                packet.event_name(),
                addr
            );
            return;
        };

        let outbound = match packet {
            Packet::Heartbeat => Vec::new(),
            Packet::Disconnect => {
                self.clients.write().await.remove_client(&client_id);
                self.sessions.leave(client_id)
            }
            Packet::PlayerJoin { avatar, name, x, y } => {
                self.sessions.join(client_id, &name, avatar, x, y)
            }
            Packet::PlayerMove { seq, x, y } => self.sessions.move_player(client_id, seq, x, y),
            Packet::ChatSend { text, sender } => self.sessions.relay_chat(client_id, &text, &sender),
            other => {
                warn!(
                    "Unexpected {} packet from client {}",
                    other.event_name(),
                    client_id
                );
                Vec::new()
            }
        };

        self.deliver(outbound).await;
    }

    /// Main server loop
    pub async fn run(&mut self) -> Result<(), ServerError> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        let mut status_interval = interval(Duration::from_secs(30));

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            let outbound = self.sessions.leave(client_id);
                            self.deliver(outbound).await;
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = status_interval.tick() => {
                    let client_count = self.clients.read().await.len();
                    if client_count > 0 {
                        debug!("{} connections, {} players in the world",
                               client_count, self.sessions.len());
                    }
                },
            }
        }

        Ok(())
    }
}

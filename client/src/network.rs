//! UDP link to the session server
//!
//! The frame loop is synchronous, so the socket lives on its own thread
//! running a current-thread tokio runtime. Packets cross between the two
//! over unbounded channels. Dropping the [`UdpLink`] closes the outbound
//! channel, which flushes whatever is still in it and stops the thread.

use crate::transport::{Connector, Link, TransportError};
use log::{debug, error, info, warn};
use shared::{decode, encode, Packet, MAX_PACKET_SIZE};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::thread;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

pub struct UdpLink {
    outgoing: mpsc::UnboundedSender<Packet>,
    incoming: mpsc::UnboundedReceiver<Packet>,
}

impl UdpLink {
    pub fn connect(server_addr: SocketAddr) -> Result<Self, TransportError> {
        let bind_ip: IpAddr = if server_addr.is_ipv4() {
            Ipv4Addr::UNSPECIFIED.into()
        } else {
            Ipv6Addr::UNSPECIFIED.into()
        };
        let bind_addr = SocketAddr::new(bind_ip, 0);
        let socket = std::net::UdpSocket::bind(bind_addr)?;
        socket.set_nonblocking(true)?;

        let (outgoing, out_rx) = mpsc::unbounded_channel();
        let (in_tx, incoming) = mpsc::unbounded_channel();

        thread::Builder::new()
            .name("udp-link".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        error!("Failed to start network runtime: {}", e);
                        return;
                    }
                };

                runtime.block_on(async move {
                    match UdpSocket::from_std(socket) {
                        Ok(socket) => run_link(socket, server_addr, out_rx, in_tx).await,
                        Err(e) => error!("Failed to register socket: {}", e),
                    }
                });
            })?;

        info!("Opened link to {}", server_addr);
        Ok(Self { outgoing, incoming })
    }
}

impl Link for UdpLink {
    fn send(&mut self, packet: Packet) -> Result<(), TransportError> {
        self.outgoing.send(packet).map_err(|_| TransportError::Closed)
    }

    fn try_recv(&mut self) -> Option<Packet> {
        self.incoming.try_recv().ok()
    }
}

/// Connector opening a fresh [`UdpLink`] on every connect
pub fn udp_connector(server_addr: SocketAddr) -> Connector {
    Box::new(move || Ok(Box::new(UdpLink::connect(server_addr)?) as Box<dyn Link>))
}

async fn run_link(
    socket: UdpSocket,
    server_addr: SocketAddr,
    mut out_rx: mpsc::UnboundedReceiver<Packet>,
    in_tx: mpsc::UnboundedSender<Packet>,
) {
    let mut heartbeat = interval_at(Instant::now() + HEARTBEAT_INTERVAL, HEARTBEAT_INTERVAL);
    let mut buffer = vec![0u8; MAX_PACKET_SIZE];

    loop {
        tokio::select! {
            result = socket.recv_from(&mut buffer) => {
                match result {
                    Ok((len, from)) if from == server_addr => match decode(&buffer[..len]) {
                        Ok(packet) => {
                            if in_tx.send(packet).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Dropping malformed packet from server: {}", e),
                    },
                    Ok((_, from)) => debug!("Ignoring datagram from {}", from),
                    Err(e) => debug!("Receive error: {}", e),
                }
            }

            packet = out_rx.recv() => {
                match packet {
                    Some(packet) => send_packet(&socket, server_addr, &packet).await,
                    None => break,
                }
            }

            _ = heartbeat.tick() => {
                send_packet(&socket, server_addr, &Packet::Heartbeat).await;
            }
        }
    }

    debug!("Link to {} closed", server_addr);
}

async fn send_packet(socket: &UdpSocket, server_addr: SocketAddr, packet: &Packet) {
    let data = match encode(packet) {
        Ok(data) => data,
        Err(e) => {
            warn!("Failed to encode {}: {}", packet.event_name(), e);
            return;
        }
    };

    if let Err(e) = socket.send_to(&data, server_addr).await {
        error!("Failed to send {}: {}", packet.event_name(), e);
    }
}

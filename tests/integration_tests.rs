//! Integration tests across the shared, server and client crates
//!
//! The first group wires real client worlds and transports to the server's
//! session registry through an in-memory hub. The second group runs the
//! actual UDP server and UDP links on localhost.

use client::game::World;
use client::player::PlayerInput;
use client::transport::{Connector, Link, Transport, TransportError};
use server::session::SessionRegistry;
use shared::{AvatarConfig, Packet, PlayerId, TileGrid};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const DT: f32 = 1.0 / 60.0;

fn avatar(outfit: &str) -> AvatarConfig {
    AvatarConfig {
        body: "body-1".to_string(),
        outfit: outfit.to_string(),
        hair: "hair-short".to_string(),
        accessory: "none".to_string(),
    }
}

fn world_at(name: &str, x: f32, y: f32) -> World {
    let mut world = World::new(Arc::new(TileGrid::town_and_field()), name, avatar("outfit-red"));
    world.player.x = x;
    world.player.y = y;
    world
}

/// IN-MEMORY HUB TESTS
mod hub_tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Pipe {
        to_server: Arc<Mutex<VecDeque<Packet>>>,
        to_client: Arc<Mutex<VecDeque<Packet>>>,
    }

    impl Link for Pipe {
        fn send(&mut self, packet: Packet) -> Result<(), TransportError> {
            self.to_server.lock().unwrap().push_back(packet);
            Ok(())
        }

        fn try_recv(&mut self) -> Option<Packet> {
            self.to_client.lock().unwrap().pop_front()
        }
    }

    struct Peer {
        pipe: Pipe,
        id: Option<PlayerId>,
    }

    /// Plays the server's part: assigns ids on connect and routes every
    /// registry outcome to the addressed peers.
    #[derive(Clone, Default)]
    struct Hub {
        peers: Arc<Mutex<Vec<Peer>>>,
        registry: Arc<Mutex<SessionRegistry>>,
        next_id: Arc<Mutex<PlayerId>>,
    }

    impl Hub {
        fn connector(&self) -> Connector {
            let peers = Arc::clone(&self.peers);
            Box::new(move || {
                let pipe = Pipe::default();
                peers.lock().unwrap().push(Peer {
                    pipe: pipe.clone(),
                    id: None,
                });
                Ok(Box::new(pipe) as Box<dyn Link>)
            })
        }

        fn pump(&self) {
            let mut peers = self.peers.lock().unwrap();
            let mut registry = self.registry.lock().unwrap();

            for i in 0..peers.len() {
                let inbound: Vec<Packet> = peers[i].pipe.to_server.lock().unwrap().drain(..).collect();

                for packet in inbound {
                    let outbound = match (packet, peers[i].id) {
                        (Packet::Connect { .. }, None) => {
                            let mut next_id = self.next_id.lock().unwrap();
                            *next_id += 1;
                            peers[i].id = Some(*next_id);
                            peers[i]
                                .pipe
                                .to_client
                                .lock()
                                .unwrap()
                                .push_back(Packet::Connected { client_id: *next_id });
                            Vec::new()
                        }
                        (Packet::PlayerJoin { avatar, name, x, y }, Some(id)) => {
                            registry.join(id, &name, avatar, x, y)
                        }
                        (Packet::PlayerMove { seq, x, y }, Some(id)) => registry.move_player(id, seq, x, y),
                        (Packet::ChatSend { text, sender }, Some(id)) => registry.relay_chat(id, &text, &sender),
                        (Packet::Disconnect, Some(id)) => {
                            peers[i].id = None;
                            registry.leave(id)
                        }
                        _ => Vec::new(),
                    };

                    for message in outbound {
                        for peer in peers.iter() {
                            if let Some(id) = peer.id {
                                if message.recipients.includes(id) {
                                    peer.pipe.to_client.lock().unwrap().push_back(message.packet.clone());
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    struct Client {
        transport: Transport,
        world: World,
    }

    impl Client {
        fn join(hub: &Hub, name: &str, x: f32, y: f32) -> Self {
            let mut transport = Transport::new(hub.connector());
            let mut world = world_at(name, x, y);
            world.attach(&mut transport);
            world.connect(&mut transport).unwrap();
            Client { transport, world }
        }

        fn frame(&mut self, input: &PlayerInput, now: Instant) {
            self.world.frame(input, DT, &mut self.transport, now);
        }

        fn id(&self) -> PlayerId {
            self.transport.client_id().unwrap()
        }
    }

    fn settle(hub: &Hub, clients: &mut [&mut Client]) {
        let now = Instant::now();
        for _ in 0..4 {
            hub.pump();
            for client in clients.iter_mut() {
                client.frame(&PlayerInput::default(), now);
            }
        }
    }

    /// Two players see each other at their join positions without a snap
    #[test]
    fn alice_and_bob_see_each_other() {
        let hub = Hub::default();
        let mut alice = Client::join(&hub, "Alice", 10.0, 10.0);
        settle(&hub, &mut [&mut alice]);

        let mut bob = Client::join(&hub, "Bob", 20.0, 20.0);
        settle(&hub, &mut [&mut alice, &mut bob]);

        let alice_view = bob.world.remotes.get(alice.id()).expect("Bob should see Alice");
        assert_eq!(alice_view.name, "Alice");
        assert_eq!((alice_view.current_x, alice_view.current_y), (10.0, 10.0));
        assert_eq!((alice_view.target_x, alice_view.target_y), (10.0, 10.0));

        let bob_view = alice.world.remotes.get(bob.id()).expect("Alice should see Bob");
        assert_eq!((bob_view.current_x, bob_view.current_y), (20.0, 20.0));

        // Nobody sees themselves
        assert_eq!(alice.world.remotes.len(), 1);
        assert_eq!(bob.world.remotes.len(), 1);
        assert_eq!(hub.registry.lock().unwrap().len(), 2);
    }

    /// Local movement reaches the other client as an interpolated target
    #[test]
    fn movement_is_relayed_and_smoothed() {
        let hub = Hub::default();
        let (x, y) = shared::tile_center(5, 7);
        let mut alice = Client::join(&hub, "Alice", x, y);
        let mut bob = Client::join(&hub, "Bob", x, y + 64.0);
        settle(&hub, &mut [&mut alice, &mut bob]);

        let right = PlayerInput {
            right: true,
            ..PlayerInput::default()
        };
        let t0 = Instant::now();
        for i in 0..30 {
            alice.frame(&right, t0 + Duration::from_millis(200 + i * 16));
        }
        hub.pump();
        bob.frame(&PlayerInput::default(), t0);

        let view = bob.world.remotes.get(alice.id()).unwrap();
        assert!(view.target_x > x + 10.0);
        // One interpolation step only closes part of the gap
        assert!(view.current_x > x && view.current_x < view.target_x);
        assert_eq!(view.animation, client::remote::RemoteAnimation::Run);
    }

    #[test]
    fn chat_reaches_everyone_including_sender() {
        let hub = Hub::default();
        let mut alice = Client::join(&hub, "Alice", 100.0, 100.0);
        let mut bob = Client::join(&hub, "Bob", 120.0, 100.0);
        settle(&hub, &mut [&mut alice, &mut bob]);

        bob.world.send_chat(&mut bob.transport, "  hello there ");
        settle(&hub, &mut [&mut alice, &mut bob]);

        for client in [&alice, &bob] {
            let lines: Vec<_> = client.world.chat.iter().collect();
            assert_eq!(lines.len(), 1);
            assert_eq!(lines[0].sender, "Bob");
            assert_eq!(lines[0].text, "hello there");
        }
    }

    #[test]
    fn leaving_removes_the_view_elsewhere() {
        let hub = Hub::default();
        let mut alice = Client::join(&hub, "Alice", 100.0, 100.0);
        let mut bob = Client::join(&hub, "Bob", 120.0, 100.0);
        settle(&hub, &mut [&mut alice, &mut bob]);
        assert_eq!(bob.world.remotes.len(), 1);

        alice.world.disconnect(&mut alice.transport);
        settle(&hub, &mut [&mut bob]);

        assert!(bob.world.remotes.is_empty());
        assert!(alice.world.remotes.is_empty());
        assert_eq!(hub.registry.lock().unwrap().len(), 1);
    }

    #[test]
    fn reconnect_rejoins_with_a_new_id() {
        let hub = Hub::default();
        let mut alice = Client::join(&hub, "Alice", 100.0, 100.0);
        let mut bob = Client::join(&hub, "Bob", 120.0, 100.0);
        settle(&hub, &mut [&mut alice, &mut bob]);
        let first_id = alice.id();

        alice.world.disconnect(&mut alice.transport);
        alice.world.connect(&mut alice.transport).unwrap();
        settle(&hub, &mut [&mut alice, &mut bob]);

        assert_ne!(alice.id(), first_id);
        assert!(bob.world.remotes.get(first_id).is_none());
        assert!(bob.world.remotes.get(alice.id()).is_some());
        assert_eq!(alice.world.remotes.len(), 1);
    }

    #[test]
    fn messages_sent_before_connecting_are_flushed_once() {
        let hub = Hub::default();
        let mut bob = Client::join(&hub, "Bob", 120.0, 100.0);
        settle(&hub, &mut [&mut bob]);

        let mut transport = Transport::new(hub.connector());
        let mut alice = world_at("Alice", 100.0, 100.0);
        alice.send_chat(&mut transport, "early");
        assert_eq!(transport.queued(), 1);

        alice.attach(&mut transport);
        alice.connect(&mut transport).unwrap();
        let mut alice = Client {
            transport,
            world: alice,
        };
        settle(&hub, &mut [&mut alice, &mut bob]);
        settle(&hub, &mut [&mut alice, &mut bob]);

        let early: Vec<_> = bob.world.chat.iter().filter(|l| l.text == "early").collect();
        assert_eq!(early.len(), 1);
    }
}

/// REAL UDP TESTS
mod udp_tests {
    use super::*;
    use client::network::udp_connector;
    use server::network::{Server, ServerMessage};
    use std::net::SocketAddr;
    use tokio::net::UdpSocket;
    use tokio::sync::mpsc;
    use tokio::time::sleep;
    use tokio_test::assert_ok;

    async fn start_server() -> (SocketAddr, mpsc::UnboundedSender<ServerMessage>) {
        let mut server = assert_ok!(Server::new("127.0.0.1:0", 8, Duration::from_secs(5)).await);
        let addr = assert_ok!(server.local_addr());
        let control = server.control();
        tokio::spawn(async move {
            let _ = server.run().await;
        });
        (addr, control)
    }

    /// Runs frames until `done` holds or two seconds pass
    async fn run_until<F>(clients: &mut [(&mut Transport, &mut World)], mut done: F) -> bool
    where
        F: FnMut(&[(&mut Transport, &mut World)]) -> bool,
    {
        for _ in 0..200 {
            for (transport, world) in clients.iter_mut() {
                world.frame(&PlayerInput::default(), DT, &mut **transport, Instant::now());
            }
            if done(&*clients) {
                return true;
            }
            sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn end_to_end_over_udp() {
        let (server_addr, control) = start_server().await;

        let mut alice_transport = Transport::new(udp_connector(server_addr));
        let mut alice = world_at("Alice", 10.0, 10.0);
        alice.attach(&mut alice_transport);
        assert_ok!(alice.connect(&mut alice_transport));

        let mut bob_transport = Transport::new(udp_connector(server_addr));
        let mut bob = world_at("Bob", 20.0, 20.0);
        bob.attach(&mut bob_transport);
        assert_ok!(bob.connect(&mut bob_transport));

        let mut clients = [
            (&mut alice_transport, &mut alice),
            (&mut bob_transport, &mut bob),
        ];
        let converged = run_until(&mut clients, |clients| {
            clients.iter().all(|(_, world)| world.remotes.len() == 1)
        })
        .await;
        assert!(converged, "clients never saw each other");

        let alice_id = alice_transport.client_id().unwrap();
        let view = bob.remotes.get(alice_id).unwrap();
        assert_eq!((view.current_x, view.current_y), (10.0, 10.0));

        alice.send_chat(&mut alice_transport, "hi bob");
        let mut clients = [
            (&mut alice_transport, &mut alice),
            (&mut bob_transport, &mut bob),
        ];
        let delivered = run_until(&mut clients, |clients| {
            clients.iter().all(|(_, world)| world.chat.len() == 1)
        })
        .await;
        assert!(delivered, "chat was not relayed to both clients");

        alice.disconnect(&mut alice_transport);
        let mut clients = [(&mut bob_transport, &mut bob)];
        let left = run_until(&mut clients, |clients| clients[0].1.remotes.is_empty()).await;
        assert!(left, "Bob still sees Alice after she disconnected");

        control.send(ServerMessage::Shutdown).unwrap();
    }

    /// Garbage datagrams are dropped without disturbing the server
    #[tokio::test]
    async fn malformed_datagrams_are_ignored() {
        let (server_addr, control) = start_server().await;
        let socket = assert_ok!(UdpSocket::bind("127.0.0.1:0").await);

        assert_ok!(socket.send_to(&[0xff, 0x00, 0x13, 0x37], server_addr).await);
        assert_ok!(socket.send_to(&[], server_addr).await);

        let connect = assert_ok!(shared::encode(&Packet::Connect {
            client_version: shared::PROTOCOL_VERSION,
        }));
        assert_ok!(socket.send_to(&connect, server_addr).await);

        let mut buf = vec![0u8; shared::MAX_PACKET_SIZE];
        let (len, _) = assert_ok!(
            assert_ok!(tokio::time::timeout(Duration::from_secs(2), socket.recv_from(&mut buf)).await)
        );
        assert!(matches!(
            assert_ok!(shared::decode(&buf[..len])),
            Packet::Connected { .. }
        ));

        control.send(ServerMessage::Shutdown).unwrap();
    }
}

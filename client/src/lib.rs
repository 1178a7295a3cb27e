//! # Pixel World Client
//!
//! Client side of the pixel world: a walkable town next to a small football
//! field, shared in real time with everyone connected to the same server.
//!
//! ## Architecture Overview
//!
//! Only player positions and chat travel over the network. Each client is
//! authoritative for its own player, simulates its own ball locally and
//! smooths everybody else's reported positions.
//!
//! One cooperative frame tick drives, in order:
//! input sampling, the local player, the ball, remote interpolation and the
//! throttled position send. Network traffic arrives asynchronously on a
//! socket thread and is picked up at the start of the next frame.
//!
//! ## Module Organization
//!
//! - [`transport`]: connection-timing hiding. Queues messages until the
//!   handshake completes, throttles position updates and dispatches server
//!   events to typed listeners.
//! - [`network`]: the UDP [`transport::Link`] implementation running on its
//!   own tokio runtime.
//! - [`events`]: typed publish/subscribe with unsubscribe handles.
//! - [`player`]: local movement, tile collision and the charge kick.
//! - [`ball`]: ball physics, bounces and goal detection.
//! - [`remote`]: remote player interpolation and animation inference.
//! - [`appearance`]: per-player visuals with a fallback look.
//! - [`game`]: the [`game::World`] tying all of the above together, plus the
//!   scoreboard and chat log.
//! - [`input`] and [`rendering`]: macroquad keyboard sampling and drawing.

pub mod appearance;
pub mod ball;
pub mod events;
pub mod game;
pub mod input;
pub mod network;
pub mod player;
pub mod remote;
pub mod rendering;
pub mod transport;

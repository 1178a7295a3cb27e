//! # Pixel World Session Server
//!
//! The server is the single source of truth for who is in the world. It
//! relays player actions between connections and never simulates anything:
//! movement is client-authoritative and the ball is simulated by each client
//! on its own.
//!
//! ## Architecture
//!
//! ### Single-Threaded Event Dispatch
//! Every inbound datagram is decoded by a receiver task and forwarded over a
//! channel to the main loop, which handles one event to completion before
//! the next. The session registry is therefore only touched from one place
//! and needs no locking of its own.
//!
//! ### Fire-and-Forget Fan-Out
//! Registry operations return the packets to send together with their
//! recipients. A sender task resolves recipients to addresses and writes
//! the datagrams; nothing waits for peers to acknowledge.
//!
//! ### Connection Lifecycle
//! Peers connect with an explicit handshake and keep the connection alive
//! with heartbeats. Explicit disconnects and timeouts both remove the
//! player's session and announce `player:left`.
//!
//! ## Module Organization
//!
//! - [`client_manager`]: connected peers, liveness and capacity limits
//! - [`session`]: the session registry and its join/move/leave/chat fan-out
//! - [`network`]: UDP socket tasks and the main dispatch loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     // At most 32 connections, dropped after 5 seconds of silence
//!     let mut server = Server::new("127.0.0.1:3001", 32, Duration::from_secs(5)).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod network;
pub mod session;

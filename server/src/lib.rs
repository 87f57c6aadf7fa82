//! # Lightbike Arena Server Library
//!
//! This library provides the authoritative server for a multiplayer lightbike
//! arena. Players steer bikes around a bounded grid, each bike leaving a
//! solid trail behind it. Running into a wall or any trail, including your
//! own, takes the bike out of the round.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! The server owns every bike and trail. Clients only ever send intents
//! (spawn, turn, give me the state) and render whatever snapshot they get
//! back.
//!
//! ### Slot Management
//! A fixed number of player slots is handed out on connect and taken back
//! on disconnect. When every slot is taken, new connections are told
//! `GAME_FULL` and closed.
//!
//! ### Snapshot Delivery
//! Each tick rebuilds one JSON snapshot of the whole arena. Sessions hand
//! the latest one to their client whenever it asks with `REQUEST_STATE`.
//!
//! ## Architecture Design
//!
//! ### Lazily Started Tick Loop
//! The simulation only ticks while at least one bike is alive. The first
//! spawn into an idle arena starts a fixed-rate tick task; it stops on its
//! own once the last bike crashes.
//!
//! ### One Lock, Many Tasks
//! All simulation state sits behind a single lock inside [`arena::Arena`].
//! Every session runs a read task and a write task; neither touches the
//! simulation other than through the arena's methods. Snapshots are
//! published through a `watch` channel so reading them never takes the lock.
//!
//! ### WebSocket Transport
//! Messages are colon-separated text frames over WebSocket. Sessions are
//! written against the [`transport`] traits, so tests drive them through
//! in-memory channels instead.
//!
//! ## Module Organization
//!
//! ### Trail and Vehicle Modules (`trail`, `vehicle`)
//! - Axis-aligned polyline geometry and the point-on-trail test
//! - Bike movement, turn requests and death
//!
//! ### Simulation Module (`simulation`)
//! - Spawn placement with a capped number of random retries
//! - The per-tick turn, move and collide pass
//! - Snapshot serialization
//!
//! ### Arena Module (`arena`)
//! - Locked simulation shared by every session
//! - Tick loop lifecycle and trail retirement after the last crash
//!
//! ### Client Manager and Session Modules (`client_manager`, `session`)
//! - Slot table with idempotent release
//! - One-shot session termination
//! - Command dispatch and the outbound queue
//!
//! ### Network Module (`network`)
//! - Admission and shutdown
//! - WebSocket accept loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 8 player slots on a 560x560 grid, ticking at 60Hz
//!     let server = Server::new(ServerConfig::default());
//!
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!     server.run(listener).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod arena;
pub mod client_manager;
pub mod config;
pub mod error;
pub mod network;
pub mod session;
pub mod simulation;
pub mod trail;
pub mod transport;
pub mod utils;
pub mod vehicle;

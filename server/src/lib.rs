//! # Nim Server Library
//!
//! This library implements the server side of the Nim text protocol: it
//! hosts concurrent client connections, keeps the authoritative roster of
//! users and games, applies the rules of Nim, and delivers asynchronous
//! events through per-user notification queues.
//!
//! ## Core Responsibilities
//!
//! ### Request Handling
//! Each accepted connection runs as its own worker task that reads framed
//! requests and routes them through a single dispatcher. Version gating
//! (505), unknown methods (501), and the per-method precondition ladders
//! all live in one place, so every connection behaves identically.
//!
//! ### Shared State
//! The registry is the one source of truth for connection→user, name→user,
//! and id→game mappings. Everything that mutates it (logins, game
//! creation, moves, observers, disconnects) happens under one global
//! lock. Socket reads and writes run in parallel across workers, but
//! request handling is serialized server-wide, which keeps the shared
//! maps free of races at the cost of throughput.
//!
//! ### Notifications
//! There is no server push. When a handler produces an event for someone
//! other than the caller (an opponent's move, a game ending, a player
//! leaving), it appends a string to that user's FIFO queue. The queue is
//! flushed as 300 Continued frames ahead of the terminal frame of the
//! user's own next exchange, which the client guarantees happens soon by
//! polling with PING.
//!
//! ## Module Organization
//!
//! ### Registry Module (`registry`)
//! User lifecycle and the shared maps:
//! - Connection and game id assignment (monotonic, never reused)
//! - Name binding and uniqueness
//! - Per-user FIFO notification queues
//!
//! ### Game Module (`game`)
//! The pure rules engine for one match:
//! - Random pile initialization (3–5 piles of 1–7 objects)
//! - Move validation and the turn-holder/waiting swap
//! - Win detection: taking the last object wins
//!
//! ### Handlers Module (`handlers`)
//! The dispatcher and one handler per protocol method, mapping
//! precondition failures to their 4xx statuses and composing the bodies
//! and broadcast transcripts.
//!
//! ### Network Module (`network`)
//! The TCP listener, the per-connection worker loop, and response
//! framing: queued notifications first, terminal frame last.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind("127.0.0.1:7849").await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod handlers;
pub mod network;
pub mod registry;

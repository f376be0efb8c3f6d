//! # Nim Client Library
//!
//! This library implements the text-based client for the Nim protocol:
//! the persistent server connection, the interactive command loop, and
//! the polling mechanism that stands in for server push.
//!
//! ## Architecture Overview
//!
//! The client runs two concurrent activities over a single connection:
//!
//! ### Command Loop
//! Prompts the user, tokenizes the input line, validates arguments
//! locally (argument counts, the username charset, positive integers)
//! and only then issues the protocol request. Validation failures never
//! touch the network.
//!
//! ### Background Poller
//! The server cannot push: asynchronous events (an opponent's move, a
//! game ending, a player leaving) wait in a per-user queue until the
//! user's next exchange. The poller issues PING once per second while
//! the user is idle at the prompt, so those events surface promptly.
//! Queued messages arrive as 300 Continued frames ahead of the terminal
//! frame; the poller prints every non-empty body and redraws the prompt.
//!
//! The two activities share the connection behind an async mutex, which
//! preserves the transport's one-outstanding-request invariant; an
//! atomic "at the prompt" flag merely decides when polling is useful.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! The connection wrapper: sends one request, then collects response
//! frames until a terminal status, returning the notices and the
//! response together as an [`network::Exchange`].
//!
//! ### Commands Module (`commands`)
//! The interactive [`commands::TextClient`]: prompt loop, command
//! parsing and validation, the poller task, and exit handling (`bye`,
//! end of input, connection loss).

pub mod commands;
pub mod network;

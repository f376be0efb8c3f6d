//! TCP listener and per-connection workers
//!
//! The server runs one spawned task per accepted connection. A worker
//! loops reading framed requests; each request is decoded and then handled
//! with the global registry lock held, so request handling is serialized
//! server-wide while socket I/O still proceeds in parallel. Before every
//! terminal response the worker flushes the caller's notification queue as
//! 300 Continued frames, oldest first.

use log::{info, warn};
use shared::protocol::Response;
use shared::{NimError, Transport};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::net::{TcpListener, TcpStream};

use crate::handlers::{self, Reply};
use crate::registry::Registry;

/// Greeting queued for every new connection; it rides the normal
/// notification drain on the user's first exchange.
const WELCOME: &str = "Welcome to the Nim server!\nType 'help' for a list of commands.";

/// A Nim server bound to one TCP listener.
pub struct Server {
    listener: TcpListener,
    registry: Arc<Mutex<Registry>>,
}

impl Server {
    /// Binds the listener. `addr` is `host:port`; port 0 picks an
    /// ephemeral port (used by the integration tests).
    pub async fn bind(addr: &str) -> Result<Server, NimError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Server {
            listener,
            registry: Arc::new(Mutex::new(Registry::new())),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, NimError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until the surrounding task is dropped, spawning
    /// one worker per client.
    pub async fn run(&self) -> Result<(), NimError> {
        loop {
            let (stream, addr) = self.listener.accept().await?;
            let registry = Arc::clone(&self.registry);
            tokio::spawn(async move {
                handle_connection(stream, addr, registry).await;
            });
        }
    }
}

async fn handle_connection(stream: TcpStream, addr: SocketAddr, registry: Arc<Mutex<Registry>>) {
    let mut transport = Transport::new(stream);
    let conn = {
        let mut reg = lock(&registry);
        let conn = reg.add_user();
        reg.enqueue(conn, WELCOME);
        conn
    };
    info!("Connection from {addr} as user #{conn}");

    loop {
        let request = match transport.read_request().await {
            Ok(request) => request,
            Err(NimError::Closed) => break,
            Err(err) => {
                warn!("Dropping {addr}: {err}");
                break;
            }
        };

        let (reply, notices) = {
            let mut reg = lock(&registry);
            handlers::dispatch(&mut reg, conn, &request)
        };
        info!(
            "{addr} \"{}\" {} {}",
            request.request_line(),
            reply.status.code(),
            reply.status.reason()
        );

        let sent = send_exchange(&mut transport, notices, &reply).await;
        // A BYE reply closes regardless of whether the 202 reached the peer.
        if reply.close || sent.is_err() {
            break;
        }
    }

    {
        let mut reg = lock(&registry);
        handlers::disconnect(&mut reg, conn);
    }
    info!("Disconnection by {addr} (user #{conn})");
}

async fn send_exchange(
    transport: &mut Transport,
    notices: Vec<String>,
    reply: &Reply,
) -> Result<(), NimError> {
    for notice in notices {
        transport.send_response(&Response::continued(notice)).await?;
    }
    transport
        .send_response(&Response::new(reply.status, reply.body.as_str()))
        .await
}

fn lock(registry: &Arc<Mutex<Registry>>) -> MutexGuard<'_, Registry> {
    // A poisoned lock only means another worker panicked mid-request; the
    // registry itself is still usable.
    registry
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

//! Client-side connection handling
//!
//! Owns the framed transport and implements the exchange pattern of the
//! protocol: one request out, then response frames in until a terminal
//! (non-300) status arrives. Queued server notifications arrive as the
//! leading 300 Continued frames of whatever exchange happens next.

use shared::protocol::{Command, Request, Response, Status};
use shared::{NimError, Transport};

/// The complete result of one request.
#[derive(Debug)]
pub struct Exchange {
    /// Bodies of the 300 Continued frames that preceded the terminal
    /// response, oldest first.
    pub notices: Vec<String>,
    /// The terminal response.
    pub response: Response,
}

/// A persistent connection to a Nim server.
pub struct Connection {
    transport: Transport,
}

impl Connection {
    pub async fn connect(host: &str, port: u16) -> Result<Connection, NimError> {
        let transport = Transport::connect(&format!("{host}:{port}")).await?;
        Ok(Connection { transport })
    }

    /// Sends one command and reads frames until the exchange completes.
    ///
    /// The transport rejects a second request while one is outstanding, so
    /// callers serialize access to the connection.
    pub async fn request(&mut self, command: Command) -> Result<Exchange, NimError> {
        self.transport.send_request(&Request::new(command)).await?;

        let mut notices = Vec::new();
        loop {
            let response = self.transport.read_response().await?;
            if response.status == Status::Continued {
                notices.push(response.body);
            } else {
                return Ok(Exchange { notices, response });
            }
        }
    }
}

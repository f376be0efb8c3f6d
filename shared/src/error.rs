use thiserror::Error;

/// Errors produced by the protocol and transport layers.
///
/// The variants mirror how callers recover: `Transport` and `Closed` are
/// fatal to the connection, `Framing` means the peer sent bytes that do not
/// match the packet grammar (the server drops that connection, the client
/// reports the message and exits), and `ProtocolState` flags a request
/// issued while a previous one was still awaiting its response.
#[derive(Debug, Error)]
pub enum NimError {
    /// Connection-level I/O failure. Fatal to the connection; never retried.
    #[error("connection error: {0}")]
    Transport(#[from] std::io::Error),

    /// The peer sent bytes that do not parse as a protocol packet.
    #[error("malformed packet: {0}")]
    Framing(String),

    /// Request/response alternation was violated on this connection.
    #[error("protocol state error: {0}")]
    ProtocolState(String),

    /// The peer closed the connection between packets.
    #[error("connection closed by peer")]
    Closed,
}

impl NimError {
    /// True for errors after which no further packets can be exchanged.
    pub fn is_fatal(&self) -> bool {
        matches!(self, NimError::Transport(_) | NimError::Closed)
    }
}

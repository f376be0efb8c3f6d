//! Framed transport for the Nim text protocol
//!
//! A packet on the wire is a head (request or status line plus header
//! lines, CRLF-terminated), a blank separator line, and a body of exactly
//! `Content-Length` bytes. The reader is buffered and scans for the
//! separator, so a packet may arrive split across any number of TCP
//! segments. [`Transport`] additionally enforces the protocol's strict
//! request/response alternation for the requesting side.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::protocol::{content_length, parse_headers, Request, Response, Status};
use crate::NimError;

/// Reads protocol frames from any buffered byte source.
pub struct FrameReader<R> {
    reader: R,
}

impl<R: AsyncBufRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        FrameReader { reader }
    }

    /// Reads one complete frame, returning its first head line and body.
    ///
    /// Returns `NimError::Closed` on a clean end-of-stream between frames
    /// and `NimError::Framing` if the stream ends mid-packet or the head
    /// does not match the grammar.
    pub async fn read_frame(&mut self) -> Result<(String, String), NimError> {
        let mut head: Vec<String> = Vec::new();
        loop {
            let mut line = String::new();
            let read = self.reader.read_line(&mut line).await?;
            if read == 0 {
                return Err(if head.is_empty() {
                    NimError::Closed
                } else {
                    NimError::Framing("connection closed mid-packet".to_string())
                });
            }
            let line = line.trim_end_matches('\n').trim_end_matches('\r');
            if line.is_empty() {
                break;
            }
            head.push(line.to_string());
        }

        if head.is_empty() {
            return Err(NimError::Framing("packet head is empty".to_string()));
        }

        let headers = parse_headers(&head[1..])?;
        let length = content_length(&headers)?;
        let mut body = vec![0u8; length];
        self.reader.read_exact(&mut body).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                NimError::Framing("connection closed mid-body".to_string())
            } else {
                NimError::Transport(err)
            }
        })?;
        let body = String::from_utf8(body)
            .map_err(|_| NimError::Framing("body is not valid UTF-8".to_string()))?;

        Ok((head.swap_remove(0), body))
    }
}

/// A persistent protocol connection over one TCP stream.
///
/// Both sides of the wire use this type: clients call
/// [`send_request`](Transport::send_request) /
/// [`read_response`](Transport::read_response), server workers call
/// [`read_request`](Transport::read_request) /
/// [`send_response`](Transport::send_response). The requesting side may
/// have at most one request outstanding; a 300 Continued response leaves
/// the exchange open until a terminal status arrives.
pub struct Transport {
    reader: FrameReader<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    awaiting_response: bool,
}

impl Transport {
    pub fn new(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Transport {
            reader: FrameReader::new(BufReader::new(read_half)),
            writer: write_half,
            awaiting_response: false,
        }
    }

    pub async fn connect(addr: &str) -> Result<Self, NimError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Transport::new(stream))
    }

    /// Sends a request. Fails with `ProtocolState` if the previous
    /// exchange has not reached its terminal response yet.
    pub async fn send_request(&mut self, request: &Request) -> Result<(), NimError> {
        if self.awaiting_response {
            return Err(NimError::ProtocolState(
                "a request is already awaiting its response".to_string(),
            ));
        }
        self.writer.write_all(&request.encode()).await?;
        self.writer.flush().await?;
        self.awaiting_response = true;
        Ok(())
    }

    /// Reads one response frame. Any status other than 300 Continued
    /// completes the exchange and permits the next request.
    pub async fn read_response(&mut self) -> Result<Response, NimError> {
        let (line, body) = self.reader.read_frame().await?;
        let response = Response::parse(&line, body)?;
        if response.status != Status::Continued {
            self.awaiting_response = false;
        }
        Ok(response)
    }

    pub async fn read_request(&mut self) -> Result<Request, NimError> {
        let (line, body) = self.reader.read_frame().await?;
        Request::parse(&line, body)
    }

    pub async fn send_response(&mut self, response: &Response) -> Result<(), NimError> {
        self.writer.write_all(&response.encode()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

//! Connection-oriented transport seam.
//!
//! The node drives transports cooperatively: non-blocking reads, with a
//! `service()` call on every wait iteration. On hosted builds the kernel
//! runs the TCP state machine and `service()` is a no-op; embedded ports
//! pump their network stack (lwIP-style polling) in it.

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use thiserror::Error;

use crate::config::HTTP_TIMEOUT_MS;

/// Transport-level failures. All of them abort the request immediately.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect to {host}:{port} failed: {source}")]
    Connect {
        host: String,
        port: u16,
        source: std::io::Error,
    },
    #[error("address '{0}' did not resolve")]
    Resolve(String),
    #[error("send failed: {0}")]
    Send(std::io::Error),
    #[error("receive failed: {0}")]
    Recv(std::io::Error),
}

/// Result of one non-blocking read attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvStatus {
    /// `n` bytes were copied into the buffer.
    Data(usize),
    /// Nothing available right now.
    WouldBlock,
    /// Peer closed the connection (end of response).
    Closed,
}

/// One open connection. Dropped when the request finishes, which closes it.
pub trait Connection {
    /// Queue outgoing bytes; may accept fewer than offered. Returns the
    /// number taken (0 means try again after `service()`).
    fn send(&mut self, data: &[u8]) -> Result<usize, TransportError>;

    /// Non-blocking read into `buf`.
    fn recv(&mut self, buf: &mut [u8]) -> Result<RecvStatus, TransportError>;

    /// Drive the transport's own processing. Called on every wait
    /// iteration so in-flight events are never starved.
    fn service(&mut self);
}

/// Connection factory. One `connect` per request.
pub trait Transport {
    type Conn: Connection;

    fn connect(&mut self, host: &str, port: u16) -> Result<Self::Conn, TransportError>;

    /// Stack-level housekeeping between requests. No-op by default.
    fn service(&mut self) {}
}

/// Kernel TCP transport.
pub struct TcpTransport {
    pub connect_timeout: Duration,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self {
            connect_timeout: Duration::from_millis(HTTP_TIMEOUT_MS),
        }
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for TcpTransport {
    type Conn = TcpConnection;

    fn connect(&mut self, host: &str, port: u16) -> Result<TcpConnection, TransportError> {
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|source| TransportError::Connect {
                host: host.to_string(),
                port,
                source,
            })?
            .next()
            .ok_or_else(|| TransportError::Resolve(format!("{host}:{port}")))?;

        let stream = TcpStream::connect_timeout(&addr, self.connect_timeout).map_err(
            |source| TransportError::Connect {
                host: host.to_string(),
                port,
                source,
            },
        )?;
        stream
            .set_nonblocking(true)
            .map_err(TransportError::Send)?;
        let _ = stream.set_nodelay(true);

        Ok(TcpConnection { stream })
    }
}

/// Non-blocking TCP connection.
pub struct TcpConnection {
    stream: TcpStream,
}

impl Connection for TcpConnection {
    fn send(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        match self.stream.write(data) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(0),
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(0),
            Err(e) => Err(TransportError::Send(e)),
        }
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<RecvStatus, TransportError> {
        match self.stream.read(buf) {
            Ok(0) => Ok(RecvStatus::Closed),
            Ok(n) => Ok(RecvStatus::Data(n)),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(RecvStatus::WouldBlock),
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(RecvStatus::WouldBlock),
            Err(e) => Err(TransportError::Recv(e)),
        }
    }

    fn service(&mut self) {
        // Kernel TCP needs no pumping.
    }
}

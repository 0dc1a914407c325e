//! One-shot HTTP client over [`Transport`].
//!
//! Request cycle: connect, send with `Connection: close`, then accumulate
//! into a fixed buffer until the peer closes, the buffer fills, or the
//! deadline passes. The wait is a polling loop that services the transport
//! on every iteration; it blocks the caller (by design, the dispatcher
//! pauses during a request) but never the transport itself.
//!
//! Timeout rule, preserved from the deployed firmware: bytes received by
//! the deadline count as a response (`complete: false`); zero bytes is a
//! failure. A truncated JSON body therefore can reach callers; they must
//! parse defensively.

use std::time::{Duration, Instant};

use log::{debug, trace};
use thiserror::Error;

use crate::config::{HTTP_BUF_LEN, HTTP_TIMEOUT_MS};
use crate::net::transport::{Connection, RecvStatus, Transport, TransportError};

/// Pause between wait iterations once the transport reports would-block.
const WAIT_YIELD: Duration = Duration::from_millis(1);

#[derive(Debug, Error)]
pub enum HttpError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Deadline passed with zero bytes received.
    #[error("no response within {0} ms")]
    Timeout(u64),
    /// Received bytes do not start with a parseable status line.
    #[error("malformed response head")]
    BadResponse,
}

/// Parsed response. `body` is everything past the header block that made it
/// into the receive buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
    /// False when the read ended at the deadline rather than at
    /// end-of-stream; the body may be truncated.
    pub complete: bool,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP/1.1 client; one fresh connection per request.
pub struct HttpClient<T: Transport> {
    transport: T,
    timeout: Duration,
}

impl<T: Transport> HttpClient<T> {
    pub fn new(transport: T) -> Self {
        Self::with_timeout(transport, Duration::from_millis(HTTP_TIMEOUT_MS))
    }

    /// Client with a non-default receive deadline (tests mostly).
    pub fn with_timeout(transport: T, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Stack-level housekeeping between requests.
    pub fn service(&mut self) {
        self.transport.service();
    }

    pub fn get(&mut self, host: &str, port: u16, path: &str) -> Result<HttpResponse, HttpError> {
        self.request("GET", host, port, path, None)
    }

    pub fn post_json(
        &mut self,
        host: &str,
        port: u16,
        path: &str,
        body: &str,
    ) -> Result<HttpResponse, HttpError> {
        self.request("POST", host, port, path, Some(body))
    }

    /// Run one request to completion.
    ///
    /// # Returns
    ///
    /// - `Ok` with `complete: true` when the peer closed (or the buffer
    ///   filled) before the deadline.
    /// - `Ok` with `complete: false` when the deadline passed with at least
    ///   one byte accumulated (documented permissive behavior).
    /// - `Err(Timeout)` when the deadline passed with nothing received.
    /// - `Err(Transport)` immediately on a transport fault.
    /// - `Err(BadResponse)` when the accumulated bytes do not contain a
    ///   full status line. This narrows the partial-data rule: a deadline
    ///   partial shorter than `HTTP/1.x NNN\r\n` is rejected rather than
    ///   accepted, since no status can be attributed to it. Callers treat
    ///   both the same way (skip the cycle, retry next interval).
    pub fn request(
        &mut self,
        method: &str,
        host: &str,
        port: u16,
        path: &str,
        body: Option<&str>,
    ) -> Result<HttpResponse, HttpError> {
        let deadline = Instant::now() + self.timeout;
        let mut conn = self.transport.connect(host, port)?;

        let wire = build_request(method, host, port, path, body);
        self.send_all(&mut conn, wire.as_bytes(), deadline)?;

        let mut buf = [0u8; HTTP_BUF_LEN];
        let mut filled = 0usize;
        let complete = loop {
            conn.service();
            if filled == buf.len() {
                // Buffer full: treat as end of response, anything further
                // would be discarded anyway.
                break true;
            }
            match conn.recv(&mut buf[filled..])? {
                RecvStatus::Data(n) => {
                    filled += n;
                    trace!("recv {n} bytes ({filled} total)");
                }
                RecvStatus::Closed => break true,
                RecvStatus::WouldBlock => {
                    if Instant::now() >= deadline {
                        if filled == 0 {
                            return Err(HttpError::Timeout(self.timeout.as_millis() as u64));
                        }
                        debug!("deadline with {filled} bytes buffered, accepting partial");
                        break false;
                    }
                    std::thread::sleep(WAIT_YIELD);
                }
            }
        };

        parse_response(&buf[..filled], complete)
    }

    fn send_all(
        &mut self,
        conn: &mut T::Conn,
        mut data: &[u8],
        deadline: Instant,
    ) -> Result<(), HttpError> {
        while !data.is_empty() {
            let n = conn.send(data)?;
            data = &data[n..];
            if n == 0 {
                if Instant::now() >= deadline {
                    return Err(HttpError::Timeout(self.timeout.as_millis() as u64));
                }
                conn.service();
                std::thread::sleep(WAIT_YIELD);
            }
        }
        Ok(())
    }
}

fn build_request(method: &str, host: &str, port: u16, path: &str, body: Option<&str>) -> String {
    let mut req = format!(
        "{method} {path} HTTP/1.1\r\nHost: {host}:{port}\r\nConnection: close\r\n"
    );
    match body {
        Some(b) => {
            req.push_str(&format!(
                "Content-Type: application/json\r\nContent-Length: {}\r\n\r\n",
                b.len()
            ));
            req.push_str(b);
        }
        None => req.push_str("\r\n"),
    }
    req
}

fn parse_response(raw: &[u8], complete: bool) -> Result<HttpResponse, HttpError> {
    let status = parse_status_line(raw).ok_or(HttpError::BadResponse)?;
    let body = match find_header_end(raw) {
        Some(pos) => raw[pos..].to_vec(),
        None => Vec::new(),
    };
    Ok(HttpResponse {
        status,
        body,
        complete,
    })
}

/// Status code from `HTTP/1.x NNN ...`.
fn parse_status_line(raw: &[u8]) -> Option<u16> {
    let line_end = raw.windows(2).position(|w| w == b"\r\n")?;
    let line = core::str::from_utf8(&raw[..line_end]).ok()?;
    let mut parts = line.split_whitespace();
    if !parts.next()?.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

/// Offset just past the blank line separating headers from body.
fn find_header_end(raw: &[u8]) -> Option<usize> {
    raw.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_get() {
        let req = build_request("GET", "10.0.0.2", 8000, "/api/v1/commands/pending?node_id=x", None);
        assert!(req.starts_with("GET /api/v1/commands/pending?node_id=x HTTP/1.1\r\n"));
        assert!(req.contains("Host: 10.0.0.2:8000\r\n"));
        assert!(req.contains("Connection: close\r\n"));
        assert!(req.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_build_request_post_carries_length() {
        let req = build_request("POST", "h", 80, "/api/v1/logs/", Some("{\"a\":1}"));
        assert!(req.contains("Content-Length: 7\r\n"));
        assert!(req.ends_with("\r\n\r\n{\"a\":1}"));
    }

    #[test]
    fn test_parse_status_line() {
        assert_eq!(parse_status_line(b"HTTP/1.1 200 OK\r\n"), Some(200));
        assert_eq!(parse_status_line(b"HTTP/1.0 404 Not Found\r\n"), Some(404));
        assert_eq!(parse_status_line(b"garbage\r\n"), None);
        assert_eq!(parse_status_line(b"HTTP/1.1 200"), None); // no line end yet
    }

    #[test]
    fn test_parse_response_splits_body() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n[1,2]";
        let resp = parse_response(raw, true).unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, b"[1,2]");
        assert!(resp.complete);
    }

    #[test]
    fn test_parse_response_headers_only() {
        let resp = parse_response(b"HTTP/1.1 204 No Content\r\n", false).unwrap();
        assert_eq!(resp.status, 204);
        assert!(resp.body.is_empty());
        assert!(!resp.complete);
    }
}

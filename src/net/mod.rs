//! Module: net
//!
//! Purpose: One-shot request/response plumbing to the collector.
//!
//! Architecture:
//! - `transport`: byte-level `Connection`/`Transport` traits plus the TCP
//!   implementation. Every request opens a fresh connection; nothing is
//!   kept alive between requests.
//! - `http`: the request cycle as a deadline-bounded polling loop. Receive
//!   buffer is fixed at `HTTP_BUF_LEN`; the transport's `service()` hook is
//!   driven on every wait iteration so stack-level bookkeeping never
//!   starves while the node waits.
//! - `collector`: the four collector endpoints with their JSON payloads.
//!
//! Failure policy is skip-and-retry-next-interval: a failed push or poll
//! costs one cycle, nothing more. No backoff.

pub mod collector;
pub mod http;
pub mod transport;

pub use collector::{CollectorClient, InferenceReport, TelemetryReport};
pub use http::{HttpClient, HttpError, HttpResponse};
pub use transport::{Connection, RecvStatus, TcpTransport, Transport, TransportError};

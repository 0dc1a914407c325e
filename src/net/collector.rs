//! Collector API: telemetry, inference results, log lines, pending poll.
//!
//! Field names and paths are the collector's wire contract; do not rename.
//! Every method maps transport failures to a warn line and a skipped cycle.
//! The next fixed-interval tick retries; there is no backoff.

use log::{debug, warn};
use serde::Serialize;

use crate::command::{parse_pending, Command};
use crate::config::SystemConfig;
use crate::net::http::HttpClient;
use crate::net::transport::Transport;

pub const API_TELEMETRY: &str = "/api/v1/telemetry/";
pub const API_INFERENCE: &str = "/api/v1/inference/";
pub const API_LOGS: &str = "/api/v1/logs/";
pub const API_PENDING: &str = "/api/v1/commands/pending";

/// One climate/battery report.
#[derive(Debug, Serialize)]
pub struct TelemetryReport<'a> {
    pub node_id: &'a str,
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub battery_mv: u32,
}

/// One classification report. `timestamp` stays `None`; the collector
/// assigns receipt time (the node has no RTC).
#[derive(Debug, Serialize)]
pub struct InferenceReport<'a> {
    pub node_id: &'a str,
    pub model_type: &'a str,
    pub classification: &'a str,
    pub confidence: f32,
    pub timestamp: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct LogReport<'a> {
    node_id: &'a str,
    message: &'a str,
}

/// The node's view of the collector.
pub struct CollectorClient<T: Transport> {
    http: HttpClient<T>,
}

impl<T: Transport> CollectorClient<T> {
    pub fn new(http: HttpClient<T>) -> Self {
        Self { http }
    }

    /// Stack-level housekeeping between requests.
    pub fn service(&mut self) {
        self.http.service();
    }

    /// Push one telemetry report. Returns success.
    pub fn push_telemetry(&mut self, cfg: &SystemConfig, report: &TelemetryReport) -> bool {
        self.post(cfg, API_TELEMETRY, report)
    }

    /// Push one inference report. Returns success.
    pub fn push_inference(&mut self, cfg: &SystemConfig, report: &InferenceReport) -> bool {
        self.post(cfg, API_INFERENCE, report)
    }

    /// Push one device log line. Returns success.
    pub fn push_log(&mut self, cfg: &SystemConfig, message: &str) -> bool {
        let report = LogReport {
            node_id: &cfg.node_id,
            message,
        };
        self.post(cfg, API_LOGS, &report)
    }

    /// Poll for pending commands. `None` when the collector was unreachable
    /// (link considered down); an unparseable or non-2xx body yields an
    /// empty list (the collector answered, the link is fine).
    pub fn poll_pending(&mut self, cfg: &SystemConfig) -> Option<Vec<Command>> {
        let path = format!("{API_PENDING}?node_id={}", cfg.node_id);
        match self
            .http
            .get(&cfg.collector_host, cfg.collector_port, &path)
        {
            Ok(resp) if resp.is_success() => Some(parse_pending(&resp.body)),
            Ok(resp) => {
                warn!("pending poll answered {}", resp.status);
                Some(Vec::new())
            }
            Err(e) => {
                debug!("pending poll failed: {e}");
                None
            }
        }
    }

    fn post<B: Serialize>(&mut self, cfg: &SystemConfig, path: &str, body: &B) -> bool {
        let json = match serde_json::to_string(body) {
            Ok(json) => json,
            Err(e) => {
                warn!("payload serialization failed: {e}");
                return false;
            }
        };
        match self
            .http
            .post_json(&cfg.collector_host, cfg.collector_port, path, &json)
        {
            Ok(resp) if resp.is_success() => true,
            Ok(resp) => {
                warn!("{path} answered {}", resp.status);
                false
            }
            Err(e) => {
                warn!("{path} failed: {e}");
                false
            }
        }
    }
}

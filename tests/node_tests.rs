//! Control loop integration tests: console input, dispatch, remote poll

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use hive_node::config::store::MemStorage;
use hive_node::net::transport::{Connection, RecvStatus, Transport, TransportError};
use hive_node::net::{CollectorClient, HttpClient};
use hive_node::platform::SimPlatform;
use hive_node::{ConfigStore, Node, SpikeThresholdClassifier};

/// Serves one canned response per connection, records every request.
struct CannedTransport {
    responses: Rc<RefCell<VecDeque<Vec<u8>>>>,
    requests: Rc<RefCell<Vec<Vec<u8>>>>,
}

struct CannedConnection {
    response: Vec<u8>,
    pos: usize,
    request: Rc<RefCell<Vec<Vec<u8>>>>,
    index: usize,
}

impl Connection for CannedConnection {
    fn send(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        self.request.borrow_mut()[self.index].extend_from_slice(data);
        Ok(data.len())
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<RecvStatus, TransportError> {
        if self.pos >= self.response.len() {
            return Ok(RecvStatus::Closed);
        }
        let n = (self.response.len() - self.pos).min(buf.len());
        buf[..n].copy_from_slice(&self.response[self.pos..self.pos + n]);
        self.pos += n;
        Ok(RecvStatus::Data(n))
    }

    fn service(&mut self) {}
}

impl Transport for CannedTransport {
    type Conn = CannedConnection;

    fn connect(&mut self, host: &str, port: u16) -> Result<CannedConnection, TransportError> {
        let response = self
            .responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| TransportError::Resolve(format!("{host}:{port}")))?;
        let mut requests = self.requests.borrow_mut();
        requests.push(Vec::new());
        let index = requests.len() - 1;
        Ok(CannedConnection {
            response,
            pos: 0,
            request: Rc::clone(&self.requests),
            index,
        })
    }
}

struct Rig {
    responses: Rc<RefCell<VecDeque<Vec<u8>>>>,
    requests: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl Rig {
    fn new() -> Self {
        Self {
            responses: Rc::new(RefCell::new(VecDeque::new())),
            requests: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn node(&self) -> Node<SimPlatform, CannedTransport> {
        let transport = CannedTransport {
            responses: Rc::clone(&self.responses),
            requests: Rc::clone(&self.requests),
        };
        Node::new(
            SimPlatform::new(),
            ConfigStore::new(Box::new(MemStorage::new())),
            CollectorClient::new(HttpClient::new(transport)),
            Box::new(SpikeThresholdClassifier::new()),
        )
    }

    fn queue_response(&self, body: &str) {
        let wire = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        self.responses.borrow_mut().push_back(wire.into_bytes());
    }

    fn request_text(&self, index: usize) -> String {
        String::from_utf8_lossy(&self.requests.borrow()[index]).into_owned()
    }
}

#[test]
fn test_one_command_per_tick() {
    let rig = Rig::new();
    let mut node = rig.node();
    for _ in 0..3 {
        node.platform_mut().push_line("p");
    }

    node.tick();
    assert_eq!(node.pending(), 2, "all lines parsed, one dispatched");
    node.tick();
    assert_eq!(node.pending(), 1);
    node.tick();
    assert_eq!(node.pending(), 0);

    let out = node.platform().output_text();
    assert_eq!(out.matches("PONG").count(), 3);
}

#[test]
fn test_local_commands_run_before_remote() {
    let rig = Rig::new();
    // Poll answer carrying one remote command.
    rig.queue_response(r#"[{"command_type": "TOGGLE_MOCK", "params": {}}]"#);
    // Log-drain posts after the successful poll.
    for _ in 0..8 {
        rig.queue_response("{}");
    }

    let mut node = rig.node();
    node.platform_mut().link = true;
    node.platform_mut().advance_ms(2000);
    node.platform_mut().push_line("p");
    node.platform_mut().push_line("c");

    // Tick 1 drains both console lines, polls, then runs the first console
    // command. The remote command waits behind everything typed this tick.
    node.tick();
    node.tick();
    node.tick();

    let out = node.platform().output_text();
    let pong = out.find("PONG").expect("ping output");
    let cleared = out.find("history cleared").expect("clear output");
    let mock = out.find("mock mode on").expect("remote toggle output");
    assert!(pong < cleared && cleared < mock, "order violated: {out}");
    assert!(node.mock_enabled());

    // The poll itself was the first request on the wire.
    let poll = rig.request_text(0);
    assert!(poll.starts_with("GET /api/v1/commands/pending?node_id=pico-hive-001"));
}

#[test]
fn test_poll_failure_leaves_console_working() {
    let rig = Rig::new(); // no scripted responses: every connect fails
    let mut node = rig.node();
    node.platform_mut().link = true;
    node.platform_mut().advance_ms(2000);
    node.platform_mut().push_line("p");

    node.tick();

    assert!(node.platform().output_text().contains("PONG"));
    assert_eq!(node.pending(), 0);
}

#[test]
fn test_stream_emits_header_payload_sentinel() {
    let rig = Rig::new();
    let mut node = rig.node();
    node.platform_mut().push_line("a1");

    node.tick();

    let out = node.platform().output.clone();
    let text = String::from_utf8_lossy(&out);
    let hdr = text.find("HDR:32000:16000:").expect("header line");
    assert!(text.ends_with("\nEND\n"));

    // Header line, then exactly payload_bytes of raw samples, then sentinel.
    let payload_start = out[hdr..].iter().position(|&b| b == b'\n').unwrap() + hdr + 1;
    let payload_end = out.len() - b"\nEND\n".len();
    assert_eq!(payload_end - payload_start, 32_000);
}

#[test]
fn test_background_telemetry_pushes_on_interval() {
    let rig = Rig::new();
    rig.queue_response("[]"); // pending poll fires first on the same tick
    rig.queue_response("{}"); // telemetry POST
    let mut node = rig.node();
    node.platform_mut().link = true;
    node.platform_mut().advance_ms(60_000);

    node.tick();

    let telemetry = rig.request_text(1);
    assert!(
        telemetry.starts_with("POST /api/v1/telemetry/ HTTP/1.1\r\n"),
        "got: {telemetry}"
    );
    assert!(telemetry.contains("\"node_id\":\"pico-hive-001\""));
    assert!(telemetry.contains("\"temperature_c\":25.0"), "sensorless sim falls back to defaults");
    assert!(telemetry.contains("\"battery_mv\":4200"));

    // The interval gate holds: an immediate second tick posts nothing.
    let before = rig.requests.borrow().len();
    node.tick();
    assert_eq!(rig.requests.borrow().len(), before);
}

#[test]
fn test_overlong_console_line_discarded() {
    let rig = Rig::new();
    let mut node = rig.node();
    node.platform_mut().push_bytes(&[b'x'; 70]);
    node.platform_mut().push_bytes(b"\n");
    node.platform_mut().push_line("p");

    node.tick();

    let out = node.platform().output_text();
    assert!(out.contains("ERR: line too long"), "got: {out}");
    // The overflow is confined to its line; the next one parses normally.
    assert!(out.contains("PONG"));
}

#[test]
fn test_bare_gain_verb_reports_current_value() {
    let rig = Rig::new();
    let mut node = rig.node();
    node.platform_mut().push_line("g");

    node.tick();

    let out = node.platform().output_text();
    assert!(out.contains("current gain: 0.350"), "got: {out}");
    assert!(out.contains("usage: g<gain>"));
    assert_eq!(node.pending(), 0, "nothing is queued for a bare g");
}

#[test]
fn test_unknown_console_line_rejected_without_dispatch() {
    let rig = Rig::new();
    let mut node = rig.node();
    node.platform_mut().push_line("zzz");

    node.tick();

    assert_eq!(node.pending(), 0);
    assert!(node.platform().output_text().contains("ERR:"));
}

#[test]
fn test_mock_values_drive_climate_reads() {
    let rig = Rig::new();
    let mut node = rig.node();
    node.platform_mut().push_line("m");
    node.platform_mut().push_line("v30.0,70.0,12.0");
    node.platform_mut().push_line("t");

    node.tick();
    node.tick();
    node.tick();

    let out = node.platform().output_text();
    assert!(out.contains("mock mode on"));
    assert!(out.contains("TEMP: 30.0 C"), "got: {out}");
    assert!(out.contains("HUM: 70.0 %"));
}

#[test]
fn test_inference_prints_status_and_json() {
    let rig = Rig::new();
    let mut node = rig.node();
    node.platform_mut().push_line("s");

    node.tick();

    let out = node.platform().output_text();
    assert!(out.contains("=== HIVE STATUS ==="));
    assert!(out.contains("model:    summer"));
    let json_line = out
        .lines()
        .find_map(|l| l.strip_prefix("JSON_OUT:"))
        .expect("machine-readable line");
    let parsed: serde_json::Value = serde_json::from_str(json_line).unwrap();
    assert_eq!(parsed["features"].as_array().unwrap().len(), 20);
    assert_eq!(parsed["model"], "summer");
}

#[test]
fn test_server_command_updates_config() {
    let rig = Rig::new();
    let mut node = rig.node();
    node.platform_mut().push_line("server 10.0.0.9 9000");

    node.tick();

    assert_eq!(node.config().collector_host, "10.0.0.9");
    assert_eq!(node.config().collector_port, 9000);
    assert!(node
        .platform()
        .output_text()
        .contains("collector set to 10.0.0.9:9000"));
}

#[test]
fn test_clear_history_empties_rolling_state() {
    let rig = Rig::new();
    let mut node = rig.node();
    // One inference seeds the density history; clear drops it; the dump
    // afterwards shows both histories empty.
    node.platform_mut().push_line("s");
    node.platform_mut().push_line("c");
    node.platform_mut().push_line("d");
    node.tick();
    node.tick();
    node.tick();

    let out = node.platform().output_text();
    assert!(out.contains("history cleared"));
    assert!(out.contains("history:   density 0 / temp 0"), "got: {out}");
}

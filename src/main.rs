//! hive-node host binary.
//!
//! Wires a [`Node`] to the host: stdin/stdout as the console, a file as the
//! reserved config region, kernel TCP as the transport, and a synthesized
//! tone generator as the capture source. Hardware ports replace only the
//! platform; the control loop is identical.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use hive_node::config::{FileStorage, SAMPLE_RATE_HZ};
use hive_node::net::{CollectorClient, HttpClient, TcpTransport};
use hive_node::platform::{ClimateReading, Platform};
use hive_node::{ConfigStore, Node, SpikeThresholdClassifier};

/// Tick yield between control-loop iterations.
const TICK_MS: u64 = 10;

#[derive(Parser, Debug)]
#[command(version, about = "Beehive acoustic monitoring edge node")]
struct CliArgs {
    /// File standing in for the reserved config flash region.
    #[clap(long, default_value = "hive-node.cfg")]
    config: PathBuf,

    /// Override the collector as host:port for this session (not persisted).
    #[clap(long)]
    collector: Option<String>,

    /// Override the node identifier for this session (not persisted).
    #[clap(long)]
    node_id: Option<String>,

    /// Start in mock sensor mode.
    #[clap(long)]
    mock: bool,

    /// Disable the unsolicited background telemetry push.
    #[clap(long)]
    no_telemetry: bool,

    /// Synthesized capture tone frequency in Hz.
    #[clap(long, default_value_t = 187.5)]
    tone_hz: f32,

    /// Synthesized capture tone amplitude in ADC counts.
    #[clap(long, default_value_t = 300.0)]
    tone_amplitude: f32,
}

fn parse_collector(s: &str) -> Result<(String, u16)> {
    match s.rsplit_once(':') {
        Some((host, port)) => {
            let port: u16 = port
                .parse()
                .with_context(|| format!("bad collector port in '{s}'"))?;
            Ok((host.to_string(), port))
        }
        None => Ok((s.to_string(), 8000)),
    }
}

/// Platform over stdin/stdout and a synthesized capture source.
///
/// A reader thread blocks on stdin and feeds a channel; `console_read`
/// drains it without blocking, which is all the control loop needs.
struct HostPlatform {
    tone_hz: f32,
    tone_amplitude: f32,
    phase: u64,
    noise_state: u32,
    stdin_rx: Receiver<u8>,
    stdin_open: bool,
    boot: Instant,
}

impl HostPlatform {
    fn new(tone_hz: f32, tone_amplitude: f32) -> Self {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for byte in stdin.lock().bytes() {
                let Ok(byte) = byte else { break };
                if tx.send(byte).is_err() {
                    break;
                }
            }
        });
        Self {
            tone_hz,
            tone_amplitude,
            phase: 0,
            noise_state: 0x1234_5678,
            stdin_rx: rx,
            stdin_open: true,
            boot: Instant::now(),
        }
    }

    /// False once stdin reached EOF and the queue drained.
    fn console_open(&self) -> bool {
        self.stdin_open
    }

    /// xorshift32, scaled to +/- 8 counts of ADC noise.
    fn noise(&mut self) -> f64 {
        let mut x = self.noise_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.noise_state = x;
        (f64::from(x) / f64::from(u32::MAX) - 0.5) * 16.0
    }
}

impl Platform for HostPlatform {
    fn capture(&mut self, buf: &mut [u16]) {
        let rate = f64::from(SAMPLE_RATE_HZ);
        let freq = f64::from(self.tone_hz);
        let amp = f64::from(self.tone_amplitude);
        for s in buf.iter_mut() {
            let t = self.phase as f64 / rate;
            let tone = amp * (2.0 * std::f64::consts::PI * freq * t).sin();
            *s = (2048.0 + tone + self.noise()).clamp(0.0, 4095.0) as u16;
            self.phase += 1;
        }
    }

    fn read_climate(&mut self) -> Option<ClimateReading> {
        // No sensor on the host; the node substitutes defaults or mocks.
        None
    }

    fn battery_mv(&mut self) -> u32 {
        4200
    }

    fn hour_of_day(&self) -> f32 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(since) => (since.as_secs() % 86_400) as f32 / 3600.0,
            Err(_) => hive_node::config::DEFAULT_HOUR,
        }
    }

    fn now_ms(&self) -> u64 {
        self.boot.elapsed().as_millis() as u64
    }

    fn console_read(&mut self, buf: &mut [u8]) -> usize {
        let mut n = 0;
        while n < buf.len() {
            match self.stdin_rx.try_recv() {
                Ok(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.stdin_open = false;
                    break;
                }
            }
        }
        n
    }

    fn console_write(&mut self, bytes: &[u8]) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(bytes);
        let _ = stdout.flush();
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = CliArgs::parse();

    let storage = FileStorage::new(&args.config);
    let store = ConfigStore::new(Box::new(storage));
    let collector = CollectorClient::new(HttpClient::new(TcpTransport::new()));
    let platform = HostPlatform::new(args.tone_hz, args.tone_amplitude);

    let mut node = Node::new(
        platform,
        store,
        collector,
        Box::new(SpikeThresholdClassifier::new()),
    );

    if let Some(spec) = args.collector.as_deref() {
        let (host, port) = parse_collector(spec)?;
        node.override_collector(host, port);
    }
    if let Some(node_id) = args.node_id {
        node.override_node_id(node_id);
    }
    node.set_mock_enabled(args.mock);
    node.set_background_telemetry(!args.no_telemetry);

    node.print_banner();
    info!("entering control loop, config region {:?}", args.config);

    while node.platform().console_open() || node.pending() > 0 {
        node.tick();
        std::thread::sleep(Duration::from_millis(TICK_MS));
    }

    info!("console closed, shutting down");
    Ok(())
}

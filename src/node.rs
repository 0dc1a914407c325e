//! Module: node
//!
//! Purpose: The device context and the cooperative control loop.
//!
//! Architecture:
//! - `Node` owns every piece of long-lived state: capture buffer, extractor
//!   (with filter memory), rolling histories, configuration, command queue,
//!   uplink journal. One instance per device, one thread, no locking; the
//!   loop's sequencing is the whole concurrency model.
//! - One `tick` runs: drain console input, poll the remote channel if due,
//!   dispatch at most one queued command, push background telemetry if due,
//!   drain one uplink log entry, service the transport. The caller yields
//!   between ticks.
//! - Command handlers are total: they absorb their own failures into log
//!   lines and always leave state consistent. The dispatcher never sees an
//!   error.
//!
//! The only long block is command execution itself (a capture plus
//! extraction takes seconds); that is intentional, acquisition must not be
//! preempted mid-buffer.

use log::{info, warn};

use crate::classifier::{label_for, Classifier};
use crate::command::{
    parse_line, Command, CommandQueue, LineAction, LineBuffer, ModelVariant, Origin,
};
use crate::config::{
    ConfigStore, SystemConfig, AUDIO_BUFFER_LEN, BACKGROUND_SAMPLE_INTERVAL_MS, BIN_HZ,
    DEFAULT_HOUR, DEFAULT_HUMIDITY_PCT, DEFAULT_TEMPERATURE_C, POLL_INTERVAL_MS, SAMPLE_RATE_HZ,
};
use crate::dsp::BinEnergyExtractor;
use crate::features::FeatureAssembler;
use crate::logging::UplinkLog;
use crate::net::collector::{CollectorClient, InferenceReport, TelemetryReport};
use crate::net::transport::Transport;
use crate::platform::Platform;

const HELP_TEXT: &str = "\
commands:\n\
  s  infer summer     w  infer winter     t  read climate\n\
  r  capture stats    a[sec]  stream raw  d  debug dump\n\
  m  toggle mock      c  clear history    p  ping\n\
  g<gain>             v<t>,<h>,<hour>     h  help\n\
  wifi <ssid> <password>    server <host> [port]\n";

/// Mock sensor substitution values.
struct MockState {
    enabled: bool,
    temperature_c: f32,
    humidity_pct: f32,
    hour: f32,
}

impl MockState {
    const fn new() -> Self {
        Self {
            enabled: false,
            temperature_c: DEFAULT_TEMPERATURE_C,
            humidity_pct: DEFAULT_HUMIDITY_PCT,
            hour: DEFAULT_HOUR,
        }
    }
}

/// Raw capture statistics. Float mean, but each squared deviation truncates
/// to an integer before summing, as deployed.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SampleStats {
    min: u16,
    max: u16,
    mean: f32,
    std_dev: f32,
}

impl SampleStats {
    fn compute(samples: &[u16]) -> Self {
        if samples.is_empty() {
            return Self {
                min: 0,
                max: 0,
                mean: 0.0,
                std_dev: 0.0,
            };
        }
        let mut min = u16::MAX;
        let mut max = 0u16;
        let mut sum = 0u64;
        for &s in samples {
            min = min.min(s);
            max = max.max(s);
            sum += u64::from(s);
        }
        let mean = sum as f32 / samples.len() as f32;
        let mut var_sum = 0u64;
        for &s in samples {
            let d = f32::from(s) - mean;
            var_sum += (d * d) as u64;
        }
        let std_dev = (var_sum as f64 / samples.len() as f64).sqrt() as f32;
        Self {
            min,
            max,
            mean,
            std_dev,
        }
    }
}

/// The device: all state, one thread.
pub struct Node<P: Platform, T: Transport> {
    platform: P,
    store: ConfigStore,
    config: SystemConfig,
    collector: CollectorClient<T>,
    classifier: Box<dyn Classifier>,
    extractor: BinEnergyExtractor,
    features: FeatureAssembler,
    queue: CommandQueue,
    uplink: UplinkLog,
    samples: Vec<u16>,
    line: LineBuffer,
    line_overflow: bool,
    mock: MockState,
    last_poll_ms: u64,
    last_telemetry_ms: u64,
    background_telemetry: bool,
    link_healthy: bool,
}

impl<P: Platform, T: Transport> Node<P, T> {
    pub fn new(
        platform: P,
        mut store: ConfigStore,
        collector: CollectorClient<T>,
        classifier: Box<dyn Classifier>,
    ) -> Self {
        let config = store.load();
        info!(
            "node {} starting, collector {}:{}",
            config.node_id, config.collector_host, config.collector_port
        );
        Self {
            platform,
            store,
            config,
            collector,
            classifier,
            extractor: BinEnergyExtractor::new(),
            features: FeatureAssembler::new(),
            queue: CommandQueue::new(),
            uplink: UplinkLog::new(),
            samples: vec![0u16; AUDIO_BUFFER_LEN],
            line: LineBuffer::new(),
            line_overflow: false,
            mock: MockState::new(),
            last_poll_ms: 0,
            last_telemetry_ms: 0,
            background_telemetry: true,
            link_healthy: false,
        }
    }

    /// One scheduler iteration. The caller yields between calls.
    pub fn tick(&mut self) {
        self.drain_console();
        self.poll_remote_if_due();
        if let Some(entry) = self.queue.pop() {
            self.execute(entry.command, entry.origin);
        }
        self.background_telemetry_if_due();
        self.drain_uplink_one();
        self.collector.service();
    }

    /// Boot banner plus the command summary.
    pub fn print_banner(&mut self) {
        let banner = format!(
            "==========================================\n \
             {}\n node: {}  collector: {}:{}\n\
             ==========================================\n{HELP_TEXT}",
            crate::version(),
            self.config.node_id,
            self.config.collector_host,
            self.config.collector_port
        );
        self.platform.console_write(banner.as_bytes());
    }

    // ========================================
    // Accessors (tests, binary wiring)
    // ========================================

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn mock_enabled(&self) -> bool {
        self.mock.enabled
    }

    pub fn gain(&self) -> f32 {
        self.extractor.gain()
    }

    /// Commands waiting for dispatch.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn set_mock_enabled(&mut self, enabled: bool) {
        self.mock.enabled = enabled;
    }

    pub fn set_background_telemetry(&mut self, enabled: bool) {
        self.background_telemetry = enabled;
    }

    /// Session-only collector override; not persisted.
    pub fn override_collector(&mut self, host: String, port: u16) {
        self.config.collector_host = host;
        self.config.collector_port = port;
    }

    /// Session-only node id override; not persisted.
    pub fn override_node_id(&mut self, node_id: String) {
        self.config.node_id = node_id;
    }

    // ========================================
    // Input accumulation
    // ========================================

    fn drain_console(&mut self) {
        let mut chunk = [0u8; 64];
        loop {
            let n = self.platform.console_read(&mut chunk);
            if n == 0 {
                break;
            }
            for &byte in &chunk[..n] {
                self.feed_byte(byte);
            }
        }
    }

    fn feed_byte(&mut self, byte: u8) {
        match byte {
            b'\r' => {}
            b'\n' => {
                if self.line_overflow {
                    self.line_overflow = false;
                    self.line.clear();
                    self.platform.console_write(b"ERR: line too long\n");
                } else {
                    let line = self.line.as_str().to_string();
                    self.line.clear();
                    self.handle_line(&line);
                }
            }
            0x08 | 0x7F => self.line.backspace(),
            _ => {
                if !self.line_overflow && !self.line.push(byte) {
                    self.line_overflow = true;
                }
            }
        }
    }

    fn handle_line(&mut self, line: &str) {
        match parse_line(line) {
            Ok(None) => {}
            Ok(Some(LineAction::ShowHelp)) => {
                self.platform.console_write(HELP_TEXT.as_bytes());
            }
            Ok(Some(LineAction::ShowGain)) => {
                let msg = format!(
                    "current gain: {:.3}\nusage: g<gain> with 0 < gain <= 2.0\n",
                    self.extractor.gain()
                );
                self.platform.console_write(msg.as_bytes());
            }
            Ok(Some(LineAction::Dispatch(command))) => {
                self.enqueue(command, Origin::Console);
            }
            Err(e) => {
                let msg = format!("ERR: {e}\n");
                self.platform.console_write(msg.as_bytes());
            }
        }
    }

    fn enqueue(&mut self, command: Command, origin: Origin) {
        let name = command.name();
        if self.queue.push(command, origin) {
            self.uplink.push(format!("cmd {name} ({})", origin.as_str()));
        }
    }

    // ========================================
    // Remote channel
    // ========================================

    fn poll_remote_if_due(&mut self) {
        let now = self.platform.now_ms();
        if now.saturating_sub(self.last_poll_ms) < POLL_INTERVAL_MS {
            return;
        }
        self.last_poll_ms = now;
        if !self.platform.link_ready() {
            return;
        }
        match self.collector.poll_pending(&self.config) {
            Some(commands) => {
                self.link_healthy = true;
                for command in commands {
                    self.enqueue(command, Origin::Remote);
                }
            }
            None => self.link_healthy = false,
        }
    }

    fn background_telemetry_if_due(&mut self) {
        if !self.background_telemetry {
            return;
        }
        let now = self.platform.now_ms();
        if now.saturating_sub(self.last_telemetry_ms) < BACKGROUND_SAMPLE_INTERVAL_MS {
            return;
        }
        self.last_telemetry_ms = now;
        if !self.platform.link_ready() {
            return;
        }
        let (temperature_c, humidity_pct) = self.sense_climate();
        let battery_mv = self.platform.battery_mv();
        let report = TelemetryReport {
            node_id: &self.config.node_id,
            temperature_c,
            humidity_pct,
            battery_mv,
        };
        self.collector.push_telemetry(&self.config, &report);
    }

    fn drain_uplink_one(&mut self) {
        if !self.link_healthy || !self.platform.link_ready() {
            return;
        }
        let Some(message) = self.uplink.pop() else {
            return;
        };
        if !self.collector.push_log(&self.config, &message) {
            self.uplink.requeue(message);
            self.link_healthy = false;
        }
    }

    // ========================================
    // Dispatch
    // ========================================

    fn execute(&mut self, command: Command, origin: Origin) {
        info!("dispatch {} ({})", command.name(), origin.as_str());
        match command {
            Command::Ping => self.cmd_ping(),
            Command::ReadClimate => self.cmd_read_climate(),
            Command::RunInference(variant) => self.cmd_run_inference(variant),
            Command::Capture => self.cmd_capture(),
            Command::StreamAudio { seconds } => self.cmd_stream_audio(seconds),
            Command::ToggleMock => self.cmd_toggle_mock(),
            Command::ClearHistory => self.cmd_clear_history(),
            Command::DebugDump => self.cmd_debug_dump(),
            Command::SetWifi { ssid, password } => self.cmd_set_wifi(ssid, password),
            Command::SetCollector { host, port } => self.cmd_set_collector(host, port),
            Command::SetMock {
                temperature_c,
                humidity_pct,
                hour,
            } => self.cmd_set_mock(temperature_c, humidity_pct, hour),
            Command::SetGain(gain) => self.cmd_set_gain(gain),
        }
    }

    /// Mock values, sensor reading, or documented defaults, in that order.
    fn sense_climate(&mut self) -> (f32, f32) {
        if self.mock.enabled {
            return (self.mock.temperature_c, self.mock.humidity_pct);
        }
        match self.platform.read_climate() {
            Some(r) => (r.temperature_c, r.humidity_pct),
            None => {
                warn!("climate sensor unavailable, using defaults");
                (DEFAULT_TEMPERATURE_C, DEFAULT_HUMIDITY_PCT)
            }
        }
    }

    fn sense_hour(&self) -> f32 {
        if self.mock.enabled {
            self.mock.hour
        } else {
            self.platform.hour_of_day()
        }
    }

    fn cmd_ping(&mut self) {
        let msg = format!(
            "PONG {} mock={} gain={:.2}\n",
            crate::version(),
            if self.mock.enabled { "on" } else { "off" },
            self.extractor.gain()
        );
        self.platform.console_write(msg.as_bytes());
    }

    fn cmd_read_climate(&mut self) {
        let (temperature_c, humidity_pct) = self.sense_climate();
        let battery_mv = self.platform.battery_mv();
        let msg = format!("TEMP: {temperature_c:.1} C  HUM: {humidity_pct:.1} %  BAT: {battery_mv} mV\n");
        self.platform.console_write(msg.as_bytes());
        if self.platform.link_ready() {
            let report = TelemetryReport {
                node_id: &self.config.node_id,
                temperature_c,
                humidity_pct,
                battery_mv,
            };
            self.collector.push_telemetry(&self.config, &report);
        }
    }

    fn cmd_run_inference(&mut self, variant: ModelVariant) {
        let (temperature_c, humidity_pct) = self.sense_climate();
        let hour = self.sense_hour();
        self.platform.capture(&mut self.samples);
        let summary = self.extractor.process(&self.samples);

        // Vector assembly records the new observation; exactly once per cycle.
        let features: Vec<f32> = match variant {
            ModelVariant::Summer => self
                .features
                .build_summer(temperature_c, humidity_pct, hour, &summary)
                .to_vec(),
            ModelVariant::Winter => self
                .features
                .build_winter(temperature_c, humidity_pct, &summary)
                .to_vec(),
        };

        let Some(score) = self.classifier.classify(variant, &features) else {
            warn!("classifier produced no result, skipping report");
            self.uplink
                .push(format!("inference {} skipped", variant.as_str()));
            return;
        };
        let label = label_for(score);

        let mut out = String::new();
        out.push_str("=== HIVE STATUS ===\n");
        out.push_str(&format!("model:    {}\n", variant.as_str()));
        out.push_str(&format!(
            "status:   {} (conf={score:.2})\n",
            label.to_uppercase()
        ));
        out.push_str(&format!("density:  {:.6}\n", summary.density));
        match variant {
            ModelVariant::Summer => {
                out.push_str(&format!("spike:    {:.3}\n", features[3]));
            }
            ModelVariant::Winter => {
                out.push_str(&format!(
                    "heater:   {:.6} (ratio {:.3})\n",
                    features[3], features[4]
                ));
            }
        }
        out.push_str(&format!("windows:  {}\n", summary.windows));
        self.platform.console_write(out.as_bytes());

        let json = serde_json::json!({
            "model": variant.as_str(),
            "classification": label,
            "confidence": score,
            "features": features,
        });
        let line = format!("JSON_OUT:{json}\n");
        self.platform.console_write(line.as_bytes());

        self.uplink.push(format!(
            "inference {}: {label} ({score:.2})",
            variant.as_str()
        ));

        if self.platform.link_ready() {
            let report = InferenceReport {
                node_id: &self.config.node_id,
                model_type: variant.as_str(),
                classification: label,
                confidence: score,
                timestamp: None,
            };
            self.collector.push_inference(&self.config, &report);
        }
    }

    fn cmd_capture(&mut self) {
        self.platform.capture(&mut self.samples);
        let stats = SampleStats::compute(&self.samples);
        let msg = format!(
            "CAPTURED {} samples  min={} max={} mean={:.1}\n",
            self.samples.len(),
            stats.min,
            stats.max,
            stats.mean
        );
        self.platform.console_write(msg.as_bytes());
        self.uplink.push(format!(
            "capture: {} samples min={} max={} mean={:.1}",
            self.samples.len(),
            stats.min,
            stats.max,
            stats.mean
        ));
    }

    fn cmd_stream_audio(&mut self, seconds: u32) {
        let count = ((seconds * SAMPLE_RATE_HZ) as usize).min(self.samples.len());
        self.platform.capture(&mut self.samples[..count]);
        let stats = SampleStats::compute(&self.samples[..count]);
        info!("streaming {count} samples");

        // Header, then raw little-endian samples, then the sentinel. No
        // other console output may interleave until END.
        let header = format!("HDR:{}:{}:{:.1}\n", count * 2, count, stats.std_dev);
        self.platform.console_write(header.as_bytes());
        let mut chunk = [0u8; 1024];
        for block in self.samples[..count].chunks(chunk.len() / 2) {
            let mut pos = 0;
            for &s in block {
                chunk[pos..pos + 2].copy_from_slice(&s.to_le_bytes());
                pos += 2;
            }
            self.platform.console_write(&chunk[..pos]);
        }
        self.platform.console_write(b"\nEND\n");
    }

    fn cmd_toggle_mock(&mut self) {
        self.mock.enabled = !self.mock.enabled;
        let state = if self.mock.enabled { "on" } else { "off" };
        info!("mock mode {state}");
        let msg = format!("mock mode {state}\n");
        self.platform.console_write(msg.as_bytes());
    }

    fn cmd_clear_history(&mut self) {
        self.features.clear();
        self.platform.console_write(b"history cleared\n");
        self.uplink.push("history cleared".to_string());
    }

    fn cmd_debug_dump(&mut self) {
        let (temperature_c, humidity_pct) = self.sense_climate();
        let hour = self.sense_hour();
        self.platform.capture(&mut self.samples);
        let summary = self.extractor.process(&self.samples);

        let mut out = String::new();
        out.push_str("=== DEBUG DUMP ===\n");
        out.push_str(&format!("version:   {}\n", crate::version()));
        out.push_str(&format!("node:      {}\n", self.config.node_id));
        out.push_str(&format!(
            "collector: {}:{}\n",
            self.config.collector_host, self.config.collector_port
        ));
        out.push_str(&format!(
            "mock:      {}  temp={temperature_c:.1} hum={humidity_pct:.1} hour={hour:.1}\n",
            self.mock.enabled
        ));
        out.push_str(&format!("gain:      {:.2}\n", self.extractor.gain()));
        out.push_str(&format!(
            "history:   density {} / temp {}\n",
            self.features.density_count(),
            self.features.temperature_count()
        ));
        out.push_str(&format!(
            "density:   {:.6} over {} windows\n",
            summary.density, summary.windows
        ));
        for (k, b) in summary.bins.iter().enumerate() {
            out.push_str(&format!("bin[{k:2}] {:7.2} Hz: {b:.6}\n", k as f32 * BIN_HZ));
        }
        self.platform.console_write(out.as_bytes());
    }

    fn cmd_set_wifi(&mut self, ssid: String, password: String) {
        self.config.wifi_ssid = ssid;
        self.config.wifi_password = password;
        self.persist("wifi credentials saved");
    }

    fn cmd_set_collector(&mut self, host: String, port: Option<u16>) {
        self.config.collector_host = host;
        if let Some(p) = port {
            self.config.collector_port = p;
        }
        let ack = format!(
            "collector set to {}:{}",
            self.config.collector_host, self.config.collector_port
        );
        self.persist(&ack);
    }

    fn cmd_set_mock(&mut self, temperature_c: f32, humidity_pct: f32, hour: f32) {
        self.mock.temperature_c = temperature_c;
        self.mock.humidity_pct = humidity_pct;
        self.mock.hour = hour;
        let msg =
            format!("mock values: temp={temperature_c:.1} hum={humidity_pct:.1} hour={hour:.1}\n");
        self.platform.console_write(msg.as_bytes());
    }

    fn cmd_set_gain(&mut self, gain: f32) {
        self.extractor.set_gain(gain);
        let msg = format!("gain set to {gain:.2}\n");
        self.platform.console_write(msg.as_bytes());
    }

    /// Persist the config record. A write fault is logged, not surfaced:
    /// the in-memory config stays authoritative either way.
    fn persist(&mut self, ack: &str) {
        if let Err(e) = self.store.save(&self.config) {
            warn!("config save failed: {e}");
        }
        let msg = format!("{ack}\n");
        self.platform.console_write(msg.as_bytes());
    }
}

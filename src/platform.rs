//! Platform seam: everything the node wants from the board.
//!
//! Thin I/O only; the pipeline and control logic stay in core modules.
//! Hardware ports implement [`Platform`] over their ADC/DMA capture path,
//! climate sensor, and console UART. Hosted builds get [`SimPlatform`]
//! (deterministic, in-memory) and the binary's stdin/stdout wrapper.

use std::collections::VecDeque;

use crate::config::{DEFAULT_HOUR, SAMPLE_RATE_HZ};

/// One climate sample in physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

/// Board services consumed by the control loop.
pub trait Platform {
    /// Fill `buf` with raw ADC samples at [`SAMPLE_RATE_HZ`]. Blocks until
    /// the capture completes; the caller never reads a partial buffer.
    fn capture(&mut self, buf: &mut [u16]);

    /// One climate sample, or `None` when the sensor is unreachable.
    fn read_climate(&mut self) -> Option<ClimateReading>;

    /// Supply voltage in millivolts.
    fn battery_mv(&mut self) -> u32;

    /// Hour of day in [0, 24). The reference hardware has no RTC, so the
    /// default is a fixed afternoon hour; ports with a clock override this.
    fn hour_of_day(&self) -> f32 {
        DEFAULT_HOUR
    }

    /// Monotonic milliseconds since boot.
    fn now_ms(&self) -> u64;

    /// True when the uplink transport is usable (e.g. WiFi associated).
    fn link_ready(&self) -> bool {
        true
    }

    /// Non-blocking console read into `buf`; returns bytes copied.
    fn console_read(&mut self, buf: &mut [u8]) -> usize;

    /// Console byte sink. Blocking is acceptable here.
    fn console_write(&mut self, bytes: &[u8]);
}

/// SHT3x raw temperature word to degrees Celsius.
#[inline]
pub fn sht3x_temperature_c(raw: u16) -> f32 {
    -45.0 + 175.0 * f32::from(raw) / 65535.0
}

/// SHT3x raw humidity word to percent, clamped to [0, 100].
#[inline]
pub fn sht3x_humidity_pct(raw: u16) -> f32 {
    (100.0 * f32::from(raw) / 65535.0).clamp(0.0, 100.0)
}

/// Deterministic in-memory platform for tests and bench rigs.
///
/// Capture synthesizes a mid-rail sine at `tone_hz`; the console is a pair
/// of byte queues; the clock only moves via [`SimPlatform::advance_ms`].
/// The link starts down so network traffic is opt-in per test.
pub struct SimPlatform {
    pub tone_hz: f32,
    pub tone_amplitude: f32,
    pub climate: Option<ClimateReading>,
    pub battery_mv: u32,
    pub link: bool,
    clock_ms: u64,
    input: VecDeque<u8>,
    pub output: Vec<u8>,
}

impl SimPlatform {
    pub fn new() -> Self {
        Self {
            tone_hz: 187.5,
            tone_amplitude: 300.0,
            climate: None,
            battery_mv: 4200,
            link: false,
            clock_ms: 0,
            input: VecDeque::new(),
            output: Vec::new(),
        }
    }

    /// Queue a console line (newline appended).
    pub fn push_line(&mut self, line: &str) {
        self.input.extend(line.as_bytes());
        self.input.push_back(b'\n');
    }

    /// Queue raw console bytes.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.input.extend(bytes);
    }

    /// Advance the monotonic clock.
    pub fn advance_ms(&mut self, ms: u64) {
        self.clock_ms += ms;
    }

    /// Console output so far, lossily decoded.
    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Default for SimPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for SimPlatform {
    fn capture(&mut self, buf: &mut [u16]) {
        let rate = f64::from(SAMPLE_RATE_HZ);
        let freq = f64::from(self.tone_hz);
        let amp = f64::from(self.tone_amplitude);
        for (i, s) in buf.iter_mut().enumerate() {
            let tone = amp * (2.0 * std::f64::consts::PI * freq * i as f64 / rate).sin();
            *s = (2048.0 + tone).clamp(0.0, 4095.0) as u16;
        }
        // A real capture takes buf.len()/rate seconds; reflect that on the
        // sim clock so interval logic sees time pass.
        self.clock_ms += (buf.len() as u64 * 1000) / u64::from(SAMPLE_RATE_HZ);
    }

    fn read_climate(&mut self) -> Option<ClimateReading> {
        self.climate
    }

    fn battery_mv(&mut self) -> u32 {
        self.battery_mv
    }

    fn now_ms(&self) -> u64 {
        self.clock_ms
    }

    fn link_ready(&self) -> bool {
        self.link
    }

    fn console_read(&mut self, buf: &mut [u8]) -> usize {
        let mut n = 0;
        while n < buf.len() {
            match self.input.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }

    fn console_write(&mut self, bytes: &[u8]) {
        self.output.extend_from_slice(bytes);
    }
}

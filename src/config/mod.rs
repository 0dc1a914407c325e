//! Module: config
//!
//! Purpose: Fixed tuning constants for the acquisition pipeline and the
//! collector uplink, plus the persisted device record.
//!
//! Architecture:
//! - Pipeline geometry (rates, window length, bin count) is frozen: the
//!   offline reference model was trained against these exact values and the
//!   precomputed tables in `dsp` are sized by them.
//! - Runtime-tunable state is limited to the gain scalar and mock values;
//!   everything else changes only with a firmware build.
//! - The persisted record (credentials, collector address, node identity)
//!   lives in `store`.

pub mod store;

pub use store::{ConfigStore, FileStorage, MemStorage, NvStorage, StorageError, SystemConfig};

/// ADC sampling rate.
pub const SAMPLE_RATE_HZ: u32 = 16_000;

/// Seconds of audio per full capture cycle.
pub const CAPTURE_SECONDS: u32 = 6;

/// Raw sample buffer capacity (one full capture).
pub const AUDIO_BUFFER_LEN: usize = (SAMPLE_RATE_HZ * CAPTURE_SECONDS) as usize;

/// Analysis window length in samples.
pub const WINDOW_LEN: usize = 512;

/// Hop between consecutive windows (equal to the length: non-overlapping).
pub const WINDOW_HOP: usize = 512;

/// Number of frequency bins evaluated by direct correlation.
pub const NUM_BINS: usize = 20;

/// Width of one bin in Hz (31.25 at 16 kHz / 512).
pub const BIN_HZ: f32 = SAMPLE_RATE_HZ as f32 / WINDOW_LEN as f32;

/// Rolling history capacity for density and temperature observations.
pub const HISTORY_LEN: usize = 12;

/// ADC full-scale divisor used for sample normalization (12-bit, mid-rail).
pub const FULL_SCALE: f32 = 2048.0;

/// Default input gain compensation. Tuned against the reference microphone
/// front-end; settable at runtime within (0, MAX_GAIN].
pub const DEFAULT_GAIN: f32 = 0.35;

/// Upper bound accepted by the set-gain command.
pub const MAX_GAIN: f32 = 2.0;

/// Denominator guard for ratio features.
pub const EPSILON: f32 = 1e-6;

/// Interval between remote pending-command polls.
pub const POLL_INTERVAL_MS: u64 = 2_000;

/// Receive deadline for one collector request.
pub const HTTP_TIMEOUT_MS: u64 = 3_000;

/// Fixed receive buffer for one collector response.
pub const HTTP_BUF_LEN: usize = 4_096;

/// Interval between unsolicited background telemetry pushes.
pub const BACKGROUND_SAMPLE_INTERVAL_MS: u64 = 60_000;

/// Event-class score at or above which an inference is reported as "event".
pub const CONFIDENCE_THRESHOLD: f32 = 0.60;

/// Climate fallbacks when the sensor is unreachable and mock mode is off.
pub const DEFAULT_TEMPERATURE_C: f32 = 25.0;
pub const DEFAULT_HUMIDITY_PCT: f32 = 50.0;

/// Hour-of-day placeholder on hardware without an RTC.
pub const DEFAULT_HOUR: f32 = 14.0;

/// Console line buffer capacity (bytes, excluding the newline).
pub const CONSOLE_LINE_LEN: usize = 64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_covers_full_capture() {
        assert_eq!(AUDIO_BUFFER_LEN, 96_000);
        // Not an exact multiple of the hop: the extractor drops the tail.
        assert_eq!((AUDIO_BUFFER_LEN - WINDOW_LEN) / WINDOW_HOP + 1, 187);
    }

    #[test]
    fn test_bin_width() {
        assert!((BIN_HZ - 31.25).abs() < f32::EPSILON);
    }
}

//! Module: features
//!
//! Purpose: Rolling observation histories and the two fixed-shape model
//! input vectors.
//!
//! Architecture:
//! - `RollingHistory` is a bounded FIFO over f32 observations; when full,
//!   pushing evicts the oldest entry. Capacity is a const generic so the
//!   ring lives inline with no allocation.
//! - `FeatureAssembler` owns the density and temperature histories and
//!   builds the summer (20-element) and winter (5-element) vectors. The
//!   build calls append the current observation *first*, then derive the
//!   statistic, so a cold start yields a spike ratio of ~1.0 instead of a
//!   divide-by-zero.
//!
//! Vector layouts are frozen; the classifier was trained against them.
//!
//! Summer: [temp, humidity, hour, spike_ratio, bins[4]..bins[19]]
//! Winter: [temp, humidity, temp_variance, heater_power, heater_ratio]

use crate::config::{EPSILON, HISTORY_LEN, NUM_BINS};
use crate::dsp::SpectrumSummary;

/// Summer model input length.
pub const SUMMER_VECTOR_LEN: usize = 20;

/// Winter model input length.
pub const WINTER_VECTOR_LEN: usize = 5;

/// First bin carried into the summer vector (bins 0..4 are dominated by
/// residual hum and carry no colony signal).
pub const SUMMER_BIN_START: usize = 4;

/// Bins summed into the winter "heater power" feature (cluster thermo-
/// regulation shows up around 190-280 Hz).
pub const HEATER_BINS: [usize; 3] = [6, 7, 8];

/// Bounded FIFO of recent scalar observations.
#[derive(Debug, Clone)]
pub struct RollingHistory<const N: usize> {
    buf: [f32; N],
    head: usize,
    len: usize,
}

impl<const N: usize> RollingHistory<N> {
    pub const fn new() -> Self {
        Self {
            buf: [0.0; N],
            head: 0,
            len: 0,
        }
    }

    /// Append one observation, evicting the oldest when full.
    pub fn push(&mut self, value: f32) {
        self.buf[self.head] = value;
        self.head = (self.head + 1) % N;
        if self.len < N {
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Oldest-to-newest iteration over held entries.
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        (0..self.len).map(move |i| {
            let idx = (self.head + N - self.len + i) % N;
            self.buf[idx]
        })
    }

    /// Arithmetic mean of held entries, `None` when empty.
    pub fn mean(&self) -> Option<f32> {
        if self.len == 0 {
            return None;
        }
        let sum: f32 = self.iter().sum();
        Some(sum / self.len as f32)
    }

    /// Population variance; 0.0 with fewer than two entries.
    pub fn variance(&self) -> f32 {
        if self.len < 2 {
            return 0.0;
        }
        let mean = self.iter().sum::<f32>() / self.len as f32;
        let var: f32 = self.iter().map(|v| (v - mean) * (v - mean)).sum();
        var / self.len as f32
    }
}

impl<const N: usize> Default for RollingHistory<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds model input vectors and owns the rolling state behind them.
pub struct FeatureAssembler {
    density_history: RollingHistory<HISTORY_LEN>,
    temp_history: RollingHistory<HISTORY_LEN>,
}

impl FeatureAssembler {
    pub const fn new() -> Self {
        Self {
            density_history: RollingHistory::new(),
            temp_history: RollingHistory::new(),
        }
    }

    /// Append one density observation.
    pub fn record_density(&mut self, density: f32) {
        self.density_history.push(density);
    }

    /// Append one temperature observation.
    pub fn record_temperature(&mut self, temp_c: f32) {
        self.temp_history.push(temp_c);
    }

    /// Mean of the density history, or `probe` itself when no observations
    /// exist yet (keeps the cold-start ratio at 1.0).
    pub fn rolling_density(&self, probe: f32) -> f32 {
        self.density_history.mean().unwrap_or(probe)
    }

    /// Current density over the rolling baseline.
    pub fn spike_ratio(&self, current: f32) -> f32 {
        current / (self.rolling_density(current) + EPSILON)
    }

    /// Drop all held observations (explicit reset command).
    pub fn clear(&mut self) {
        self.density_history.clear();
        self.temp_history.clear();
    }

    pub fn density_count(&self) -> usize {
        self.density_history.len()
    }

    pub fn temperature_count(&self) -> usize {
        self.temp_history.len()
    }

    /// Assemble the summer vector. Records the density observation as a
    /// side effect; call exactly once per sensing cycle.
    pub fn build_summer(
        &mut self,
        temp_c: f32,
        humidity_pct: f32,
        hour: f32,
        summary: &SpectrumSummary,
    ) -> [f32; SUMMER_VECTOR_LEN] {
        self.record_density(summary.density);
        let spike = self.spike_ratio(summary.density);

        let mut v = [0.0_f32; SUMMER_VECTOR_LEN];
        v[0] = temp_c;
        v[1] = humidity_pct;
        v[2] = hour;
        v[3] = spike;
        v[4..].copy_from_slice(&summary.bins[SUMMER_BIN_START..NUM_BINS]);
        v
    }

    /// Assemble the winter vector. Records the temperature observation as a
    /// side effect; call exactly once per sensing cycle.
    pub fn build_winter(
        &mut self,
        temp_c: f32,
        humidity_pct: f32,
        summary: &SpectrumSummary,
    ) -> [f32; WINTER_VECTOR_LEN] {
        self.record_temperature(temp_c);
        let stability = self.temp_history.variance();
        let heater_power: f32 = HEATER_BINS.iter().map(|&k| summary.bins[k]).sum();
        let heater_ratio = heater_power / (summary.density + EPSILON);

        [temp_c, humidity_pct, stability, heater_power, heater_ratio]
    }
}

impl Default for FeatureAssembler {
    fn default() -> Self {
        Self::new()
    }
}

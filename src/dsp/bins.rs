//! Windowed bin-magnitude extraction by direct correlation.
//!
//! The capture buffer is cut into non-overlapping 512-sample windows. Each
//! window is normalized, filtered, Hann-weighted, then correlated against
//! precomputed sine/cosine tables for the 20 bins of interest (bin k sits at
//! k × 31.25 Hz). Magnitudes are averaged across windows. An RMS "density"
//! scalar is taken over the filtered samples before the Hann weighting, so
//! it reflects broadband energy, not just the evaluated bins.
//!
//! Windows shorter than 512 samples at the tail of the buffer are dropped.

use crate::config::{DEFAULT_GAIN, FULL_SCALE, NUM_BINS, WINDOW_HOP, WINDOW_LEN};
use crate::dsp::FilterChain;

/// Per-bin correlation tables plus the analysis window.
///
/// Built once at startup, immutable after. Tables are computed in f64 and
/// stored in f32, matching the offline reference.
pub struct BinTable {
    cos: Vec<[f32; WINDOW_LEN]>,
    sin: Vec<[f32; WINDOW_LEN]>,
    hann: [f32; WINDOW_LEN],
}

impl BinTable {
    pub fn new() -> Self {
        let mut cos = Vec::with_capacity(NUM_BINS);
        let mut sin = Vec::with_capacity(NUM_BINS);
        for k in 0..NUM_BINS {
            let mut c = [0.0_f32; WINDOW_LEN];
            let mut s = [0.0_f32; WINDOW_LEN];
            for n in 0..WINDOW_LEN {
                let angle =
                    -2.0 * std::f64::consts::PI * (k as f64) * (n as f64) / (WINDOW_LEN as f64);
                c[n] = angle.cos() as f32;
                s[n] = angle.sin() as f32;
            }
            cos.push(c);
            sin.push(s);
        }

        // Symmetric raised cosine, zero at both endpoints (length-1 denominator).
        let mut hann = [0.0_f32; WINDOW_LEN];
        for (i, h) in hann.iter_mut().enumerate() {
            let phase = 2.0 * std::f64::consts::PI * (i as f64) / ((WINDOW_LEN - 1) as f64);
            *h = (0.5 * (1.0 - phase.cos())) as f32;
        }

        Self { cos, sin, hann }
    }

    /// Correlation magnitude of one Hann-weighted window at bin `k`.
    /// Accumulates in f64.
    #[inline]
    fn magnitude(&self, k: usize, windowed: &[f32; WINDOW_LEN]) -> f64 {
        let mut re = 0.0_f64;
        let mut im = 0.0_f64;
        let cos = &self.cos[k];
        let sin = &self.sin[k];
        for n in 0..WINDOW_LEN {
            let v = f64::from(windowed[n]);
            re += v * f64::from(cos[n]);
            im += v * f64::from(sin[n]);
        }
        (re * re + im * im).sqrt()
    }
}

impl Default for BinTable {
    fn default() -> Self {
        Self::new()
    }
}

/// One extraction pass over a capture buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumSummary {
    /// RMS of the filtered signal across every processed sample.
    pub density: f32,
    /// Window-averaged correlation magnitude per bin.
    pub bins: [f32; NUM_BINS],
    /// Number of full windows processed.
    pub windows: usize,
}

impl SpectrumSummary {
    const fn zeroed() -> Self {
        Self {
            density: 0.0,
            bins: [0.0; NUM_BINS],
            windows: 0,
        }
    }
}

/// Capture buffer → (density, bin magnitudes).
///
/// Owns the filter chain so the reset-once-per-pass rule is enforced here
/// rather than trusted to callers.
pub struct BinEnergyExtractor {
    table: BinTable,
    chain: FilterChain,
    gain: f32,
}

impl BinEnergyExtractor {
    pub fn new() -> Self {
        Self {
            table: BinTable::new(),
            chain: FilterChain::new(),
            gain: DEFAULT_GAIN,
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Set the gain compensation scalar. Range checking belongs to the
    /// command layer; the pipeline applies whatever it is given.
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    /// Run one full extraction pass.
    ///
    /// # Arguments
    ///
    /// * `samples` - raw ADC capture; only `windows × WINDOW_LEN` leading
    ///   samples are used (floor division, tail dropped).
    ///
    /// # Returns
    ///
    /// Zeroed summary when the buffer is shorter than one window.
    pub fn process(&mut self, samples: &[u16]) -> SpectrumSummary {
        if samples.len() < WINDOW_LEN {
            return SpectrumSummary::zeroed();
        }

        // DC offset over the whole raw buffer (exact integer sum in f64).
        let mut dc_sum = 0.0_f64;
        for &s in samples {
            dc_sum += f64::from(s);
        }
        let dc = (dc_sum / samples.len() as f64) as f32;

        self.chain.reset();

        let num_windows = (samples.len() - WINDOW_LEN) / WINDOW_HOP + 1;
        let mut rms_sum = 0.0_f64;
        let mut rms_count = 0_u32;
        let mut bin_accum = [0.0_f64; NUM_BINS];
        let mut windowed = [0.0_f32; WINDOW_LEN];

        for w in 0..num_windows {
            let start = w * WINDOW_HOP;
            for i in 0..WINDOW_LEN {
                let normalized = (samples[start + i] as f32 - dc) / FULL_SCALE * self.gain;
                let filtered = self.chain.process(normalized);
                rms_sum += f64::from(filtered * filtered);
                rms_count += 1;
                windowed[i] = filtered * self.table.hann[i];
            }
            for (k, accum) in bin_accum.iter_mut().enumerate() {
                *accum += self.table.magnitude(k, &windowed);
            }
        }

        let density = (rms_sum / f64::from(rms_count)).sqrt() as f32;
        let mut bins = [0.0_f32; NUM_BINS];
        for (k, b) in bins.iter_mut().enumerate() {
            *b = (bin_accum[k] / num_windows as f64) as f32;
        }

        SpectrumSummary {
            density,
            bins,
            windows: num_windows,
        }
    }
}

impl Default for BinEnergyExtractor {
    fn default() -> Self {
        Self::new()
    }
}

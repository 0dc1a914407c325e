//! Acquisition filter chain: high-pass, then two low-pass stages.
//!
//! Coefficients were generated offline (Butterworth designs at fs = 16 kHz:
//! 2nd-order 100 Hz high-pass, 1st + 2nd order low-pass near 6 kHz) and are
//! frozen here. The high-pass strips hum and DC residue; the low-pass pair
//! rolls off above the band the bins evaluate.
//!
//! All three sections run direct form II transposed. The delay registers are
//! the only state; they carry across window boundaries within one extraction
//! pass and are zeroed exactly once at the start of each pass.

// 2nd-order high-pass, 100 Hz cutoff.
const HP_B0: f32 = 0.972_613_9;
const HP_B1: f32 = -1.945_227_8;
const HP_B2: f32 = 0.972_613_9;
const HP_A1: f32 = -1.944_477_7;
const HP_A2: f32 = 0.945_977_9;

// 1st-order low-pass stage.
const LP1_B0: f32 = 0.445_902_9;
const LP1_B1: f32 = 0.445_902_9;
const LP1_A1: f32 = 0.414_213_6;

// 2nd-order low-pass stage.
const LP2_B0: f32 = 0.3913;
const LP2_B1: f32 = 0.7827;
const LP2_B2: f32 = 0.3913;
const LP2_A1: f32 = -0.3695;
const LP2_A2: f32 = -0.1958;

/// Stateful three-section IIR cascade.
///
/// # Example
///
/// ```
/// use hive_node::dsp::FilterChain;
///
/// let mut chain = FilterChain::new();
/// chain.reset();
/// let y = chain.process(0.25);
/// assert!(y.is_finite());
/// ```
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    hp_w1: f32,
    hp_w2: f32,
    lp1_w1: f32,
    lp2_w1: f32,
    lp2_w2: f32,
}

impl FilterChain {
    pub const fn new() -> Self {
        Self {
            hp_w1: 0.0,
            hp_w2: 0.0,
            lp1_w1: 0.0,
            lp2_w1: 0.0,
            lp2_w2: 0.0,
        }
    }

    /// Zero all delay registers. Call once per extraction pass, before the
    /// first sample; never between windows of the same pass.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Run one sample through all three sections in order.
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        // High-pass
        let y = HP_B0 * x + self.hp_w1;
        self.hp_w1 = HP_B1 * x - HP_A1 * y + self.hp_w2;
        self.hp_w2 = HP_B2 * x - HP_A2 * y;

        // Low-pass stage 1 (first order)
        let x = y;
        let y = LP1_B0 * x + self.lp1_w1;
        self.lp1_w1 = LP1_B1 * x - LP1_A1 * y;

        // Low-pass stage 2
        let x = y;
        let y = LP2_B0 * x + self.lp2_w1;
        self.lp2_w1 = LP2_B1 * x - LP2_A1 * y + self.lp2_w2;
        self.lp2_w2 = LP2_B2 * x - LP2_A2 * y;

        y
    }
}

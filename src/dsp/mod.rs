//! Module: dsp
//!
//! Purpose: The fixed numeric pipeline from raw ADC samples to the
//! density/bin-magnitude summary the feature vectors are built from.
//!
//! Architecture:
//! - `filter`: three cascaded IIR sections with frozen coefficients,
//!   applied sample-by-sample with explicit delay-state reset.
//! - `bins`: windowing and direct correlation against precomputed per-bin
//!   sine/cosine tables. Only `NUM_BINS` components are ever evaluated, so
//!   the cost is O(bins × window × windows), not a full transform.
//!
//! Numeric discipline: accumulation in f64, storage in f32, matching the
//! offline reference the classifier was trained against. Changing any
//! precision here shifts bin magnitudes enough to invalidate the model.

pub mod bins;
pub mod filter;

pub use bins::{BinEnergyExtractor, BinTable, SpectrumSummary};
pub use filter::FilterChain;

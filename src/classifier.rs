//! Classifier seam.
//!
//! The trained model is an external artifact. The node guarantees vector
//! shape and feeds whatever implementation it was constructed with; the
//! built-in heuristic keeps the pipeline exercisable on hosts that do not
//! carry the model.

use crate::command::ModelVariant;
use crate::config::CONFIDENCE_THRESHOLD;

/// Scores one feature vector.
pub trait Classifier {
    /// Event-class score in [0, 1], or `None` when no result could be
    /// produced this cycle (the report is skipped, never errored).
    fn classify(&mut self, variant: ModelVariant, features: &[f32]) -> Option<f32>;
}

/// Label for a score under the fixed reporting threshold.
pub fn label_for(score: f32) -> &'static str {
    if score >= CONFIDENCE_THRESHOLD {
        "event"
    } else {
        "normal"
    }
}

/// Heuristic stand-in for the trained model.
///
/// Summer: maps the spike ratio's excess over 1.0 onto [0, 1].
/// Winter: maps temperature variance onto [0, 1] (an unstable cluster
/// temperature is the event signal in the cold season).
pub struct SpikeThresholdClassifier {
    /// Spike ratio excess that saturates the summer score.
    pub spike_span: f32,
    /// Temperature variance that saturates the winter score.
    pub variance_span: f32,
}

impl SpikeThresholdClassifier {
    pub const fn new() -> Self {
        Self {
            spike_span: 2.0,
            variance_span: 4.0,
        }
    }
}

impl Default for SpikeThresholdClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for SpikeThresholdClassifier {
    fn classify(&mut self, variant: ModelVariant, features: &[f32]) -> Option<f32> {
        let raw = match variant {
            ModelVariant::Summer => (*features.get(3)? - 1.0) / self.spike_span,
            ModelVariant::Winter => *features.get(2)? / self.variance_span,
        };
        Some(raw.clamp(0.0, 1.0))
    }
}

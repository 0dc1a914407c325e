//! # hive-node
//!
//! Beehive acoustic monitoring edge node: acquisition, feature extraction,
//! and collector uplink.
//!
//! ## Architecture
//!
//! One [`node::Node`] owns all long-lived state and runs a cooperative
//! control loop on a single thread:
//! - `dsp` turns a raw capture into a density scalar and bin magnitudes
//! - `features` keeps the rolling histories and builds the model vectors
//! - `command` is the closed command set fed from console and remote poll
//! - `net` is one-shot HTTP to the collector, with the documented
//!   partial-data-on-timeout behavior
//! - `config` holds the pipeline constants and the persisted device record
//! - `platform` is the seam real hardware implements
//!
//! No locking anywhere: correctness is by the loop's sequencing.

pub mod classifier;
pub mod command;
pub mod config;
pub mod dsp;
pub mod features;
pub mod logging;
pub mod net;
pub mod node;
pub mod platform;

pub use classifier::{Classifier, SpikeThresholdClassifier};
pub use command::{Command, CommandQueue, ModelVariant, Origin};
pub use config::{ConfigStore, SystemConfig};
pub use dsp::{BinEnergyExtractor, FilterChain, SpectrumSummary};
pub use features::{FeatureAssembler, RollingHistory};
pub use node::Node;
pub use platform::{ClimateReading, Platform, SimPlatform};

/// Firmware version string stamped by the build script.
pub fn version() -> &'static str {
    env!("VERSION_STRING")
}

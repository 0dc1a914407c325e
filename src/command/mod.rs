//! Module: command
//!
//! Purpose: The closed set of things this node can be told to do, and the
//! FIFO queue the control loop consumes them from.
//!
//! Architecture:
//! - `Command` is a tagged enum; dispatch is a `match`, exhaustive at
//!   compile time. There is no string-keyed dispatch anywhere.
//! - Commands arrive from two sources: the local console (`parser`) and the
//!   remote pending-commands poll (`remote`). Both produce the same enum.
//! - The queue is bounded; a full queue drops the new command with a
//!   warning rather than growing without limit on a flooded link.

pub mod line;
pub mod parser;
pub mod remote;

use std::collections::VecDeque;

use log::warn;

pub use line::LineBuffer;
pub use parser::{parse_line, LineAction, ParseError};
pub use remote::parse_pending;

/// Which model a run-inference command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelVariant {
    Summer,
    Winter,
}

impl ModelVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelVariant::Summer => "summer",
            ModelVariant::Winter => "winter",
        }
    }
}

/// One unit of requested work.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Read the climate sensor and report.
    ReadClimate,
    /// Full sensing cycle: climate + capture + extract + classify + report.
    RunInference(ModelVariant),
    /// Capture one buffer and report raw statistics; no stream.
    Capture,
    /// Capture and emit the raw sample stream over the console.
    StreamAudio { seconds: u32 },
    /// Toggle mock sensor mode.
    ToggleMock,
    /// Clear the rolling histories.
    ClearHistory,
    /// Capture and print the full feature breakdown.
    DebugDump,
    /// Liveness check; answers with version, mock state, and gain.
    Ping,
    /// Persist WiFi credentials.
    SetWifi { ssid: String, password: String },
    /// Persist the collector address. `None` keeps the current port.
    SetCollector { host: String, port: Option<u16> },
    /// Set mock sensor values (does not toggle mock mode).
    SetMock {
        temperature_c: f32,
        humidity_pct: f32,
        hour: f32,
    },
    /// Set the gain compensation scalar.
    SetGain(f32),
}

impl Command {
    /// Stable name for logs and the uplink journal.
    pub fn name(&self) -> &'static str {
        match self {
            Command::ReadClimate => "read-climate",
            Command::RunInference(ModelVariant::Summer) => "infer-summer",
            Command::RunInference(ModelVariant::Winter) => "infer-winter",
            Command::Capture => "capture",
            Command::StreamAudio { .. } => "stream-audio",
            Command::ToggleMock => "toggle-mock",
            Command::ClearHistory => "clear-history",
            Command::DebugDump => "debug-dump",
            Command::Ping => "ping",
            Command::SetWifi { .. } => "set-wifi",
            Command::SetCollector { .. } => "set-collector",
            Command::SetMock { .. } => "set-mock",
            Command::SetGain(_) => "set-gain",
        }
    }
}

/// Where a command came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Console,
    Remote,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Console => "console",
            Origin::Remote => "remote",
        }
    }
}

/// A command waiting for dispatch.
#[derive(Debug, Clone)]
pub struct QueuedCommand {
    pub command: Command,
    pub origin: Origin,
}

/// Queue capacity. Sixteen outstanding commands is already a sign the
/// operator is typing faster than the loop can dispatch.
pub const COMMAND_QUEUE_CAP: usize = 16;

/// Bounded FIFO consumed one entry per control-loop tick.
pub struct CommandQueue {
    entries: VecDeque<QueuedCommand>,
    dropped: u32,
}

impl CommandQueue {
    pub const fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            dropped: 0,
        }
    }

    /// Append a command. Returns `false` (and counts a drop) when full.
    pub fn push(&mut self, command: Command, origin: Origin) -> bool {
        if self.entries.len() >= COMMAND_QUEUE_CAP {
            self.dropped += 1;
            warn!(
                "command queue full, dropping {} ({})",
                command.name(),
                origin.as_str()
            );
            return false;
        }
        self.entries.push_back(QueuedCommand { command, origin });
        true
    }

    /// Take the oldest pending command.
    pub fn pop(&mut self) -> Option<QueuedCommand> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Commands dropped due to a full queue since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

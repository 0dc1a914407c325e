//! Pending-command parsing for the remote channel.
//!
//! The collector answers the poll with a JSON array of
//! `{"command_type": "...", "params": {...}}` objects (extra row fields are
//! ignored). This is a structured parse: a log line that merely contains
//! the word PING can never be mistaken for a command. A malformed body
//! contributes zero commands and a warning, never an error.

use log::warn;
use serde::Deserialize;

use crate::command::{Command, ModelVariant};

#[derive(Debug, Deserialize)]
struct PendingEntry {
    command_type: String,
    #[serde(default)]
    params: serde_json::Value,
}

/// Parse a pending-commands response body.
pub fn parse_pending(body: &[u8]) -> Vec<Command> {
    let entries: Vec<PendingEntry> = match serde_json::from_slice(body) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("pending-commands body not parseable: {e}");
            return Vec::new();
        }
    };
    entries.iter().filter_map(to_command).collect()
}

fn to_command(entry: &PendingEntry) -> Option<Command> {
    match entry.command_type.as_str() {
        "PING" => Some(Command::Ping),
        "READ_CLIMATE" => Some(Command::ReadClimate),
        "TOGGLE_MOCK" => Some(Command::ToggleMock),
        "CLEAR_HISTORY" => Some(Command::ClearHistory),
        "DEBUG_DUMP" => Some(Command::DebugDump),
        "CAPTURE_AUDIO" => Some(Command::Capture),
        "RUN_INFERENCE" => {
            let variant = match entry.params.get("model").and_then(|m| m.as_str()) {
                Some("winter") => ModelVariant::Winter,
                _ => ModelVariant::Summer,
            };
            Some(Command::RunInference(variant))
        }
        other => {
            warn!("skipping unknown remote command '{other}'");
            None
        }
    }
}

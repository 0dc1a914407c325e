//! Console line parser.
//!
//! Single-letter verbs with optional suffix payloads, plus two multi-token
//! verbs for provisioning. Anything else is rejected with a usage message;
//! rejected lines never reach the queue.

use thiserror::Error;

use crate::command::{Command, ModelVariant};
use crate::config::{CAPTURE_SECONDS, MAX_GAIN};

/// Outcome of parsing one complete console line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineAction {
    /// Queue this command for dispatch.
    Dispatch(Command),
    /// Print the help text; nothing is queued.
    ShowHelp,
    /// Print the current gain and the set-gain usage; nothing is queued.
    ShowGain,
}

/// Console parse failures, printed back to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown command '{0}' (h for help)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

const USAGE_STREAM: &str = "a<seconds>  (1..=6, default 6)";
const USAGE_MOCK_VALUES: &str = "v<temp>,<humidity>,<hour>  e.g. v25.0,50.0,14.0";
const USAGE_GAIN: &str = "g<gain>  with 0 < gain <= 2.0";
const USAGE_WIFI: &str = "wifi <ssid> <password>";
const USAGE_SERVER: &str = "server <host> [port]";

/// Parse one line. `Ok(None)` for blank input.
pub fn parse_line(line: &str) -> Result<Option<LineAction>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let mut tokens = line.split_whitespace();
    let first = tokens.next().unwrap_or("");

    match first {
        "wifi" => {
            let ssid = tokens.next().ok_or(ParseError::Usage(USAGE_WIFI))?;
            let password = tokens.next().ok_or(ParseError::Usage(USAGE_WIFI))?;
            if tokens.next().is_some() {
                return Err(ParseError::Usage(USAGE_WIFI));
            }
            return Ok(Some(LineAction::Dispatch(Command::SetWifi {
                ssid: ssid.to_string(),
                password: password.to_string(),
            })));
        }
        "server" => {
            let host = tokens.next().ok_or(ParseError::Usage(USAGE_SERVER))?;
            let port = match tokens.next() {
                Some(p) => Some(p.parse::<u16>().map_err(|_| ParseError::Usage(USAGE_SERVER))?),
                None => None,
            };
            if tokens.next().is_some() {
                return Err(ParseError::Usage(USAGE_SERVER));
            }
            return Ok(Some(LineAction::Dispatch(Command::SetCollector {
                host: host.to_string(),
                port,
            })));
        }
        "h" | "?" => return Ok(Some(LineAction::ShowHelp)),
        _ => {}
    }

    // Single-letter verbs; the rest of the line is the payload.
    if !line.is_ascii() {
        return Err(ParseError::Unknown(line.to_string()));
    }
    let verb = line.as_bytes()[0];
    let rest = line[1..].trim();

    let command = match (verb, rest.is_empty()) {
        (b's', true) => Command::RunInference(ModelVariant::Summer),
        (b'w', true) => Command::RunInference(ModelVariant::Winter),
        (b't', true) => Command::ReadClimate,
        (b'r', true) => Command::Capture,
        (b'm', true) => Command::ToggleMock,
        (b'c', true) => Command::ClearHistory,
        (b'd', true) => Command::DebugDump,
        (b'p', true) => Command::Ping,
        (b'a', _) => Command::StreamAudio {
            seconds: parse_stream_seconds(rest)?,
        },
        (b'v', false) => parse_mock_values(rest)?,
        // Bare `g` reports the current gain instead of setting one.
        (b'g', true) => return Ok(Some(LineAction::ShowGain)),
        (b'g', false) => parse_gain(rest)?,
        _ => return Err(ParseError::Unknown(line.to_string())),
    };

    Ok(Some(LineAction::Dispatch(command)))
}

fn parse_stream_seconds(rest: &str) -> Result<u32, ParseError> {
    if rest.is_empty() {
        return Ok(CAPTURE_SECONDS);
    }
    let secs: u32 = rest.parse().map_err(|_| ParseError::Usage(USAGE_STREAM))?;
    if secs == 0 {
        return Ok(CAPTURE_SECONDS);
    }
    Ok(secs.min(CAPTURE_SECONDS))
}

fn parse_mock_values(rest: &str) -> Result<Command, ParseError> {
    let mut parts = rest.split(',');
    let temperature_c = parse_float(parts.next(), USAGE_MOCK_VALUES)?;
    let humidity_pct = parse_float(parts.next(), USAGE_MOCK_VALUES)?;
    let hour = parse_float(parts.next(), USAGE_MOCK_VALUES)?;
    if parts.next().is_some() {
        return Err(ParseError::Usage(USAGE_MOCK_VALUES));
    }
    Ok(Command::SetMock {
        temperature_c,
        humidity_pct,
        hour,
    })
}

fn parse_gain(rest: &str) -> Result<Command, ParseError> {
    let gain: f32 = rest.parse().map_err(|_| ParseError::Usage(USAGE_GAIN))?;
    if gain <= 0.0 || gain > MAX_GAIN {
        return Err(ParseError::Usage(USAGE_GAIN));
    }
    Ok(Command::SetGain(gain))
}

fn parse_float(part: Option<&str>, usage: &'static str) -> Result<f32, ParseError> {
    part.map(str::trim)
        .filter(|p| !p.is_empty())
        .and_then(|p| p.parse().ok())
        .ok_or(ParseError::Usage(usage))
}

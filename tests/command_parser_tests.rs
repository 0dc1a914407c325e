//! Console line and remote pending-command parser tests

use hive_node::command::{parse_line, parse_pending, Command, LineAction, ModelVariant};

fn parsed(line: &str) -> Command {
    match parse_line(line) {
        Ok(Some(LineAction::Dispatch(cmd))) => cmd,
        other => panic!("line '{line}' parsed to {other:?}"),
    }
}

#[test]
fn test_single_letter_verbs() {
    assert_eq!(parsed("s"), Command::RunInference(ModelVariant::Summer));
    assert_eq!(parsed("w"), Command::RunInference(ModelVariant::Winter));
    assert_eq!(parsed("t"), Command::ReadClimate);
    assert_eq!(parsed("r"), Command::Capture);
    assert_eq!(parsed("m"), Command::ToggleMock);
    assert_eq!(parsed("c"), Command::ClearHistory);
    assert_eq!(parsed("d"), Command::DebugDump);
    assert_eq!(parsed("p"), Command::Ping);
}

#[test]
fn test_stream_verb_seconds() {
    assert_eq!(parsed("a"), Command::StreamAudio { seconds: 6 });
    assert_eq!(parsed("a3"), Command::StreamAudio { seconds: 3 });
    // Clamped to the capture buffer; zero falls back to the default.
    assert_eq!(parsed("a99"), Command::StreamAudio { seconds: 6 });
    assert_eq!(parsed("a0"), Command::StreamAudio { seconds: 6 });
    assert!(parse_line("axyz").is_err());
}

#[test]
fn test_gain_verb_range() {
    assert_eq!(parsed("g0.35"), Command::SetGain(0.35));
    assert_eq!(parsed("g2.0"), Command::SetGain(2.0));
    assert!(parse_line("g0").is_err());
    assert!(parse_line("g-1").is_err());
    assert!(parse_line("g2.5").is_err());
    // Bare g queries instead of setting.
    assert_eq!(parse_line("g"), Ok(Some(LineAction::ShowGain)));
}

#[test]
fn test_mock_values_verb() {
    assert_eq!(
        parsed("v25.5,60.0,14"),
        Command::SetMock {
            temperature_c: 25.5,
            humidity_pct: 60.0,
            hour: 14.0,
        }
    );
    assert!(parse_line("v25.5,60.0").is_err());
    assert!(parse_line("v1,2,3,4").is_err());
    assert!(parse_line("va,b,c").is_err());
}

#[test]
fn test_wifi_and_server_verbs() {
    assert_eq!(
        parsed("wifi apiary-net secret42"),
        Command::SetWifi {
            ssid: "apiary-net".to_string(),
            password: "secret42".to_string(),
        }
    );
    assert!(parse_line("wifi apiary-net").is_err());

    assert_eq!(
        parsed("server 10.0.0.42 8080"),
        Command::SetCollector {
            host: "10.0.0.42".to_string(),
            port: Some(8080),
        }
    );
    assert_eq!(
        parsed("server collector.local"),
        Command::SetCollector {
            host: "collector.local".to_string(),
            port: None,
        }
    );
    assert!(parse_line("server host 99999").is_err());
}

#[test]
fn test_help_and_blank_lines() {
    assert_eq!(parse_line("h"), Ok(Some(LineAction::ShowHelp)));
    assert_eq!(parse_line("?"), Ok(Some(LineAction::ShowHelp)));
    assert_eq!(parse_line(""), Ok(None));
    assert_eq!(parse_line("   "), Ok(None));
}

#[test]
fn test_unknown_input_rejected() {
    assert!(parse_line("x").is_err());
    assert!(parse_line("status").is_err());
    assert!(parse_line("s extra").is_err());
}

#[test]
fn test_remote_parse_known_commands() {
    let body = br#"[
        {"command_type": "PING", "params": {}},
        {"command_type": "READ_CLIMATE"},
        {"command_type": "RUN_INFERENCE", "params": {"model": "winter"}},
        {"command_type": "RUN_INFERENCE", "params": {}},
        {"command_type": "CAPTURE_AUDIO", "params": {}}
    ]"#;
    let commands = parse_pending(body);
    assert_eq!(
        commands,
        vec![
            Command::Ping,
            Command::ReadClimate,
            Command::RunInference(ModelVariant::Winter),
            Command::RunInference(ModelVariant::Summer),
            Command::Capture,
        ]
    );
}

#[test]
fn test_remote_parse_skips_unknown_types() {
    let body = br#"[
        {"command_type": "SELF_DESTRUCT", "params": {}},
        {"command_type": "TOGGLE_MOCK"}
    ]"#;
    assert_eq!(parse_pending(body), vec![Command::ToggleMock]);
}

#[test]
fn test_remote_parse_malformed_body_yields_nothing() {
    assert!(parse_pending(b"").is_empty());
    assert!(parse_pending(b"not json").is_empty());
    assert!(parse_pending(br#"{"command_type": "PING"}"#).is_empty());
    // A log line mentioning PING is not a command.
    assert!(parse_pending(br#"["device sent PING at 12:00"]"#).is_empty());
    // Truncated body from a timed-out response parses to nothing.
    assert!(parse_pending(br#"[{"command_type": "PI"#).is_empty());
}

//! End-to-end tests for the rpc-props commands.

use std::io::Write;

use clap::Parser;
use cli::{CliConfig, CommandResult};
use tempfile::NamedTempFile;

fn run(argv: &[&str]) -> CommandResult {
    let config = CliConfig::try_parse_from(argv).unwrap();
    config.execute().unwrap()
}

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

// ============================================================================
// Property Commands
// ============================================================================

#[test]
fn test_show_with_prefix() {
    let file = config_file("App.Pool.Size=4\nApp.Name=demo\nOther=x\n");
    let path = file.path().to_str().unwrap();
    let result = run(&["rpc-props", "--config", path, "show", "--prefix", "App."]);
    assert_eq!(result.render(), "App.Name=demo\nApp.Pool.Size=4");
}

#[test]
fn test_props_override_file() {
    let file = config_file("App.Mode=fast\n");
    let path = file.path().to_str().unwrap();
    let result = run(&["rpc-props", "-c", path, "-D", "App.Mode=slow", "get", "App.Mode"]);
    assert_eq!(result, CommandResult::Value("slow".to_string()));
}

#[test]
fn test_set_reports_changes() {
    let result = run(&["rpc-props", "-D", "App.A=1", "set", "App.A=1", "App.B=2", "App.C="]);
    assert_eq!(result.render(), "App.B = 2");
}

#[test]
fn test_set_rejects_malformed_key() {
    let config = CliConfig::try_parse_from(["rpc-props", "set", "=oops"]).unwrap();
    assert!(config.execute().is_err());
}

#[test]
fn test_missing_config_file_fails() {
    let config =
        CliConfig::try_parse_from(["rpc-props", "-c", "/nonexistent/rpc.cfg", "show"]).unwrap();
    let err = config.execute().unwrap_err();
    assert!(format!("{:#}", err).contains("failed to initialize"));
}

#[test]
fn test_options_round_trip() {
    let result = run(&["rpc-props", "-D", "Rpc.Trace.Admin.Properties=1", "options"]);
    match result {
        CommandResult::Options(options) => {
            assert!(options.contains(&"--Rpc.Trace.Admin.Properties=1".to_string()));
            assert!(options.contains(&"--Rpc.ProgramName=rpc-props".to_string()));
        }
        other => panic!("unexpected {:?}", other),
    }
}

// ============================================================================
// Endpoint Command
// ============================================================================

#[test]
fn test_endpoint_chain() {
    let result = run(&["rpc-props", "endpoint", "wss -h example.com -p 443 -r /ws"]);
    let json = result.to_json();
    assert_eq!(json["endpoint"], "wss -h example.com -p 443 -t infinite -r /ws");
    assert_eq!(json["type"], 1);
    assert_eq!(json["secure"], false);
    assert_eq!(json["info"]["underlying"]["kind"], "ssl");

    let text = result.render();
    assert_eq!(text.lines().count(), 4);
    assert!(text.lines().nth(1).unwrap().trim_start().starts_with("ws"));
}

#[test]
fn test_endpoint_parse_error() {
    let config = CliConfig::try_parse_from(["rpc-props", "endpoint", "quic -h x"]).unwrap();
    assert!(config.execute().is_err());
}

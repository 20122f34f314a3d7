//! Subcommands and their results.

use clap::Subcommand;
use corelib::{Communicator, Endpoint, EndpointInfo, PropertyDict};
use serde_json::{json, Value};

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print properties, optionally restricted to a key prefix
    Show {
        #[arg(long, default_value = "")]
        prefix: String,
    },

    /// Print the value of one property (empty when unset)
    Get { key: String },

    /// Set properties through the admin facade and print what changed.
    /// An empty value removes the property.
    Set {
        #[arg(required = true, value_name = "KEY=VALUE", value_parser = parse_assignment)]
        assignments: Vec<(String, String)>,
    },

    /// Parse an endpoint string and print its metadata chain
    Endpoint { endpoint: String },

    /// Print every property as a `--Key=Value` option
    Options,
}

/// Output of a command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    Properties(PropertyDict),
    Value(String),
    /// Changed keys; removed keys map to an empty value.
    Changes(PropertyDict),
    Endpoint { canonical: String, info: EndpointInfo },
    Options(Vec<String>),
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, found `{}`", s))
}

impl Command {
    pub fn execute(&self, communicator: &Communicator) -> anyhow::Result<CommandResult> {
        let result = match self {
            Command::Show { prefix } => CommandResult::Properties(
                communicator.properties().get_properties_for_prefix(prefix),
            ),
            Command::Get { key } => {
                CommandResult::Value(communicator.properties().get_property(key))
            }
            Command::Set { assignments } => {
                let new_properties: PropertyDict = assignments.iter().cloned().collect();
                let changes = communicator.properties_admin().set_properties(&new_properties)?;
                tracing::info!(changed = changes.len(), "properties updated");
                CommandResult::Changes(changes)
            }
            Command::Endpoint { endpoint } => {
                let endpoint = Endpoint::parse(endpoint)?;
                let info = endpoint
                    .info()
                    .ok_or_else(|| anyhow::anyhow!("endpoint `{}` has no metadata", endpoint))?;
                CommandResult::Endpoint {
                    canonical: endpoint.to_string(),
                    info,
                }
            }
            Command::Options => {
                CommandResult::Options(communicator.properties().get_command_line_options())
            }
        };
        Ok(result)
    }
}

impl CommandResult {
    pub fn to_json(&self) -> Value {
        match self {
            CommandResult::Properties(properties) | CommandResult::Changes(properties) => {
                json!(properties)
            }
            CommandResult::Value(value) => json!(value),
            CommandResult::Endpoint { canonical, info } => json!({
                "endpoint": canonical,
                "type": info.endpoint_type(),
                "datagram": info.datagram(),
                "secure": info.secure(),
                "info": info,
            }),
            CommandResult::Options(options) => json!(options),
        }
    }

    /// Plain-text rendering, one item per line.
    pub fn render(&self) -> String {
        match self {
            CommandResult::Properties(properties) => properties
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect::<Vec<_>>()
                .join("\n"),
            CommandResult::Value(value) => value.clone(),
            CommandResult::Changes(changes) if changes.is_empty() => "no changes".to_string(),
            CommandResult::Changes(changes) => changes
                .iter()
                .map(|(key, value)| {
                    if value.is_empty() {
                        format!("{} removed", key)
                    } else {
                        format!("{} = {}", key, value)
                    }
                })
                .collect::<Vec<_>>()
                .join("\n"),
            CommandResult::Endpoint { canonical, info } => {
                let mut lines = vec![canonical.clone()];
                for (depth, layer) in info.layers().enumerate() {
                    lines.push(format!(
                        "{}{} (type {}, timeout {}, compress {})",
                        "  ".repeat(depth + 1),
                        layer_name(layer),
                        layer.endpoint_type(),
                        layer.timeout(),
                        layer.compress()
                    ));
                }
                lines.join("\n")
            }
            CommandResult::Options(options) => options.join("\n"),
        }
    }
}

fn layer_name(layer: &EndpointInfo) -> &'static str {
    use corelib::EndpointKind;

    match layer.kind() {
        EndpointKind::Tcp { .. } => "tcp",
        EndpointKind::Udp { .. } => "udp",
        EndpointKind::Ws { .. } => "ws",
        EndpointKind::Opaque { .. } => "opaque",
        EndpointKind::Ssl => "ssl",
        #[cfg(any(target_os = "ios", target_os = "tvos", target_os = "watchos"))]
        EndpointKind::Iap { .. } => "iap",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(parse_assignment("A=1").unwrap(), ("A".to_string(), "1".to_string()));
        assert_eq!(parse_assignment("A=").unwrap(), ("A".to_string(), String::new()));
        assert_eq!(parse_assignment("A=b=c").unwrap().1, "b=c");
        assert!(parse_assignment("A").is_err());
    }

    #[test]
    fn test_render_endpoint_layers() {
        let endpoint = Endpoint::parse("wss -h host -p 443 -t 1000").unwrap();
        let result = CommandResult::Endpoint {
            canonical: endpoint.to_string(),
            info: endpoint.info().unwrap(),
        };
        let rendered = result.render();
        let names: Vec<&str> = rendered
            .lines()
            .skip(1)
            .map(|line| line.trim_start().split(' ').next().unwrap_or_default())
            .collect();
        assert_eq!(names, vec!["ws", "ssl", "tcp"]);
    }

    #[test]
    fn test_render_changes() {
        let changes: PropertyDict = [
            ("A".to_string(), "1".to_string()),
            ("B".to_string(), String::new()),
        ]
        .into_iter()
        .collect();
        assert_eq!(CommandResult::Changes(changes).render(), "A = 1\nB removed");
        assert_eq!(CommandResult::Changes(PropertyDict::new()).render(), "no changes");
    }
}

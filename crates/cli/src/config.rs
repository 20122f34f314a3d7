//! Command-line configuration.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use corelib::{initialize, Communicator, InitializationData};

use crate::commands::{Command, CommandResult};

/// Inspect and administer runtime properties.
#[derive(Debug, Parser)]
#[command(name = "rpc-props", version, about = "Inspect and administer runtime properties")]
pub struct CliConfig {
    /// Configuration file loaded before any `--prop` value
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Property assignment, e.g. `-D Rpc.Trace.Admin.Properties=1`
    #[arg(long = "prop", short = 'D', value_name = "KEY=VALUE", global = true)]
    pub props: Vec<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    /// Bootstrap a communicator from the configuration file and `--prop`
    /// values. Runtime properties go through the runtime option parser,
    /// everything else is applied as an application property afterwards.
    pub fn communicator(&self) -> anyhow::Result<Communicator> {
        let mut args: Vec<String> = std::iter::once("rpc-props".to_string())
            .chain(self.props.iter().map(|prop| format!("--{}", prop)))
            .collect();

        let communicator = initialize(
            &mut args,
            InitializationData::default(),
            self.config.as_deref(),
        )
        .context("failed to initialize the runtime")?;

        let rest = communicator
            .properties()
            .parse_command_line_options("", args)
            .context("invalid property assignment")?;
        tracing::debug!(?rest, "unused arguments");
        Ok(communicator)
    }

    /// Run the selected command and return its result.
    pub fn execute(&self) -> anyhow::Result<CommandResult> {
        let communicator = self.communicator()?;
        let result = self.command.execute(&communicator);
        communicator.destroy();
        result
    }

    /// Run the selected command and print its result to stdout.
    pub fn run(self) -> anyhow::Result<()> {
        let result = self.execute()?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&result.to_json())?);
        } else {
            let text = result.render();
            if !text.is_empty() {
                println!("{}", text);
            }
        }
        Ok(())
    }
}

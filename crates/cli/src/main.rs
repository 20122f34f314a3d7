//! CLI entry point for rpc-props.

use clap::Parser;
use cli::CliConfig;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "corelib=info,cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = CliConfig::parse();
    config.run()
}

//! CLI tool for inspecting and administering runtime properties.
//!
//! Provides commands for:
//! - Listing properties by prefix
//! - Reading and setting properties through the admin facade
//! - Inspecting endpoint strings
//! - Rendering the configuration as command-line options

pub mod commands;
pub mod config;

pub use commands::{Command, CommandResult};
pub use config::CliConfig;

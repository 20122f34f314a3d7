//! Command-line property options.
//!
//! A property option has the form `--<Key>=<Value>`, or `--<Key>` which sets
//! the value `1`. An option is recognized when its key starts with the
//! requested prefix followed by a dot (`--Rpc.LogFile=app.log` for prefix
//! `Rpc`). Values are taken verbatim. Recognized options are removed from
//! the argument list; everything else is returned in its original order.
//! A bare `--` stops option processing and is passed through together with
//! every argument after it.
//!
//! For the runtime prefix, `--Rpc.Config=<file>[,<file>...]` loads the
//! listed files before the remaining recognized options are applied, so
//! options on the command line override file contents.

use std::path::Path;

use crate::error::Result;
use crate::properties::file::read_config;
use crate::properties::{keys, Properties, PropertyDict, RUNTIME_PREFIX};

/// Split `args` into recognized options for `prefix` and the rest.
fn extract_options(prefix: &str, args: Vec<String>) -> (Vec<(String, String)>, Vec<String>) {
    let prefix = match prefix.trim_end_matches('.') {
        "" => String::new(),
        p => format!("{}.", p),
    };

    let mut options = Vec::new();
    let mut remaining = Vec::with_capacity(args.len());
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if arg == "--" {
            remaining.push(arg);
            remaining.extend(args.by_ref());
            break;
        }
        let option = arg
            .strip_prefix("--")
            .filter(|rest| rest.starts_with(prefix.as_str()) && rest.len() > prefix.len());
        match option {
            Some(rest) => {
                let (key, value) = rest.split_once('=').unwrap_or((rest, "1"));
                options.push((key.to_string(), value.to_string()));
            }
            None => remaining.push(arg),
        }
    }
    (options, remaining)
}

/// Collect runtime (`--Rpc.*`) options from `args` into one batch.
///
/// Files named by `--Rpc.Config` are read first and the options are laid
/// over them. Nothing is applied; the caller writes the batch in a single
/// [`Properties::set_properties`] call so a failure leaves the store as it was.
pub fn runtime_options(args: Vec<String>) -> Result<(PropertyDict, Vec<String>)> {
    let (options, remaining) = extract_options(RUNTIME_PREFIX, args);
    let options: PropertyDict = options.into_iter().collect();

    let mut batch = PropertyDict::new();
    if let Some(files) = options.get(keys::CONFIG) {
        for file in files.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            batch.extend(read_config(Path::new(file))?);
        }
    }
    batch.extend(options);
    Ok((batch, remaining))
}

impl Properties {
    /// Consume `--<prefix>.*` options from `args` into the store and return
    /// the unrecognized arguments.
    pub fn parse_command_line_options(
        &self,
        prefix: &str,
        args: Vec<String>,
    ) -> Result<Vec<String>> {
        let (options, remaining) = extract_options(prefix, args);
        if !options.is_empty() {
            let dict: PropertyDict = options.into_iter().collect();
            self.set_properties(&dict)?;
        }
        Ok(remaining)
    }

    /// Consume runtime (`--Rpc.*`) options from `args`, loading any files
    /// named by `--Rpc.Config` first. Returns the unrecognized arguments.
    pub fn parse_runtime_command_line_options(&self, args: Vec<String>) -> Result<Vec<String>> {
        let (batch, remaining) = runtime_options(args)?;
        if !batch.is_empty() {
            self.set_properties(&batch)?;
        }
        Ok(remaining)
    }
}

//! Configuration file format.
//!
//! ```text
//! # Comment lines start with '#' (after optional leading whitespace).
//! Rpc.Admin.Enabled = 1
//! App.Greeting=hello # world
//! App.Removed=
//! ```
//!
//! - The file is UTF-8; a leading byte order mark is ignored.
//! - Each line is trimmed. Blank lines and comment lines are skipped.
//! - The line is split at the first `=`; key and value are trimmed
//!   separately. Later `=` characters and any `#` after the first column
//!   belong to the value.
//! - A line without `=` or with a malformed key is a parse error.
//! - An empty value removes the key.
//! - A file is applied as a single batch: a malformed file changes nothing.

use std::path::Path;

use crate::error::{Error, Result};
use crate::properties::{validate_key, Properties, PropertyDict};

/// Parse configuration text. `path` is only used for error reporting.
pub fn parse_config(text: &str, path: &Path) -> Result<PropertyDict> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut entries = PropertyDict::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parse_error = |reason: String| Error::Parse {
            path: path.to_path_buf(),
            line: index + 1,
            reason,
        };

        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| parse_error(format!("missing `=` in `{}`", line)))?;
        let key = key.trim();
        validate_key(key).map_err(|err| match err {
            Error::Configuration { reason } => parse_error(reason),
            other => other,
        })?;
        entries.insert(key.to_string(), value.trim().to_string());
    }
    Ok(entries)
}

/// Read and parse a configuration file.
pub fn read_config(path: &Path) -> Result<PropertyDict> {
    let bytes = std::fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = std::str::from_utf8(&bytes).map_err(|err| {
        let line = bytes[..err.valid_up_to()].iter().filter(|b| **b == b'\n').count() + 1;
        Error::Parse {
            path: path.to_path_buf(),
            line,
            reason: "invalid UTF-8".to_string(),
        }
    })?;
    parse_config(text, path)
}

impl Properties {
    /// Load a configuration file into the store.
    ///
    /// Fails with [`Error::Io`] when the file cannot be read and
    /// [`Error::Parse`] on a malformed line; nothing is applied on failure.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let entries = read_config(path)?;
        let update = self.set_properties(&entries)?;
        tracing::debug!(
            path = %path.display(),
            entries = entries.len(),
            changed = update.changes.len(),
            "loaded configuration file"
        );
        Ok(())
    }
}

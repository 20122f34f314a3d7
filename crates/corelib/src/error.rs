//! Error types for the core library.

use std::path::PathBuf;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core library.
///
/// A missing property is not an error: lookups return an empty string.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed property key, command-line option or property value.
    #[error("configuration error: {reason}")]
    Configuration {
        /// What was wrong with the configuration.
        reason: String,
    },

    /// Malformed line in a configuration file.
    #[error("{}:{line}: {reason}", path.display())]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },

    /// A configuration file could not be opened or read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Malformed endpoint string.
    #[error("invalid endpoint `{input}`: {reason}")]
    EndpointParse {
        /// The rejected endpoint string.
        input: String,
        /// What was wrong with it.
        reason: String,
    },

    /// An admin facet was asked for an operation it does not implement.
    #[error("facet `{facet}` has no operation `{operation}`")]
    UnknownOperation {
        /// Facet that received the request.
        facet: String,
        /// The requested operation.
        operation: String,
    },

    /// The runtime could not be constructed.
    #[error("initialization failed: {reason}")]
    Initialization {
        /// Description of the failure.
        reason: String,
    },
}

impl Error {
    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Error::Configuration {
            reason: reason.into(),
        }
    }

    pub(crate) fn endpoint_parse(input: &str, reason: impl Into<String>) -> Self {
        Error::EndpointParse {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    /// True for malformed configuration, whether it came from a key, an
    /// option or a file line.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration { .. } | Error::Parse { .. })
    }

    /// True when a file could not be read.
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io { .. })
    }
}

/// Failure reported by a runtime backend while it is being constructed.
///
/// Backends describe failures with a kind name instead of a crate error so
/// that they do not need to depend on this crate's error layout; the
/// registered error factory turns them into [`Error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeFailure {
    /// Failure kind, e.g. `"ConfigurationError"` or `"IOError"`.
    pub kind: String,
    /// Human-readable detail.
    pub message: String,
}

impl RuntimeFailure {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RuntimeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl From<RuntimeFailure> for Error {
    fn from(failure: RuntimeFailure) -> Self {
        match failure.kind.as_str() {
            "ConfigurationError" => Error::Configuration {
                reason: failure.message,
            },
            "IOError" => Error::Io {
                path: PathBuf::new(),
                source: std::io::Error::new(std::io::ErrorKind::Other, failure.message),
            },
            _ => Error::Initialization {
                reason: failure.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_failure_mapping() {
        let err: Error = RuntimeFailure::new("ConfigurationError", "bad key").into();
        assert!(err.is_configuration());

        let err: Error = RuntimeFailure::new("IOError", "gone").into();
        assert!(err.is_io());

        let err: Error = RuntimeFailure::new("PluginError", "boom").into();
        assert!(matches!(err, Error::Initialization { .. }));
        assert_eq!(err.to_string(), "initialization failed: PluginError: boom");
    }

    #[test]
    fn test_parse_error_display() {
        let err = Error::Parse {
            path: PathBuf::from("app.cfg"),
            line: 3,
            reason: "missing `=`".into(),
        };
        assert_eq!(err.to_string(), "app.cfg:3: missing `=`");
        assert!(err.is_configuration());
    }
}

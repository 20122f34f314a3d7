//! Runtime backend contract.
//!
//! A [`RuntimeFactory`] builds the runtime that owns the transport and
//! dispatch machinery. It receives the resolved properties and logger and
//! may substitute either; callers always re-read both from the returned
//! [`RuntimeBackend`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::RuntimeFailure;
use crate::logger::{FileLogger, Logger, TracingLogger};
use crate::properties::{keys, Properties};

/// Constructed runtime.
pub trait RuntimeBackend: Send + Sync {
    /// Properties in effect after construction.
    fn properties(&self) -> Arc<Properties>;

    /// Logger in effect after construction.
    fn logger(&self) -> Arc<dyn Logger>;

    /// Release runtime resources. Called once.
    fn destroy(&self) {}
}

/// Builds a [`RuntimeBackend`].
pub trait RuntimeFactory: Send + Sync {
    /// `logger` is `None` when the properties name a logger that the
    /// runtime must build itself.
    fn create(
        &self,
        properties: Arc<Properties>,
        logger: Option<Arc<dyn Logger>>,
    ) -> Result<Box<dyn RuntimeBackend>, RuntimeFailure>;
}

/// Hook run after the logger is resolved; returning a logger replaces it.
pub type LoggerPlugin =
    Arc<dyn Fn(&Properties, &Arc<dyn Logger>) -> Option<Arc<dyn Logger>> + Send + Sync>;

/// In-process runtime: builds property-implied loggers and runs logger
/// plugins.
#[derive(Clone, Default)]
pub struct LocalRuntimeFactory {
    plugins: Vec<LoggerPlugin>,
}

impl LocalRuntimeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_logger_plugin(mut self, plugin: LoggerPlugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    fn property_logger(properties: &Properties) -> Result<Arc<dyn Logger>, RuntimeFailure> {
        let prefix = properties.get_property(keys::PROGRAM_NAME);
        let log_file = properties.get_property(keys::LOG_FILE);
        if !log_file.is_empty() {
            let logger = FileLogger::open(&log_file, prefix).map_err(|err| {
                RuntimeFailure::new(
                    "InitializationError",
                    format!("cannot open log file `{}`: {}", log_file, err),
                )
            })?;
            return Ok(Arc::new(logger));
        }
        if properties.get_property_as_int(keys::USE_SYSLOG) > 0 {
            return Self::syslog_logger(properties, prefix);
        }
        Ok(Arc::new(TracingLogger::new(prefix)))
    }

    #[cfg(unix)]
    fn syslog_logger(
        properties: &Properties,
        prefix: String,
    ) -> Result<Arc<dyn Logger>, RuntimeFailure> {
        let facility = properties.get_property_with_default(keys::SYSLOG_FACILITY, "LOG_USER");
        crate::logger::SyslogLogger::connect(&facility, prefix)
            .map(|logger| Arc::new(logger) as Arc<dyn Logger>)
            .map_err(|err| {
                RuntimeFailure::new("InitializationError", format!("cannot use syslog: {}", err))
            })
    }

    #[cfg(not(unix))]
    fn syslog_logger(
        _properties: &Properties,
        _prefix: String,
    ) -> Result<Arc<dyn Logger>, RuntimeFailure> {
        Err(RuntimeFailure::new(
            "ConfigurationError",
            "Rpc.UseSyslog is not supported on this platform",
        ))
    }
}

impl fmt::Debug for LocalRuntimeFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalRuntimeFactory")
            .field("plugins", &self.plugins.len())
            .finish()
    }
}

impl RuntimeFactory for LocalRuntimeFactory {
    fn create(
        &self,
        properties: Arc<Properties>,
        logger: Option<Arc<dyn Logger>>,
    ) -> Result<Box<dyn RuntimeBackend>, RuntimeFailure> {
        let mut logger = match logger {
            Some(logger) => logger,
            None => Self::property_logger(&properties)?,
        };
        for plugin in &self.plugins {
            if let Some(replacement) = plugin(properties.as_ref(), &logger) {
                logger = replacement;
            }
        }
        Ok(Box::new(LocalRuntime {
            properties,
            logger,
            destroyed: AtomicBool::new(false),
        }))
    }
}

struct LocalRuntime {
    properties: Arc<Properties>,
    logger: Arc<dyn Logger>,
    destroyed: AtomicBool,
}

impl RuntimeBackend for LocalRuntime {
    fn properties(&self) -> Arc<Properties> {
        Arc::clone(&self.properties)
    }

    fn logger(&self) -> Arc<dyn Logger> {
        Arc::clone(&self.logger)
    }

    fn destroy(&self) {
        if !self.destroyed.swap(true, Ordering::SeqCst) {
            tracing::debug!("local runtime destroyed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_logger_from_properties() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runtime.log");
        let properties = Arc::new(Properties::new());
        properties.set_property(keys::LOG_FILE, path.to_str().unwrap()).unwrap();

        let backend = LocalRuntimeFactory::new().create(properties, None).unwrap();
        backend.logger().warning("hello");
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("warning: hello"));
    }

    #[test]
    fn test_unopenable_log_file() {
        let properties = Arc::new(Properties::new());
        properties
            .set_property(keys::LOG_FILE, "/nonexistent-dir/sub/runtime.log")
            .unwrap();
        let failure = LocalRuntimeFactory::new().create(properties, None).err().unwrap();
        assert_eq!(failure.kind, "InitializationError");
    }

    #[test]
    fn test_plugin_substitutes_logger() {
        let factory = LocalRuntimeFactory::new().with_logger_plugin(Arc::new(
            |_: &Properties, current: &Arc<dyn Logger>| Some(current.clone_with_prefix("plugged")),
        ));
        let caller: Arc<dyn Logger> = Arc::new(TracingLogger::new("caller"));
        let backend = factory.create(Arc::new(Properties::new()), Some(caller)).unwrap();
        assert_eq!(backend.logger().prefix(), "plugged");
    }
}

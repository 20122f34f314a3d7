//! Logger resolution.
//!
//! Strategies are tried in order and the first one that answers wins:
//!
//! 1. the logger supplied by the caller;
//! 2. a logger implied by `Rpc.LogFile` or `Rpc.UseSyslog`, which the
//!    runtime backend builds itself;
//! 3. a [`TracingLogger`] prefixed with `Rpc.ProgramName`.

use std::sync::Arc;

use crate::logger::{Logger, TracingLogger};
use crate::properties::{keys, Properties};

/// Outcome of logger resolution.
#[derive(Clone, Debug)]
pub(crate) enum LoggerSource {
    /// Use this logger.
    Resolved(Arc<dyn Logger>),
    /// Let the runtime backend build the logger from the properties.
    Runtime,
}

impl LoggerSource {
    /// The logger handed to the backend; `None` asks it to build one.
    pub(crate) fn into_logger(self) -> Option<Arc<dyn Logger>> {
        match self {
            LoggerSource::Resolved(logger) => Some(logger),
            LoggerSource::Runtime => None,
        }
    }
}

struct Context<'a> {
    caller: Option<&'a Arc<dyn Logger>>,
    properties: &'a Properties,
}

type Strategy = fn(&Context<'_>) -> Option<LoggerSource>;

const STRATEGIES: &[Strategy] = &[from_caller, from_properties];

fn from_caller(context: &Context<'_>) -> Option<LoggerSource> {
    context.caller.map(|logger| LoggerSource::Resolved(Arc::clone(logger)))
}

fn from_properties(context: &Context<'_>) -> Option<LoggerSource> {
    let log_file = context.properties.get_property(keys::LOG_FILE);
    let use_syslog = context.properties.get_property_as_int(keys::USE_SYSLOG) > 0;
    (!log_file.is_empty() || use_syslog).then_some(LoggerSource::Runtime)
}

fn process_default(properties: &Properties) -> LoggerSource {
    let prefix = properties.get_property(keys::PROGRAM_NAME);
    LoggerSource::Resolved(Arc::new(TracingLogger::new(prefix)))
}

pub(crate) fn resolve_logger(
    caller: Option<&Arc<dyn Logger>>,
    properties: &Properties,
) -> LoggerSource {
    let context = Context { caller, properties };
    STRATEGIES
        .iter()
        .find_map(|strategy| strategy(&context))
        .unwrap_or_else(|| process_default(properties))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        let properties = Properties::new();
        properties.set_property(keys::LOG_FILE, "app.log").unwrap();

        let caller: Arc<dyn Logger> = Arc::new(TracingLogger::new("mine"));
        match resolve_logger(Some(&caller), &properties) {
            LoggerSource::Resolved(logger) => assert_eq!(logger.prefix(), "mine"),
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(resolve_logger(None, &properties), LoggerSource::Runtime));

        properties.set_property(keys::LOG_FILE, "").unwrap();
        properties.set_property(keys::PROGRAM_NAME, "server").unwrap();
        match resolve_logger(None, &properties) {
            LoggerSource::Resolved(logger) => assert_eq!(logger.prefix(), "server"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_syslog_flag() {
        let properties = Properties::new();
        properties.set_property(keys::USE_SYSLOG, "0").unwrap();
        assert!(matches!(resolve_logger(None, &properties), LoggerSource::Resolved(_)));
        properties.set_property(keys::USE_SYSLOG, "1").unwrap();
        assert!(matches!(resolve_logger(None, &properties), LoggerSource::Runtime));
    }
}

//! Tests for runtime bootstrap.
//!
//! # Test Strategy
//!
//! 1. **Properties resolution**: caller store, config file, command line
//! 2. **Failures**: invalid config file, backend failures, no communicator
//! 3. **Logger resolution**: caller, property, default, plugin substitution
//! 4. **Lifecycle**: destroy and unused-property warnings

use std::io::Write;
use std::sync::Arc;

use corelib::error::RuntimeFailure;
use corelib::logger::{Logger, Severity};
use corelib::properties::{keys, Properties};
use corelib::runtime::{LocalRuntimeFactory, RuntimeBackend, RuntimeFactory};
use corelib::{create_properties, initialize, InitializationData};
use parking_lot::Mutex;
use tempfile::NamedTempFile;

#[derive(Debug, Default)]
struct CapturingLogger {
    prefix: String,
    lines: Arc<Mutex<Vec<(Severity, String)>>>,
}

impl Logger for CapturingLogger {
    fn write(&self, severity: Severity, message: &str) {
        self.lines.lock().push((severity, message.to_string()));
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn clone_with_prefix(&self, prefix: &str) -> Arc<dyn Logger> {
        Arc::new(CapturingLogger {
            prefix: prefix.to_string(),
            lines: Arc::clone(&self.lines),
        })
    }
}

struct Failing(&'static str);

impl RuntimeFactory for Failing {
    fn create(
        &self,
        _properties: Arc<Properties>,
        _logger: Option<Arc<dyn Logger>>,
    ) -> Result<Box<dyn RuntimeBackend>, RuntimeFailure> {
        Err(RuntimeFailure::new(self.0, "backend refused"))
    }
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

// ============================================================================
// Properties Resolution Tests
// ============================================================================

#[test]
fn test_caller_properties_are_used() {
    let properties = Arc::new(Properties::new());
    properties.set_property("App.Name", "demo").unwrap();
    let init_data = InitializationData {
        properties: Some(Arc::clone(&properties)),
        ..Default::default()
    };

    let communicator = initialize(&mut Vec::new(), init_data, None).unwrap();
    assert!(Arc::ptr_eq(communicator.properties(), &properties));
    assert_eq!(communicator.properties().get_property("App.Name"), "demo");
}

#[test]
fn test_config_file_then_command_line() {
    let file = config_file("App.Threads=2\nRpc.ProgramName=from-file\n");
    let mut argv = args(&["--Rpc.ProgramName=from-args", "rest"]);

    let communicator =
        initialize(&mut argv, InitializationData::default(), Some(file.path())).unwrap();
    assert_eq!(argv, args(&["rest"]));
    let properties = communicator.properties();
    assert_eq!(properties.get_property("App.Threads"), "2");
    assert_eq!(properties.get_property(keys::PROGRAM_NAME), "from-args");
}

#[test]
fn test_create_properties_keeps_defaults_separate() {
    let defaults = Properties::new();
    defaults.set_property("App.Mode", "fast").unwrap();
    let argv = args(&["--Rpc.LogFile=x.log", "--App.Mode=slow"]);
    let (properties, rest) = create_properties(argv, Some(&defaults)).unwrap();

    assert_eq!(rest, args(&["--App.Mode=slow"]));
    assert_eq!(properties.get_property(keys::LOG_FILE), "x.log");
    assert_eq!(properties.get_property("App.Mode"), "fast");
    assert_eq!(defaults.get_property(keys::LOG_FILE), "");
}

// ============================================================================
// Failure Tests
// ============================================================================

#[test]
fn test_invalid_config_path_fails_with_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.cfg");

    let result = initialize(&mut Vec::new(), InitializationData::default(), Some(&missing));
    match result {
        Err(err) => assert!(err.is_io(), "{}", err),
        Ok(_) => panic!("initialization must not produce a communicator"),
    }
}

#[test]
fn test_malformed_option_fails() {
    let result = initialize(&mut args(&["--Rpc.Bad Key =1"]), InitializationData::default(), None);
    assert!(result.err().unwrap().is_configuration());
}

#[test]
fn test_args_untouched_on_failure() {
    let mut argv = args(&["app", "--Rpc.Config=/definitely/not/here.cfg"]);
    assert!(initialize(&mut argv, InitializationData::default(), None).is_err());
    assert_eq!(argv.len(), 2);

    let mut argv = args(&["app", "--Rpc.Admin.Enabled=1", "x"]);
    let init_data = InitializationData {
        runtime_factory: Some(Arc::new(Failing("InitializationError"))),
        ..Default::default()
    };
    assert!(initialize(&mut argv, init_data, None).is_err());
    assert_eq!(argv, args(&["app", "--Rpc.Admin.Enabled=1", "x"]));
}

#[test]
fn test_failed_config_leaves_caller_store_unchanged() {
    let good = config_file("App.FromGood=1\n");
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.cfg");
    let properties = Arc::new(Properties::new());
    let init_data = InitializationData {
        properties: Some(Arc::clone(&properties)),
        ..Default::default()
    };
    let mut argv = vec![
        "app".to_string(),
        format!("--Rpc.Config={},{}", good.path().display(), missing.display()),
    ];

    let err = initialize(&mut argv, init_data, None).err().unwrap();
    assert!(err.is_io(), "{}", err);
    assert!(properties.is_empty(), "{:?}", properties.to_map());
}

#[test]
fn test_bad_option_keeps_config_file_out_of_caller_store() {
    let file = config_file("App.Threads=2\n");
    let properties = Arc::new(Properties::new());
    let init_data = InitializationData {
        properties: Some(Arc::clone(&properties)),
        ..Default::default()
    };

    let result = initialize(&mut args(&["--Rpc.Bad Key ="]), init_data, Some(file.path()));
    assert!(result.err().unwrap().is_configuration());
    assert!(properties.is_empty(), "{:?}", properties.to_map());
}

#[test]
fn test_backend_failure_kinds() {
    let cases: [(&str, fn(&corelib::Error) -> bool); 3] = [
        ("ConfigurationError", corelib::Error::is_configuration),
        ("IOError", corelib::Error::is_io),
        ("PluginInitializationError", |err: &corelib::Error| {
            matches!(err, corelib::Error::Initialization { .. })
        }),
    ];
    for (kind, check) in cases {
        let init_data = InitializationData {
            runtime_factory: Some(Arc::new(Failing(kind))),
            ..Default::default()
        };
        let err = initialize(&mut Vec::new(), init_data, None).err().unwrap();
        assert!(check(&err), "{}: {}", kind, err);
    }
}

// ============================================================================
// Logger Resolution Tests
// ============================================================================

#[test]
fn test_caller_logger_wins_over_property() {
    let dir = tempfile::tempdir().unwrap();
    let log_file = dir.path().join("never.log");
    let logger: Arc<dyn Logger> = Arc::new(CapturingLogger {
        prefix: "caller".into(),
        ..Default::default()
    });
    let init_data = InitializationData {
        logger: Some(logger),
        ..Default::default()
    };
    let mut argv = vec![format!("--Rpc.LogFile={}", log_file.display())];

    let communicator = initialize(&mut argv, init_data, None).unwrap();
    assert_eq!(communicator.logger().prefix(), "caller");
    assert!(!log_file.exists());
}

#[test]
fn test_log_file_property() {
    let dir = tempfile::tempdir().unwrap();
    let log_file = dir.path().join("app.log");
    let mut argv = vec!["server".to_string(), format!("--Rpc.LogFile={}", log_file.display())];

    let communicator = initialize(&mut argv, InitializationData::default(), None).unwrap();
    communicator.logger().warning("low disk");
    let contents = std::fs::read_to_string(&log_file).unwrap();
    assert!(contents.contains("server: warning: low disk"), "{}", contents);
}

#[test]
fn test_default_logger_uses_program_name() {
    let communicator =
        initialize(&mut args(&["worker"]), InitializationData::default(), None).unwrap();
    assert_eq!(communicator.logger().prefix(), "worker");
}

#[test]
fn test_logger_and_properties_resynced_from_backend() {
    struct Normalizing;

    struct Normalized {
        properties: Arc<Properties>,
        logger: Arc<dyn Logger>,
    }

    impl RuntimeBackend for Normalized {
        fn properties(&self) -> Arc<Properties> {
            Arc::clone(&self.properties)
        }

        fn logger(&self) -> Arc<dyn Logger> {
            Arc::clone(&self.logger)
        }
    }

    impl RuntimeFactory for Normalizing {
        fn create(
            &self,
            properties: Arc<Properties>,
            logger: Option<Arc<dyn Logger>>,
        ) -> Result<Box<dyn RuntimeBackend>, RuntimeFailure> {
            let copy = Arc::new(properties.duplicate());
            copy.set_property("Rpc.Normalized", "1")
                .map_err(|err| RuntimeFailure::new("ConfigurationError", err.to_string()))?;
            let logger = logger
                .ok_or_else(|| RuntimeFailure::new("InitializationError", "no logger"))?;
            Ok(Box::new(Normalized {
                properties: copy,
                logger: logger.clone_with_prefix("runtime"),
            }))
        }
    }

    let original = Arc::new(Properties::new());
    let init_data = InitializationData {
        properties: Some(Arc::clone(&original)),
        runtime_factory: Some(Arc::new(Normalizing)),
        ..Default::default()
    };
    let communicator = initialize(&mut Vec::new(), init_data, None).unwrap();

    assert!(!Arc::ptr_eq(communicator.properties(), &original));
    assert_eq!(communicator.properties().get_property("Rpc.Normalized"), "1");
    assert_eq!(original.get_property("Rpc.Normalized"), "");
    assert_eq!(communicator.logger().prefix(), "runtime");
    assert_eq!(communicator.properties_admin().get_property("Rpc.Normalized"), "1");
}

#[test]
fn test_logger_plugin_substitution() {
    let substitute: Arc<dyn Logger> = Arc::new(CapturingLogger {
        prefix: "plugin".into(),
        ..Default::default()
    });
    let factory = LocalRuntimeFactory::new().with_logger_plugin(Arc::new(
        move |properties: &Properties, _current: &Arc<dyn Logger>| {
            (properties.get_property("App.UsePlugin") == "1").then(|| Arc::clone(&substitute))
        },
    ));
    let properties = Arc::new(Properties::new());
    properties.set_property("App.UsePlugin", "1").unwrap();
    let init_data = InitializationData {
        properties: Some(properties),
        runtime_factory: Some(Arc::new(factory)),
        ..Default::default()
    };

    let communicator = initialize(&mut Vec::new(), init_data, None).unwrap();
    assert_eq!(communicator.logger().prefix(), "plugin");
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

#[test]
fn test_destroy_warns_about_unused_properties() {
    let logger = Arc::new(CapturingLogger::default());
    let lines = Arc::clone(&logger.lines);
    let init_data = InitializationData {
        logger: Some(logger as Arc<dyn Logger>),
        ..Default::default()
    };
    let mut argv = args(&["--Rpc.Warn.UnusedProperties=1", "--Rpc.Admin.Facets=Properties"]);
    let communicator = initialize(&mut argv, init_data, None).unwrap();
    communicator.properties().set_property("App.Unread", "x").unwrap();
    communicator.properties().set_property("App.Read", "y").unwrap();
    communicator.properties().get_property("App.Read");

    communicator.destroy();
    communicator.destroy();
    drop(communicator);

    let lines = lines.lock();
    let warnings: Vec<&String> = lines
        .iter()
        .filter(|(severity, _)| *severity == Severity::Warning)
        .map(|(_, message)| message)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("App.Unread"));
    assert!(!warnings[0].lines().any(|line| line.trim() == "App.Read"));
    // Admin facets are not exposed, so the facet list was never read.
    assert!(warnings[0].contains("Rpc.Admin.Facets"));
}

#[test]
fn test_repeated_initialization() {
    let first = initialize(&mut Vec::new(), InitializationData::default(), None).unwrap();
    let second = initialize(&mut Vec::new(), InitializationData::default(), None).unwrap();
    assert!(!Arc::ptr_eq(first.properties(), second.properties()));
    drop(first);
    assert!(!second.is_destroyed());
}

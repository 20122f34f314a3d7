//! Runtime bootstrap.
//!
//! [`initialize`] turns an argument list and optional
//! [`InitializationData`] into a ready [`Communicator`]:
//!
//! 1. register the process-wide factories (once per process);
//! 2. pick the property store: the caller's, or a new one; load the
//!    configuration file if one is given, then apply `--Rpc.*` options;
//! 3. resolve the logger;
//! 4. build the runtime backend, then re-read properties and logger from
//!    it since the backend may substitute either.
//!
//! Any failure aborts initialization and no communicator is produced.

mod backend;
mod factories;
mod logger;

pub use backend::{LocalRuntimeFactory, LoggerPlugin, RuntimeBackend, RuntimeFactory};

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::admin::{AdminFacet, PropertiesAdmin};
use crate::connection::{Connection, ConnectionResource};
use crate::endpoint::{Endpoint, EndpointResource};
use crate::error::Result;
use crate::logger::Logger;
use crate::properties::args::runtime_options;
use crate::properties::file::read_config;
use crate::properties::{keys, Properties, PropertyDict};

use self::factories::{factories, Factories};
use self::logger::resolve_logger;

/// Optional inputs to [`initialize`].
#[derive(Clone, Default)]
pub struct InitializationData {
    /// Store to configure instead of a fresh one.
    pub properties: Option<Arc<Properties>>,
    /// Logger that takes precedence over any logger property.
    pub logger: Option<Arc<dyn Logger>>,
    /// Backend factory; [`LocalRuntimeFactory`] when unset.
    pub runtime_factory: Option<Arc<dyn RuntimeFactory>>,
}

impl fmt::Debug for InitializationData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitializationData")
            .field("properties", &self.properties)
            .field("logger", &self.logger)
            .field("runtime_factory", &self.runtime_factory.is_some())
            .finish()
    }
}

/// Initialize a communicator.
///
/// Recognized `--Rpc.*` options are removed from `args`; the rest are left
/// in place for the application. Properties from `config_file` are loaded
/// before the command-line options, so the command line wins. On failure
/// neither `args` nor a caller-supplied store is modified.
pub fn initialize(
    args: &mut Vec<String>,
    init_data: InitializationData,
    config_file: Option<&Path>,
) -> Result<Communicator> {
    let factories = factories();

    let properties = init_data.properties.unwrap_or_default();
    let mut batch = PropertyDict::new();
    if let Some(program) = default_program_name(&properties, args) {
        batch.insert(keys::PROGRAM_NAME.to_string(), program);
    }
    if let Some(path) = config_file {
        batch.extend(read_config(path)?);
    }
    let (options, remaining) = runtime_options(args.clone())?;
    batch.extend(options);
    properties.set_properties(&batch)?;

    for key in properties.unknown_runtime_properties() {
        tracing::warn!(%key, "unknown runtime property");
    }

    let logger = resolve_logger(init_data.logger.as_ref(), &properties).into_logger();
    let runtime_factory = init_data
        .runtime_factory
        .unwrap_or_else(|| Arc::new(LocalRuntimeFactory::new()));
    let backend = runtime_factory
        .create(Arc::clone(&properties), logger)
        .map_err(factories.error)?;
    *args = remaining;

    let properties = backend.properties();
    let logger = backend.logger();
    let properties_admin =
        (factories.properties_admin)(Arc::clone(&properties), Arc::clone(&logger));
    let admin_facets = admin_facets(&properties, &properties_admin);

    tracing::debug!(
        properties = properties.len(),
        facets = admin_facets.len(),
        remaining_args = args.len(),
        "communicator initialized"
    );

    Ok(Communicator {
        factories,
        backend,
        properties,
        logger,
        properties_admin,
        admin_facets,
        destroyed: AtomicBool::new(false),
    })
}

/// Create a property store from `args` and optional `defaults`.
///
/// Returns the store and the arguments that were not `--Rpc.*` options.
pub fn create_properties(
    args: Vec<String>,
    defaults: Option<&Properties>,
) -> Result<(Properties, Vec<String>)> {
    let properties = match defaults {
        Some(defaults) => Properties::with_defaults(defaults),
        None => Properties::new(),
    };
    let mut batch = PropertyDict::new();
    if let Some(program) = default_program_name(&properties, &args) {
        batch.insert(keys::PROGRAM_NAME.to_string(), program);
    }
    let (options, remaining) = runtime_options(args)?;
    batch.extend(options);
    properties.set_properties(&batch)?;
    Ok((properties, remaining))
}

/// The first argument names the program unless it is an option or the
/// store already has a name.
fn default_program_name(properties: &Properties, args: &[String]) -> Option<String> {
    if !properties.get_property(keys::PROGRAM_NAME).is_empty() {
        return None;
    }
    args.first()
        .filter(|program| !program.is_empty() && !program.starts_with("--"))
        .cloned()
}

fn admin_facets(
    properties: &Properties,
    properties_admin: &Arc<PropertiesAdmin>,
) -> BTreeMap<String, Arc<dyn AdminFacet>> {
    let mut facets: BTreeMap<String, Arc<dyn AdminFacet>> = BTreeMap::new();
    if properties.get_property_as_int(keys::ADMIN_ENABLED) <= 0 {
        return facets;
    }
    let wanted = properties.get_property_as_list(keys::ADMIN_FACETS);
    let enabled = |name: &str| wanted.is_empty() || wanted.iter().any(|w| w == name);
    if enabled(PropertiesAdmin::FACET) {
        facets.insert(
            PropertiesAdmin::FACET.to_string(),
            Arc::clone(properties_admin) as Arc<dyn AdminFacet>,
        );
    }
    facets
}

/// Initialized runtime context.
///
/// Destroyed explicitly with [`Communicator::destroy`] or when dropped.
pub struct Communicator {
    factories: &'static Factories,
    backend: Box<dyn RuntimeBackend>,
    properties: Arc<Properties>,
    logger: Arc<dyn Logger>,
    properties_admin: Arc<PropertiesAdmin>,
    admin_facets: BTreeMap<String, Arc<dyn AdminFacet>>,
    destroyed: AtomicBool,
}

impl Communicator {
    pub fn properties(&self) -> &Arc<Properties> {
        &self.properties
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    /// Local properties administration, available whether or not the admin
    /// facets are exposed.
    pub fn properties_admin(&self) -> &Arc<PropertiesAdmin> {
        &self.properties_admin
    }

    /// An exposed admin facet. Facets are only exposed when
    /// `Rpc.Admin.Enabled` is set, filtered by `Rpc.Admin.Facets`.
    pub fn find_admin_facet(&self, name: &str) -> Option<Arc<dyn AdminFacet>> {
        self.admin_facets.get(name).cloned()
    }

    pub fn admin_facet_names(&self) -> Vec<String> {
        self.admin_facets.keys().cloned().collect()
    }

    /// Endpoint handle for a transport resource. Wrapping the same resource
    /// again yields the same handle while it is alive.
    pub fn wrap_endpoint(&self, resource: Box<dyn EndpointResource>) -> Endpoint {
        Endpoint::wrap(&self.factories.endpoints, resource)
    }

    pub fn wrap_connection(&self, resource: Box<dyn ConnectionResource>) -> Connection {
        Connection::wrap(&self.factories.connections, &self.factories.endpoints, resource)
    }

    /// Shut the runtime down. Later calls do nothing.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.properties.get_property_as_int(keys::WARN_UNUSED_PROPERTIES) > 0 {
            let unused = self.properties.unused_properties();
            if !unused.is_empty() {
                tracing::warn!(count = unused.len(), "properties set but never read");
                let mut message = String::from("The following properties were set but never read:");
                for key in &unused {
                    message.push_str("\n    ");
                    message.push_str(key);
                }
                self.logger.warning(&message);
            }
        }
        self.backend.destroy();
        tracing::debug!("communicator destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl Drop for Communicator {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for Communicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Communicator")
            .field("properties", &self.properties.len())
            .field("logger", &self.logger)
            .field("admin_facets", &self.admin_facet_names())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

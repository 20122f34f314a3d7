//! Hierarchical configuration store.
//!
//! Properties are string key/value pairs with dotted keys
//! (`Rpc.Admin.Enabled`, `MyApp.Pool.Size`). Lookups of unset keys return an
//! empty string; setting a key to the empty string removes it.
//!
//! # Concurrency
//!
//! The store sits behind a single reader/writer lock. Readers never block
//! each other; every write is applied under the write lock as one batch, so
//! readers observe either none or all of a `set_properties` call.
//!
//! # Key policy
//!
//! A key is malformed when it is empty, contains `=`, contains a control
//! character, or has leading or trailing whitespace. Writes containing a
//! malformed key are rejected as a whole.

pub mod args;
pub mod file;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::strings::split_quoted;

/// Ordered property mapping, used for bulk reads and writes.
pub type PropertyDict = BTreeMap<String, String>;

/// Prefix reserved for runtime properties.
pub const RUNTIME_PREFIX: &str = "Rpc";

/// Names of the runtime properties.
pub mod keys {
    pub const CONFIG: &str = "Rpc.Config";
    pub const PROGRAM_NAME: &str = "Rpc.ProgramName";
    pub const LOG_FILE: &str = "Rpc.LogFile";
    pub const USE_SYSLOG: &str = "Rpc.UseSyslog";
    pub const SYSLOG_FACILITY: &str = "Rpc.SyslogFacility";
    pub const ADMIN_ENABLED: &str = "Rpc.Admin.Enabled";
    pub const ADMIN_FACETS: &str = "Rpc.Admin.Facets";
    pub const TRACE_ADMIN_PROPERTIES: &str = "Rpc.Trace.Admin.Properties";
    pub const WARN_UNUSED_PROPERTIES: &str = "Rpc.Warn.UnusedProperties";

    /// Every property the runtime understands.
    pub const KNOWN: &[&str] = &[
        CONFIG,
        PROGRAM_NAME,
        LOG_FILE,
        USE_SYSLOG,
        SYSLOG_FACILITY,
        ADMIN_ENABLED,
        ADMIN_FACETS,
        TRACE_ADMIN_PROPERTIES,
        WARN_UNUSED_PROPERTIES,
    ];
}

/// Check a key against the malformed-key policy.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::configuration("empty property key"));
    }
    if key.contains('=') {
        return Err(Error::configuration(format!("property key `{}` contains `=`", key)));
    }
    if key.chars().any(char::is_control) {
        return Err(Error::configuration(format!(
            "property key {:?} contains a control character",
            key
        )));
    }
    if key.trim() != key {
        return Err(Error::configuration(format!(
            "property key `{}` has leading or trailing whitespace",
            key
        )));
    }
    Ok(())
}

/// Outcome of a committed write.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PropertyUpdate {
    /// Changed keys mapped to their new value; removed keys map to `""`.
    pub changes: PropertyDict,
    /// Store version after the write. Unchanged when `changes` is empty.
    pub version: u64,
}

impl PropertyUpdate {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

struct Property {
    value: String,
    used: AtomicBool,
}

impl Property {
    fn new(value: String) -> Self {
        Self {
            value,
            used: AtomicBool::new(false),
        }
    }

    fn read(&self) -> &str {
        self.used.store(true, Ordering::Relaxed);
        &self.value
    }
}

impl Clone for Property {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            used: AtomicBool::new(self.used.load(Ordering::Relaxed)),
        }
    }
}

#[derive(Clone, Default)]
struct PropertyState {
    values: BTreeMap<String, Property>,
    version: u64,
}

/// Thread-safe property store.
#[derive(Default)]
pub struct Properties {
    state: RwLock<PropertyState>,
}

impl Properties {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with a copy of `defaults`.
    pub fn with_defaults(defaults: &Properties) -> Self {
        let values = defaults
            .state
            .read()
            .values
            .iter()
            .map(|(key, property)| (key.clone(), Property::new(property.value.clone())))
            .collect();
        Self {
            state: RwLock::new(PropertyState { values, version: 0 }),
        }
    }

    /// Create a store from a list of `key=value` pairs.
    pub fn from_dict(dict: &PropertyDict) -> Result<Self> {
        let properties = Self::new();
        properties.set_properties(dict)?;
        Ok(properties)
    }

    /// Value of `key`, or an empty string when unset.
    pub fn get_property(&self, key: &str) -> String {
        self.state
            .read()
            .values
            .get(key)
            .map(|property| property.read().to_string())
            .unwrap_or_default()
    }

    /// Value of `key`, or `default` when unset.
    pub fn get_property_with_default(&self, key: &str, default: &str) -> String {
        self.state
            .read()
            .values
            .get(key)
            .map(|property| property.read().to_string())
            .unwrap_or_else(|| default.to_string())
    }

    /// Integer value of `key`, 0 when unset or not an integer.
    pub fn get_property_as_int(&self, key: &str) -> i32 {
        self.get_property_as_int_with_default(key, 0)
    }

    /// Integer value of `key`, `default` when unset or not an integer.
    pub fn get_property_as_int_with_default(&self, key: &str, default: i32) -> i32 {
        let state = self.state.read();
        let Some(property) = state.values.get(key) else {
            return default;
        };
        let value = property.read();
        match value.trim().parse::<i32>() {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::warn!(key, value, default, "property is not an integer, using default");
                default
            }
        }
    }

    /// List value of `key`: elements separated by commas or whitespace,
    /// quotes group. Empty when unset.
    pub fn get_property_as_list(&self, key: &str) -> Vec<String> {
        self.get_property_as_list_with_default(key, &[])
    }

    /// List value of `key`, `default` when unset or unparsable.
    pub fn get_property_as_list_with_default(&self, key: &str, default: &[&str]) -> Vec<String> {
        let default = || -> Vec<String> { default.iter().map(|s| s.to_string()).collect() };
        let state = self.state.read();
        let Some(property) = state.values.get(key) else {
            return default();
        };
        let value = property.read();
        match split_quoted(value, |c| c == ',' || c.is_whitespace()) {
            Ok(list) => list,
            Err(reason) => {
                tracing::warn!(key, value, %reason, "property is not a valid list, using default");
                default()
            }
        }
    }

    /// All properties whose key starts with `prefix`. An empty prefix
    /// returns everything.
    pub fn get_properties_for_prefix(&self, prefix: &str) -> PropertyDict {
        let state = self.state.read();
        state
            .values
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, property)| (key.clone(), property.read().to_string()))
            .collect()
    }

    /// Set a single property. An empty value removes the key.
    pub fn set_property(&self, key: &str, value: &str) -> Result<()> {
        let mut dict = PropertyDict::new();
        dict.insert(key.to_string(), value.to_string());
        self.set_properties(&dict).map(|_| ())
    }

    /// Merge `new_properties` into the store as one atomic batch.
    ///
    /// Keys with an empty value are removed. Returns the keys whose value
    /// actually changed. Fails without applying anything if any key is
    /// malformed.
    pub fn set_properties(&self, new_properties: &PropertyDict) -> Result<PropertyUpdate> {
        for key in new_properties.keys() {
            validate_key(key)?;
        }

        let mut state = self.state.write();
        let mut changes = PropertyDict::new();
        for (key, value) in new_properties {
            if value.is_empty() {
                if state.values.remove(key).is_some() {
                    changes.insert(key.clone(), String::new());
                }
                continue;
            }
            match state.values.get_mut(key) {
                Some(existing) if existing.value == *value => {}
                Some(existing) => {
                    existing.value = value.clone();
                    changes.insert(key.clone(), value.clone());
                }
                None => {
                    state.values.insert(key.clone(), Property::new(value.clone()));
                    changes.insert(key.clone(), value.clone());
                }
            }
        }
        if !changes.is_empty() {
            state.version += 1;
        }
        Ok(PropertyUpdate {
            changes,
            version: state.version,
        })
    }

    /// Render every property as a `--Key=Value` command-line option.
    pub fn get_command_line_options(&self) -> Vec<String> {
        self.state
            .read()
            .values
            .iter()
            .map(|(key, property)| format!("--{}={}", key, property.value))
            .collect()
    }

    /// Snapshot of all properties. Does not count as reading them.
    pub fn to_map(&self) -> PropertyDict {
        self.state
            .read()
            .values
            .iter()
            .map(|(key, property)| (key.clone(), property.value.clone()))
            .collect()
    }

    /// Independent deep copy of this store.
    pub fn duplicate(&self) -> Properties {
        Properties {
            state: RwLock::new(self.state.read().clone()),
        }
    }

    /// Keys that were set but never read.
    pub fn unused_properties(&self) -> Vec<String> {
        self.state
            .read()
            .values
            .iter()
            .filter(|(_, property)| !property.used.load(Ordering::Relaxed))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// `Rpc.*` keys that the runtime does not recognize.
    pub fn unknown_runtime_properties(&self) -> Vec<String> {
        let prefix = format!("{}.", RUNTIME_PREFIX);
        self.state
            .read()
            .values
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter(|(key, _)| !keys::KNOWN.contains(&key.as_str()))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Number of committed writes that changed something.
    pub fn version(&self) -> u64 {
        self.state.read().version
    }

    pub fn len(&self) -> usize {
        self.state.read().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().values.is_empty()
    }
}

impl fmt::Debug for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.to_map()).finish()
    }
}

//! Properties administration.
//!
//! [`PropertiesAdmin`] is a facade over a shared [`Properties`] store that
//! adds change notification. Every `set_properties` call that changes
//! something invokes the registered update callbacks, synchronously and in
//! registration order, with the keys changed by that call (removed keys map
//! to an empty value). A callback only sees writes committed after it was
//! registered.
//!
//! The [`AdminFacet`] trait is the remote surface: a facet answers named
//! operations with JSON parameters and results.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::logger::Logger;
use crate::properties::{keys, Properties, PropertyDict};

/// Callback invoked with the keys changed by an admin write.
pub type UpdateCallback = Arc<dyn Fn(&PropertyDict) + Send + Sync>;

/// A remotely callable administrative object.
pub trait AdminFacet: Send + Sync {
    /// Facet name, unique within a communicator.
    fn name(&self) -> &str;

    /// Execute `operation` with JSON `params`.
    fn dispatch(&self, operation: &str, params: Value) -> Result<Value>;
}

struct CallbackEntry {
    id: u64,
    /// Store version at registration time.
    registered_at: u64,
    /// Cleared by deregistration; checked again right before each call.
    live: Arc<AtomicBool>,
    callback: UpdateCallback,
}

#[derive(Default)]
struct Callbacks {
    entries: Mutex<Vec<CallbackEntry>>,
    next_id: AtomicU64,
}

/// Facade over a property store with live get/set and change callbacks.
pub struct PropertiesAdmin {
    properties: Arc<Properties>,
    logger: Arc<dyn Logger>,
    callbacks: Arc<Callbacks>,
}

impl PropertiesAdmin {
    /// Name under which the facet is registered.
    pub const FACET: &'static str = "Properties";

    const TRACE_CATEGORY: &'static str = "Admin.Properties";

    pub fn new(properties: Arc<Properties>, logger: Arc<dyn Logger>) -> Self {
        Self {
            properties,
            logger,
            callbacks: Arc::new(Callbacks::default()),
        }
    }

    pub fn get_property(&self, key: &str) -> String {
        self.properties.get_property(key)
    }

    pub fn get_properties_for_prefix(&self, prefix: &str) -> PropertyDict {
        self.properties.get_properties_for_prefix(prefix)
    }

    /// Apply `new_properties` and notify the update callbacks.
    ///
    /// Returns the changed keys. A malformed key fails the whole call and
    /// nothing is applied or notified.
    pub fn set_properties(&self, new_properties: &PropertyDict) -> Result<PropertyDict> {
        let update = self.properties.set_properties(new_properties)?;
        if update.is_empty() {
            return Ok(update.changes);
        }

        if self.properties.get_property_as_int(keys::TRACE_ADMIN_PROPERTIES) > 0 {
            self.trace_changes(&update.changes);
        }

        let callbacks: Vec<(Arc<AtomicBool>, UpdateCallback)> = self
            .callbacks
            .entries
            .lock()
            .iter()
            .filter(|entry| entry.registered_at < update.version)
            .map(|entry| (Arc::clone(&entry.live), Arc::clone(&entry.callback)))
            .collect();

        for (live, callback) in callbacks {
            if !live.load(Ordering::Acquire) {
                continue;
            }
            let outcome = catch_unwind(AssertUnwindSafe(|| callback(&update.changes)));
            if outcome.is_err() {
                tracing::warn!(
                    changed = update.changes.len(),
                    "properties update callback panicked"
                );
            }
        }
        Ok(update.changes)
    }

    /// Register `callback` for future updates.
    pub fn add_update_callback<F>(&self, callback: F) -> CallbackRegistration
    where
        F: Fn(&PropertyDict) + Send + Sync + 'static,
    {
        let id = self.callbacks.next_id.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.callbacks.entries.lock();
        entries.push(CallbackEntry {
            id,
            registered_at: self.properties.version(),
            live: Arc::new(AtomicBool::new(true)),
            callback: Arc::new(callback),
        });
        CallbackRegistration {
            callbacks: Arc::downgrade(&self.callbacks),
            id,
        }
    }

    /// Number of registered callbacks.
    pub fn callback_count(&self) -> usize {
        self.callbacks.entries.lock().len()
    }

    /// The administered store.
    pub fn properties(&self) -> &Arc<Properties> {
        &self.properties
    }

    fn trace_changes(&self, changes: &PropertyDict) {
        let mut message = String::from("summary of property changes");
        for (key, value) in changes {
            if value.is_empty() {
                message.push_str(&format!("\n  {} was removed", key));
            } else {
                message.push_str(&format!("\n  {} = {}", key, value));
            }
        }
        self.logger.trace(Self::TRACE_CATEGORY, &message);
    }
}

impl fmt::Debug for PropertiesAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertiesAdmin")
            .field("properties", &self.properties.len())
            .field("callbacks", &self.callback_count())
            .finish()
    }
}

#[derive(Deserialize)]
struct KeyParams {
    key: String,
}

#[derive(Deserialize)]
struct PrefixParams {
    prefix: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetParams {
    new_properties: PropertyDict,
}

fn decode<T: DeserializeOwned>(operation: &str, params: Value) -> Result<T> {
    serde_json::from_value(params).map_err(|err| {
        Error::configuration(format!("invalid parameters for `{}`: {}", operation, err))
    })
}

impl AdminFacet for PropertiesAdmin {
    fn name(&self) -> &str {
        Self::FACET
    }

    /// Operations:
    ///
    /// | operation                | params                         | result        |
    /// |--------------------------|--------------------------------|---------------|
    /// | `getProperty`            | `{"key": ..}`                  | string        |
    /// | `getPropertiesForPrefix` | `{"prefix": ..}`               | object        |
    /// | `setProperties`          | `{"newProperties": {..}}`      | changed keys  |
    fn dispatch(&self, operation: &str, params: Value) -> Result<Value> {
        match operation {
            "getProperty" => {
                let KeyParams { key } = decode(operation, params)?;
                Ok(Value::String(self.get_property(&key)))
            }
            "getPropertiesForPrefix" => {
                let PrefixParams { prefix } = decode(operation, params)?;
                let properties = self.get_properties_for_prefix(&prefix);
                Ok(serde_json::to_value(properties).unwrap_or_default())
            }
            "setProperties" => {
                let SetParams { new_properties } = decode(operation, params)?;
                let changes = self.set_properties(&new_properties)?;
                Ok(serde_json::to_value(changes).unwrap_or_default())
            }
            _ => Err(Error::UnknownOperation {
                facet: Self::FACET.to_string(),
                operation: operation.to_string(),
            }),
        }
    }
}

/// Handle returned by [`PropertiesAdmin::add_update_callback`].
#[derive(Clone)]
pub struct CallbackRegistration {
    callbacks: Weak<Callbacks>,
    id: u64,
}

impl CallbackRegistration {
    /// Deregister the callback. Calling this again does nothing.
    ///
    /// No invocation starts after this returns, including invocations for a
    /// write that is already notifying callbacks. An invocation that is
    /// already running is not interrupted.
    pub fn remove(&self) {
        if let Some(callbacks) = self.callbacks.upgrade() {
            callbacks.entries.lock().retain(|entry| {
                if entry.id == self.id {
                    entry.live.store(false, Ordering::Release);
                    false
                } else {
                    true
                }
            });
        }
    }
}

impl fmt::Debug for CallbackRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistration").field("id", &self.id).finish()
    }
}

//! Process-wide factory registration.
//!
//! The factories are registered lazily on the first call to [`factories`]
//! and never again. Concurrent first calls block until the single
//! registration has finished. A panic while registering is fatal: every
//! later initialization would fail anyway.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use crate::admin::PropertiesAdmin;
use crate::connection::ConnectionRegistry;
use crate::endpoint::EndpointRegistry;
use crate::error::{Error, RuntimeFailure};
use crate::logger::Logger;
use crate::properties::Properties;

/// Builds the properties admin facet for a communicator.
pub(crate) type PropertiesAdminFactory =
    fn(Arc<Properties>, Arc<dyn Logger>) -> Arc<PropertiesAdmin>;

pub(crate) struct Factories {
    /// Maps backend failures to crate errors.
    pub error: fn(RuntimeFailure) -> Error,
    /// Endpoint handle cache, shared by every communicator.
    pub endpoints: Arc<EndpointRegistry>,
    /// Connection handle cache.
    pub connections: ConnectionRegistry,
    pub properties_admin: PropertiesAdminFactory,
}

static FACTORIES: OnceLock<Factories> = OnceLock::new();
static REGISTRATIONS: AtomicUsize = AtomicUsize::new(0);

/// The registered factories, registering them on first use.
pub(crate) fn factories() -> &'static Factories {
    FACTORIES.get_or_init(register)
}

/// How many times registration actually ran in this process.
pub(crate) fn registration_count() -> usize {
    REGISTRATIONS.load(Ordering::SeqCst)
}

fn register() -> Factories {
    REGISTRATIONS.fetch_add(1, Ordering::SeqCst);
    tracing::debug!("registering runtime factories");
    Factories {
        error: Error::from,
        endpoints: Arc::new(EndpointRegistry::new()),
        connections: ConnectionRegistry::new(),
        properties_admin: |properties, logger| Arc::new(PropertiesAdmin::new(properties, logger)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrent_registration_happens_once() {
        const THREADS: usize = 16;
        let barrier = std::sync::Barrier::new(THREADS);

        let seen: Vec<usize> = crossbeam::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    scope.spawn(|_| {
                        barrier.wait();
                        let factories = factories();
                        // Registration is complete once `factories` returns.
                        assert!(registration_count() >= 1);
                        factories as *const Factories as usize
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        })
        .unwrap();

        assert_eq!(registration_count(), 1);
        assert!(seen.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[test]
    fn test_error_factory() {
        let err = (factories().error)(RuntimeFailure::new("ConfigurationError", "bad"));
        assert!(err.is_configuration());
    }
}

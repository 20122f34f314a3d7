//! Endpoints and their transport metadata.
//!
//! An [`Endpoint`] is a cheap, cloneable handle around a transport resource.
//! Endpoint values are produced by the transport layer; this module defines
//! the contract they satisfy:
//!
//! - `to_string()` is pure and deterministic, and parses back to an equal
//!   endpoint.
//! - Equality is reference identity first, then structural equality of the
//!   underlying resources. `Option<Endpoint>` comparisons are nil-aware
//!   (`None == None`, `None != Some(_)`).
//! - `Hash` agrees with equality, so endpoints can be set and map keys.

pub mod format;
pub mod info;
pub mod registry;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

pub use info::{EndpointInfo, EndpointKind, IpEndpointInfo};
pub use registry::{HandleRegistry, ResourceId};

use crate::error::{Error, Result};

/// Transport-side resource behind an [`Endpoint`].
///
/// Implementations are supplied by the transport layer. Resources that
/// compare equal through [`EndpointResource::equals`] must stringify
/// identically.
pub trait EndpointResource: Send + Sync + fmt::Debug {
    /// Identity of this resource, stable for its lifetime.
    fn id(&self) -> ResourceId;

    /// Canonical textual form.
    fn stringify(&self) -> String;

    /// Transport metadata, or `None` while it cannot be produced yet
    /// (e.g. an unresolved endpoint).
    fn info(&self) -> Option<EndpointInfo>;

    /// Structural equality with another resource.
    fn equals(&self, other: &dyn EndpointResource) -> bool {
        self.stringify() == other.stringify()
    }
}

/// Resource backed by a fully known [`EndpointInfo`], as produced by
/// [`Endpoint::parse`].
#[derive(Debug)]
pub struct StaticEndpoint {
    id: ResourceId,
    info: EndpointInfo,
}

impl StaticEndpoint {
    pub fn new(info: EndpointInfo) -> Self {
        Self {
            id: ResourceId::allocate(),
            info,
        }
    }
}

impl EndpointResource for StaticEndpoint {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn stringify(&self) -> String {
        self.info.to_string()
    }

    fn info(&self) -> Option<EndpointInfo> {
        Some(self.info.clone())
    }
}

/// Shared state of an endpoint handle.
#[derive(Debug)]
pub struct EndpointInner {
    resource: Box<dyn EndpointResource>,
}

/// Registry used to wrap transport resources into endpoint handles.
pub type EndpointRegistry = HandleRegistry<EndpointInner>;

/// Handle to a transport endpoint.
#[derive(Clone)]
pub struct Endpoint {
    inner: Arc<EndpointInner>,
}

impl Endpoint {
    /// Wrap a resource, reusing the live handle for the same resource id.
    pub fn wrap(registry: &EndpointRegistry, resource: Box<dyn EndpointResource>) -> Self {
        let inner = registry.get_or_insert_with(resource.id(), || EndpointInner { resource });
        Self { inner }
    }

    /// Wrap a resource without going through a registry.
    pub fn detached(resource: Box<dyn EndpointResource>) -> Self {
        Self {
            inner: Arc::new(EndpointInner { resource }),
        }
    }

    /// Parse an endpoint string (see [`format`]).
    pub fn parse(input: &str) -> Result<Self> {
        let info = format::parse(input)?;
        Ok(Self::from_info(info))
    }

    pub fn from_info(info: EndpointInfo) -> Self {
        Self::detached(Box::new(StaticEndpoint::new(info)))
    }

    /// Metadata for this endpoint, or `None` if the resource cannot produce
    /// it yet.
    pub fn info(&self) -> Option<EndpointInfo> {
        self.inner.resource.info()
    }

    pub fn resource_id(&self) -> ResourceId {
        self.inner.resource.id()
    }

    /// True when both handles are the same instance.
    pub fn ptr_eq(&self, other: &Endpoint) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Nil-aware equality for optional endpoints.
pub fn endpoints_equal(lhs: Option<&Endpoint>, rhs: Option<&Endpoint>) -> bool {
    match (lhs, rhs) {
        (None, None) => true,
        (Some(lhs), Some(rhs)) => lhs == rhs,
        _ => false,
    }
}

impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.inner.resource.equals(other.inner.resource.as_ref())
    }
}

impl Eq for Endpoint {}

impl Hash for Endpoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.resource.stringify().hash(state);
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.resource.stringify())
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("id", &self.resource_id())
            .field("endpoint", &self.to_string())
            .finish()
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Debug)]
    struct Unresolved(ResourceId);

    impl EndpointResource for Unresolved {
        fn id(&self) -> ResourceId {
            self.0
        }

        fn stringify(&self) -> String {
            "tcp -h pending -p 1 -t infinite".into()
        }

        fn info(&self) -> Option<EndpointInfo> {
            None
        }
    }

    #[test]
    fn test_parse_and_display() {
        let endpoint: Endpoint = "tcp -h localhost -p 4061 -t 500".parse().unwrap();
        assert_eq!(endpoint.to_string(), "tcp -h localhost -p 4061 -t 500");
        assert_eq!(endpoint.info().unwrap().ip().unwrap().port, 4061);
    }

    #[test]
    fn test_structural_equality() {
        let a = Endpoint::parse("tcp -h a -p 1").unwrap();
        let b = Endpoint::parse("tcp  -p 1   -h a").unwrap();
        let c = Endpoint::parse("tcp -h a -p 2").unwrap();
        assert!(!a.ptr_eq(&b));
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<Endpoint> = [a.clone(), b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&a));
    }

    #[test]
    fn test_nil_aware_equality() {
        let a = Endpoint::parse("udp -h x -p 9").unwrap();
        assert!(endpoints_equal(None, None));
        assert!(!endpoints_equal(Some(&a), None));
        assert!(!endpoints_equal(None, Some(&a)));
        assert!(endpoints_equal(Some(&a), Some(&a.clone())));

        let none: Option<Endpoint> = None;
        assert_eq!(none, None);
        assert_ne!(Some(a), none);
    }

    #[test]
    fn test_registry_preserves_identity() {
        let registry = EndpointRegistry::new();
        let id = ResourceId::allocate();
        let first = Endpoint::wrap(&registry, Box::new(Unresolved(id)));
        let second = Endpoint::wrap(&registry, Box::new(Unresolved(id)));
        assert!(first.ptr_eq(&second));

        let other = Endpoint::wrap(&registry, Box::new(Unresolved(ResourceId::allocate())));
        assert!(!first.ptr_eq(&other));
        // Different resources, same canonical form.
        assert_eq!(first, other);
    }

    #[test]
    fn test_unresolved_info_is_none() {
        let endpoint = Endpoint::detached(Box::new(Unresolved(ResourceId::allocate())));
        assert!(endpoint.info().is_none());
        assert_eq!(endpoint.to_string(), "tcp -h pending -p 1 -t infinite");
    }
}

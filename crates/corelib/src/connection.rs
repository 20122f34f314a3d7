//! Connection metadata.
//!
//! Mirrors the endpoint model: a connection is described by a chain of
//! [`ConnectionInfo`] layers (an SSL or WebSocket layer on top of a TCP
//! layer), and [`Connection`] handles wrap transport resources through a
//! [`HandleRegistry`] so that repeated lookups yield the same handle.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::endpoint::{Endpoint, EndpointRegistry, EndpointResource, HandleRegistry, ResourceId};

/// Address fields shared by IP-based connections.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpConnectionInfo {
    pub local_address: String,
    pub local_port: i32,
    pub remote_address: String,
    pub remote_port: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ConnectionKind {
    Tcp {
        ip: IpConnectionInfo,
        rcv_size: i32,
        snd_size: i32,
    },
    Udp {
        ip: IpConnectionInfo,
        mcast_address: String,
        mcast_port: i32,
        rcv_size: i32,
        snd_size: i32,
    },
    Ws {
        /// Headers of the HTTP upgrade request.
        headers: BTreeMap<String, String>,
    },
    Ssl {
        /// Negotiated cipher suite.
        cipher: String,
        /// Peer certificate chain, PEM encoded, leaf first.
        certs: Vec<String>,
        /// Whether the peer chain was verified.
        verified: bool,
    },
}

/// Immutable description of an established connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    underlying: Option<Box<ConnectionInfo>>,
    incoming: bool,
    adapter_name: String,
    connection_id: String,
    #[serde(flatten)]
    kind: ConnectionKind,
}

impl ConnectionInfo {
    pub fn new(
        kind: ConnectionKind,
        incoming: bool,
        adapter_name: impl Into<String>,
        connection_id: impl Into<String>,
    ) -> Self {
        Self {
            underlying: None,
            incoming,
            adapter_name: adapter_name.into(),
            connection_id: connection_id.into(),
            kind,
        }
    }

    /// Put `kind` on top of `underlying`, inheriting its base fields.
    pub fn layered(kind: ConnectionKind, underlying: ConnectionInfo) -> Self {
        Self {
            incoming: underlying.incoming,
            adapter_name: underlying.adapter_name.clone(),
            connection_id: underlying.connection_id.clone(),
            underlying: Some(Box::new(underlying)),
            kind,
        }
    }

    pub fn underlying(&self) -> Option<&ConnectionInfo> {
        self.underlying.as_deref()
    }

    /// True for connections accepted by an adapter.
    pub fn incoming(&self) -> bool {
        self.incoming
    }

    /// Name of the accepting adapter; empty for outgoing connections.
    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub fn kind(&self) -> &ConnectionKind {
        &self.kind
    }

    /// IP fields of the first IP-based layer in the chain.
    pub fn ip(&self) -> Option<&IpConnectionInfo> {
        let mut current = Some(self);
        while let Some(layer) = current {
            if let ConnectionKind::Tcp { ip, .. } | ConnectionKind::Udp { ip, .. } = &layer.kind {
                return Some(ip);
            }
            current = layer.underlying();
        }
        None
    }

    /// True when any layer of the chain is SSL.
    pub fn secure(&self) -> bool {
        let mut current = Some(self);
        while let Some(layer) = current {
            if matches!(layer.kind, ConnectionKind::Ssl { .. }) {
                return true;
            }
            current = layer.underlying();
        }
        false
    }
}

/// Transport-side resource behind a [`Connection`].
pub trait ConnectionResource: Send + Sync + fmt::Debug {
    fn id(&self) -> ResourceId;

    /// Human-readable description (addresses, state).
    fn describe(&self) -> String;

    /// Metadata, or `None` once the connection is closed.
    fn info(&self) -> Option<ConnectionInfo>;

    /// The endpoint this connection was established with.
    fn endpoint(&self) -> Box<dyn EndpointResource>;
}

#[derive(Debug)]
pub struct ConnectionInner {
    resource: Box<dyn ConnectionResource>,
    endpoints: Arc<EndpointRegistry>,
}

pub type ConnectionRegistry = HandleRegistry<ConnectionInner>;

/// Handle to a transport connection. Equality is identity.
#[derive(Clone, Debug)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    pub fn wrap(
        registry: &ConnectionRegistry,
        endpoints: &Arc<EndpointRegistry>,
        resource: Box<dyn ConnectionResource>,
    ) -> Self {
        let inner = registry.get_or_insert_with(resource.id(), || ConnectionInner {
            resource,
            endpoints: Arc::clone(endpoints),
        });
        Self { inner }
    }

    pub fn info(&self) -> Option<ConnectionInfo> {
        self.inner.resource.info()
    }

    /// Endpoint handle for this connection, shared with every other lookup
    /// of the same endpoint resource.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::wrap(&self.inner.endpoints, self.inner.resource.endpoint())
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Connection {}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.resource.describe())
    }
}

//! Endpoint metadata.
//!
//! # Layering
//!
//! Transports that sit on top of other transports (SSL over TCP, WebSocket
//! over TCP or SSL) are described by a chain of [`EndpointInfo`] values linked
//! through `underlying`, outermost first:
//!
//! ```text
//! wss:  Ws { resource } -> Ssl -> Tcp { host, port }
//! ssl:  Ssl -> Tcp { host, port }
//! tcp:  Tcp { host, port }
//! ```
//!
//! Each layer exclusively owns the next one, so a chain is built bottom-up
//! and can never be cyclic.
//!
//! # Classification
//!
//! [`EndpointInfo::endpoint_type`], [`EndpointInfo::datagram`] and
//! [`EndpointInfo::secure`] always report the classification of the
//! innermost layer. An outer layer only contributes its own classification
//! when it is itself the innermost one.

use serde::{Deserialize, Serialize};

use crate::encoding::EncodingVersion;

pub const TCP_ENDPOINT_TYPE: i16 = 1;
pub const SSL_ENDPOINT_TYPE: i16 = 2;
pub const UDP_ENDPOINT_TYPE: i16 = 3;
pub const WS_ENDPOINT_TYPE: i16 = 4;
pub const WSS_ENDPOINT_TYPE: i16 = 5;
pub const IAP_ENDPOINT_TYPE: i16 = 8;

/// Address fields shared by IP-based transports.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IpEndpointInfo {
    /// Host name or address. Empty means the default host.
    pub host: String,
    pub port: i32,
    /// Local address to bind outgoing connections to. Empty when unset.
    pub source_address: String,
}

impl IpEndpointInfo {
    pub fn new(host: impl Into<String>, port: i32) -> Self {
        Self {
            host: host.into(),
            port,
            source_address: String::new(),
        }
    }

    pub fn with_source_address(mut self, source_address: impl Into<String>) -> Self {
        self.source_address = source_address.into();
        self
    }
}

/// The closed set of endpoint variants. Each carries only its own fields.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EndpointKind {
    Tcp {
        ip: IpEndpointInfo,
    },
    Udp {
        ip: IpEndpointInfo,
        /// Interface for multicast traffic. Empty when unset.
        mcast_interface: String,
        /// Multicast time-to-live, -1 when unset.
        mcast_ttl: i32,
    },
    Ws {
        resource: String,
    },
    /// Endpoint of a transport this process does not know how to decode.
    Opaque {
        type_code: i16,
        raw_encoding: EncodingVersion,
        raw_bytes: Vec<u8>,
    },
    Ssl,
    /// Accessory-protocol endpoint, only available on mobile targets.
    #[cfg(any(target_os = "ios", target_os = "tvos", target_os = "watchos"))]
    Iap {
        manufacturer: String,
        model_number: String,
        name: String,
        protocol: String,
    },
}

impl EndpointKind {
    /// The variant's own type code, ignoring any layering.
    pub fn own_type(&self) -> i16 {
        match self {
            EndpointKind::Tcp { .. } => TCP_ENDPOINT_TYPE,
            EndpointKind::Udp { .. } => UDP_ENDPOINT_TYPE,
            EndpointKind::Ws { .. } => WS_ENDPOINT_TYPE,
            EndpointKind::Opaque { type_code, .. } => *type_code,
            EndpointKind::Ssl => SSL_ENDPOINT_TYPE,
            #[cfg(any(target_os = "ios", target_os = "tvos", target_os = "watchos"))]
            EndpointKind::Iap { .. } => IAP_ENDPOINT_TYPE,
        }
    }

    pub fn own_datagram(&self) -> bool {
        matches!(self, EndpointKind::Udp { .. })
    }

    pub fn own_secure(&self) -> bool {
        matches!(self, EndpointKind::Ssl)
    }
}

/// Immutable description of an endpoint's transport parameters.
///
/// All fields are fixed at construction; accessors are read-only. Values are
/// plain data and can be shared across threads freely.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointInfo {
    timeout: i32,
    compress: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    underlying: Option<Box<EndpointInfo>>,
    #[serde(flatten)]
    kind: EndpointKind,
}

impl EndpointInfo {
    /// Create the innermost layer of a chain.
    pub fn new(kind: EndpointKind, timeout: i32, compress: bool) -> Self {
        Self {
            timeout,
            compress,
            underlying: None,
            kind,
        }
    }

    /// Create a layer on top of an existing chain.
    pub fn layered(
        kind: EndpointKind,
        timeout: i32,
        compress: bool,
        underlying: EndpointInfo,
    ) -> Self {
        Self {
            timeout,
            compress,
            underlying: Some(Box::new(underlying)),
            kind,
        }
    }

    pub fn tcp(ip: IpEndpointInfo, timeout: i32, compress: bool) -> Self {
        Self::new(EndpointKind::Tcp { ip }, timeout, compress)
    }

    pub fn udp(
        ip: IpEndpointInfo,
        mcast_interface: impl Into<String>,
        mcast_ttl: i32,
        compress: bool,
    ) -> Self {
        Self::new(
            EndpointKind::Udp {
                ip,
                mcast_interface: mcast_interface.into(),
                mcast_ttl,
            },
            -1,
            compress,
        )
    }

    /// Timeout in milliseconds, -1 for no timeout.
    #[inline]
    pub fn timeout(&self) -> i32 {
        self.timeout
    }

    #[inline]
    pub fn compress(&self) -> bool {
        self.compress
    }

    #[inline]
    pub fn underlying(&self) -> Option<&EndpointInfo> {
        self.underlying.as_deref()
    }

    #[inline]
    pub fn kind(&self) -> &EndpointKind {
        &self.kind
    }

    /// Iterate over the chain, outermost layer first.
    pub fn layers(&self) -> Layers<'_> {
        Layers { next: Some(self) }
    }

    /// The last layer of the chain (`self` when there is no underlying info).
    pub fn innermost(&self) -> &EndpointInfo {
        let mut current = self;
        while let Some(next) = current.underlying() {
            current = next;
        }
        current
    }

    /// Number of layers, including `self`.
    pub fn depth(&self) -> usize {
        self.layers().count()
    }

    /// Type code of the innermost layer.
    pub fn endpoint_type(&self) -> i16 {
        self.innermost().kind.own_type()
    }

    /// Whether the innermost layer is a datagram transport.
    pub fn datagram(&self) -> bool {
        self.innermost().kind.own_datagram()
    }

    /// Whether the innermost layer is a secure transport.
    pub fn secure(&self) -> bool {
        self.innermost().kind.own_secure()
    }

    /// IP address fields of the first IP-based layer in the chain.
    pub fn ip(&self) -> Option<&IpEndpointInfo> {
        self.layers().find_map(|layer| match &layer.kind {
            EndpointKind::Tcp { ip } | EndpointKind::Udp { ip, .. } => Some(ip),
            _ => None,
        })
    }
}

/// Iterator over the layers of an [`EndpointInfo`] chain.
pub struct Layers<'a> {
    next: Option<&'a EndpointInfo>,
}

impl<'a> Iterator for Layers<'a> {
    type Item = &'a EndpointInfo;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.underlying();
        Some(current)
    }
}

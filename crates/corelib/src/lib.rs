//! Core library for the RPC runtime's endpoint and configuration model.
//!
//! This crate provides:
//! - Endpoint metadata (`EndpointInfo`) and identity-preserving endpoint handles
//! - Connection metadata and handles
//! - The property store, configuration files and command-line options
//! - Properties administration with change callbacks
//! - Object identities and their string form
//! - Logger contract and built-in loggers
//! - Runtime bootstrap producing a `Communicator`

pub mod admin;
pub mod connection;
pub mod encoding;
pub mod endpoint;
pub mod error;
pub mod identity;
pub mod logger;
pub mod properties;
pub mod runtime;

mod strings;

pub use admin::{AdminFacet, CallbackRegistration, PropertiesAdmin};
pub use connection::{Connection, ConnectionInfo};
pub use encoding::EncodingVersion;
pub use endpoint::{endpoints_equal, Endpoint, EndpointInfo, EndpointKind};
pub use error::{Error, Result};
pub use identity::Identity;
pub use logger::{Logger, Severity};
pub use properties::{Properties, PropertyDict};
pub use runtime::{create_properties, initialize, Communicator, InitializationData};

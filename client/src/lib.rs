//! Asynchronous SNMP v1/v2c/v3 client (C11) and trap listener (C12),
//! built on `snmp-mpm`'s plugin dispatcher and `snmp-usm`'s v3 session
//! state.

pub mod client;
pub mod config;
pub mod error;
pub mod transport;
pub mod trap;

pub use client::Client;
pub use config::{ClientConfig, ClientConfigBuilder, WalkErrorPolicy};
pub use error::ClientError;
pub use transport::{Transport, UdpTransport};
pub use trap::{TrapInfo, TrapListener};

pub use snmp_core::{ObjectIdentifier, StringKind, Value};
pub use snmp_pdu::PduKind;
pub use snmp_usm::{AuthProtocolId, Credentials, PrivProtocolId};

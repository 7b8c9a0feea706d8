//! The flattened error type public API callers see: every lower-layer
//! error arrives here via `#[from]`/transparent, so `anyhow`-based callers
//! (the CLI) still get the full causal chain.

use thiserror::Error;

use snmp_core::ObjectIdentifier;
use snmp_mpm::MpmError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Processing(#[from] MpmError),

    #[error("no response from {host}:{port} after {attempts} attempt(s)")]
    Timeout { host: String, port: u16, attempts: u32 },

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("received datagram of {len} bytes exceeds configured buffer_size {buffer_size}")]
    InvalidValueLength { len: usize, buffer_size: usize },

    #[error("agent returned error_status={status} ({name}), offending_oid={offending_oid:?}")]
    AgentError { status: u32, name: &'static str, offending_oid: Option<ObjectIdentifier> },

    #[error("agent {host} appears to be a faulty SNMP implementation: repeated the same OID during a walk")]
    FaultyImplementation { host: String },

    #[error("request_id mismatch: sent {sent}, received {received}")]
    RequestIdMismatch { sent: i32, received: i32 },

    #[error("expected exactly one VarBind in the response, found {0}")]
    UnexpectedVarBindCount(usize),

    #[error("discovery round trip with {host}:{port} failed: {reason}")]
    DiscoveryFailed { host: String, port: u16, reason: String },
}

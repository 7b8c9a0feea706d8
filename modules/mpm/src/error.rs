//! Error taxonomy for message processing and plugin dispatch (C6, C10).

use thiserror::Error;

use snmp_core::CodecError;
use snmp_pdu::ProtocolError;
use snmp_usm::UsmError;

#[derive(Debug, Error)]
pub enum MpmError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Security(#[from] UsmError),

    #[error("unsupported message processing model version {0}")]
    UnsupportedVersion(u8),

    #[error("unsupported security model id {0}")]
    UnsupportedSecurityModel(i64),

    #[error("message carries no security parameters")]
    MissingSecurityParameters,

    #[error("credentials do not match the requested message version")]
    CredentialVersionMismatch,
}

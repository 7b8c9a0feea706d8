//! Security error taxonomy (spec §7 "Security errors").

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UsmError {
    #[error("authentication failed: HMAC mismatch")]
    AuthenticationFailure,

    #[error("privacy decryption failed")]
    DecryptionError,

    #[error("unknown authoritative engine id")]
    UnknownEngineId,

    #[error("unknown user name")]
    UnknownUserName,

    #[error("message outside the accepted time window")]
    NotInTimeWindow,

    #[error("requested security level is not supported by these credentials")]
    UnsupportedSecLevel,

    #[error("auth protocol {0:?} is not supported")]
    UnsupportedAuthProtocol(super::credentials::AuthProtocolId),

    #[error("priv protocol {0:?} is not supported in this build (privacy feature disabled)")]
    PrivacyNotSupported(super::credentials::PrivProtocolId),
}

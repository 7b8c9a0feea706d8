//! Codec error taxonomy (spec §7 "Codec errors").

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid tag octet(s)")]
    InvalidTag,
    #[error("invalid length encoding")]
    InvalidLength,
    #[error("invalid value length for this type: {0}")]
    InvalidValueLength(String),
    #[error("buffer ended before a complete TLV could be read")]
    IncompleteData,
    #[error("unexpected type: expected {expected}, found {found}")]
    UnexpectedType { expected: String, found: String },
}

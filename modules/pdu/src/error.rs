//! Protocol error taxonomy.

use snmp_core::{CodecError, ObjectIdentifier};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("agent returned error_status={status} ({name}), offending_oid={offending_oid:?}")]
    ErrorResponse {
        status: u32,
        name: &'static str,
        offending_oid: Option<ObjectIdentifier>,
    },

    #[error("agent reported noSuchName/noSuchObject/noSuchInstance for {oid}")]
    NoSuchOid { oid: Option<ObjectIdentifier> },

    #[error("message contained no varbinds where at least one was expected")]
    EmptyMessage,

    #[error("too many varbinds in one request ({0})")]
    TooManyVarbinds(usize),

    #[error("request_id is not a valid INTEGER")]
    InvalidRequestId,

    #[error("GetBulkRequest non_repeaters/max_repetitions must be non-negative")]
    InvalidBulkCounters,

    #[error("response error_index {index} out of range for {len} varbinds")]
    InvalidErrorIndex { index: u32, len: usize },
}

/// Named error_status values from RFC 3416, plus locally added codes.
pub fn error_status_name(status: u32) -> &'static str {
    match status {
        0 => "noError",
        1 => "tooBig",
        2 => "noSuchName",
        3 => "badValue",
        4 => "readOnly",
        5 => "genErr",
        6 => "noAccess",
        7 => "wrongType",
        8 => "wrongLength",
        9 => "wrongEncoding",
        10 => "wrongValue",
        11 => "noCreation",
        12 => "inconsistentValue",
        13 => "resourceUnavailable",
        14 => "commitFailed",
        15 => "undoFailed",
        16 => "authorizationError",
        17 => "notWritable",
        18 => "inconsistentName",
        _ => "unknown",
    }
}

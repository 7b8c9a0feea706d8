//! SNMP PDU layer (C4): PDU kinds, VarBind, construction, serialization,
//! and the PDU validation rules.

pub mod error;
pub mod pdu;
pub mod varbind;

pub use error::ProtocolError;
pub use pdu::{Pdu, PduCounters, PduKind, TrapV1Info};
pub use varbind::VarBind;

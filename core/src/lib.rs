//! X.690/BER codec and shared SNMP value types (spec components C1-C3).
//!
//! This crate has no knowledge of SNMP messages or PDUs; it only knows how
//! to turn bytes into `Value`s and back, bit-exactly, and how to name and
//! compare `ObjectIdentifier`s.

pub mod ber;
pub mod error;
pub mod oid;
pub mod registry;
pub mod tag;
pub mod value;

pub use error::CodecError;
pub use oid::ObjectIdentifier;
pub use tag::{Class, Pc, TypeInfo};
pub use value::{StringKind, Value};

pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

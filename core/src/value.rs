//! The closed sum type covering every ASN.1/SNMP value exchanged on the
//! wire. A closed enum plus an `Unknown` arm replaces dynamic,
//! isinstance-style typing.

use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::ber::{decode_integer, decode_unsigned_wrapping, encode_integer, encode_tlv, encode_unsigned};
use crate::error::CodecError;
use crate::oid::ObjectIdentifier;
use crate::tag::{application, context, universal, Class, Pc, TypeInfo};

/// The string families enumerated in ("printable/visible/IA5/
/// T61/UTF8/etc."). Kept as one `Value::TextString` variant carrying the
/// kind, rather than one enum variant per kind, since all of them share
/// identical wire semantics (an OCTET STRING body) and differ only in the
/// tag number and the character-set contract callers may choose to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringKind {
    Printable,
    Ia5,
    Utf8,
    T61,
    Visible,
    Utc,
}

impl StringKind {
    fn tag(self) -> u32 {
        match self {
            StringKind::Printable => universal::PRINTABLE_STRING,
            StringKind::Ia5 => universal::IA5_STRING,
            StringKind::Utf8 => 0x0C,
            StringKind::T61 => 0x14,
            StringKind::Visible => 0x1A,
            StringKind::Utc => universal::UTC_TIME,
        }
    }

    fn from_tag(tag: u32) -> Option<StringKind> {
        match tag {
            x if x == universal::PRINTABLE_STRING => Some(StringKind::Printable),
            x if x == universal::IA5_STRING => Some(StringKind::Ia5),
            0x0C => Some(StringKind::Utf8),
            0x14 => Some(StringKind::T61),
            0x1A => Some(StringKind::Visible),
            x if x == universal::UTC_TIME => Some(StringKind::Utc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    // --- universal types ---
    Boolean(bool),
    Integer(i64),
    OctetString(Vec<u8>),
    Null,
    ObjectIdentifier(ObjectIdentifier),
    Sequence(Vec<Value>),
    Set(Vec<Value>),
    TextString { kind: StringKind, text: String },

    // --- SNMP application types (C3) ---
    IpAddress(Ipv4Addr),
    Counter32(u32),
    Counter64(u64),
    Gauge32(u32),
    TimeTicks(u32),
    Opaque(Vec<u8>),
    NsapAddress(Vec<u8>),

    // --- VarBind value sentinels (context-class primitives) ---
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,

    /// Any TLV whose `(class, tag)` is not recognized. Never fatal at
    /// decode time.
    Unknown { info: TypeInfo, bytes: Vec<u8> },
}

impl Value {
    pub fn type_info(&self) -> TypeInfo {
        match self {
            Value::Boolean(_) => TypeInfo::universal(Pc::Primitive, universal::BOOLEAN),
            Value::Integer(_) => TypeInfo::universal(Pc::Primitive, universal::INTEGER),
            Value::OctetString(_) => TypeInfo::universal(Pc::Primitive, universal::OCTET_STRING),
            Value::Null => TypeInfo::universal(Pc::Primitive, universal::NULL),
            Value::ObjectIdentifier(_) => TypeInfo::universal(Pc::Primitive, universal::OBJECT_IDENTIFIER),
            Value::Sequence(_) => TypeInfo::universal(Pc::Constructed, universal::SEQUENCE),
            Value::Set(_) => TypeInfo::universal(Pc::Constructed, universal::SET),
            Value::TextString { kind, .. } => TypeInfo::universal(Pc::Primitive, kind.tag()),
            Value::IpAddress(_) => TypeInfo::application(application::IP_ADDRESS),
            Value::Counter32(_) => TypeInfo::application(application::COUNTER32),
            Value::Counter64(_) => TypeInfo::application(application::COUNTER64),
            Value::Gauge32(_) => TypeInfo::application(application::GAUGE32),
            Value::TimeTicks(_) => TypeInfo::application(application::TIME_TICKS),
            Value::Opaque(_) => TypeInfo::application(application::OPAQUE),
            Value::NsapAddress(_) => TypeInfo::application(application::NSAP_ADDRESS),
            Value::NoSuchObject => TypeInfo::context(context::NO_SUCH_OBJECT),
            Value::NoSuchInstance => TypeInfo::context(context::NO_SUCH_INSTANCE),
            Value::EndOfMibView => TypeInfo::context(context::END_OF_MIB_VIEW),
            Value::Unknown { info, .. } => *info,
        }
    }

    /// Encode the body (everything inside the length octet) of this value.
    pub fn encode_value(&self) -> Vec<u8> {
        match self {
            Value::Boolean(b) => vec![if *b { 0xFF } else { 0x00 }],
            Value::Integer(i) => encode_integer(*i),
            Value::OctetString(bytes) => bytes.clone(),
            Value::Null => Vec::new(),
            Value::ObjectIdentifier(oid) => oid.to_ber_bytes(),
            Value::Sequence(items) | Value::Set(items) => {
                let mut out = Vec::new();
                for item in items {
                    out.extend_from_slice(&item.encode());
                }
                out
            }
            Value::TextString { text, .. } => text.as_bytes().to_vec(),
            Value::IpAddress(ip) => ip.octets().to_vec(),
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => encode_unsigned(*v as u64),
            Value::Counter64(v) => encode_unsigned(*v),
            Value::Opaque(bytes) => bytes.clone(),
            Value::NsapAddress(bytes) => bytes.clone(),
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => Vec::new(),
            Value::Unknown { bytes, .. } => bytes.clone(),
        }
    }

    /// Encode the full TLV (identifier + length + body).
    pub fn encode(&self) -> Vec<u8> {
        encode_tlv(self.type_info(), &self.encode_value())
    }

    pub fn decode_value(info: TypeInfo, body: &[u8]) -> Result<Value, CodecError> {
        if info.class == Class::Universal {
            return match info.tag {
                t if t == universal::BOOLEAN => {
                    if body.len() != 1 {
                        return Err(CodecError::InvalidValueLength("BOOLEAN must be one byte".into()));
                    }
                    Ok(Value::Boolean(body[0] != 0))
                }
                t if t == universal::INTEGER => Ok(Value::Integer(decode_integer(body)?)),
                t if t == universal::OCTET_STRING => Ok(Value::OctetString(body.to_vec())),
                t if t == universal::NULL => {
                    if !body.is_empty() {
                        return Err(CodecError::InvalidValueLength("NULL must be empty".into()));
                    }
                    Ok(Value::Null)
                }
                t if t == universal::OBJECT_IDENTIFIER => {
                    Ok(Value::ObjectIdentifier(ObjectIdentifier::from_ber_bytes(body)?))
                }
                t if t == universal::SEQUENCE => Ok(Value::Sequence(decode_sequence_items(body)?)),
                t if t == universal::SET => Ok(Value::Set(decode_sequence_items(body)?)),
                t => {
                    if let Some(kind) = StringKind::from_tag(t) {
                        Ok(Value::TextString {
                            kind,
                            text: String::from_utf8_lossy(body).into_owned(),
                        })
                    } else {
                        Ok(Value::Unknown { info, bytes: body.to_vec() })
                    }
                }
            };
        }

        if info.class == Class::Application {
            return match info.tag {
                t if t == application::IP_ADDRESS => {
                    if body.len() != 4 {
                        return Err(CodecError::InvalidValueLength("IpAddress must be 4 bytes".into()));
                    }
                    Ok(Value::IpAddress(Ipv4Addr::new(body[0], body[1], body[2], body[3])))
                }
                t if t == application::COUNTER32 => {
                    Ok(Value::Counter32(decode_unsigned_wrapping(body, 32)? as u32))
                }
                t if t == application::GAUGE32 => {
                    // Gauge32 saturates rather than wraps.
                    let raw = decode_unsigned_wrapping(body, 64)?;
                    Ok(Value::Gauge32(raw.min(u32::MAX as u64) as u32))
                }
                t if t == application::TIME_TICKS => {
                    Ok(Value::TimeTicks(decode_unsigned_wrapping(body, 32)? as u32))
                }
                t if t == application::OPAQUE => Ok(Value::Opaque(body.to_vec())),
                t if t == application::NSAP_ADDRESS => Ok(Value::NsapAddress(body.to_vec())),
                t if t == application::COUNTER64 => Ok(Value::Counter64(decode_unsigned_wrapping(body, 64)?)),
                _ => Ok(Value::Unknown { info, bytes: body.to_vec() }),
            };
        }

        if info.class == Class::Context {
            return match info.tag {
                t if t == context::NO_SUCH_OBJECT => Ok(Value::NoSuchObject),
                t if t == context::NO_SUCH_INSTANCE => Ok(Value::NoSuchInstance),
                t if t == context::END_OF_MIB_VIEW => Ok(Value::EndOfMibView),
                _ => Ok(Value::Unknown { info, bytes: body.to_vec() }),
            };
        }

        Ok(Value::Unknown { info, bytes: body.to_vec() })
    }

    /// TimeTicks expressed as a `Duration` (hundredths of seconds).
    pub fn as_time_ticks_duration(&self) -> Option<Duration> {
        match self {
            Value::TimeTicks(ticks) => Some(Duration::from_millis(u64::from(*ticks) * 10)),
            _ => None,
        }
    }
}

fn decode_sequence_items(mut body: &[u8]) -> Result<Vec<Value>, CodecError> {
    let mut items = Vec::new();
    while !body.is_empty() {
        let (value, rest) = decode(body)?;
        items.push(value);
        body = rest;
    }
    Ok(items)
}

/// Decode one TLV at the head of `data`, returning the value and the
/// remaining bytes.
pub fn decode(data: &[u8]) -> Result<(Value, &[u8]), CodecError> {
    let (info, body, rest) = crate::ber::pop_tlv(data)?;
    let value = Value::decode_value(info, body)?;
    Ok((value, rest))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::OctetString(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
            Value::Null => write!(f, "NULL"),
            Value::ObjectIdentifier(oid) => write!(f, "{oid}"),
            Value::Sequence(items) | Value::Set(items) => {
                write!(f, "[{}]", items.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", "))
            }
            Value::TextString { text, .. } => write!(f, "{text}"),
            Value::IpAddress(ip) => write!(f, "{ip}"),
            Value::Counter32(v) => write!(f, "{v}"),
            Value::Counter64(v) => write!(f, "{v}"),
            Value::Gauge32(v) => write!(f, "{v}"),
            Value::TimeTicks(v) => write!(f, "{v}"),
            Value::Opaque(bytes) => write!(f, "Opaque({} bytes)", bytes.len()),
            Value::NsapAddress(bytes) => write!(f, "NSAP({})", hex::encode(bytes)),
            Value::NoSuchObject => write!(f, "noSuchObject"),
            Value::NoSuchInstance => write!(f, "noSuchInstance"),
            Value::EndOfMibView => write!(f, "endOfMibView"),
            Value::Unknown { info, bytes } => write!(f, "Unknown({:?}, {} bytes)", info.tag, bytes.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_roundtrip_through_tlv() {
        let v = Value::Integer(300);
        let encoded = v.encode();
        assert_eq!(encoded, vec![0x02, 0x02, 0x01, 0x2c]);
        let (decoded, rest) = decode(&encoded).unwrap();
        assert_eq!(decoded, v);
        assert!(rest.is_empty());
    }

    #[test]
    fn ip_address_roundtrip() {
        let v = Value::IpAddress(Ipv4Addr::new(192, 0, 2, 1));
        let (decoded, _) = decode(&v.encode()).unwrap();
        assert_eq!(decoded, v);
    }

    #[test]
    fn counter32_overflow_wraps_on_decode() {
        let bytes = [0x01, 0x00, 0x00, 0x00, 0x28];
        let tlv = crate::ber::encode_tlv(TypeInfo::application(application::COUNTER32), &bytes);
        let (decoded, _) = decode(&tlv).unwrap();
        assert_eq!(decoded, Value::Counter32(40));
    }

    #[test]
    fn unknown_type_is_preserved_not_fatal() {
        let tlv = crate::ber::encode_tlv(TypeInfo::new(Class::Private, Pc::Primitive, 9), &[1, 2, 3]);
        let (decoded, _) = decode(&tlv).unwrap();
        match decoded {
            Value::Unknown { bytes, .. } => assert_eq!(bytes, vec![1, 2, 3]),
            other => panic!("expected Unknown, got {other:?}"),
        }
    }

    #[test]
    fn sequence_roundtrip() {
        let v = Value::Sequence(vec![Value::Integer(1), Value::Null]);
        let (decoded, _) = decode(&v.encode()).unwrap();
        assert_eq!(decoded, v);
    }
}

//! Wire envelopes: the v1/v2c `Message` (version, community, PDU) and the
//! v3 `ScopedPDU` (contextEngineID, contextName, PDU).
//!
//! These are written against raw TLV bytes rather than `Value::Sequence`
//! because the trailing field is a context-tagged PDU (tags 0-2 collide
//! with the VarBind sentinel tags `Value::decode` recognizes); popping
//! each field by hand keeps that disambiguation explicit instead of
//! leaning on the generic decoder to guess it.

use snmp_core::ber::{encode_tlv, pop_tlv};
use snmp_core::tag::{universal, Class, Pc, TypeInfo};
use snmp_core::{CodecError, Value};
use snmp_pdu::{Pdu, PduKind, ProtocolError};

use crate::error::MpmError;

fn sequence_tag() -> TypeInfo {
    TypeInfo::universal(Pc::Constructed, universal::SEQUENCE)
}

fn decode_octet_string(data: &[u8]) -> Result<(Vec<u8>, &[u8]), MpmError> {
    let (value, rest) = snmp_core::value::decode(data)?;
    match value {
        Value::OctetString(bytes) => Ok((bytes, rest)),
        other => Err(ProtocolError::Codec(CodecError::UnexpectedType {
            expected: "OCTET STRING".into(),
            found: format!("{other:?}"),
        })
        .into()),
    }
}

fn decode_integer(data: &[u8]) -> Result<(i64, &[u8]), MpmError> {
    let (value, rest) = snmp_core::value::decode(data)?;
    match value {
        Value::Integer(i) => Ok((i, rest)),
        other => Err(ProtocolError::Codec(CodecError::UnexpectedType {
            expected: "INTEGER".into(),
            found: format!("{other:?}"),
        })
        .into()),
    }
}

fn decode_pdu_tlv(data: &[u8]) -> Result<Pdu, MpmError> {
    let (info, body, rest) = pop_tlv(data)?;
    if !rest.is_empty() {
        return Err(ProtocolError::Codec(CodecError::InvalidLength).into());
    }
    if info.class != Class::Context {
        return Err(ProtocolError::Codec(CodecError::UnexpectedType {
            expected: "context-tagged PDU".into(),
            found: format!("{info:?}"),
        })
        .into());
    }
    let kind = PduKind::from_context_tag(info.tag).ok_or(ProtocolError::Codec(CodecError::InvalidTag))?;
    Ok(Pdu::decode_body(kind, body)?)
}

/// A plaintext v1/v2c message: `Sequence { version, community, pdu }`.
pub fn encode_v1_message(version: i64, community: &[u8], pdu: &Pdu) -> Vec<u8> {
    let mut body = Value::Integer(version).encode();
    body.extend(Value::OctetString(community.to_vec()).encode());
    body.extend(pdu.encode());
    encode_tlv(sequence_tag(), &body)
}

pub struct DecodedV1Message {
    pub version: i64,
    pub community: Vec<u8>,
    pub pdu: Pdu,
}

pub fn decode_v1_message(data: &[u8]) -> Result<DecodedV1Message, MpmError> {
    let (info, body, rest) = pop_tlv(data)?;
    if info.class != Class::Universal || info.tag != universal::SEQUENCE || !rest.is_empty() {
        return Err(ProtocolError::Codec(CodecError::UnexpectedType {
            expected: "SEQUENCE".into(),
            found: format!("{info:?}"),
        })
        .into());
    }
    let (version, rest) = decode_integer(body)?;
    let (community, rest) = decode_octet_string(rest)?;
    let pdu = decode_pdu_tlv(rest)?;
    Ok(DecodedV1Message { version, community, pdu })
}

/// `ScopedPDU ::= Sequence { contextEngineID OCTET STRING, contextName
/// OCTET STRING, data PDU }` (RFC 3412 §3.1), the payload a v3 message
/// carries either in the clear or as `PrivacyProtocol::encrypt`'s
/// ciphertext.
pub struct ScopedPdu {
    pub context_engine_id: Vec<u8>,
    pub context_name: Vec<u8>,
    pub pdu: Pdu,
}

impl ScopedPdu {
    pub fn new(context_engine_id: Vec<u8>, context_name: Vec<u8>, pdu: Pdu) -> Self {
        ScopedPdu { context_engine_id, context_name, pdu }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut body = Value::OctetString(self.context_engine_id.clone()).encode();
        body.extend(Value::OctetString(self.context_name.clone()).encode());
        body.extend(self.pdu.encode());
        encode_tlv(sequence_tag(), &body)
    }

    pub fn decode(data: &[u8]) -> Result<ScopedPdu, MpmError> {
        let (scoped, rest) = Self::decode_prefix(data)?;
        if !rest.is_empty() {
            return Err(ProtocolError::Codec(CodecError::InvalidLength).into());
        }
        Ok(scoped)
    }

    /// Like `decode`, but tolerates trailing bytes after the ScopedPDU's
    /// TLV. A privacy protocol that pads plaintext to its cipher's block
    /// size (DES-CBC) leaves that padding appended after decryption; the
    /// ScopedPDU's own BER length already marks where its encoding ends, so
    /// the excess is discarded rather than treated as a framing error.
    pub fn decode_prefix(data: &[u8]) -> Result<(ScopedPdu, &[u8]), MpmError> {
        let (info, body, rest) = pop_tlv(data)?;
        if info.class != Class::Universal || info.tag != universal::SEQUENCE {
            return Err(ProtocolError::Codec(CodecError::UnexpectedType {
                expected: "ScopedPDU SEQUENCE".into(),
                found: format!("{info:?}"),
            })
            .into());
        }
        let (context_engine_id, body_rest) = decode_octet_string(body)?;
        let (context_name, body_rest) = decode_octet_string(body_rest)?;
        let pdu = decode_pdu_tlv(body_rest)?;
        Ok((ScopedPdu { context_engine_id, context_name, pdu }, rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snmp_core::ObjectIdentifier;

    #[test]
    fn v1_message_roundtrip() {
        let oid: ObjectIdentifier = "1.3.6.1.2.1.1.1.0".parse().unwrap();
        let pdu = Pdu::get_request(7, &[oid]);
        let bytes = encode_v1_message(0, b"public", &pdu);
        let decoded = decode_v1_message(&bytes).unwrap();
        assert_eq!(decoded.version, 0);
        assert_eq!(decoded.community, b"public");
        assert_eq!(decoded.pdu.request_id, 7);
    }

    #[test]
    fn scoped_pdu_roundtrip() {
        let oid: ObjectIdentifier = "1.3.6.1.2.1.1.1.0".parse().unwrap();
        let pdu = Pdu::get_request(9, &[oid]);
        let scoped = ScopedPdu::new(b"engine-id".to_vec(), Vec::new(), pdu);
        let bytes = scoped.encode();
        let decoded = ScopedPdu::decode(&bytes).unwrap();
        assert_eq!(decoded.context_engine_id, b"engine-id");
        assert_eq!(decoded.pdu.request_id, 9);
    }
}

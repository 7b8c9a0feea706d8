//! `UsmSecurityParameters ::= Sequence` (RFC 3414 §2.4), the structure
//! carried opaquely inside a v3 message's `msgSecurityParameters` OCTET
//! STRING.

use snmp_core::ber::{encode_tlv, pop_tlv};
use snmp_core::tag::{universal, Class, Pc, TypeInfo};
use snmp_core::{CodecError, Value};
use snmp_pdu::ProtocolError;

use crate::error::MpmError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsmSecurityParameters {
    pub authoritative_engine_id: Vec<u8>,
    pub authoritative_engine_boots: u32,
    pub authoritative_engine_time: u32,
    pub user_name: Vec<u8>,
    pub auth_parameters: Vec<u8>,
    pub priv_parameters: Vec<u8>,
}

impl UsmSecurityParameters {
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Value::OctetString(self.authoritative_engine_id.clone()).encode();
        body.extend(Value::Integer(self.authoritative_engine_boots as i64).encode());
        body.extend(Value::Integer(self.authoritative_engine_time as i64).encode());
        body.extend(Value::OctetString(self.user_name.clone()).encode());
        body.extend(Value::OctetString(self.auth_parameters.clone()).encode());
        body.extend(Value::OctetString(self.priv_parameters.clone()).encode());
        encode_tlv(TypeInfo::universal(Pc::Constructed, universal::SEQUENCE), &body)
    }

    pub fn decode(data: &[u8]) -> Result<UsmSecurityParameters, MpmError> {
        let (value, rest) = snmp_core::value::decode(data)?;
        if !rest.is_empty() {
            return Err(ProtocolError::Codec(CodecError::InvalidLength).into());
        }
        let items = match value {
            Value::Sequence(items) => items,
            other => {
                return Err(ProtocolError::Codec(CodecError::UnexpectedType {
                    expected: "UsmSecurityParameters SEQUENCE".into(),
                    found: format!("{other:?}"),
                })
                .into())
            }
        };
        if items.len() != 6 {
            return Err(ProtocolError::Codec(CodecError::InvalidLength).into());
        }
        let mut it = items.into_iter();
        let authoritative_engine_id = expect_octet_string(it.next().unwrap())?;
        let authoritative_engine_boots = expect_u32(it.next().unwrap())?;
        let authoritative_engine_time = expect_u32(it.next().unwrap())?;
        let user_name = expect_octet_string(it.next().unwrap())?;
        let auth_parameters = expect_octet_string(it.next().unwrap())?;
        let priv_parameters = expect_octet_string(it.next().unwrap())?;
        Ok(UsmSecurityParameters {
            authoritative_engine_id,
            authoritative_engine_boots,
            authoritative_engine_time,
            user_name,
            auth_parameters,
            priv_parameters,
        })
    }
}

fn expect_octet_string(value: Value) -> Result<Vec<u8>, MpmError> {
    match value {
        Value::OctetString(bytes) => Ok(bytes),
        other => Err(ProtocolError::Codec(CodecError::UnexpectedType {
            expected: "OCTET STRING".into(),
            found: format!("{other:?}"),
        })
        .into()),
    }
}

fn expect_u32(value: Value) -> Result<u32, MpmError> {
    match value {
        Value::Integer(i) if i >= 0 => Ok(i as u32),
        other => Err(ProtocolError::Codec(CodecError::UnexpectedType {
            expected: "non-negative INTEGER".into(),
            found: format!("{other:?}"),
        })
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let params = UsmSecurityParameters {
            authoritative_engine_id: b"engine".to_vec(),
            authoritative_engine_boots: 4,
            authoritative_engine_time: 1000,
            user_name: b"alice".to_vec(),
            auth_parameters: vec![0u8; 12],
            priv_parameters: vec![1u8; 8],
        };
        let bytes = params.encode();
        let decoded = UsmSecurityParameters::decode(&bytes).unwrap();
        assert_eq!(decoded, params);
    }
}

//! PDU layer (C4): the nine PDU kinds, their context-class tags, and
//! definite-length SEQUENCE encoding.

use snmp_core::{ObjectIdentifier, Value};
use snmp_core::tag::{Class, Pc, TypeInfo};

use crate::error::{error_status_name, ProtocolError};
use crate::varbind::VarBind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PduKind {
    GetRequest,
    GetNextRequest,
    GetResponse,
    SetRequest,
    TrapV1,
    GetBulkRequest,
    InformRequest,
    TrapV2,
    Report,
}

impl PduKind {
    pub fn context_tag(self) -> u32 {
        match self {
            PduKind::GetRequest => 0,
            PduKind::GetNextRequest => 1,
            PduKind::GetResponse => 2,
            PduKind::SetRequest => 3,
            PduKind::TrapV1 => 4,
            PduKind::GetBulkRequest => 5,
            PduKind::InformRequest => 6,
            PduKind::TrapV2 => 7,
            PduKind::Report => 8,
        }
    }

    pub fn from_context_tag(tag: u32) -> Option<PduKind> {
        Some(match tag {
            0 => PduKind::GetRequest,
            1 => PduKind::GetNextRequest,
            2 => PduKind::GetResponse,
            3 => PduKind::SetRequest,
            4 => PduKind::TrapV1,
            5 => PduKind::GetBulkRequest,
            6 => PduKind::InformRequest,
            7 => PduKind::TrapV2,
            8 => PduKind::Report,
            _ => return None,
        })
    }

    fn type_info(self) -> TypeInfo {
        TypeInfo::new(Class::Context, Pc::Constructed, self.context_tag())
    }
}

/// The second/third fields of a PDU: `error_status/error_index` for
/// everything except `GetBulkRequest`, which instead carries
/// `non_repeaters/max_repetitions`. Modeling this as an enum rather than
/// two fields that are meaningless outside GetBulkRequest is a
/// reimplementation-only tightening (see DESIGN.md); the wire bytes are
/// identical either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PduCounters {
    ErrorFields { error_status: u32, error_index: u32 },
    BulkFields { non_repeaters: u32, max_repetitions: u32 },
}

impl PduCounters {
    fn encode(self) -> (Value, Value) {
        match self {
            PduCounters::ErrorFields { error_status, error_index } => {
                (Value::Integer(error_status as i64), Value::Integer(error_index as i64))
            }
            PduCounters::BulkFields { non_repeaters, max_repetitions } => {
                (Value::Integer(non_repeaters as i64), Value::Integer(max_repetitions as i64))
            }
        }
    }
}

/// The v1-only Trap-PDU fields, carried separately because v1 traps use a
/// structurally different body than every other PDU kind.
#[derive(Debug, Clone, PartialEq)]
pub struct TrapV1Info {
    pub enterprise: ObjectIdentifier,
    pub agent_addr: std::net::Ipv4Addr,
    pub generic_trap: i64,
    pub specific_trap: i64,
    pub timestamp: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pdu {
    pub kind: PduKind,
    pub request_id: i32,
    pub counters: PduCounters,
    pub varbinds: Vec<VarBind>,
    pub trap_v1: Option<TrapV1Info>,
}

impl Pdu {
    pub fn new(kind: PduKind, request_id: i32, counters: PduCounters, varbinds: Vec<VarBind>) -> Self {
        Pdu { kind, request_id, counters, varbinds, trap_v1: None }
    }

    pub fn get_request(request_id: i32, oids: &[ObjectIdentifier]) -> Self {
        let varbinds = oids.iter().cloned().map(VarBind::null).collect();
        Pdu::new(
            PduKind::GetRequest,
            request_id,
            PduCounters::ErrorFields { error_status: 0, error_index: 0 },
            varbinds,
        )
    }

    pub fn get_next_request(request_id: i32, oids: &[ObjectIdentifier]) -> Self {
        let varbinds = oids.iter().cloned().map(VarBind::null).collect();
        Pdu::new(
            PduKind::GetNextRequest,
            request_id,
            PduCounters::ErrorFields { error_status: 0, error_index: 0 },
            varbinds,
        )
    }

    pub fn set_request(request_id: i32, varbinds: Vec<VarBind>) -> Self {
        Pdu::new(
            PduKind::SetRequest,
            request_id,
            PduCounters::ErrorFields { error_status: 0, error_index: 0 },
            varbinds,
        )
    }

    pub fn get_bulk_request(
        request_id: i32,
        non_repeaters: u32,
        max_repetitions: u32,
        oids: &[ObjectIdentifier],
    ) -> Result<Self, ProtocolError> {
        if non_repeaters as usize > oids.len() {
            return Err(ProtocolError::InvalidBulkCounters);
        }
        let varbinds = oids.iter().cloned().map(VarBind::null).collect();
        Ok(Pdu::new(
            PduKind::GetBulkRequest,
            request_id,
            PduCounters::BulkFields { non_repeaters, max_repetitions },
            varbinds,
        ))
    }

    /// Encode the PDU body as a `Value::Sequence` (without the context tag
    /// wrapper — callers needing the full TLV should call `encode`).
    pub fn encode_inner(&self) -> Value {
        if let Some(trap) = &self.trap_v1 {
            return Value::Sequence(vec![
                Value::ObjectIdentifier(trap.enterprise.clone()),
                Value::IpAddress(trap.agent_addr),
                Value::Integer(trap.generic_trap),
                Value::Integer(trap.specific_trap),
                Value::TimeTicks(trap.timestamp),
                Value::Sequence(self.varbinds.iter().map(VarBind::encode).collect()),
            ]);
        }
        let (second, third) = self.counters.encode();
        Value::Sequence(vec![
            Value::Integer(self.request_id as i64),
            second,
            third,
            Value::Sequence(self.varbinds.iter().map(VarBind::encode).collect()),
        ])
    }

    pub fn encode(&self) -> Vec<u8> {
        snmp_core::ber::encode_tlv(self.kind.type_info(), &self.encode_inner().encode_value())
    }

    /// Decode a PDU body given its already-identified kind.
    pub fn decode_body(kind: PduKind, body: &[u8]) -> Result<Pdu, ProtocolError> {
        let (value, rest) = snmp_core::value::decode(body)?;
        if !rest.is_empty() {
            return Err(ProtocolError::Codec(snmp_core::CodecError::InvalidLength));
        }
        let items = match value {
            Value::Sequence(items) => items,
            other => {
                return Err(ProtocolError::Codec(snmp_core::CodecError::UnexpectedType {
                    expected: "SEQUENCE".into(),
                    found: format!("{other:?}"),
                }))
            }
        };

        if kind == PduKind::TrapV1 {
            return Self::decode_trap_v1(items);
        }

        if items.len() != 4 {
            return Err(ProtocolError::Codec(snmp_core::CodecError::InvalidLength));
        }
        let mut it = items.into_iter();
        let request_id = match it.next().unwrap() {
            Value::Integer(i) => i32::try_from(i).map_err(|_| ProtocolError::InvalidRequestId)?,
            _ => return Err(ProtocolError::InvalidRequestId),
        };
        let second = as_u32(it.next().unwrap())?;
        let third = as_u32(it.next().unwrap())?;
        let varbind_list = match it.next().unwrap() {
            Value::Sequence(vs) => vs,
            other => {
                return Err(ProtocolError::Codec(snmp_core::CodecError::UnexpectedType {
                    expected: "VarBindList SEQUENCE".into(),
                    found: format!("{other:?}"),
                }))
            }
        };
        let varbinds: Result<Vec<VarBind>, ProtocolError> =
            varbind_list.into_iter().map(VarBind::try_from_value).collect();
        let varbinds = varbinds?;

        let counters = if kind == PduKind::GetBulkRequest {
            PduCounters::BulkFields { non_repeaters: second, max_repetitions: third }
        } else {
            PduCounters::ErrorFields { error_status: second, error_index: third }
        };

        let pdu = Pdu { kind, request_id, counters, varbinds, trap_v1: None };
        pdu.validate()?;
        Ok(pdu)
    }

    fn decode_trap_v1(items: Vec<Value>) -> Result<Pdu, ProtocolError> {
        if items.len() != 6 {
            return Err(ProtocolError::Codec(snmp_core::CodecError::InvalidLength));
        }
        let mut it = items.into_iter();
        let enterprise = match it.next().unwrap() {
            Value::ObjectIdentifier(oid) => oid,
            _ => return Err(unexpected("OBJECT IDENTIFIER")),
        };
        let agent_addr = match it.next().unwrap() {
            Value::IpAddress(ip) => ip,
            _ => return Err(unexpected("IpAddress")),
        };
        let generic_trap = match it.next().unwrap() {
            Value::Integer(i) => i,
            _ => return Err(unexpected("INTEGER")),
        };
        let specific_trap = match it.next().unwrap() {
            Value::Integer(i) => i,
            _ => return Err(unexpected("INTEGER")),
        };
        let timestamp = match it.next().unwrap() {
            Value::TimeTicks(t) => t,
            _ => return Err(unexpected("TimeTicks")),
        };
        let varbind_list = match it.next().unwrap() {
            Value::Sequence(vs) => vs,
            _ => return Err(unexpected("VarBindList SEQUENCE")),
        };
        let varbinds: Result<Vec<VarBind>, ProtocolError> =
            varbind_list.into_iter().map(VarBind::try_from_value).collect();

        Ok(Pdu {
            kind: PduKind::TrapV1,
            request_id: 0,
            counters: PduCounters::ErrorFields { error_status: 0, error_index: 0 },
            varbinds: varbinds?,
            trap_v1: Some(TrapV1Info { enterprise, agent_addr, generic_trap, specific_trap, timestamp }),
        })
    }

    /// Validation rules: bulk counters non-negative (guaranteed by the
    /// `u32` type itself once parsed), and a response
    /// with `error_status != 0` must have `error_index` either 0 (the
    /// offending OID is unspecified — never index into varbinds) or within
    /// `[1, len(varbinds)]`.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if let PduCounters::ErrorFields { error_status, error_index } = self.counters {
            if error_status != 0 && error_index != 0 {
                let len = self.varbinds.len();
                if error_index as usize > len {
                    return Err(ProtocolError::InvalidErrorIndex { index: error_index, len });
                }
            }
        }
        Ok(())
    }

    /// If this PDU is an error response, the status name and the
    /// best-effort offending OID (per the `error_index == 0` edge case:
    /// surface without indexing).
    pub fn error_response(&self) -> Option<(u32, &'static str, Option<ObjectIdentifier>)> {
        let PduCounters::ErrorFields { error_status, error_index } = self.counters else {
            return None;
        };
        if error_status == 0 {
            return None;
        }
        let offending = if error_index > 0 {
            self.varbinds.get(error_index as usize - 1).map(|vb| vb.oid.clone())
        } else {
            None
        };
        Some((error_status, error_status_name(error_status), offending))
    }
}

fn as_u32(value: Value) -> Result<u32, ProtocolError> {
    match value {
        Value::Integer(i) if i >= 0 => Ok(i as u32),
        _ => Err(ProtocolError::InvalidBulkCounters),
    }
}

fn unexpected(expected: &str) -> ProtocolError {
    ProtocolError::Codec(snmp_core::CodecError::UnexpectedType {
        expected: expected.into(),
        found: "other".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_request_roundtrip() {
        let oid: ObjectIdentifier = "1.3.6.1.2.1.1.1.0".parse().unwrap();
        let pdu = Pdu::get_request(1, &[oid.clone()]);
        let bytes = pdu.encode();
        let (info, body, rest) = snmp_core::ber::pop_tlv(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(info, PduKind::GetRequest.type_info());
        let decoded = Pdu::decode_body(PduKind::GetRequest, body).unwrap();
        assert_eq!(decoded.request_id, 1);
        assert_eq!(decoded.varbinds.len(), 1);
        assert_eq!(decoded.varbinds[0].oid, oid);
    }

    #[test]
    fn get_bulk_rejects_too_many_non_repeaters() {
        let oid: ObjectIdentifier = "1.3.6.1.2.1.2.2".parse().unwrap();
        assert!(Pdu::get_bulk_request(1, 5, 10, &[oid]).is_err());
    }

    #[test]
    fn error_index_zero_never_panics_on_empty_varbinds() {
        let pdu = Pdu::new(
            PduKind::GetResponse,
            1,
            PduCounters::ErrorFields { error_status: 5, error_index: 0 },
            vec![],
        );
        assert!(pdu.validate().is_ok());
        let (status, name, oid) = pdu.error_response().unwrap();
        assert_eq!(status, 5);
        assert_eq!(name, "genErr");
        assert!(oid.is_none());
    }

    #[test]
    fn error_index_out_of_range_is_rejected() {
        let pdu = Pdu::new(
            PduKind::GetResponse,
            1,
            PduCounters::ErrorFields { error_status: 2, error_index: 3 },
            vec![],
        );
        assert!(pdu.validate().is_err());
    }

    #[test]
    fn trap_v1_roundtrip() {
        let mut pdu = Pdu::new(
            PduKind::TrapV1,
            0,
            PduCounters::ErrorFields { error_status: 0, error_index: 0 },
            vec![],
        );
        pdu.trap_v1 = Some(TrapV1Info {
            enterprise: "1.3.6.1.4.1.8072".parse().unwrap(),
            agent_addr: std::net::Ipv4Addr::new(10, 0, 0, 1),
            generic_trap: 6,
            specific_trap: 1,
            timestamp: 12345,
        });
        let bytes = pdu.encode();
        let (_, body, _) = snmp_core::ber::pop_tlv(&bytes).unwrap();
        let decoded = Pdu::decode_body(PduKind::TrapV1, body).unwrap();
        assert_eq!(decoded.trap_v1.unwrap().specific_trap, 1);
    }
}

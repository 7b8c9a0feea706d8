use snmp_core::{ObjectIdentifier, Value};

/// A `(OID, Value)` pair exchanged inside a PDU's VarBindList.
#[derive(Debug, Clone, PartialEq)]
pub struct VarBind {
    pub oid: ObjectIdentifier,
    pub value: Value,
}

impl VarBind {
    pub fn new(oid: ObjectIdentifier, value: Value) -> Self {
        VarBind { oid, value }
    }

    /// A VarBind carrying NULL, as used in GET/GETNEXT/GETBULK requests.
    pub fn null(oid: ObjectIdentifier) -> Self {
        VarBind { oid, value: Value::Null }
    }

    pub(crate) fn encode(&self) -> Value {
        Value::Sequence(vec![Value::ObjectIdentifier(self.oid.clone()), self.value.clone()])
    }

    pub(crate) fn try_from_value(value: Value) -> Result<VarBind, crate::error::ProtocolError> {
        match value {
            Value::Sequence(mut items) if items.len() == 2 => {
                let value = items.pop().unwrap();
                let oid_value = items.pop().unwrap();
                let oid = match oid_value {
                    Value::ObjectIdentifier(oid) => oid,
                    _ => return Err(crate::error::ProtocolError::Codec(snmp_core::CodecError::UnexpectedType {
                        expected: "OBJECT IDENTIFIER".into(),
                        found: format!("{oid_value:?}"),
                    })),
                };
                Ok(VarBind { oid, value })
            }
            other => Err(crate::error::ProtocolError::Codec(snmp_core::CodecError::UnexpectedType {
                expected: "VarBind SEQUENCE{OID, Value}".into(),
                found: format!("{other:?}"),
            })),
        }
    }

    /// True if the value is one of the three "no value here" sentinels.
    pub fn is_sentinel(&self) -> bool {
        matches!(self.value, Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView)
    }
}

//! X.690 §8.1.2 tag octet handling: class, primitive/constructed bit, tag number.

/// Tag class, the top two bits of the identifier octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Class {
    Universal,
    Application,
    Context,
    Private,
}

impl Class {
    fn from_bits(bits: u8) -> Class {
        match bits {
            0b00 => Class::Universal,
            0b01 => Class::Application,
            0b10 => Class::Context,
            _ => Class::Private,
        }
    }

    fn bits(self) -> u8 {
        match self {
            Class::Universal => 0b00,
            Class::Application => 0b01,
            Class::Context => 0b10,
            Class::Private => 0b11,
        }
    }
}

/// Primitive/constructed bit (bit 6 of the identifier octet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pc {
    Primitive,
    Constructed,
}

/// Universal tag numbers used by the SNMP wire format.
pub mod universal {
    pub const BOOLEAN: u32 = 0x01;
    pub const INTEGER: u32 = 0x02;
    pub const OCTET_STRING: u32 = 0x04;
    pub const NULL: u32 = 0x05;
    pub const OBJECT_IDENTIFIER: u32 = 0x06;
    pub const SEQUENCE: u32 = 0x10;
    pub const SET: u32 = 0x11;
    pub const PRINTABLE_STRING: u32 = 0x13;
    pub const IA5_STRING: u32 = 0x16;
    pub const UTC_TIME: u32 = 0x17;
}

/// Application tag numbers registered for SNMP (C3).
pub mod application {
    pub const IP_ADDRESS: u32 = 0x00;
    pub const COUNTER32: u32 = 0x01;
    pub const GAUGE32: u32 = 0x02;
    pub const TIME_TICKS: u32 = 0x03;
    pub const OPAQUE: u32 = 0x04;
    pub const NSAP_ADDRESS: u32 = 0x05;
    pub const COUNTER64: u32 = 0x06;
}

/// Context tag numbers used as VarBind value sentinels (the remaining
/// context tags — PDU kinds — live in `snmp-pdu`).
pub mod context {
    pub const NO_SUCH_OBJECT: u32 = 0x00;
    pub const NO_SUCH_INSTANCE: u32 = 0x01;
    pub const END_OF_MIB_VIEW: u32 = 0x02;
}

/// `(class, constructed?, tag number)`, the logical decomposition of an
/// X.690 identifier octet (or octets, for tag numbers ≥ 31).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    pub class: Class,
    pub pc: Pc,
    pub tag: u32,
}

impl TypeInfo {
    pub const fn new(class: Class, pc: Pc, tag: u32) -> Self {
        TypeInfo { class, pc, tag }
    }

    pub const fn universal(pc: Pc, tag: u32) -> Self {
        TypeInfo::new(Class::Universal, pc, tag)
    }

    pub const fn application(tag: u32) -> Self {
        TypeInfo::new(Class::Application, Pc::Primitive, tag)
    }

    pub const fn context(tag: u32) -> Self {
        TypeInfo::new(Class::Context, Pc::Primitive, tag)
    }

    pub fn is_constructed(&self) -> bool {
        matches!(self.pc, Pc::Constructed)
    }

    /// Encode the identifier octet(s), short form when `tag < 31`, long
    /// form (base-128 VLQ, continuation bit set on all but the last byte)
    /// otherwise.
    pub fn encode(&self, out: &mut Vec<u8>) {
        let pc_bit = match self.pc {
            Pc::Primitive => 0,
            Pc::Constructed => 1 << 5,
        };
        let class_bits = self.class.bits() << 6;
        if self.tag < 31 {
            out.push(class_bits | pc_bit | self.tag as u8);
        } else {
            out.push(class_bits | pc_bit | 0x1F);
            let mut chunks = Vec::new();
            let mut n = self.tag;
            chunks.push((n & 0x7F) as u8);
            n >>= 7;
            while n > 0 {
                chunks.push(((n & 0x7F) as u8) | 0x80);
                n >>= 7;
            }
            chunks.reverse();
            out.extend_from_slice(&chunks);
        }
    }

    /// Parse the identifier octet(s) at the head of `data`, returning the
    /// parsed `TypeInfo` and the remainder.
    pub fn parse(data: &[u8]) -> Result<(TypeInfo, &[u8]), crate::error::CodecError> {
        let first = *data.first().ok_or(crate::error::CodecError::IncompleteData)?;
        let class = Class::from_bits(first >> 6);
        let pc = if first & 0x20 != 0 { Pc::Constructed } else { Pc::Primitive };
        let low = first & 0x1F;
        if low != 0x1F {
            return Ok((TypeInfo::new(class, pc, low as u32), &data[1..]));
        }
        let mut rest = &data[1..];
        let mut tag: u32 = 0;
        loop {
            let byte = *rest.first().ok_or(crate::error::CodecError::IncompleteData)?;
            tag = tag
                .checked_shl(7)
                .and_then(|v| v.checked_add((byte & 0x7F) as u32))
                .ok_or(crate::error::CodecError::InvalidTag)?;
            rest = &rest[1..];
            if byte & 0x80 == 0 {
                break;
            }
        }
        Ok((TypeInfo::new(class, pc, tag), rest))
    }
}

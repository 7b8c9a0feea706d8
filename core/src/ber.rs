//! Definite-length TLV framing (X.690 §8.1).

use crate::error::CodecError;
use crate::tag::TypeInfo;

/// Encode a definite-length header: short form for len < 128, long form
/// `0x80 | n` followed by `n` big-endian length bytes otherwise, using the
/// minimum number of length bytes.
pub fn encode_length(len: usize, out: &mut Vec<u8>) {
    if len < 128 {
        out.push(len as u8);
    } else {
        let bytes = len.to_be_bytes();
        let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
        let significant = &bytes[first_nonzero..];
        out.push(0x80 | significant.len() as u8);
        out.extend_from_slice(significant);
    }
}

/// Decode a definite-length header, rejecting the indefinite-length form
/// (SNMP forbids it).
pub fn decode_length(data: &[u8]) -> Result<(usize, &[u8]), CodecError> {
    let first = *data.first().ok_or(CodecError::IncompleteData)?;
    let rest = &data[1..];
    if first & 0x80 == 0 {
        return Ok((first as usize, rest));
    }
    let n = (first & 0x7F) as usize;
    if n == 0 {
        // indefinite length form, not permitted on the wire
        return Err(CodecError::InvalidLength);
    }
    if rest.len() < n {
        return Err(CodecError::IncompleteData);
    }
    if n > std::mem::size_of::<usize>() {
        return Err(CodecError::InvalidLength);
    }
    let mut len: usize = 0;
    for &b in &rest[..n] {
        len = len
            .checked_shl(8)
            .and_then(|v| v.checked_add(b as usize))
            .ok_or(CodecError::InvalidLength)?;
    }
    Ok((len, &rest[n..]))
}

/// Encode a full TLV: identifier octet(s), definite length, body.
pub fn encode_tlv(info: TypeInfo, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 8);
    info.encode(&mut out);
    encode_length(body.len(), &mut out);
    out.extend_from_slice(body);
    out
}

/// Decode one TLV at the head of `data`, returning `(type_info, body,
/// rest_of_buffer)`.
pub fn pop_tlv(data: &[u8]) -> Result<(TypeInfo, &[u8], &[u8]), CodecError> {
    let (info, rest) = TypeInfo::parse(data)?;
    let (len, rest) = decode_length(rest)?;
    if rest.len() < len {
        return Err(CodecError::IncompleteData);
    }
    let (body, rest) = rest.split_at(len);
    Ok((info, body, rest))
}

/// Two's-complement, minimum-length signed integer encoding (strips
/// redundant leading 0x00/0xFF while preserving the sign bit; zero encodes
/// as a single 0x00 byte).
pub fn encode_integer(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let keep_going = if bytes[start] == 0x00 {
            bytes[start + 1] & 0x80 == 0
        } else if bytes[start] == 0xFF {
            bytes[start + 1] & 0x80 != 0
        } else {
            false
        };
        if keep_going {
            start += 1;
        } else {
            break;
        }
    }
    bytes[start..].to_vec()
}

pub fn decode_integer(bytes: &[u8]) -> Result<i64, CodecError> {
    if bytes.is_empty() {
        return Err(CodecError::InvalidValueLength("empty INTEGER".into()));
    }
    if bytes.len() > 8 {
        return Err(CodecError::InvalidValueLength("INTEGER too wide for i64".into()));
    }
    let negative = bytes[0] & 0x80 != 0;
    let mut buf = [if negative { 0xFFu8 } else { 0x00 }; 8];
    let offset = 8 - bytes.len();
    buf[offset..].copy_from_slice(bytes);
    Ok(i64::from_be_bytes(buf))
}

/// Minimum-length unsigned big-endian encoding, used by Counter32/Gauge32/
/// TimeTicks/Counter64. A leading 0x00 pad byte is inserted when the high
/// bit of the first significant byte is set, so the value is never
/// misread as a negative INTEGER by a generic BER reader.
pub fn encode_unsigned(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        out.push((value & 0xFF) as u8);
        value >>= 8;
        if value == 0 {
            break;
        }
    }
    out.reverse();
    if out[0] & 0x80 != 0 {
        out.insert(0, 0x00);
    }
    out
}

/// Decode an unsigned integer, wrapping modulo `2^bits` on overflow — the
/// documented divergence for Counter32/Gauge32/TimeTicks (32 bits) and
/// Counter64 (64 bits).
pub fn decode_unsigned_wrapping(bytes: &[u8], bits: u32) -> Result<u64, CodecError> {
    if bytes.is_empty() {
        return Err(CodecError::InvalidValueLength("empty unsigned value".into()));
    }
    let mut acc: u128 = 0;
    for &b in bytes {
        acc = (acc << 8) | b as u128;
    }
    let modulus: u128 = 1u128 << bits;
    Ok((acc % modulus) as u64)
}

pub fn encode_base128(mut value: u32) -> Vec<u8> {
    let mut chunks = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        chunks.push(((value & 0x7F) as u8) | 0x80);
        value >>= 7;
    }
    chunks.reverse();
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_encodings_match_spec_examples() {
        assert_eq!(encode_integer(300), vec![0x01, 0x2c]);
        assert_eq!(encode_integer(-1), vec![0xff]);
        assert_eq!(encode_integer(0), vec![0x00]);
    }

    #[test]
    fn integer_roundtrip() {
        for v in [-1i64, 0, 1, 127, 128, -129, 300, i32::MAX as i64, i32::MIN as i64] {
            let enc = encode_integer(v);
            assert_eq!(decode_integer(&enc).unwrap(), v);
        }
    }

    #[test]
    fn length_short_and_long_form() {
        let mut out = Vec::new();
        encode_length(5, &mut out);
        assert_eq!(out, vec![0x05]);

        let mut out = Vec::new();
        encode_length(200, &mut out);
        assert_eq!(out, vec![0x81, 0xc8]);

        let (len, rest) = decode_length(&[0x81, 0xc8]).unwrap();
        assert_eq!(len, 200);
        assert!(rest.is_empty());
    }

    #[test]
    fn rejects_indefinite_length() {
        assert!(decode_length(&[0x80]).is_err());
    }

    #[test]
    fn counter32_wraps_on_overflow() {
        // 2^32 + 40, five-byte extended encoding an agent might return.
        let bytes = [0x01, 0x00, 0x00, 0x00, 0x28];
        assert_eq!(decode_unsigned_wrapping(&bytes, 32).unwrap(), 40);
    }
}

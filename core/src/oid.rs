//! Object Identifier: an ordered sequence of non-negative integers.

use std::fmt;
use std::str::FromStr;

use crate::error::CodecError;

/// An ASN.1 OBJECT IDENTIFIER. Immutable after construction; length ≥ 2,
/// first node ≤ 2, second node < 40 when the first node is 0 or 1
/// (X.690 §8.19.4).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectIdentifier(Vec<u32>);

impl ObjectIdentifier {
    pub fn new(nodes: Vec<u32>) -> Result<Self, CodecError> {
        if nodes.len() < 2 {
            return Err(CodecError::InvalidValueLength(
                "OID must have at least two nodes".into(),
            ));
        }
        if nodes[0] > 2 {
            return Err(CodecError::InvalidValueLength(
                "OID first node must be 0, 1, or 2".into(),
            ));
        }
        if nodes[0] < 2 && nodes[1] >= 40 {
            return Err(CodecError::InvalidValueLength(
                "OID second node must be < 40 when first node is 0 or 1".into(),
            ));
        }
        Ok(ObjectIdentifier(nodes))
    }

    pub fn components(&self) -> &[u32] {
        &self.0
    }

    /// True iff `self` is a proper prefix of `other`.
    pub fn parent_of(&self, other: &ObjectIdentifier) -> bool {
        self.0.len() < other.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// True iff `other` is a proper prefix of `self`.
    pub fn child_of(&self, other: &ObjectIdentifier) -> bool {
        other.parent_of(self)
    }

    /// Append a sub-identifier, returning a new OID (OIDs are immutable).
    pub fn child(&self, node: u32) -> ObjectIdentifier {
        let mut nodes = self.0.clone();
        nodes.push(node);
        ObjectIdentifier(nodes)
    }

    /// The trailing sub-identifiers after stripping the given prefix, if
    /// `prefix` actually prefixes `self`.
    pub fn suffix_after(&self, prefix: &ObjectIdentifier) -> Option<&[u32]> {
        if prefix.0.len() <= self.0.len() && self.0[..prefix.0.len()] == prefix.0[..] {
            Some(&self.0[prefix.0.len()..])
        } else {
            None
        }
    }
}

impl ObjectIdentifier {
    /// Encode per X.690 §8.19: first byte = 40*a+b, remaining nodes as
    /// base-128 VLQs.
    pub fn to_ber_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.push((self.0[0] * 40 + self.0[1]) as u8);
        for &node in &self.0[2..] {
            out.extend_from_slice(&crate::ber::encode_base128(node));
        }
        out
    }

    pub fn from_ber_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.is_empty() {
            return Err(CodecError::InvalidValueLength("empty OBJECT IDENTIFIER".into()));
        }
        let first = bytes[0];
        let (a, b) = if first < 40 {
            (0u32, first as u32)
        } else if first < 80 {
            (1u32, (first - 40) as u32)
        } else {
            (2u32, (first - 80) as u32)
        };
        let mut nodes = vec![a, b];
        let mut acc: u32 = 0;
        let mut have_bits = false;
        for &byte in &bytes[1..] {
            acc = acc
                .checked_shl(7)
                .and_then(|v| v.checked_add((byte & 0x7F) as u32))
                .ok_or(CodecError::InvalidValueLength("OID sub-identifier overflow".into()))?;
            have_bits = true;
            if byte & 0x80 == 0 {
                nodes.push(acc);
                acc = 0;
                have_bits = false;
            }
        }
        if have_bits {
            return Err(CodecError::IncompleteData);
        }
        ObjectIdentifier::new(nodes)
    }
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|n| n.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl FromStr for ObjectIdentifier {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Leading dot optional, stripped on parse.
        let trimmed = s.strip_prefix('.').unwrap_or(s);
        let nodes: Result<Vec<u32>, _> = trimmed
            .split('.')
            .filter(|p| !p.is_empty())
            .map(|p| p.parse::<u32>())
            .collect();
        let nodes = nodes.map_err(|_| CodecError::InvalidValueLength(format!("invalid OID string: {s}")))?;
        ObjectIdentifier::new(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_and_without_leading_dot() {
        let a: ObjectIdentifier = "1.3.6.1.2.1.1.1.0".parse().unwrap();
        let b: ObjectIdentifier = ".1.3.6.1.2.1.1.1.0".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "1.3.6.1.2.1.1.1.0");
    }

    #[test]
    fn rejects_bad_second_node() {
        assert!(ObjectIdentifier::new(vec![1, 40]).is_err());
        assert!(ObjectIdentifier::new(vec![2, 999]).is_ok());
    }

    #[test]
    fn parent_child_relations() {
        let base: ObjectIdentifier = "1.3.6.1.2.1.1".parse().unwrap();
        let child: ObjectIdentifier = "1.3.6.1.2.1.1.1.0".parse().unwrap();
        assert!(base.parent_of(&child));
        assert!(child.child_of(&base));
        assert!(!child.parent_of(&base));
    }

    #[test]
    fn encodes_to_the_documented_example_bytes() {
        let oid: ObjectIdentifier = "1.3.6.1.2.1.1.2.0".parse().unwrap();
        assert_eq!(
            oid.to_ber_bytes(),
            vec![0x2b, 0x06, 0x01, 0x02, 0x01, 0x01, 0x02, 0x00]
        );
        assert_eq!(ObjectIdentifier::from_ber_bytes(&oid.to_ber_bytes()).unwrap(), oid);
    }

    #[test]
    fn ordering_is_elementwise() {
        let a: ObjectIdentifier = "1.3.6.1.2.1.1.1.0".parse().unwrap();
        let b: ObjectIdentifier = "1.3.6.1.2.1.1.2.0".parse().unwrap();
        assert!(a < b);
    }
}

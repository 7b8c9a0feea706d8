//! Authentication plugins (C8): HMAC-MD5-96 and HMAC-SHA1-96, key
//! derivation per RFC 3414 §2.6/§A.2.

use digest::Digest;
use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;

use crate::credentials::AuthProtocolId;

/// `password2key`: repeatedly hash the password cycled to fill a
/// 1,048,576-byte buffer, then final-hash.
fn password_to_key_generic<D: Digest>(password: &[u8]) -> Vec<u8> {
    assert!(!password.is_empty(), "password must not be empty");
    let mut hasher = D::new();
    let mut index = 0usize;
    let mut produced = 0usize;
    let mut buf = [0u8; 64];
    while produced < 1_048_576 {
        for slot in buf.iter_mut() {
            *slot = password[index % password.len()];
            index += 1;
        }
        hasher.update(buf);
        produced += 64;
    }
    hasher.finalize().to_vec()
}

/// `Kul = hash(Ku || engineID || Ku)`: localize a key to the authoritative
/// engine.
fn localize_generic<D: Digest>(ku: &[u8], engine_id: &[u8]) -> Vec<u8> {
    let mut hasher = D::new();
    hasher.update(ku);
    hasher.update(engine_id);
    hasher.update(ku);
    hasher.finalize().to_vec()
}

/// A pluggable authentication algorithm (C8). Implementors derive
/// localized keys and compute/verify the 12-byte HMAC tag carried in
/// `msgAuthenticationParameters`.
pub trait AuthProtocol: Send + Sync {
    fn id(&self) -> AuthProtocolId;

    /// Localized key for `password` under this engine id.
    fn password_to_key(&self, password: &str, engine_id: &[u8]) -> Vec<u8>;

    /// `HMAC(key, message)[0..12]`.
    fn authenticate(&self, key: &[u8], message: &[u8]) -> [u8; 12];

    fn verify(&self, key: &[u8], message: &[u8], tag: &[u8]) -> bool {
        tag.len() == 12 && constant_time_eq::constant_time_eq(&self.authenticate(key, message), tag)
    }
}

pub struct HmacMd5;

impl AuthProtocol for HmacMd5 {
    fn id(&self) -> AuthProtocolId {
        AuthProtocolId::HmacMd5
    }

    fn password_to_key(&self, password: &str, engine_id: &[u8]) -> Vec<u8> {
        let ku = password_to_key_generic::<Md5>(password.as_bytes());
        localize_generic::<Md5>(&ku, engine_id)
    }

    fn authenticate(&self, key: &[u8], message: &[u8]) -> [u8; 12] {
        let mut mac = Hmac::<Md5>::new_from_slice(key).expect("HMAC accepts keys of any length");
        mac.update(message);
        let full = mac.finalize().into_bytes();
        let mut out = [0u8; 12];
        out.copy_from_slice(&full[..12]);
        out
    }
}

pub struct HmacSha1;

impl AuthProtocol for HmacSha1 {
    fn id(&self) -> AuthProtocolId {
        AuthProtocolId::HmacSha1
    }

    fn password_to_key(&self, password: &str, engine_id: &[u8]) -> Vec<u8> {
        let ku = password_to_key_generic::<Sha1>(password.as_bytes());
        localize_generic::<Sha1>(&ku, engine_id)
    }

    fn authenticate(&self, key: &[u8], message: &[u8]) -> [u8; 12] {
        let mut mac = Hmac::<Sha1>::new_from_slice(key).expect("HMAC accepts keys of any length");
        mac.update(message);
        let full = mac.finalize().into_bytes();
        let mut out = [0u8; 12];
        out.copy_from_slice(&full[..12]);
        out
    }
}

pub fn protocol_for(id: AuthProtocolId) -> Box<dyn AuthProtocol> {
    match id {
        AuthProtocolId::HmacMd5 => Box::new(HmacMd5),
        AuthProtocolId::HmacSha1 => Box::new(HmacSha1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_localized_key_is_sixteen_bytes() {
        let key = HmacMd5.password_to_key("maplesyrup", b"\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x01");
        assert_eq!(key.len(), 16);
    }

    #[test]
    fn sha1_localized_key_is_twenty_bytes() {
        let key = HmacSha1.password_to_key("maplesyrup", b"\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x01");
        assert_eq!(key.len(), 20);
    }

    #[test]
    fn authenticate_is_twelve_bytes_and_deterministic() {
        let key = HmacSha1.password_to_key("theauthpass", b"engine-id-bytes");
        let a = HmacSha1.authenticate(&key, b"some message bytes");
        let b = HmacSha1.authenticate(&key, b"some message bytes");
        assert_eq!(a, b);
        assert!(HmacSha1.verify(&key, b"some message bytes", &a));
        assert!(!HmacSha1.verify(&key, b"some OTHER message", &a));
    }
}

//! Localized-key cache: deriving `Kul` repeats the 1MB password-cycling
//! hash every call, so callers should localize once per (user, engine,
//! protocol) and reuse the result.

use std::collections::HashMap;

use crate::auth::AuthProtocol;
use crate::credentials::AuthProtocolId;

/// A user holds two independent secrets — an authentication password and a
/// privacy password — both localized with the same auth-protocol hash
/// (RFC 3414 §2.6) but never with each other's password. Kept distinct in
/// the cache key so a lookup for one purpose can never return the other's
/// derived key even when the two passwords happen to collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPurpose {
    Auth,
    Priv,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    user_name: String,
    engine_id: Vec<u8>,
    protocol: AuthProtocolId,
    purpose: KeyPurpose,
}

/// Caches localized keys keyed by `(user, engine, protocol, purpose)`.
#[derive(Default)]
pub struct EngineKeyCache {
    entries: HashMap<CacheKey, Vec<u8>>,
}

impl EngineKeyCache {
    pub fn new() -> Self {
        EngineKeyCache { entries: HashMap::new() }
    }

    fn localized_key_for(
        &mut self,
        purpose: KeyPurpose,
        protocol: &dyn AuthProtocol,
        user_name: &str,
        engine_id: &[u8],
        password: &str,
    ) -> Vec<u8> {
        let key = CacheKey {
            user_name: user_name.to_string(),
            engine_id: engine_id.to_vec(),
            protocol: protocol.id(),
            purpose,
        };
        if let Some(existing) = self.entries.get(&key) {
            return existing.clone();
        }
        let derived = protocol.password_to_key(password, engine_id);
        self.entries.insert(key, derived.clone());
        derived
    }

    /// Localized key derived from the user's authentication password, used
    /// both for the HMAC auth tag and (per RFC 3414 §8.1/§1.6) as the basis
    /// for the DES-CBC/AES-CFB128 privacy key.
    pub fn localized_auth_key(
        &mut self,
        protocol: &dyn AuthProtocol,
        user_name: &str,
        engine_id: &[u8],
        password: &str,
    ) -> Vec<u8> {
        self.localized_key_for(KeyPurpose::Auth, protocol, user_name, engine_id, password)
    }

    /// Localized key derived from the user's privacy password, using the
    /// auth protocol's hash algorithm (privacy protocols have none of their
    /// own) as RFC 3414 §2.6 specifies.
    pub fn localized_priv_key(
        &mut self,
        protocol: &dyn AuthProtocol,
        user_name: &str,
        engine_id: &[u8],
        password: &str,
    ) -> Vec<u8> {
        self.localized_key_for(KeyPurpose::Priv, protocol, user_name, engine_id, password)
    }

    pub fn invalidate_engine(&mut self, engine_id: &[u8]) {
        self.entries.retain(|key, _| key.engine_id != engine_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::HmacSha1;

    #[test]
    fn caches_identical_derivation() {
        let mut cache = EngineKeyCache::new();
        let a = cache.localized_auth_key(&HmacSha1, "user", b"engine-1", "password123");
        let b = cache.localized_auth_key(&HmacSha1, "user", b"engine-1", "password123");
        assert_eq!(a, b);
    }

    #[test]
    fn different_engines_get_different_keys() {
        let mut cache = EngineKeyCache::new();
        let a = cache.localized_auth_key(&HmacSha1, "user", b"engine-1", "password123");
        let b = cache.localized_auth_key(&HmacSha1, "user", b"engine-2", "password123");
        assert_ne!(a, b);
    }

    #[test]
    fn auth_and_priv_purposes_never_collide_even_with_the_same_password() {
        let mut cache = EngineKeyCache::new();
        let auth_key = cache.localized_auth_key(&HmacSha1, "user", b"engine-1", "samepassword");
        let priv_key = cache.localized_priv_key(&HmacSha1, "user", b"engine-1", "samepassword");
        assert_eq!(auth_key, priv_key, "same password derives the same bytes");
        // but they are tracked under distinct cache entries
        assert_eq!(cache.entries.len(), 2);
    }

    #[test]
    fn invalidate_drops_only_matching_engine() {
        let mut cache = EngineKeyCache::new();
        cache.localized_auth_key(&HmacSha1, "user", b"engine-1", "password123");
        cache.localized_auth_key(&HmacSha1, "user", b"engine-2", "password123");
        cache.invalidate_engine(b"engine-1");
        assert_eq!(cache.entries.len(), 1);
    }
}

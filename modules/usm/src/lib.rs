//! The User-based Security Model (USM, RFC 3414): credentials, key
//! derivation, authentication and privacy plugins, engine time tracking,
//! and the localized-key cache.

pub mod auth;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod key_cache;
pub mod priv_crypto;

pub use auth::{AuthProtocol, HmacMd5, HmacSha1};
pub use credentials::{AuthConfig, AuthProtocolId, Credentials, PrivConfig, PrivProtocolId, SecurityLevel};
pub use engine::EngineState;
pub use error::UsmError;
pub use key_cache::EngineKeyCache;
pub use priv_crypto::PrivacyProtocol;

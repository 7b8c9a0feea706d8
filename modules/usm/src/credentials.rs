//! Credentials (C5): v1/v2c community strings and v3 user/auth/privacy
//! settings, plus the protocol identifiers used to select auth/privacy
//! plugins at the dispatcher layer.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthProtocolId {
    HmacMd5,
    HmacSha1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrivProtocolId {
    DesCbc,
    AesCfb128,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub protocol: AuthProtocolId,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct PrivConfig {
    pub protocol: PrivProtocolId,
    pub password: String,
}

#[derive(Debug, Clone)]
pub enum Credentials {
    V1 { community: Vec<u8> },
    V2c { community: Vec<u8> },
    V3 {
        user_name: String,
        auth: Option<AuthConfig>,
        priv_: Option<PrivConfig>,
    },
}

impl Credentials {
    pub fn v1(community: impl Into<Vec<u8>>) -> Self {
        Credentials::V1 { community: community.into() }
    }

    pub fn v2c(community: impl Into<Vec<u8>>) -> Self {
        Credentials::V2c { community: community.into() }
    }

    pub fn v3_no_auth(user_name: impl Into<String>) -> Self {
        Credentials::V3 { user_name: user_name.into(), auth: None, priv_: None }
    }

    pub fn v3_auth(user_name: impl Into<String>, protocol: AuthProtocolId, password: impl Into<String>) -> Self {
        Credentials::V3 {
            user_name: user_name.into(),
            auth: Some(AuthConfig { protocol, password: password.into() }),
            priv_: None,
        }
    }

    pub fn v3_auth_priv(
        user_name: impl Into<String>,
        auth_protocol: AuthProtocolId,
        auth_password: impl Into<String>,
        priv_protocol: PrivProtocolId,
        priv_password: impl Into<String>,
    ) -> Self {
        Credentials::V3 {
            user_name: user_name.into(),
            auth: Some(AuthConfig { protocol: auth_protocol, password: auth_password.into() }),
            priv_: Some(PrivConfig { protocol: priv_protocol, password: priv_password.into() }),
        }
    }

    /// Message-processing version number this credential variant implies
    /// (0 = v1, 1 = v2c, 3 = v3).
    pub fn mpm_version(&self) -> u8 {
        match self {
            Credentials::V1 { .. } => 0,
            Credentials::V2c { .. } => 1,
            Credentials::V3 { .. } => 3,
        }
    }

    pub fn security_level(&self) -> SecurityLevel {
        match self {
            Credentials::V1 { .. } | Credentials::V2c { .. } => SecurityLevel::NoAuthNoPriv,
            Credentials::V3 { auth, priv_, .. } => match (auth, priv_) {
                (None, _) => SecurityLevel::NoAuthNoPriv,
                (Some(_), None) => SecurityLevel::AuthNoPriv,
                (Some(_), Some(_)) => SecurityLevel::AuthPriv,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityLevel {
    NoAuthNoPriv,
    AuthNoPriv,
    AuthPriv,
}

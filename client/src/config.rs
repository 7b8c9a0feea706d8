//! `ClientConfig`: host, port, credentials, timeout, retries, buffer size,
//! and the v3 context name/engine id, built through a chaining builder
//! rather than requiring every field up front.

use std::time::Duration;

use snmp_usm::Credentials;

pub const DEFAULT_PORT: u16 = 161;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(6);
pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_BUFFER_SIZE: usize = 4096;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);
/// Spec §4.6 step 4 pins `msgGlobalData.msgMaxSize` to the SNMP-over-UDP
/// maximum datagram size, not this client's own receive buffer.
pub const DEFAULT_MSG_MAX_SIZE: i32 = 65507;

/// How `walk`/`bulkwalk` react to an agent that repeats the same OID
/// instead of terminating the subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkErrorPolicy {
    /// Raise `ClientError::FaultyImplementation` (default).
    Raise,
    /// Log a warning via `tracing::warn!` and stop the walk cleanly instead.
    Warn,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub credentials: Credentials,
    pub timeout: Duration,
    pub retries: u32,
    pub retry_delay: Duration,
    pub buffer_size: usize,
    pub context_name: Vec<u8>,
    pub context_engine_id: Option<Vec<u8>>,
    pub msg_max_size: i32,
    pub walk_error_policy: WalkErrorPolicy,
}

impl ClientConfig {
    pub fn builder(host: impl Into<String>, credentials: Credentials) -> ClientConfigBuilder {
        ClientConfigBuilder::new(host, credentials)
    }
}

pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new(host: impl Into<String>, credentials: Credentials) -> Self {
        ClientConfigBuilder {
            config: ClientConfig {
                host: host.into(),
                port: DEFAULT_PORT,
                credentials,
                timeout: DEFAULT_TIMEOUT,
                retries: DEFAULT_RETRIES,
                retry_delay: DEFAULT_RETRY_DELAY,
                buffer_size: DEFAULT_BUFFER_SIZE,
                context_name: Vec::new(),
                context_engine_id: None,
                msg_max_size: DEFAULT_MSG_MAX_SIZE,
                walk_error_policy: WalkErrorPolicy::Raise,
            },
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.config.retry_delay = retry_delay;
        self
    }

    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.config.buffer_size = buffer_size;
        self
    }

    pub fn context_name(mut self, context_name: impl Into<Vec<u8>>) -> Self {
        self.config.context_name = context_name.into();
        self
    }

    pub fn context_engine_id(mut self, context_engine_id: impl Into<Vec<u8>>) -> Self {
        self.config.context_engine_id = Some(context_engine_id.into());
        self
    }

    pub fn walk_error_policy(mut self, policy: WalkErrorPolicy) -> Self {
        self.config.walk_error_policy = policy;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

//! Message processing models and the cross-cutting plugin dispatcher:
//! turns a `Pdu` plus `Credentials` into bytes on the wire and back,
//! picking v1/v2c/v3 framing and, for v3, running the USM
//! authentication/privacy steps from `snmp-usm`.

pub mod dispatcher;
pub mod error;
pub mod message;
pub mod mpm;
pub mod usm_params;

pub use dispatcher::PluginDispatcher;
pub use error::MpmError;
pub use mpm::{V1Mpm, V2cMpm, V3Mpm, V3Session, SECURITY_MODEL_USM};
pub use usm_params::UsmSecurityParameters;

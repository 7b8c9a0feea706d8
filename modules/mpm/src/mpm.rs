//! Message processing models (C6): v1, v2c, and v3 (with USM). The
//! six-step v3 encode is implemented as "encode twice" — build the
//! message with a zeroed auth tag, authenticate those bytes, then rebuild
//! with the real tag — rather than splicing bytes in place, since the
//! placeholder and the real tag are always the same length (12 bytes).

use snmp_core::ber::{encode_tlv, pop_tlv};
use snmp_core::tag::{universal, Class, Pc, TypeInfo};
use snmp_core::{CodecError, Value};
use snmp_pdu::{Pdu, ProtocolError};
use snmp_usm::auth::protocol_for as auth_protocol_for;
use snmp_usm::priv_crypto::protocol_for as priv_protocol_for;
use snmp_usm::{AuthProtocolId, Credentials, EngineKeyCache, EngineState, PrivProtocolId, SecurityLevel, UsmError};

use crate::error::MpmError;
use crate::message::{decode_v1_message, encode_v1_message, ScopedPdu};
use crate::usm_params::UsmSecurityParameters;

pub const SECURITY_MODEL_USM: i64 = 3;

const FLAG_AUTH: u8 = 0b001;
const FLAG_PRIV: u8 = 0b010;
const FLAG_REPORTABLE: u8 = 0b100;

fn sequence_tag() -> TypeInfo {
    TypeInfo::universal(Pc::Constructed, universal::SEQUENCE)
}

/// Per-target v3 bookkeeping a client keeps across requests: the
/// authoritative engine's discovered state, the localized-key cache, and
/// a monotonic message id / privacy salt counter.
pub struct V3Session {
    pub engine: EngineState,
    pub key_cache: EngineKeyCache,
    pub next_msg_id: i32,
    pub salt_counter: u32,
}

impl V3Session {
    pub fn new(engine: EngineState) -> Self {
        V3Session { engine, key_cache: EngineKeyCache::new(), next_msg_id: 1, salt_counter: 0 }
    }

    fn take_msg_id(&mut self) -> i32 {
        let id = self.next_msg_id;
        self.next_msg_id = self.next_msg_id.wrapping_add(1).max(1);
        id
    }
}

fn msg_flags_for(level: SecurityLevel, reportable: bool) -> u8 {
    let mut flags = 0u8;
    if level != SecurityLevel::NoAuthNoPriv {
        flags |= FLAG_AUTH;
    }
    if level == SecurityLevel::AuthPriv {
        flags |= FLAG_PRIV;
    }
    if reportable {
        flags |= FLAG_REPORTABLE;
    }
    flags
}

fn encode_message(
    msg_id: i32,
    msg_max_size: i32,
    msg_flags: u8,
    security_model: i64,
    security_params_bytes: &[u8],
    msg_data_tlv: &[u8],
) -> Vec<u8> {
    let mut global_data_body = Value::Integer(msg_id as i64).encode();
    global_data_body.extend(Value::Integer(msg_max_size as i64).encode());
    global_data_body.extend(Value::OctetString(vec![msg_flags]).encode());
    global_data_body.extend(Value::Integer(security_model).encode());
    let global_data_tlv = encode_tlv(sequence_tag(), &global_data_body);

    let mut body = Value::Integer(3).encode();
    body.extend(global_data_tlv);
    body.extend(Value::OctetString(security_params_bytes.to_vec()).encode());
    body.extend_from_slice(msg_data_tlv);
    encode_tlv(sequence_tag(), &body)
}

/// Walks the same TLV structure `decode_message` does, using `pop_tlv`
/// alone (no generic `Value::decode`, which copies into owned buffers and
/// loses position) so the returned range is a byte offset/length into
/// `full` itself — the authParams slot as it actually sits in the received
/// datagram, not as a freshly re-encoded copy of the parsed fields would
/// place it. Returns `None` if the field is empty (no auth).
fn locate_auth_parameters(full: &[u8]) -> Result<Option<(usize, usize)>, MpmError> {
    let (_, outer_body, _) = pop_tlv(full)?;
    let (_, _version_body, rest) = pop_tlv(outer_body)?;
    let (_, _global_data_body, rest) = pop_tlv(rest)?;
    let (_, security_params_body, _) = pop_tlv(rest)?;
    let (_, usm_params_body, _) = pop_tlv(security_params_body)?;
    let (_, _engine_id_body, rest) = pop_tlv(usm_params_body)?;
    let (_, _boots_body, rest) = pop_tlv(rest)?;
    let (_, _time_body, rest) = pop_tlv(rest)?;
    let (_, _user_name_body, rest) = pop_tlv(rest)?;
    let (_, auth_parameters_body, _) = pop_tlv(rest)?;
    if auth_parameters_body.is_empty() {
        return Ok(None);
    }
    let offset = auth_parameters_body.as_ptr() as usize - full.as_ptr() as usize;
    Ok(Some((offset, auth_parameters_body.len())))
}

struct DecodedV3Message {
    msg_id: i32,
    msg_max_size: i32,
    msg_flags: u8,
    security_model: i64,
    usm_params: UsmSecurityParameters,
    msg_data_tlv: Vec<u8>,
}

fn decode_message(data: &[u8]) -> Result<DecodedV3Message, MpmError> {
    let (info, body, rest) = pop_tlv(data)?;
    if info.class != Class::Universal || info.tag != universal::SEQUENCE || !rest.is_empty() {
        return Err(ProtocolError::Codec(CodecError::UnexpectedType {
            expected: "SEQUENCE".into(),
            found: format!("{info:?}"),
        })
        .into());
    }
    let (version, rest) = snmp_core::value::decode(body)?;
    if version != Value::Integer(3) {
        return Err(MpmError::UnsupportedVersion(match version {
            Value::Integer(v) => v as u8,
            _ => 0xFF,
        }));
    }

    let (global_info, global_body, rest) = pop_tlv(rest)?;
    if global_info.class != Class::Universal || global_info.tag != universal::SEQUENCE {
        return Err(ProtocolError::Codec(CodecError::UnexpectedType {
            expected: "msgGlobalData SEQUENCE".into(),
            found: format!("{global_info:?}"),
        })
        .into());
    }
    let (msg_id_v, rest_g) = snmp_core::value::decode(global_body)?;
    let (max_size_v, rest_g) = snmp_core::value::decode(rest_g)?;
    let (flags_v, rest_g) = snmp_core::value::decode(rest_g)?;
    let (model_v, rest_g) = snmp_core::value::decode(rest_g)?;
    if !rest_g.is_empty() {
        return Err(ProtocolError::Codec(CodecError::InvalidLength).into());
    }
    let msg_id = match msg_id_v {
        Value::Integer(i) => i as i32,
        _ => return Err(ProtocolError::Codec(CodecError::InvalidTag).into()),
    };
    let msg_max_size = match max_size_v {
        Value::Integer(i) => i as i32,
        _ => return Err(ProtocolError::Codec(CodecError::InvalidTag).into()),
    };
    let msg_flags = match flags_v {
        Value::OctetString(bytes) if bytes.len() == 1 => bytes[0],
        _ => return Err(ProtocolError::Codec(CodecError::InvalidValueLength("msgFlags must be one byte".into())).into()),
    };
    let security_model = match model_v {
        Value::Integer(i) => i,
        _ => return Err(ProtocolError::Codec(CodecError::InvalidTag).into()),
    };

    let (security_params_v, rest) = snmp_core::value::decode(rest)?;
    let security_params_bytes = match security_params_v {
        Value::OctetString(bytes) => bytes,
        _ => {
            return Err(ProtocolError::Codec(CodecError::UnexpectedType {
                expected: "msgSecurityParameters OCTET STRING".into(),
                found: "other".into(),
            })
            .into())
        }
    };
    let usm_params = UsmSecurityParameters::decode(&security_params_bytes)?;

    let (_, _, rest_after_msgdata) = pop_tlv(rest)?;
    if !rest_after_msgdata.is_empty() {
        return Err(ProtocolError::Codec(CodecError::InvalidLength).into());
    }
    let msg_data_tlv = rest.to_vec();

    Ok(DecodedV3Message {
        msg_id,
        msg_max_size,
        msg_flags,
        security_model,
        usm_params,
        msg_data_tlv,
    })
}

/// v1 and v2c share an identical wire shape; only the version number and
/// (by convention) the community's trust semantics differ.
pub struct V1Mpm;
pub struct V2cMpm;

impl V1Mpm {
    pub fn version_id(&self) -> u8 {
        0
    }

    pub fn encode(&self, community: &[u8], pdu: &Pdu) -> Vec<u8> {
        encode_v1_message(0, community, pdu)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<(Vec<u8>, Pdu), MpmError> {
        let msg = decode_v1_message(bytes)?;
        Ok((msg.community, msg.pdu))
    }
}

impl V2cMpm {
    pub fn version_id(&self) -> u8 {
        1
    }

    pub fn encode(&self, community: &[u8], pdu: &Pdu) -> Vec<u8> {
        encode_v1_message(1, community, pdu)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<(Vec<u8>, Pdu), MpmError> {
        let msg = decode_v1_message(bytes)?;
        Ok((msg.community, msg.pdu))
    }
}

pub struct V3Mpm;

impl V3Mpm {
    pub fn version_id(&self) -> u8 {
        3
    }

    /// A minimal unauthenticated, unencrypted `GetRequest` with an empty
    /// engine id and an empty user name — the engine discovery probe. The
    /// agent is expected to reply with a `Report` carrying its
    /// authoritative `contextEngineID`, boots, and time.
    pub fn discovery_probe(msg_id: i32, msg_max_size: i32) -> Vec<u8> {
        let pdu = Pdu::get_request(msg_id, &[]);
        let scoped = ScopedPdu::new(Vec::new(), Vec::new(), pdu);
        let usm_params = UsmSecurityParameters::default();
        encode_message(
            msg_id,
            msg_max_size,
            FLAG_REPORTABLE,
            SECURITY_MODEL_USM,
            &usm_params.encode(),
            &scoped.encode(),
        )
    }

    /// Decodes a discovery `Report` (or any other unauthenticated,
    /// unencrypted v3 message) and extracts the authoritative engine's
    /// state without verifying a HMAC or decrypting anything — there is no
    /// localized key yet at discovery time.
    pub fn decode_discovery(bytes: &[u8]) -> Result<(EngineState, Pdu), MpmError> {
        let decoded = decode_message(bytes)?;
        let scoped = ScopedPdu::decode(&decoded.msg_data_tlv)?;
        let engine = EngineState::new(
            decoded.usm_params.authoritative_engine_id,
            decoded.usm_params.authoritative_engine_boots,
            decoded.usm_params.authoritative_engine_time,
        );
        Ok((engine, scoped.pdu))
    }

    /// Extracts just the authoritative engine id from a v3 message's
    /// security parameters, without verifying auth or decrypting anything —
    /// used by a trap listener to pick (or create) the right per-engine
    /// `V3Session` before attempting a full authenticated decode.
    pub fn peek_engine_id(bytes: &[u8]) -> Result<Vec<u8>, MpmError> {
        let decoded = decode_message(bytes)?;
        Ok(decoded.usm_params.authoritative_engine_id)
    }

    /// Builds, authenticates, and (if required) encrypts a v3 message for
    /// `pdu` under `credentials`, using and advancing `session`'s engine
    /// state, key cache, and salt counter.
    pub fn encode(
        &self,
        pdu: &Pdu,
        credentials: &Credentials,
        context_name: &[u8],
        session: &mut V3Session,
        msg_max_size: i32,
        reportable: bool,
    ) -> Result<Vec<u8>, MpmError> {
        let Credentials::V3 { user_name, auth, priv_ } = credentials else {
            return Err(MpmError::CredentialVersionMismatch);
        };
        let level = credentials.security_level();
        let msg_flags = msg_flags_for(level, reportable);
        let msg_id = session.take_msg_id();
        let engine_id = session.engine.engine_id.clone();

        let scoped = ScopedPdu::new(engine_id.clone(), context_name.to_vec(), pdu.clone());
        let scoped_bytes = scoped.encode();

        let mut priv_params = Vec::new();
        let msg_data_tlv = if let Some(priv_cfg) = priv_ {
            let auth_cfg = auth.as_ref().ok_or(UsmError::UnsupportedSecLevel)?;
            let auth_proto = auth_protocol_for(auth_cfg.protocol);
            let localized =
                session
                    .key_cache
                    .localized_priv_key(auth_proto.as_ref(), user_name, &engine_id, &priv_cfg.password);
            let priv_proto = priv_protocol_for(priv_cfg.protocol)?;
            let (ciphertext, params) = priv_proto.encrypt(
                &localized,
                session.engine.engine_boots,
                session.engine.estimated_time(),
                &mut session.salt_counter,
                &scoped_bytes,
            )?;
            priv_params = params;
            Value::OctetString(ciphertext).encode()
        } else {
            scoped_bytes
        };

        let mut usm_params = UsmSecurityParameters {
            authoritative_engine_id: engine_id.clone(),
            authoritative_engine_boots: session.engine.engine_boots,
            authoritative_engine_time: session.engine.estimated_time(),
            user_name: user_name.as_bytes().to_vec(),
            auth_parameters: if auth.is_some() { vec![0u8; 12] } else { Vec::new() },
            priv_parameters: priv_params,
        };

        let unauthenticated = encode_message(
            msg_id,
            msg_max_size,
            msg_flags,
            SECURITY_MODEL_USM,
            &usm_params.encode(),
            &msg_data_tlv,
        );

        if let Some(auth_cfg) = auth {
            let auth_proto = auth_protocol_for(auth_cfg.protocol);
            let localized =
                session
                    .key_cache
                    .localized_auth_key(auth_proto.as_ref(), user_name, &engine_id, &auth_cfg.password);
            let tag = auth_proto.authenticate(&localized, &unauthenticated);
            usm_params.auth_parameters = tag.to_vec();
            Ok(encode_message(
                msg_id,
                msg_max_size,
                msg_flags,
                SECURITY_MODEL_USM,
                &usm_params.encode(),
                &msg_data_tlv,
            ))
        } else {
            Ok(unauthenticated)
        }
    }

    /// Decodes and authenticates/decrypts an incoming v3 message against
    /// `credentials` and `session`'s engine state.
    pub fn decode(&self, bytes: &[u8], credentials: &Credentials, session: &mut V3Session) -> Result<Pdu, MpmError> {
        let Credentials::V3 { user_name, auth, priv_ } = credentials else {
            return Err(MpmError::CredentialVersionMismatch);
        };
        if credentials.security_level() != SecurityLevel::NoAuthNoPriv && auth.is_none() {
            return Err(UsmError::UnsupportedSecLevel.into());
        }
        let decoded = decode_message(bytes)?;
        if decoded.security_model != SECURITY_MODEL_USM {
            return Err(MpmError::UnsupportedSecurityModel(decoded.security_model));
        }
        if decoded.usm_params.user_name != user_name.as_bytes() {
            return Err(UsmError::UnknownUserName.into());
        }

        if let Some(auth_cfg) = auth {
            let auth_proto = auth_protocol_for(auth_cfg.protocol);
            let localized = session.key_cache.localized_auth_key(
                auth_proto.as_ref(),
                user_name,
                &decoded.usm_params.authoritative_engine_id,
                &auth_cfg.password,
            );
            let mut zeroed = bytes.to_vec();
            if let Some((offset, len)) = locate_auth_parameters(bytes)? {
                zeroed[offset..offset + len].fill(0);
            }
            if !auth_proto.verify(&localized, &zeroed, &decoded.usm_params.auth_parameters) {
                return Err(UsmError::AuthenticationFailure.into());
            }
            session
                .engine
                .check_time_window(decoded.usm_params.authoritative_engine_boots, decoded.usm_params.authoritative_engine_time)?;
            session
                .engine
                .update(decoded.usm_params.authoritative_engine_boots, decoded.usm_params.authoritative_engine_time);
        }

        let scoped_bytes = if let Some(priv_cfg) = priv_ {
            let auth_cfg = auth.as_ref().ok_or(UsmError::UnsupportedSecLevel)?;
            let auth_proto = auth_protocol_for(auth_cfg.protocol);
            let localized = session.key_cache.localized_priv_key(
                auth_proto.as_ref(),
                user_name,
                &decoded.usm_params.authoritative_engine_id,
                &priv_cfg.password,
            );
            let priv_proto = priv_protocol_for(priv_cfg.protocol)?;
            let (ciphertext_value, _) = snmp_core::value::decode(&decoded.msg_data_tlv)?;
            let ciphertext = match ciphertext_value {
                Value::OctetString(bytes) => bytes,
                _ => return Err(UsmError::DecryptionError.into()),
            };
            priv_proto.decrypt(
                &localized,
                decoded.usm_params.authoritative_engine_boots,
                decoded.usm_params.authoritative_engine_time,
                &decoded.usm_params.priv_parameters,
                &ciphertext,
            )?
        } else {
            decoded.msg_data_tlv
        };

        let (scoped, _trailing) = ScopedPdu::decode_prefix(&scoped_bytes)?;
        Ok(scoped.pdu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snmp_core::ObjectIdentifier;

    fn engine() -> EngineState {
        EngineState::new(b"engine-0000".to_vec(), 1, 1000)
    }

    #[test]
    fn v1_mpm_roundtrip() {
        let oid: ObjectIdentifier = "1.3.6.1.2.1.1.1.0".parse().unwrap();
        let pdu = Pdu::get_request(1, &[oid]);
        let bytes = V1Mpm.encode(b"public", &pdu);
        let (community, decoded) = V1Mpm.decode(&bytes).unwrap();
        assert_eq!(community, b"public");
        assert_eq!(decoded.request_id, 1);
    }

    #[test]
    fn v3_no_auth_no_priv_roundtrip() {
        let creds = Credentials::v3_no_auth("alice");
        let oid: ObjectIdentifier = "1.3.6.1.2.1.1.1.0".parse().unwrap();
        let pdu = Pdu::get_request(42, &[oid]);
        let mut session = V3Session::new(engine());
        let bytes = V3Mpm.encode(&pdu, &creds, b"", &mut session, 1500, true).unwrap();

        let mut session2 = V3Session::new(engine());
        let decoded = V3Mpm.decode(&bytes, &creds, &mut session2).unwrap();
        assert_eq!(decoded.request_id, 42);
    }

    #[test]
    fn v3_auth_roundtrip_and_tamper_detection() {
        let creds = Credentials::v3_auth("alice", AuthProtocolId::HmacSha1, "authpassword1");
        let oid: ObjectIdentifier = "1.3.6.1.2.1.1.1.0".parse().unwrap();
        let pdu = Pdu::get_request(7, &[oid]);
        let mut session = V3Session::new(engine());
        let mut bytes = V3Mpm.encode(&pdu, &creds, b"", &mut session, 1500, true).unwrap();

        let mut session2 = V3Session::new(engine());
        let decoded = V3Mpm.decode(&bytes, &creds, &mut session2).unwrap();
        assert_eq!(decoded.request_id, 7);

        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let mut session3 = V3Session::new(engine());
        assert!(V3Mpm.decode(&bytes, &creds, &mut session3).is_err());
    }

    #[test]
    fn v3_auth_priv_roundtrip() {
        let creds = Credentials::v3_auth_priv(
            "alice",
            AuthProtocolId::HmacMd5,
            "authpassword1",
            PrivProtocolId::AesCfb128,
            "privpassword1",
        );
        let oid: ObjectIdentifier = "1.3.6.1.2.1.1.1.0".parse().unwrap();
        let pdu = Pdu::get_request(3, &[oid]);
        let mut session = V3Session::new(engine());
        let bytes = V3Mpm.encode(&pdu, &creds, b"", &mut session, 1500, true).unwrap();

        let mut session2 = V3Session::new(engine());
        let decoded = V3Mpm.decode(&bytes, &creds, &mut session2).unwrap();
        assert_eq!(decoded.request_id, 3);
    }

    #[test]
    fn v3_auth_priv_roundtrip_des_cbc_unaligned_plaintext() {
        // DES-CBC pads its plaintext to an 8-byte boundary; a varbind list
        // whose encoded ScopedPDU length isn't already a multiple of 8
        // exercises the trailing-padding-after-decrypt path.
        let creds = Credentials::v3_auth_priv(
            "alice",
            AuthProtocolId::HmacSha1,
            "authpassword1",
            PrivProtocolId::DesCbc,
            "privpassword1",
        );
        let oid: ObjectIdentifier = "1.3.6.1.2.1.1.1.0".parse().unwrap();
        let pdu = Pdu::get_request(99, &[oid]);
        let mut session = V3Session::new(engine());
        let bytes = V3Mpm.encode(&pdu, &creds, b"", &mut session, 1500, true).unwrap();

        let mut session2 = V3Session::new(engine());
        let decoded = V3Mpm.decode(&bytes, &creds, &mut session2).unwrap();
        assert_eq!(decoded.request_id, 99);
    }

    #[test]
    fn discovery_probe_roundtrip() {
        let probe = V3Mpm::discovery_probe(1, 1500);
        let (engine, pdu) = V3Mpm::decode_discovery(&probe).unwrap();
        assert!(engine.engine_id.is_empty());
        assert_eq!(pdu.request_id, 1);
        assert!(pdu.varbinds.is_empty());
    }

    #[test]
    fn peek_engine_id_matches_full_decode() {
        let creds = Credentials::v3_no_auth("alice");
        let oid: ObjectIdentifier = "1.3.6.1.2.1.1.1.0".parse().unwrap();
        let pdu = Pdu::get_request(1, &[oid]);
        let mut session = V3Session::new(engine());
        let bytes = V3Mpm.encode(&pdu, &creds, b"", &mut session, 1500, true).unwrap();
        assert_eq!(V3Mpm::peek_engine_id(&bytes).unwrap(), b"engine-0000".to_vec());
    }
}

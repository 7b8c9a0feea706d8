//! Trap listener (C12): binds a UDP socket and produces a lazy, infinite
//! sequence of decoded traps. Invalid or authentication-failing datagrams
//! are logged and skipped — the stream itself never terminates on a bad
//! packet.

use std::collections::HashMap;
use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use snmp_core::{ObjectIdentifier, Value};
use snmp_mpm::{MpmError, PluginDispatcher, V3Mpm, V3Session};
use snmp_pdu::{Pdu, PduKind, VarBind};
use snmp_usm::{Credentials, EngineState};

use crate::error::ClientError;

/// RFC 3416's `snmpTrapOID.0`, the varbind that (for v2/v3 traps) carries
/// the notification's identifying OID as its value.
const SNMP_TRAP_OID: &str = "1.3.6.1.6.3.1.1.4.1.0";

/// One decoded trap/inform notification.
#[derive(Debug, Clone, PartialEq)]
pub struct TrapInfo {
    pub origin: SocketAddr,
    pub pdu_kind: PduKind,
    /// The notification's identifying OID, when present — `snmpTrapOID.0`
    /// for v2/v3, or the v1 `TrapV1Info` enterprise/generic/specific triple
    /// folded into the same varbind list the caller can inspect directly.
    pub trap_oid: Option<ObjectIdentifier>,
    pub varbinds: Vec<VarBind>,
}

/// Binds a UDP socket (default port 162) and decodes inbound datagrams
/// through the normal MPM pipeline, maintaining a per-origin-engine v3
/// session cache so a v3 trap sender's auth/time-window state survives
/// across packets.
pub struct TrapListener {
    receiver: mpsc::UnboundedReceiver<TrapInfo>,
}

impl TrapListener {
    pub async fn bind(port: u16, credentials: Credentials) -> Result<Self, ClientError> {
        let socket = UdpSocket::bind(("0.0.0.0", port)).await?;
        Self::from_socket(socket, credentials)
    }

    /// Builds a listener over an already-bound socket — the seam tests use
    /// to bind an ephemeral port instead of the real trap port 162.
    pub fn from_socket(socket: UdpSocket, credentials: Credentials) -> Result<Self, ClientError> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(receive_loop(socket, credentials, tx));
        Ok(TrapListener { receiver: rx })
    }

    /// Awaits the next decoded trap. Returns `None` only once the
    /// background receive task has exited (the socket was closed).
    pub async fn recv(&mut self) -> Option<TrapInfo> {
        self.receiver.recv().await
    }
}

async fn receive_loop(socket: UdpSocket, credentials: Credentials, tx: mpsc::UnboundedSender<TrapInfo>) {
    let dispatcher = PluginDispatcher::new();
    let mut sessions: HashMap<Vec<u8>, V3Session> = HashMap::new();
    let mut buf = vec![0u8; 65535];
    loop {
        let (n, origin) = match socket.recv_from(&mut buf).await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(error = %e, "trap listener socket error");
                continue;
            }
        };
        let datagram = &buf[..n];
        match decode_trap(datagram, &credentials, &dispatcher, &mut sessions) {
            Ok(pdu) => {
                let trap_oid = trap_oid_of(&pdu);
                if tx.send(TrapInfo { origin, pdu_kind: pdu.kind, trap_oid, varbinds: pdu.varbinds }).is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "dropping undecodable trap datagram");
            }
        }
    }
}

fn trap_oid_of(pdu: &Pdu) -> Option<ObjectIdentifier> {
    if let Some(trap) = &pdu.trap_v1 {
        return Some(trap.enterprise.clone());
    }
    let marker: ObjectIdentifier = SNMP_TRAP_OID.parse().ok()?;
    pdu.varbinds.iter().find(|vb| vb.oid == marker).and_then(|vb| match &vb.value {
        Value::ObjectIdentifier(oid) => Some(oid.clone()),
        _ => None,
    })
}

fn decode_trap(
    bytes: &[u8],
    credentials: &Credentials,
    dispatcher: &PluginDispatcher,
    sessions: &mut HashMap<Vec<u8>, V3Session>,
) -> Result<Pdu, ClientError> {
    let version = peek_version(bytes)?;
    match (version, credentials) {
        (0, Credentials::V1 { .. }) | (1, Credentials::V2c { .. }) => {
            Ok(dispatcher.decode(version, bytes, credentials, None)?)
        }
        (3, Credentials::V3 { .. }) => {
            let engine_id = V3Mpm::peek_engine_id(bytes)?;
            let session = sessions
                .entry(engine_id.clone())
                .or_insert_with(|| V3Session::new(EngineState::new(engine_id, 0, 0)));
            Ok(dispatcher.decode(3, bytes, credentials, Some(session))?)
        }
        (other, _) => Err(ClientError::from(MpmError::UnsupportedVersion(other))),
    }
}

/// Reads just the outer message's `msgVersion`/`version` INTEGER without
/// fully decoding the rest — this listener accepts unsolicited datagrams
/// from engines it has never seen, so it cannot assume a version ahead of
/// time the way a client request/response round trip can.
fn peek_version(bytes: &[u8]) -> Result<u8, ClientError> {
    let (_, body, _) =
        snmp_core::ber::pop_tlv(bytes).map_err(|e| ClientError::from(MpmError::from(snmp_pdu::ProtocolError::from(e))))?;
    let (value, _) =
        snmp_core::value::decode(body).map_err(|e| ClientError::from(MpmError::from(snmp_pdu::ProtocolError::from(e))))?;
    match value {
        Value::Integer(v) if (0..=3).contains(&v) => Ok(v as u8),
        Value::Integer(v) => Err(ClientError::from(MpmError::UnsupportedVersion(v as u8))),
        _ => Err(ClientError::from(MpmError::UnsupportedVersion(0xFF))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snmp_pdu::{Pdu, PduCounters};
    use std::time::Duration;

    #[tokio::test]
    async fn decodes_a_v2c_trap_and_extracts_trap_oid() {
        let listener_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let listener_addr = listener_socket.local_addr().unwrap();
        let mut listener = TrapListener::from_socket(listener_socket, Credentials::v2c("public")).unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let trap_oid: ObjectIdentifier = "1.3.6.1.4.1.8072.2.3.0.1".parse().unwrap();
        let marker: ObjectIdentifier = SNMP_TRAP_OID.parse().unwrap();
        let varbinds = vec![VarBind::new(marker, Value::ObjectIdentifier(trap_oid.clone()))];
        let pdu = Pdu::new(PduKind::TrapV2, 0, PduCounters::ErrorFields { error_status: 0, error_index: 0 }, varbinds);
        let bytes = snmp_mpm::V2cMpm.encode(b"public", &pdu);
        sender.send_to(&bytes, listener_addr).await.unwrap();

        let trap = tokio::time::timeout(Duration::from_secs(2), listener.recv()).await.unwrap().unwrap();
        assert_eq!(trap.pdu_kind, PduKind::TrapV2);
        assert_eq!(trap.trap_oid, Some(trap_oid));
    }

    #[tokio::test]
    async fn mismatched_community_is_dropped_not_fatal() {
        let listener_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let listener_addr = listener_socket.local_addr().unwrap();
        let mut listener = TrapListener::from_socket(listener_socket, Credentials::v2c("public")).unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let oid: ObjectIdentifier = "1.3.6.1.4.1.8072.2.3.0.1".parse().unwrap();
        let pdu = Pdu::new(
            PduKind::TrapV2,
            0,
            PduCounters::ErrorFields { error_status: 0, error_index: 0 },
            vec![VarBind::null(oid)],
        );
        // version 0 (v1) against a v2c-only listener: rejected by `decode_trap`
        // without killing the receive loop.
        let bytes = snmp_mpm::V1Mpm.encode(b"public", &pdu);
        sender.send_to(&bytes, listener_addr).await.unwrap();

        let result = tokio::time::timeout(Duration::from_millis(200), listener.recv()).await;
        assert!(result.is_err(), "no trap should have been delivered");
    }
}

//! `Client` (C11): the high-level GET/GETNEXT/SET/GETBULK/WALK/BULKWALK/
//! TABLE operations, each an `async fn` that yields only at the transport
//! boundary.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use rand::Rng;
use tokio::sync::{mpsc, Mutex};

use snmp_core::{ObjectIdentifier, StringKind, Value};
use snmp_mpm::{MpmError, PluginDispatcher, V3Mpm, V3Session};
use snmp_pdu::{Pdu, ProtocolError, VarBind};
use snmp_usm::{Credentials, EngineState, UsmError};

use crate::config::{ClientConfig, WalkErrorPolicy};
use crate::error::ClientError;
use crate::transport::{Transport, UdpTransport};

/// An asynchronous SNMP client bound to one target (`ClientConfig::host`/
/// `port`). Cheap to clone: clones share the same transport, dispatcher,
/// and v3 session state, which is what lets `walk`/`bulkwalk` hand a clone
/// to a spawned background producer task.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    transport: Box<dyn Transport>,
    dispatcher: PluginDispatcher,
    v3_session: Mutex<Option<V3Session>>,
    next_request_id: AtomicI32,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Client::with_transport(config, Box::new(UdpTransport))
    }

    /// Builds a client over an injected `Transport` — the seam tests use
    /// to replace the real UDP socket with an in-memory fake agent.
    pub fn with_transport(config: ClientConfig, transport: Box<dyn Transport>) -> Self {
        let seed: i32 = rand::thread_rng().gen_range(1..=i32::MAX);
        Client {
            inner: Arc::new(Inner {
                config,
                transport,
                dispatcher: PluginDispatcher::new(),
                v3_session: Mutex::new(None),
                next_request_id: AtomicI32::new(seed),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    fn next_request_id(&self) -> i32 {
        self.inner.next_request_id.fetch_add(1, Ordering::Relaxed)
    }

    // --- single-varbind operations -----------------------------------

    pub async fn get(&self, oid: ObjectIdentifier) -> Result<Value, ClientError> {
        let mut values = self.multiget(&[oid]).await?;
        if values.len() != 1 {
            return Err(ClientError::UnexpectedVarBindCount(values.len()));
        }
        Ok(values.remove(0).1)
    }

    pub async fn multiget(&self, oids: &[ObjectIdentifier]) -> Result<Vec<(ObjectIdentifier, Value)>, ClientError> {
        if oids.is_empty() {
            return Ok(Vec::new());
        }
        let request_id = self.next_request_id();
        let pdu = Pdu::get_request(request_id, oids);
        let response = self.roundtrip(pdu).await?;
        let varbinds = self.extract_response(response)?;
        Ok(varbinds.into_iter().map(|vb| (vb.oid, vb.value)).collect())
    }

    /// Unlike `get`/`multiget`, a sentinel value (most commonly
    /// `EndOfMibView`) is a normal, non-error outcome of GETNEXT — it marks
    /// subtree exhaustion, not a missing object — so it is returned as an
    /// ordinary `(oid, value)` pair rather than surfaced as `NoSuchOid`.
    /// `walk` inspects the returned value itself to decide when to stop.
    pub async fn getnext(&self, oid: ObjectIdentifier) -> Result<(ObjectIdentifier, Value), ClientError> {
        let request_id = self.next_request_id();
        let pdu = Pdu::get_next_request(request_id, std::slice::from_ref(&oid));
        let response = self.roundtrip(pdu).await?;
        self.check_error_response(&response)?;
        let mut varbinds = response.varbinds;
        if varbinds.len() != 1 {
            return Err(ClientError::UnexpectedVarBindCount(varbinds.len()));
        }
        let vb = varbinds.remove(0);
        Ok((vb.oid, vb.value))
    }

    pub async fn set(&self, oid: ObjectIdentifier, value: Value) -> Result<Value, ClientError> {
        let mut values = self.multiset(vec![(oid, value)]).await?;
        if values.len() != 1 {
            return Err(ClientError::UnexpectedVarBindCount(values.len()));
        }
        Ok(values.remove(0).1)
    }

    pub async fn multiset(
        &self,
        pairs: Vec<(ObjectIdentifier, Value)>,
    ) -> Result<Vec<(ObjectIdentifier, Value)>, ClientError> {
        let request_id = self.next_request_id();
        let varbinds = pairs.into_iter().map(|(oid, value)| VarBind::new(oid, value)).collect();
        let pdu = Pdu::set_request(request_id, varbinds);
        let response = self.roundtrip(pdu).await?;
        let varbinds = self.extract_response(response)?;
        Ok(varbinds.into_iter().map(|vb| (vb.oid, vb.value)).collect())
    }

    // --- GETBULK ------------------------------------------------------

    /// One `GetBulkRequest`: `non_repeaters = scalar_oids.len()`,
    /// `max_repetitions = ceil(max_list_size / repeating_oids.len())`.
    /// Returns the scalar varbinds and the repeating listing, each
    /// filtered to its own subtree and capped at `max_list_size` entries.
    pub async fn bulkget(
        &self,
        scalar_oids: &[ObjectIdentifier],
        repeating_oids: &[ObjectIdentifier],
        max_list_size: usize,
    ) -> Result<(Vec<(ObjectIdentifier, Value)>, Vec<(ObjectIdentifier, Value)>), ClientError> {
        if repeating_oids.is_empty() {
            return Ok((self.multiget(scalar_oids).await?, Vec::new()));
        }
        let non_repeaters = scalar_oids.len() as u32;
        let max_repetitions = (max_list_size.div_ceil(repeating_oids.len())).max(1) as u32;
        let mut oids = scalar_oids.to_vec();
        oids.extend_from_slice(repeating_oids);

        let request_id = self.next_request_id();
        let pdu = Pdu::get_bulk_request(request_id, non_repeaters, max_repetitions, &oids)
            .map_err(|e| ClientError::from(MpmError::from(e)))?;
        let response = self.roundtrip(pdu).await?;
        self.check_error_response(&response)?;

        let split = (non_repeaters as usize).min(response.varbinds.len());
        let mut varbinds = response.varbinds.into_iter();
        let scalars: Vec<_> = varbinds
            .by_ref()
            .take(split)
            .filter(|vb| !vb.is_sentinel())
            .map(|vb| (vb.oid, vb.value))
            .collect();

        let mut listing = Vec::new();
        for vb in varbinds {
            if vb.is_sentinel() || !repeating_oids.iter().any(|base| base.parent_of(&vb.oid)) {
                continue;
            }
            listing.push((vb.oid, vb.value));
            if listing.len() >= max_list_size {
                break;
            }
        }
        Ok((scalars, listing))
    }

    // --- lazy iteration -------------------------------------------------

    /// Iteratively `GETNEXT`s from `base_oid`, yielding `(oid, value)`
    /// pairs over the returned channel while the result stays under
    /// `base_oid`, stopping on `EndOfMibView`, subtree exit, or (per
    /// `walk_error_policy`) a repeated OID from a broken agent.
    pub fn walk(&self, base_oid: ObjectIdentifier) -> mpsc::Receiver<Result<(ObjectIdentifier, Value), ClientError>> {
        let (tx, rx) = mpsc::channel(16);
        let client = self.clone();
        tokio::spawn(async move {
            let mut current = base_oid.clone();
            loop {
                let (oid, value) = match client.getnext(current.clone()).await {
                    Ok(pair) => pair,
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                };
                if matches!(value, Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView) {
                    return;
                }
                if !base_oid.parent_of(&oid) {
                    return;
                }
                if oid == current {
                    client.report_faulty_repeat(&tx, &oid).await;
                    return;
                }
                current = oid.clone();
                if tx.send(Ok((oid, value))).await.is_err() {
                    return;
                }
            }
        });
        rx
    }

    /// Repeated `GETBULK` over `oids` simultaneously, yielding results in
    /// arrival order; each OID's column stops independently on
    /// `EndOfMibView` or subtree exit.
    pub fn bulkwalk(
        &self,
        oids: Vec<ObjectIdentifier>,
        bulk_size: u32,
    ) -> mpsc::Receiver<Result<(ObjectIdentifier, Value), ClientError>> {
        let (tx, rx) = mpsc::channel(16);
        let client = self.clone();
        tokio::spawn(async move {
            let mut bases = oids.clone();
            let mut cursors = oids;
            while !cursors.is_empty() {
                let request_id = client.next_request_id();
                let pdu = match Pdu::get_bulk_request(request_id, 0, bulk_size.max(1), &cursors) {
                    Ok(pdu) => pdu,
                    Err(e) => {
                        let _ = tx.send(Err(ClientError::from(MpmError::from(e)))).await;
                        return;
                    }
                };
                let response = match client.roundtrip(pdu).await {
                    Ok(resp) => resp,
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                };
                if let Err(e) = client.check_error_response(&response) {
                    let _ = tx.send(Err(e)).await;
                    return;
                }

                let n = cursors.len();
                let mut finished = vec![false; n];
                for (i, vb) in response.varbinds.into_iter().enumerate() {
                    let col = i % n;
                    if finished[col] {
                        continue;
                    }
                    if vb.is_sentinel() || !bases[col].parent_of(&vb.oid) {
                        finished[col] = true;
                        continue;
                    }
                    if i < n && vb.oid == cursors[col] {
                        if !client.report_faulty_repeat(&tx, &vb.oid).await {
                            return;
                        }
                        finished[col] = true;
                        continue;
                    }
                    cursors[col] = vb.oid.clone();
                    if tx.send(Ok((vb.oid, vb.value))).await.is_err() {
                        return;
                    }
                }

                if finished.iter().any(|&f| f) {
                    let keep: Vec<usize> = (0..n).filter(|&i| !finished[i]).collect();
                    bases = keep.iter().map(|&i| bases[i].clone()).collect();
                    cursors = keep.iter().map(|&i| cursors[i].clone()).collect();
                }
            }
        });
        rx
    }

    /// Reports a faulty-agent repeated OID per `walk_error_policy`. Under
    /// `Raise` this sends a fatal error and returns `false` (the whole
    /// walk/bulkwalk must stop); under `Warn` it only logs, returning
    /// `true` so a multi-column `bulkwalk` can retire just that column
    /// while the others keep going (a single-OID `walk` stops either way,
    /// since there is nothing left for it to yield).
    async fn report_faulty_repeat(
        &self,
        tx: &mpsc::Sender<Result<(ObjectIdentifier, Value), ClientError>>,
        oid: &ObjectIdentifier,
    ) -> bool {
        match self.inner.config.walk_error_policy {
            WalkErrorPolicy::Raise => {
                let _ = tx
                    .send(Err(ClientError::FaultyImplementation { host: self.inner.config.host.clone() }))
                    .await;
                false
            }
            WalkErrorPolicy::Warn => {
                tracing::warn!(host = %self.inner.config.host, %oid, "agent repeated OID, stopping walk");
                true
            }
        }
    }

    // --- table pivoting -------------------------------------------------

    pub async fn table(&self, base_oid: ObjectIdentifier) -> Result<Vec<HashMap<String, Value>>, ClientError> {
        let mut rx = self.walk(base_oid.clone());
        let mut rows: Vec<(String, HashMap<String, Value>)> = Vec::new();
        while let Some(item) = rx.recv().await {
            let (oid, value) = item?;
            pivot_into(&base_oid, oid, value, &mut rows);
        }
        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }

    pub async fn bulktable(
        &self,
        base_oid: ObjectIdentifier,
        bulk_size: u32,
    ) -> Result<Vec<HashMap<String, Value>>, ClientError> {
        let mut rx = self.bulkwalk(vec![base_oid.clone()], bulk_size);
        let mut rows: Vec<(String, HashMap<String, Value>)> = Vec::new();
        while let Some(item) = rx.recv().await {
            let (oid, value) = item?;
            pivot_into(&base_oid, oid, value, &mut rows);
        }
        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }

    // --- request/response plumbing --------------------------------------

    fn check_error_response(&self, pdu: &Pdu) -> Result<(), ClientError> {
        if let Some((status, name, offending_oid)) = pdu.error_response() {
            return Err(ClientError::AgentError { status, name, offending_oid });
        }
        Ok(())
    }

    /// `check_error_response` plus the strict sentinel check GET/SET need —
    /// a sentinel there means the requested OID genuinely doesn't exist.
    /// GETNEXT does not route through this: its sentinels (notably
    /// `EndOfMibView`) are a normal end-of-subtree signal, not an error
    /// (see `getnext`). GETBULK runs its own looser extraction too, since
    /// its trailing `EndOfMibView`s are expected.
    fn extract_response(&self, pdu: Pdu) -> Result<Vec<VarBind>, ClientError> {
        self.check_error_response(&pdu)?;
        for vb in &pdu.varbinds {
            if vb.is_sentinel() {
                return Err(ClientError::from(MpmError::from(ProtocolError::NoSuchOid { oid: Some(vb.oid.clone()) })));
            }
        }
        Ok(pdu.varbinds)
    }

    /// Encodes, sends, and decodes `pdu`, establishing a v3 session first
    /// if needed and resyncing+retrying once on `NotInTimeWindow`/
    /// `UnknownEngineId`.
    async fn roundtrip(&self, pdu: Pdu) -> Result<Pdu, ClientError> {
        self.ensure_v3_session().await?;
        match self.roundtrip_once(&pdu).await {
            Err(ClientError::Processing(e)) if needs_resync(&e) => {
                tracing::debug!(host = %self.inner.config.host, error = %e, "resyncing v3 engine state");
                self.discover().await?;
                self.roundtrip_once(&pdu).await
            }
            other => other,
        }
    }

    async fn roundtrip_once(&self, pdu: &Pdu) -> Result<Pdu, ClientError> {
        let request_id = pdu.request_id;
        let encoded = {
            let mut session = self.inner.v3_session.lock().await;
            self.inner.dispatcher.encode(
                pdu,
                &self.inner.config.credentials,
                &self.inner.config.context_name,
                session.as_mut(),
                self.inner.config.msg_max_size,
                true,
            )?
        };
        let response_bytes = self.send_raw(&encoded).await?;
        let decoded = {
            let mut session = self.inner.v3_session.lock().await;
            self.inner.dispatcher.decode(
                self.inner.config.credentials.mpm_version(),
                &response_bytes,
                &self.inner.config.credentials,
                session.as_mut(),
            )?
        };
        if decoded.request_id != request_id {
            return Err(ClientError::RequestIdMismatch { sent: request_id, received: decoded.request_id });
        }
        Ok(decoded)
    }

    async fn ensure_v3_session(&self) -> Result<(), ClientError> {
        if !matches!(self.inner.config.credentials, Credentials::V3 { .. }) {
            return Ok(());
        }
        let has_session = self.inner.v3_session.lock().await.is_some();
        if !has_session {
            self.discover().await?;
        }
        Ok(())
    }

    /// Sends an unauthenticated engine-discovery probe and seeds the v3
    /// session from the agent's Report, or, if the caller pre-configured
    /// `context_engine_id`, seeds a session directly with
    /// `engine_boots=0`/`engine_time=0` and lets the first real request's
    /// `NotInTimeWindow` resync path pick up the real clock.
    async fn discover(&self) -> Result<(), ClientError> {
        let engine = if let Some(engine_id) = &self.inner.config.context_engine_id {
            EngineState::new(engine_id.clone(), 0, 0)
        } else {
            let msg_id = self.next_request_id();
            let probe = V3Mpm::discovery_probe(msg_id, self.inner.config.msg_max_size);
            let response = self.send_raw(&probe).await?;
            let (engine, _report) = V3Mpm::decode_discovery(&response).map_err(|e| ClientError::DiscoveryFailed {
                host: self.inner.config.host.clone(),
                port: self.inner.config.port,
                reason: e.to_string(),
            })?;
            engine
        };
        let mut session = self.inner.v3_session.lock().await;
        *session = Some(V3Session::new(engine));
        Ok(())
    }

    async fn send_raw(&self, bytes: &[u8]) -> Result<Vec<u8>, ClientError> {
        let cfg = &self.inner.config;
        let attempts = cfg.retries.max(1);
        let mut last_err = None;
        for attempt in 1..=attempts {
            match self
                .inner
                .transport
                .send_and_receive(&cfg.host, cfg.port, bytes, cfg.timeout, cfg.buffer_size)
                .await
            {
                Ok(resp) => return Ok(resp),
                Err(ClientError::Timeout { .. }) => {
                    tracing::debug!(host = %cfg.host, port = cfg.port, attempt, "snmp request timed out");
                    last_err = Some(ClientError::Timeout { host: cfg.host.clone(), port: cfg.port, attempts: attempt });
                    if attempt < attempts {
                        tokio::time::sleep(cfg.retry_delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or(ClientError::Timeout { host: cfg.host.clone(), port: cfg.port, attempts }))
    }
}

fn needs_resync(e: &MpmError) -> bool {
    matches!(e, MpmError::Security(UsmError::NotInTimeWindow | UsmError::UnknownEngineId))
}

/// Pivots one walked `(oid, value)` into `rows` under `base_oid`: the
/// sub-identifier right after `base_oid` is the column, everything after
/// that is the row key.
fn pivot_into(
    base_oid: &ObjectIdentifier,
    oid: ObjectIdentifier,
    value: Value,
    rows: &mut Vec<(String, HashMap<String, Value>)>,
) {
    let Some(suffix) = oid.suffix_after(base_oid) else { return };
    let [column, row_suffix @ ..] = suffix else { return };
    if row_suffix.is_empty() {
        return;
    }
    let column_key = column.to_string();
    let row_key = row_suffix.iter().map(u32::to_string).collect::<Vec<_>>().join(".");

    match rows.iter_mut().find(|(key, _)| *key == row_key) {
        Some((_, row)) => {
            row.insert(column_key, value);
        }
        None => {
            let mut row = HashMap::new();
            row.insert("0".to_string(), Value::TextString { kind: StringKind::Ia5, text: row_key.clone() });
            row.insert(column_key, value);
            rows.push((row_key, row));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    /// A transport stub that always times out, letting tests drive
    /// `Client` code paths that never actually need a response — the same
    /// seam `modules/udp-probe`'s tests use for deterministic I/O.
    struct FakeTransport;

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send_and_receive(
            &self,
            _host: &str,
            _port: u16,
            _request: &[u8],
            _timeout: Duration,
            _buffer_size: usize,
        ) -> Result<Vec<u8>, ClientError> {
            Err(ClientError::Timeout { host: "unused".into(), port: 0, attempts: 1 })
        }
    }

    #[test]
    fn pivot_groups_by_row_suffix() {
        let base: ObjectIdentifier = "1.3.6.1.2.1.2.2.1".parse().unwrap();
        let col1: ObjectIdentifier = "1.3.6.1.2.1.2.2.1.2.1".parse().unwrap();
        let col2: ObjectIdentifier = "1.3.6.1.2.1.2.2.1.3.1".parse().unwrap();
        let mut rows = Vec::new();
        pivot_into(&base, col1, Value::TextString { kind: StringKind::Ia5, text: "eth0".into() }, &mut rows);
        pivot_into(&base, col2, Value::Integer(6), &mut rows);
        assert_eq!(rows.len(), 1);
        let row = &rows[0].1;
        assert_eq!(row.get("0"), Some(&Value::TextString { kind: StringKind::Ia5, text: "1".into() }));
        assert_eq!(row.get("2"), Some(&Value::TextString { kind: StringKind::Ia5, text: "eth0".into() }));
        assert_eq!(row.get("3"), Some(&Value::Integer(6)));
    }

    #[test]
    fn pivot_ignores_oid_without_row_suffix() {
        let base: ObjectIdentifier = "1.3.6.1.2.1.2.2.1".parse().unwrap();
        let scalar: ObjectIdentifier = "1.3.6.1.2.1.2.2.1.2".parse().unwrap();
        let mut rows = Vec::new();
        pivot_into(&base, scalar, Value::Integer(1), &mut rows);
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn multiget_of_empty_oids_is_a_noop() {
        let config = ClientConfig::builder("203.0.113.1", Credentials::v2c("public")).build();
        let client = Client::with_transport(config, Box::new(FakeTransport));
        let result = client.multiget(&[]).await.unwrap();
        assert!(result.is_empty());
    }

    /// A transport stub standing in for an agent at end-of-MIB: every
    /// GETNEXT it receives comes back with a single `EndOfMibView` varbind
    /// echoing the requested OID.
    struct EndOfMibViewTransport;

    #[async_trait]
    impl Transport for EndOfMibViewTransport {
        async fn send_and_receive(
            &self,
            _host: &str,
            _port: u16,
            request: &[u8],
            _timeout: Duration,
            _buffer_size: usize,
        ) -> Result<Vec<u8>, ClientError> {
            let (_community, request_pdu) = snmp_mpm::V2cMpm.decode(request).expect("decode fake request");
            let oid = request_pdu.varbinds[0].oid.clone();
            let response = Pdu::new(
                snmp_pdu::PduKind::GetResponse,
                request_pdu.request_id,
                snmp_pdu::PduCounters::ErrorFields { error_status: 0, error_index: 0 },
                vec![VarBind::new(oid, Value::EndOfMibView)],
            );
            Ok(snmp_mpm::V2cMpm.encode(b"public", &response))
        }
    }

    #[tokio::test]
    async fn getnext_returns_end_of_mib_view_without_error() {
        let config = ClientConfig::builder("203.0.113.1", Credentials::v2c("public")).build();
        let client = Client::with_transport(config, Box::new(EndOfMibViewTransport));
        let oid: ObjectIdentifier = "1.3.6.1.2.1.1.9.1".parse().unwrap();
        let (_, value) = client.getnext(oid).await.unwrap();
        assert!(matches!(value, Value::EndOfMibView));
    }

    #[tokio::test]
    async fn walk_stops_cleanly_on_end_of_mib_view() {
        let config = ClientConfig::builder("203.0.113.1", Credentials::v2c("public")).build();
        let client = Client::with_transport(config, Box::new(EndOfMibViewTransport));
        let base: ObjectIdentifier = "1.3.6.1.2.1.1.9.1".parse().unwrap();
        let mut rx = client.walk(base);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn table_is_empty_not_an_error_on_immediate_end_of_mib_view() {
        let config = ClientConfig::builder("203.0.113.1", Credentials::v2c("public")).build();
        let client = Client::with_transport(config, Box::new(EndOfMibViewTransport));
        let base: ObjectIdentifier = "1.3.6.1.2.1.1.9.1".parse().unwrap();
        let rows = client.table(base).await.unwrap();
        assert!(rows.is_empty());
    }
}

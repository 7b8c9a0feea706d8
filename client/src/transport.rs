//! Transport: a `send`-and-receive round trip over UDP,
//! generalizing `modules/udp-probe`'s `timeout(..., sock.send_to(...))` /
//! `recv_from` idiom from a one-shot probe into a reusable, injectable
//! (for tests) async trait.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::error::ClientError;

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_and_receive(
        &self,
        host: &str,
        port: u16,
        request: &[u8],
        request_timeout: Duration,
        buffer_size: usize,
    ) -> Result<Vec<u8>, ClientError>;
}

/// The default transport: one fresh UDP socket per call, bound to an
/// ephemeral local port, matching the pattern `udp-probe` uses for its
/// DNS/NTP/SNMP probes.
#[derive(Debug, Default, Clone, Copy)]
pub struct UdpTransport;

#[async_trait]
impl Transport for UdpTransport {
    async fn send_and_receive(
        &self,
        host: &str,
        port: u16,
        request: &[u8],
        request_timeout: Duration,
        buffer_size: usize,
    ) -> Result<Vec<u8>, ClientError> {
        let sock = UdpSocket::bind("0.0.0.0:0").await?;
        sock.connect((host, port)).await?;
        timeout(request_timeout, sock.send(request))
            .await
            .map_err(|_| ClientError::Timeout { host: host.to_string(), port, attempts: 1 })??;

        // Allocate one byte past `buffer_size`: a UDP datagram larger than
        // the caller's buffer is truncated by the kernel with no error
        // indication from a plain `recv`, so the only way to detect it is
        // to give ourselves one spare byte and check whether it got used —
        // surface `InvalidValueLength` rather than silently truncating.
        let mut buf = vec![0u8; buffer_size + 1];
        let n = timeout(request_timeout, sock.recv(&mut buf))
            .await
            .map_err(|_| ClientError::Timeout { host: host.to_string(), port, attempts: 1 })??;
        if n > buffer_size {
            return Err(ClientError::InvalidValueLength { len: n, buffer_size });
        }
        buf.truncate(n);
        Ok(buf)
    }
}

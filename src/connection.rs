//! Raw TCP transport: one connection owns exactly one socket, with
//! `SO_KEEPALIVE`/`TCP_NODELAY` set the way a long-lived pipelined client
//! wants them.

use std::net::SocketAddr;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use crate::resp::RespCodec;

/// A framed RESP transport over one TCP socket.
pub type RedisTransport = Framed<TcpStream, RespCodec>;

/// Connects to `(host, port)`, applies keepalive/nodelay, and installs the
/// RESP codec. `connect_timeout` bounds the TCP handshake only; once
/// connected, reads/writes have no deadline of their own — callers impose
/// their own timeouts, per this crate's cancellation model.
pub async fn connect(
    host: &str,
    port: u16,
    connect_timeout: Duration,
) -> Result<RedisTransport, std::io::Error> {
    tracing::debug!(host, port, "connecting");

    let stream = match tokio::time::timeout(connect_timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            tracing::warn!(host, port, error = %e, "connect failed");
            return Err(e);
        }
        Err(_) => {
            let err = std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out");
            tracing::warn!(host, port, error = %err, "connect timed out");
            return Err(err);
        }
    };

    if let Err(e) = stream.set_nodelay(true) {
        tracing::warn!(host, port, error = %e, "failed to set TCP_NODELAY");
        return Err(e);
    }
    if let Err(e) = apply_keepalive(&stream) {
        tracing::warn!(host, port, error = %e, "failed to set SO_KEEPALIVE");
        return Err(e);
    }

    tracing::debug!(host, port, "connected");
    Ok(Framed::new(stream, RespCodec))
}

/// `tokio::net::TcpStream` exposes `set_nodelay` but no keepalive knob, so
/// we reach for `socket2` to flip `SO_KEEPALIVE` on the raw file
/// descriptor, the same way a production client handles the gap between
/// what std/tokio expose and what the OS actually supports.
fn apply_keepalive(stream: &TcpStream) -> std::io::Result<()> {
    let sock_ref = SockRef::from(stream);
    let keepalive = TcpKeepalive::new().with_time(Duration::from_secs(60));
    sock_ref.set_tcp_keepalive(&keepalive)
}

/// Parses a `host:port` address pair, as received in `MOVED`/`ASK`
/// redirects and `CLUSTER SLOTS` replies.
pub fn parse_address(text: &str) -> Option<(String, u16)> {
    let (host, port) = text.rsplit_once(':')?;
    let port: u16 = port.parse().ok()?;
    Some((host.to_string(), port))
}

/// Resolves `(host, port)` to a concrete socket address, used only for
/// diagnostics (the connect path itself resolves lazily via `TcpStream::connect`).
pub async fn resolve(host: &str, port: u16) -> std::io::Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses resolved"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_port() {
        assert_eq!(
            parse_address("127.0.0.1:7001"),
            Some(("127.0.0.1".to_string(), 7001))
        );
    }

    #[test]
    fn rejects_address_without_port() {
        assert_eq!(parse_address("127.0.0.1"), None);
    }

    #[tokio::test]
    async fn connect_and_roundtrip_ping() {
        use bytes::Bytes;
        use futures::{SinkExt, StreamExt};

        use crate::resp::RespValue;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut framed = Framed::new(stream, RespCodec);
            let value = framed.next().await.unwrap().unwrap();
            assert_eq!(
                value,
                RespValue::Array(vec![RespValue::BulkString(Bytes::from_static(b"PING"))])
            );
            framed
                .send(RespValue::SimpleString(Bytes::from_static(b"PONG")))
                .await
                .unwrap();
        });

        let mut transport = connect(
            &addr.ip().to_string(),
            addr.port(),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        transport
            .send(RespValue::Array(vec![RespValue::BulkString(Bytes::from_static(
                b"PING",
            ))]))
            .await
            .unwrap();
        let reply = transport.next().await.unwrap().unwrap();
        assert_eq!(reply, RespValue::SimpleString(Bytes::from_static(b"PONG")));

        server.await.unwrap();
    }
}

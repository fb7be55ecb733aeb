//! The pipelined single-node executor: a persistent task that owns one
//! reconnecting TCP connection, batches outgoing requests, and resolves
//! completions strictly in the order requests were handed to it.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::command::RedisExecutor;
use crate::config::SingleNodeConfig;
use crate::connection::{self, RedisTransport};
use crate::error::RedisError;
use crate::resp::RespValue;

type Completion = oneshot::Sender<Result<RespValue, RedisError>>;

struct PendingRequest {
    args: Vec<Bytes>,
    completion: Completion,
}

/// A pipelined executor for a single Redis node. Safe for concurrent
/// callers — the only contention is the bounded request queue.
pub struct SingleNodeExecutor {
    request_tx: mpsc::Sender<PendingRequest>,
    supervisor: JoinHandle<()>,
}

impl SingleNodeExecutor {
    /// Spawns the supervisor task and returns immediately; the first
    /// connection attempt happens lazily on the supervisor task, not here.
    pub fn connect(config: SingleNodeConfig) -> Self {
        let (request_tx, request_rx) = mpsc::channel(config.queue_capacity.max(1));
        let supervisor = tokio::spawn(run_supervisor(config, request_rx));
        SingleNodeExecutor {
            request_tx,
            supervisor,
        }
    }

    /// Closes the connection and fails every outstanding and queued
    /// request with a terminal I/O error. Equivalent to dropping the
    /// executor.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for SingleNodeExecutor {
    fn drop(&mut self) {
        // Aborting drops every oneshot::Sender the supervisor still holds,
        // which resolves any awaiting `execute` caller with a closed-channel
        // error mapped to RedisError::IOError below.
        self.supervisor.abort();
    }
}

#[async_trait]
impl RedisExecutor for SingleNodeExecutor {
    async fn execute(&self, args: Vec<Bytes>, _has_key: bool) -> Result<RespValue, RedisError> {
        let (completion, receiver) = oneshot::channel();
        self.request_tx
            .send(PendingRequest { args, completion })
            .await
            .map_err(|_| closed_executor_error())?;
        receiver.await.map_err(|_| closed_executor_error())?
    }
}

fn closed_executor_error() -> RedisError {
    RedisError::IOError(std::io::Error::new(
        std::io::ErrorKind::NotConnected,
        "executor closed",
    ))
}

fn transport_error(message: impl Into<String>) -> RedisError {
    RedisError::IOError(std::io::Error::new(std::io::ErrorKind::Other, message.into()))
}

/// Reconnects unconditionally and forever; only task abort (closing the
/// executor's scope) or a graceful request-channel close ends this loop.
async fn run_supervisor(config: SingleNodeConfig, mut requests: mpsc::Receiver<PendingRequest>) {
    let mut attempt: u32 = 0;
    loop {
        let span = tracing::info_span!("single_node_connect", host = %config.host, port = config.port, attempt);
        let _enter = span.enter();

        match connection::connect(&config.host, config.port, config.connect_timeout).await {
            Ok(transport) => {
                drop(_enter);
                attempt = 0;
                match drive_connection(transport, &mut requests, config.queue_capacity.max(1)).await
                {
                    Ok(()) => {
                        tracing::info!(host = %config.host, port = config.port, "request queue closed, shutting down");
                        return;
                    }
                    Err(err) => {
                        tracing::warn!(host = %config.host, port = config.port, error = %err, "connection lost, reconnecting");
                    }
                }
            }
            Err(err) => {
                attempt += 1;
                tracing::warn!(host = %config.host, port = config.port, attempt, error = %err, "connect failed, retrying");
                drop(_enter);
                tokio::time::sleep(Duration::from_millis(50).min(Duration::from_millis(50 * attempt as u64)))
                    .await;
            }
        }
    }
}

/// Runs one connection's worth of sender/reader racing. Returns `Ok(())`
/// only when the request queue closes gracefully (the executor was
/// dropped); any transport failure returns `Err` so the supervisor
/// reconnects.
async fn drive_connection(
    transport: RedisTransport,
    requests: &mut mpsc::Receiver<PendingRequest>,
    batch_cap: usize,
) -> Result<(), RedisError> {
    let (sink, stream) = transport.split();
    let (completions_tx, completions_rx) = mpsc::unbounded_channel::<Completion>();

    let sender_fut = run_sender(requests, sink, completions_tx, batch_cap);
    let reader_fut = run_reader(stream, completions_rx);
    tokio::pin!(sender_fut);
    tokio::pin!(reader_fut);

    tokio::select! {
        result = &mut sender_fut => result,
        result = &mut reader_fut => result,
    }
}

/// Dequeues `[1..batch_cap]` requests in one take: block for the first,
/// then drain whatever else is immediately available without waiting
/// further.
async fn recv_batch(
    requests: &mut mpsc::Receiver<PendingRequest>,
    batch_cap: usize,
) -> Option<Vec<PendingRequest>> {
    let first = requests.recv().await?;
    let mut batch = Vec::with_capacity(batch_cap);
    batch.push(first);
    while batch.len() < batch_cap {
        match requests.try_recv() {
            Ok(req) => batch.push(req),
            Err(_) => break,
        }
    }
    Some(batch)
}

async fn run_sender(
    requests: &mut mpsc::Receiver<PendingRequest>,
    mut sink: SplitSink<RedisTransport, RespValue>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    batch_cap: usize,
) -> Result<(), RedisError> {
    loop {
        let batch = match recv_batch(requests, batch_cap).await {
            Some(batch) => batch,
            None => return Ok(()),
        };

        let mut completions = Vec::with_capacity(batch.len());
        let mut write_failed = None;
        for request in batch {
            let value = RespValue::Array(request.args.into_iter().map(RespValue::BulkString).collect());
            match sink.feed(value).await {
                Ok(()) => completions.push(request.completion),
                Err(e) => {
                    write_failed = Some(e.to_string());
                    completions.push(request.completion);
                    break;
                }
            }
        }

        if write_failed.is_none() {
            if let Err(e) = sink.flush().await {
                write_failed = Some(e.to_string());
            }
        }

        match write_failed {
            None => {
                for completion in completions {
                    // Reader may already be gone if it failed concurrently;
                    // a dropped receiver just means the completion is
                    // resolved via the oneshot being dropped instead.
                    let _ = completions_tx.send(completion);
                }
            }
            Some(message) => {
                for completion in completions {
                    let _ = completion.send(Err(transport_error(message.clone())));
                }
                return Err(transport_error(message));
            }
        }
    }
}

async fn run_reader(
    mut stream: SplitStream<RedisTransport>,
    mut completions_rx: mpsc::UnboundedReceiver<Completion>,
) -> Result<(), RedisError> {
    loop {
        match stream.next().await {
            Some(Ok(value)) => match completions_rx.recv().await {
                Some(completion) => {
                    let _ = completion.send(Ok(value));
                }
                None => {
                    tracing::warn!("reply received with no outstanding request; discarding");
                }
            },
            Some(Err(e)) => {
                let message = e.to_string();
                drain_completions(&mut completions_rx, &message);
                return Err(transport_error(message));
            }
            None => {
                let message = "connection closed by peer".to_string();
                drain_completions(&mut completions_rx, &message);
                return Err(transport_error(message));
            }
        }
    }
}

fn drain_completions(rx: &mut mpsc::UnboundedReceiver<Completion>, message: &str) {
    while let Ok(completion) = rx.try_recv() {
        let _ = completion.send(Err(transport_error(message.to_string())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::SinkExt as _;
    use tokio::net::TcpListener;
    use tokio_util::codec::Framed;

    use crate::resp::RespCodec;

    async fn fake_server(
        listener: TcpListener,
        replies: Vec<RespValue>,
    ) -> Vec<RespValue> {
        let (stream, _) = listener.accept().await.unwrap();
        let mut framed = Framed::new(stream, RespCodec);
        let mut received = Vec::new();
        for reply in replies {
            let request = framed.next().await.unwrap().unwrap();
            received.push(request);
            framed.send(reply).await.unwrap();
        }
        received
    }

    #[tokio::test]
    async fn fifo_matching_across_concurrent_callers() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let replies = vec![
            RespValue::Integer(1),
            RespValue::Integer(2),
            RespValue::Integer(3),
        ];
        let server = tokio::spawn(fake_server(listener, replies));

        let executor = SingleNodeExecutor::connect(
            SingleNodeConfig::new(addr.ip().to_string(), addr.port()).with_queue_capacity(1),
        );

        let a = executor.execute(vec![Bytes::from_static(b"INCR"), Bytes::from_static(b"k")], true);
        let b = executor.execute(vec![Bytes::from_static(b"INCR"), Bytes::from_static(b"k")], true);
        let c = executor.execute(vec![Bytes::from_static(b"INCR"), Bytes::from_static(b"k")], true);

        let (ra, rb, rc) = tokio::join!(a, b, c);
        assert_eq!(ra.unwrap(), RespValue::Integer(1));
        assert_eq!(rb.unwrap(), RespValue::Integer(2));
        assert_eq!(rc.unwrap(), RespValue::Integer(3));

        server.await.unwrap();
        executor.close();
    }

    #[tokio::test]
    async fn outstanding_calls_fail_on_mid_stream_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut framed = Framed::new(stream, RespCodec);
            let _ = framed.next().await.unwrap().unwrap();
            drop(framed);
        });

        let executor = SingleNodeExecutor::connect(SingleNodeConfig::new(
            addr.ip().to_string(),
            addr.port(),
        ));

        let result = executor
            .execute(vec![Bytes::from_static(b"GET"), Bytes::from_static(b"k")], true)
            .await;
        assert!(matches!(result, Err(RedisError::IOError(_))));

        server.await.unwrap();
        executor.close();
    }
}

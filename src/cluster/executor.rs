//! `ClusterExecutor`: slot-based dispatch across a cluster topology,
//! with `MOVED`/`ASK` redirect handling and topology refresh.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use crate::command::{RedisCommand, RedisExecutor};
use crate::config::{ClusterConfig, SingleNodeConfig};
use crate::error::RedisError;
use crate::executor::SingleNodeExecutor;
use crate::resp::input::NoArgs;
use crate::resp::output::{ClusterSlotsOutput, Unit};
use crate::resp::RespValue;

use super::slot::slot_for_key;
use super::topology::ClusterConnection;

fn cluster_slots_command() -> RedisCommand<(), Vec<crate::resp::output::ClusterPartition>, NoArgs, ClusterSlotsOutput>
{
    RedisCommand::keyless(&["CLUSTER", "SLOTS"], NoArgs, ClusterSlotsOutput)
}

fn asking_command() -> RedisCommand<(), (), NoArgs, Unit> {
    RedisCommand::keyless(&["ASKING"], NoArgs, Unit)
}

/// Topology-aware router. Holds the current topology behind an
/// `ArcSwap` so readers never block a concurrent refresh, plus a small
/// side table of ad-hoc executors opened for `ASK` targets that aren't
/// (yet) a known partition master.
pub struct ClusterExecutor {
    snapshot: ArcSwap<ClusterConnection>,
    config: ClusterConfig,
    ask_executors: Mutex<HashMap<(String, u16), Arc<SingleNodeExecutor>>>,
}

impl ClusterExecutor {
    /// Tries each seed address in order until one answers `CLUSTER
    /// SLOTS`; builds the initial topology snapshot from it.
    pub async fn connect(config: ClusterConfig) -> Result<Self, RedisError> {
        let snapshot = bootstrap(&config).await?;
        Ok(ClusterExecutor {
            snapshot: ArcSwap::from_pointee(snapshot),
            config,
            ask_executors: Mutex::new(HashMap::new()),
        })
    }

    async fn refresh(&self) -> Result<(), RedisError> {
        let snapshot = bootstrap(&self.config).await?;
        self.snapshot.store(Arc::new(snapshot));
        Ok(())
    }

    async fn ask_executor(&self, address: &(String, u16)) -> Arc<SingleNodeExecutor> {
        let mut ask_executors = self.ask_executors.lock().await;
        if let Some(existing) = ask_executors.get(address) {
            return existing.clone();
        }
        let executor = Arc::new(SingleNodeExecutor::connect(
            SingleNodeConfig::new(address.0.clone(), address.1)
                .with_queue_capacity(self.config.queue_capacity)
                .with_connect_timeout(self.config.connect_timeout),
        ));
        ask_executors.insert(address.clone(), executor.clone());
        executor
    }

    fn executor_for(&self, args: &[Bytes], has_key: bool) -> Result<Arc<SingleNodeExecutor>, RedisError> {
        let snapshot = self.snapshot.load();
        if !has_key {
            return snapshot
                .any_executor()
                .ok_or_else(|| RedisError::ClusterConnectionError("no connected executors".into()));
        }
        let key = args
            .get(1)
            .ok_or_else(|| RedisError::ClusterKeyError("command has no key argument".into()))?;
        let slot = slot_for_key(key);
        snapshot
            .executor_for_slot(slot)
            .ok_or_else(|| RedisError::ClusterKeyExecutorError(format!("no executor owns slot {slot}")))
    }
}

#[async_trait]
impl RedisExecutor for ClusterExecutor {
    async fn execute(&self, args: Vec<Bytes>, has_key: bool) -> Result<RespValue, RedisError> {
        let mut attempt = 0;
        loop {
            let executor = self.executor_for(&args, has_key)?;
            let reply = match executor.execute(args.clone(), has_key).await {
                Ok(reply) => reply,
                Err(err) if err.is_retryable() && attempt < self.config.retry.max_attempts => {
                    attempt += 1;
                    tokio::time::sleep(self.config.retry.delay_for(attempt)).await;
                    continue;
                }
                Err(err) => return Err(err),
            };

            let redirect = match &reply {
                RespValue::Error(text) => Some(RedisError::classify(text)),
                _ => None,
            };

            match redirect {
                None => return Ok(reply),
                Some(RedisError::Moved { address, .. }) => {
                    if attempt >= self.config.retry.max_attempts {
                        return Ok(reply);
                    }
                    self.refresh().await?;
                    let _ = address;
                    attempt += 1;
                    tokio::time::sleep(self.config.retry.delay_for(attempt)).await;
                }
                Some(RedisError::Ask { address, .. }) => {
                    if attempt >= self.config.retry.max_attempts {
                        return Ok(reply);
                    }
                    let target = self.ask_executor(&address).await;
                    asking_command()
                        .run(target.as_ref(), ())
                        .await
                        .map_err(|e| {
                            RedisError::ClusterConnectionError(format!(
                                "ASKING against {address:?} failed: {e}"
                            ))
                        })?;
                    let retried = target.execute(args.clone(), has_key).await?;
                    return Ok(retried);
                }
                Some(_) => return Ok(reply),
            }
        }
    }
}

async fn bootstrap(config: &ClusterConfig) -> Result<ClusterConnection, RedisError> {
    let command = cluster_slots_command();
    let mut last_error = None;

    for (host, port) in &config.seed_addresses {
        let seed = SingleNodeExecutor::connect(
            SingleNodeConfig::new(host.clone(), *port)
                .with_queue_capacity(config.queue_capacity)
                .with_connect_timeout(config.connect_timeout),
        );
        match command.run(&seed, ()).await {
            Ok(partitions) => return Ok(ClusterConnection::build(partitions, config)),
            Err(e) => last_error = Some(e),
        }
    }

    Err(RedisError::ClusterConnectionError(format!(
        "no seed address answered CLUSTER SLOTS: {}",
        last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no seed addresses configured".into())
    )))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio_util::codec::Framed;

    use crate::config::RetryConfig;
    use crate::resp::RespCodec;

    use super::*;

    fn whole_range_slots(host: &str, port: u16) -> RespValue {
        RespValue::Array(vec![RespValue::Array(vec![
            RespValue::Integer(0),
            RespValue::Integer(16383),
            RespValue::Array(vec![
                RespValue::BulkString(Bytes::copy_from_slice(host.as_bytes())),
                RespValue::Integer(port as i64),
            ]),
        ])])
    }

    /// Accepts one connection per entry of `sessions`; each session serves
    /// its replies to sequential requests on that one connection in order,
    /// then moves on to the next accepted connection.
    async fn serve_connections(listener: TcpListener, sessions: Vec<Vec<RespValue>>) {
        for replies in sessions {
            let (stream, _) = listener.accept().await.unwrap();
            let mut framed = Framed::new(stream, RespCodec);
            for reply in replies {
                let _request = framed.next().await.unwrap().unwrap();
                framed.send(reply).await.unwrap();
            }
        }
    }

    fn fast_retry_config() -> RetryConfig {
        RetryConfig {
            base: Duration::from_millis(1),
            factor: 1.0,
            max_attempts: 5,
        }
    }

    /// A `MOVED` reply triggers exactly one topology refresh, after which
    /// the command succeeds against the new owner.
    #[tokio::test]
    async fn moved_reply_refreshes_topology_and_retries_once() {
        let listener_a = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr_a = listener_a.local_addr().unwrap();
        let listener_b = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr_b = listener_b.local_addr().unwrap();

        let server_a = tokio::spawn(serve_connections(
            listener_a,
            vec![
                vec![whole_range_slots(&addr_a.ip().to_string(), addr_a.port())],
                vec![RespValue::Error(Bytes::from(format!(
                    "MOVED 5474 {}:{}",
                    addr_b.ip(),
                    addr_b.port()
                )))],
                vec![whole_range_slots(&addr_b.ip().to_string(), addr_b.port())],
            ],
        ));
        let server_b = tokio::spawn(serve_connections(
            listener_b,
            vec![vec![RespValue::BulkString(Bytes::from_static(b"9"))]],
        ));

        let config = ClusterConfig {
            seed_addresses: vec![(addr_a.ip().to_string(), addr_a.port())],
            retry: fast_retry_config(),
            queue_capacity: 16,
            connect_timeout: Duration::from_secs(5),
        };
        let cluster = ClusterExecutor::connect(config).await.unwrap();

        let reply = cluster
            .execute(
                vec![Bytes::from_static(b"GET"), Bytes::from_static(b"{user}.x")],
                true,
            )
            .await
            .unwrap();
        assert_eq!(reply, RespValue::BulkString(Bytes::from_static(b"9")));

        server_a.await.unwrap();
        server_b.await.unwrap();
    }

    /// An `ASK` reply is preceded by `ASKING` on the redirect target and
    /// does **not** trigger a topology refresh — the seed only ever
    /// answers `CLUSTER SLOTS` once.
    #[tokio::test]
    async fn ask_reply_sends_asking_then_retries_without_refresh() {
        let listener_a = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr_a = listener_a.local_addr().unwrap();
        let listener_b = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr_b = listener_b.local_addr().unwrap();

        let server_a = tokio::spawn(serve_connections(
            listener_a,
            vec![
                vec![whole_range_slots(&addr_a.ip().to_string(), addr_a.port())],
                vec![RespValue::Error(Bytes::from(format!(
                    "ASK 5474 {}:{}",
                    addr_b.ip(),
                    addr_b.port()
                )))],
            ],
        ));
        let server_b = tokio::spawn(serve_connections(
            listener_b,
            vec![vec![
                RespValue::SimpleString(Bytes::from_static(b"OK")),
                RespValue::BulkString(Bytes::from_static(b"9")),
            ]],
        ));

        let config = ClusterConfig {
            seed_addresses: vec![(addr_a.ip().to_string(), addr_a.port())],
            retry: fast_retry_config(),
            queue_capacity: 16,
            connect_timeout: Duration::from_secs(5),
        };
        let cluster = ClusterExecutor::connect(config).await.unwrap();

        let reply = cluster
            .execute(
                vec![Bytes::from_static(b"GET"), Bytes::from_static(b"{user}.x")],
                true,
            )
            .await
            .unwrap();
        assert_eq!(reply, RespValue::BulkString(Bytes::from_static(b"9")));

        server_a.await.unwrap();
        server_b.await.unwrap();
    }
}

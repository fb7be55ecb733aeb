//! A pipelined RESP client: typed command encoding/decoding over a
//! reconnecting TCP connection, with an optional cluster-aware executor
//! that routes by slot and follows `MOVED`/`ASK` redirects.
//!
//! The per-command wrapper methods (`GET`, `SET`, `XADD`, …) that a
//! full client surface would expose are outside this crate's scope —
//! [`command::RedisCommand`] is the building block they would be
//! written in terms of. What's here is everything underneath that
//! surface: the wire codec, typed argument/reply (en|de)coders, the
//! command descriptor, the single-node and cluster executors, and the
//! error taxonomy they all resolve to.

pub mod cluster;
pub mod codec;
pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod resp;

pub use cluster::{ClusterConnection, ClusterExecutor};
pub use codec::Codec;
pub use command::{RedisCommand, RedisExecutor};
pub use config::{ClusterConfig, RetryConfig, SingleNodeConfig};
pub use connection::RedisTransport;
pub use error::RedisError;
pub use executor::SingleNodeExecutor;
pub use resp::{RespCodec, RespValue};

//! Cluster topology-aware routing: slot hashing, the topology snapshot,
//! and the executor that dispatches through it.

pub mod executor;
pub mod slot;
pub mod topology;

pub use executor::ClusterExecutor;
pub use topology::ClusterConnection;

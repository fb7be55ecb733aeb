//! Plain configuration structs. No env/CLI loading lives here — per the
//! crate's scope, application configuration is the caller's concern; we
//! only define the shape of what a caller hands us.

use std::time::Duration;

/// Configuration for a single-node connection.
#[derive(Debug, Clone)]
pub struct SingleNodeConfig {
    pub host: String,
    pub port: u16,
    /// Bounded request-queue capacity. Any value >= 1 is correct;
    /// performance, not correctness, is affected by the choice.
    pub queue_capacity: usize,
    pub connect_timeout: Duration,
}

impl SingleNodeConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        SingleNodeConfig {
            host: host.into(),
            port,
            queue_capacity: 16,
            connect_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Exponential backoff parameters for cluster retry.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub base: Duration,
    pub factor: f64,
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            base: Duration::from_millis(50),
            factor: 2.0,
            max_attempts: 5,
        }
    }
}

impl RetryConfig {
    /// Backoff delay before retry attempt `attempt` (0-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let scale = self.factor.powi(attempt as i32);
        Duration::from_secs_f64(self.base.as_secs_f64() * scale)
    }
}

/// Configuration for a cluster-aware connection.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub seed_addresses: Vec<(String, u16)>,
    pub retry: RetryConfig,
    pub queue_capacity: usize,
    pub connect_timeout: Duration,
}

impl ClusterConfig {
    pub fn new(seed_addresses: Vec<(String, u16)>) -> Self {
        ClusterConfig {
            seed_addresses,
            retry: RetryConfig::default(),
            queue_capacity: 16,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

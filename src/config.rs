use std::time::Duration;

/// Construction-time configuration shared by both pool flavors.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
pub struct PoolConfig {
    /// Number of cells the pool holds. Must be greater than zero.
    pub capacity: usize,
    /// Maximum time an available cell may sit idle before the next
    /// `get` discards it. `Duration::MAX` means never.
    #[cfg_attr(feature = "config", serde(default = "forever"))]
    pub idle_timeout: Duration,
    /// Maximum time a payload may live since its last `reset` before a
    /// `recycle` wastes it instead. `Duration::MAX` means unbounded.
    #[cfg_attr(feature = "config", serde(default = "forever"))]
    pub lifespan: Duration,
    /// Capacity of the pending-request queue (async pool only). Zero
    /// disables queueing entirely.
    #[cfg_attr(feature = "config", serde(default))]
    pub queue_capacity: usize,
}

#[cfg(feature = "config")]
fn forever() -> Duration {
    Duration::MAX
}

impl PoolConfig {
    /// A config with no idle timeout, no lifespan and no waiter queue.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            idle_timeout: Duration::MAX,
            lifespan: Duration::MAX,
            queue_capacity: 0,
        }
    }

    /// Reads a [`PoolConfig`] from environment variables prefixed with
    /// `prefix`.
    ///
    /// ## Example environment
    /// ```env
    /// POOL_CAPACITY = 16
    /// POOL_IDLE_TIMEOUT = 30s
    /// POOL_LIFESPAN = 1h
    /// POOL_QUEUE_CAPACITY = 64
    /// ```
    /// ## Example usage
    /// ```rust,ignore
    /// PoolConfig::from_env("POOL")
    /// ```
    #[cfg(feature = "config")]
    pub fn from_env(prefix: &str) -> Result<PoolConfig, ::config_crate::ConfigError> {
        let mut cfg = ::config_crate::Config::new();
        cfg.merge(::config_crate::Environment::with_prefix(prefix))?;
        cfg.try_into()
    }
}

impl Default for PoolConfig {
    /// `capacity` defaults to `cpu_count * 4` physical cores, matching
    /// the default used throughout the `deadpool` family.
    fn default() -> Self {
        Self {
            capacity: num_cpus::get_physical() * 4,
            idle_timeout: Duration::MAX,
            lifespan: Duration::MAX,
            queue_capacity: 0,
        }
    }
}

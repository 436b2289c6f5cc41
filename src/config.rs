use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{PoolError, Result};

/// Default interval at which `wait()` re-checks the drain condition.
const DEFAULT_DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Default prefix for worker thread names.
const DEFAULT_THREAD_NAME: &str = "workpool-worker";

/// How `submit` behaves when the pool is already saturated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitPolicy {
    /// Always accept into an unbounded FIFO queue.
    #[default]
    Unbounded,
    /// Block while the queue already holds this many pending tasks.
    Bounded(usize),
    /// Block until an idle worker is available to take the task.
    ///
    /// Pending tasks never outnumber idle workers, so every accepted task
    /// starts without waiting behind another one.
    FreeWorker,
}

/// Configuration of a [`WorkerPool`](crate::WorkerPool).
///
/// Can be built in code with the `with_*` methods or parsed from JSON:
///
/// ```
/// use workpool::{PoolConfig, SubmitPolicy};
///
/// let config = PoolConfig::from_json(r#"{ "worker_count": 4, "submit_policy": { "bounded": 64 } }"#)?;
/// assert_eq!(config.worker_count, 4);
/// assert_eq!(config.submit_policy, SubmitPolicy::Bounded(64));
/// # Ok::<(), workpool::PoolError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of worker threads spawned by `run()`.
    pub worker_count: usize,
    /// Prefix of worker thread names; workers are named `{thread_name}-{index}`.
    pub thread_name: String,
    /// Behaviour of `submit` under load.
    pub submit_policy: SubmitPolicy,
    /// Upper bound between two drain checks in `wait()`.
    #[serde(rename = "drain_poll_interval_ms", with = "millis")]
    pub drain_poll_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get(),
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
            submit_policy: SubmitPolicy::default(),
            drain_poll_interval: DEFAULT_DRAIN_POLL_INTERVAL,
        }
    }
}

impl PoolConfig {
    /// Creates a default configuration with the given number of workers.
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count,
            ..Default::default()
        }
    }

    /// Parses a configuration from a JSON document.
    ///
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the worker thread name prefix.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Sets the submit policy.
    pub fn with_submit_policy(mut self, policy: SubmitPolicy) -> Self {
        self.submit_policy = policy;
        self
    }

    /// Sets the drain re-check interval used by `wait()`.
    pub fn with_drain_poll_interval(mut self, interval: Duration) -> Self {
        self.drain_poll_interval = interval;
        self
    }

    /// Checks the settings that do not depend on the worker count.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.submit_policy == SubmitPolicy::Bounded(0) {
            return Err(PoolError::InvalidConfig(
                "bounded submit policy needs a capacity of at least 1".to_owned(),
            ));
        }
        if self.drain_poll_interval.is_zero() {
            return Err(PoolError::InvalidConfig(
                "drain poll interval must be non-zero".to_owned(),
            ));
        }
        Ok(())
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(interval: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(interval.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

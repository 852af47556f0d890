use std::{env, time::Duration};

use bundle_common::helpers::{env_non_empty, env_or_default, env_seconds_or_default, parse_boolean_flag};
use bundle_engine::{FulfillmentPolicy, DEFAULT_MAX_RETRIES, DEFAULT_QUEUE_BATCH_SIZE, DEFAULT_RECONCILE_BATCH_SIZE};
use bundle_provider::ProviderConfig;
use log::*;

const DEFAULT_BUNDLE_HOST: &str = "127.0.0.1";
const DEFAULT_BUNDLE_PORT: u16 = 8460;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/bundle_store.db";
pub const DEFAULT_QUEUE_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_WORKER_START_DELAY: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub provider: ProviderConfig,
    pub workers: WorkerConfig,
    pub policy: FulfillmentPolicy,
    /// If true, the provider balance is not checked on startup.
    pub skip_preflight: bool,
}

/// Timings for the two background workers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerConfig {
    pub queue_interval: Duration,
    pub reconcile_interval: Duration,
    /// Time to wait after startup before either worker runs for the first time
    pub start_delay: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_interval: DEFAULT_QUEUE_INTERVAL,
            reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
            start_delay: DEFAULT_WORKER_START_DELAY,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BUNDLE_HOST.to_string(),
            port: DEFAULT_BUNDLE_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            provider: ProviderConfig::default(),
            workers: WorkerConfig::default(),
            policy: FulfillmentPolicy::default(),
            skip_preflight: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env_non_empty("BUNDLE_HOST").unwrap_or_else(|| DEFAULT_BUNDLE_HOST.into());
        let port = env_or_default("BUNDLE_PORT", DEFAULT_BUNDLE_PORT);
        let database_url = env_non_empty("BUNDLE_DATABASE_URL").unwrap_or_else(|| {
            warn!("🪛️ BUNDLE_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.to_string()
        });
        let provider = ProviderConfig::new_from_env_or_default();
        let workers = WorkerConfig::from_env_or_default();
        let policy = policy_from_env_or_default();
        let skip_preflight = parse_boolean_flag(env::var("BUNDLE_SKIP_PREFLIGHT").ok(), false);
        Self { host, port, database_url, provider, workers, policy, skip_preflight }
    }
}

impl WorkerConfig {
    pub fn from_env_or_default() -> Self {
        let queue_interval = positive_interval("BUNDLE_QUEUE_INTERVAL", DEFAULT_QUEUE_INTERVAL);
        let reconcile_interval = positive_interval("BUNDLE_RECONCILE_INTERVAL", DEFAULT_RECONCILE_INTERVAL);
        let start_delay = env_seconds_or_default("BUNDLE_WORKER_START_DELAY", DEFAULT_WORKER_START_DELAY);
        Self { queue_interval, reconcile_interval, start_delay }
    }
}

/// `tokio::time::interval` panics on a zero period, so zero is replaced by the default.
fn positive_interval(name: &str, default: Duration) -> Duration {
    let interval = env_seconds_or_default(name, default);
    if interval.is_zero() {
        warn!("🪛️ {name} cannot be zero. Using the default of {}s instead.", default.as_secs());
        return default;
    }
    interval
}

fn policy_from_env_or_default() -> FulfillmentPolicy {
    let at_least_one = |name: &str, default: i64| {
        let value = env_or_default(name, default);
        if value < 1 {
            warn!("🪛️ {name} must be at least 1, but is {value}. Using the default of {default} instead.");
            default
        } else {
            value
        }
    };
    FulfillmentPolicy {
        queue_batch_size: at_least_one("BUNDLE_QUEUE_BATCH_SIZE", DEFAULT_QUEUE_BATCH_SIZE),
        reconcile_batch_size: at_least_one("BUNDLE_RECONCILE_BATCH_SIZE", DEFAULT_RECONCILE_BATCH_SIZE),
        max_retries: at_least_one("BUNDLE_MAX_RETRIES", DEFAULT_MAX_RETRIES),
    }
}

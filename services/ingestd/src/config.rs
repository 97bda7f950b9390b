//! Runtime configuration. Defaults cover a local single-node run; every
//! knob can be overridden by an `ACEQUIA_*` environment variable, and a
//! YAML file named by `ACEQUIA_CONFIG` overrides the defaults before the
//! environment is applied (env wins).
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl StorageBackend {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" => Ok(Self::Postgres),
            other => bail!("unknown storage backend {other:?} (expected memory or postgres)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// API listener.
    pub bind_addr: SocketAddr,
    /// Prometheus exposition listener, separate from the API.
    pub metrics_addr: SocketAddr,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
    /// Seconds between automatic buffer flushes.
    pub flush_interval_secs: u64,
    /// Upper bound on the final flush during shutdown.
    pub flush_shutdown_timeout_secs: u64,
    /// SSE heartbeat period.
    pub sse_keepalive_secs: u64,
    /// Per-subscriber broadcast queue depth.
    pub subscriber_queue_capacity: usize,
    /// Flow-rate thresholds for derived channel status.
    pub status_low_flow: f64,
    pub status_high_flow: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8088".parse().expect("static addr"),
            metrics_addr: "0.0.0.0:9100".parse().expect("static addr"),
            storage: StorageBackend::Memory,
            postgres: None,
            flush_interval_secs: 600,
            flush_shutdown_timeout_secs: 10,
            sse_keepalive_secs: 25,
            subscriber_queue_capacity: 256,
            status_low_flow: 2.0,
            status_high_flow: 50.0,
        }
    }
}

/// Shape of the optional YAML file. Every field is optional; absent fields
/// keep their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileOverrides {
    bind_addr: Option<SocketAddr>,
    metrics_addr: Option<SocketAddr>,
    storage: Option<String>,
    postgres_url: Option<String>,
    postgres_max_connections: Option<u32>,
    postgres_connect_timeout_ms: Option<u64>,
    flush_interval_secs: Option<u64>,
    flush_shutdown_timeout_secs: Option<u64>,
    sse_keepalive_secs: Option<u64>,
    subscriber_queue_capacity: Option<usize>,
    status_low_flow: Option<f64>,
    status_high_flow: Option<f64>,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|err| anyhow::anyhow!("invalid {name}={raw:?}: {err}")),
        None => Ok(None),
    }
}

impl Config {
    /// Load defaults, then the YAML file named by `ACEQUIA_CONFIG` (if set),
    /// then individual `ACEQUIA_*` environment variables.
    pub fn load() -> Result<Self> {
        let mut config = Config::default();
        let mut postgres_url: Option<String> = None;
        let mut postgres_max_connections: u32 = 10;
        let mut postgres_connect_timeout = Duration::from_millis(5_000);

        if let Some(path) = env_var("ACEQUIA_CONFIG") {
            let overrides = Self::read_file(Path::new(&path))?;
            if let Some(v) = overrides.bind_addr {
                config.bind_addr = v;
            }
            if let Some(v) = overrides.metrics_addr {
                config.metrics_addr = v;
            }
            if let Some(v) = overrides.storage.as_deref() {
                config.storage = StorageBackend::parse(v)?;
            }
            postgres_url = overrides.postgres_url.or(postgres_url);
            if let Some(v) = overrides.postgres_max_connections {
                postgres_max_connections = v;
            }
            if let Some(v) = overrides.postgres_connect_timeout_ms {
                postgres_connect_timeout = Duration::from_millis(v);
            }
            if let Some(v) = overrides.flush_interval_secs {
                config.flush_interval_secs = v;
            }
            if let Some(v) = overrides.flush_shutdown_timeout_secs {
                config.flush_shutdown_timeout_secs = v;
            }
            if let Some(v) = overrides.sse_keepalive_secs {
                config.sse_keepalive_secs = v;
            }
            if let Some(v) = overrides.subscriber_queue_capacity {
                config.subscriber_queue_capacity = v;
            }
            if let Some(v) = overrides.status_low_flow {
                config.status_low_flow = v;
            }
            if let Some(v) = overrides.status_high_flow {
                config.status_high_flow = v;
            }
        }

        if let Some(v) = env_parsed("ACEQUIA_BIND")? {
            config.bind_addr = v;
        }
        if let Some(v) = env_parsed("ACEQUIA_METRICS_BIND")? {
            config.metrics_addr = v;
        }
        if let Some(v) = env_var("ACEQUIA_STORAGE") {
            config.storage = StorageBackend::parse(&v)?;
        }
        if let Some(v) = env_var("ACEQUIA_PG_URL") {
            postgres_url = Some(v);
        }
        if let Some(v) = env_parsed("ACEQUIA_PG_MAX_CONNECTIONS")? {
            postgres_max_connections = v;
        }
        if let Some(v) = env_parsed::<u64>("ACEQUIA_PG_CONNECT_TIMEOUT_MS")? {
            postgres_connect_timeout = Duration::from_millis(v);
        }
        if let Some(v) = env_parsed("ACEQUIA_FLUSH_INTERVAL_SECS")? {
            config.flush_interval_secs = v;
        }
        if let Some(v) = env_parsed("ACEQUIA_FLUSH_SHUTDOWN_TIMEOUT_SECS")? {
            config.flush_shutdown_timeout_secs = v;
        }
        if let Some(v) = env_parsed("ACEQUIA_SSE_KEEPALIVE_SECS")? {
            config.sse_keepalive_secs = v;
        }
        if let Some(v) = env_parsed("ACEQUIA_SUBSCRIBER_QUEUE_CAPACITY")? {
            config.subscriber_queue_capacity = v;
        }
        if let Some(v) = env_parsed("ACEQUIA_STATUS_LOW_FLOW")? {
            config.status_low_flow = v;
        }
        if let Some(v) = env_parsed("ACEQUIA_STATUS_HIGH_FLOW")? {
            config.status_high_flow = v;
        }

        if config.storage == StorageBackend::Postgres {
            let url = postgres_url
                .context("storage backend is postgres but ACEQUIA_PG_URL is not set")?;
            config.postgres = Some(PostgresConfig {
                url,
                max_connections: postgres_max_connections,
                connect_timeout: postgres_connect_timeout,
            });
        }

        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<FileOverrides> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("parse config file {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        if self.flush_interval_secs == 0 {
            bail!("flush interval must be at least 1 second");
        }
        if self.sse_keepalive_secs == 0 {
            bail!("sse keepalive must be at least 1 second");
        }
        if self.subscriber_queue_capacity == 0 {
            bail!("subscriber queue capacity must be at least 1");
        }
        if !(self.status_low_flow.is_finite() && self.status_high_flow.is_finite()) {
            bail!("status thresholds must be finite");
        }
        if self.status_low_flow < 0.0 || self.status_high_flow <= self.status_low_flow {
            bail!(
                "status thresholds must satisfy 0 <= low < high (got low={}, high={})",
                self.status_low_flow,
                self.status_high_flow
            );
        }
        Ok(())
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn flush_shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.flush_shutdown_timeout_secs)
    }

    pub fn sse_keepalive(&self) -> Duration {
        Duration::from_secs(self.sse_keepalive_secs)
    }
}

//! Queue, store and relay configuration structures.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::DEFAULT_PAYLOAD;
use crate::infra::queue::{QueueLimits, DEFAULT_MAX_DEPTH, DEFAULT_RETENTION};

/// Environment setting naming a JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "RELAY_CONFIG";

/// Queue backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueBackendConfig {
    /// In-memory queue for development/testing.
    #[default]
    InMemory,
    /// JSON-lines file queue.
    File,
    /// Amazon SQS or an SQS-compatible service.
    Sqs,
}

/// Store backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackendConfig {
    /// In-memory store.
    #[default]
    InMemory,
    /// JSON-lines file store.
    File,
    /// SQLite database.
    Sqlite,
    /// Cassandra or ScyllaDB cluster reached through `contact_point`.
    Cassandra,
}

/// Durability level requested for store writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Consistency {
    /// Fire and forget; nothing is flushed.
    Any,
    /// Flushed by the OS at its leisure.
    One,
    /// Synced before the write is acknowledged.
    #[default]
    Quorum,
    /// Synced with the strictest setting the backend offers.
    All,
}

impl Consistency {
    /// Whether writes must be synced to disk before returning.
    #[must_use]
    pub const fn requires_sync(self) -> bool {
        matches!(self, Self::Quorum | Self::All)
    }
}

impl std::str::FromStr for Consistency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" => Ok(Self::Any),
            "one" => Ok(Self::One),
            "quorum" => Ok(Self::Quorum),
            "all" => Ok(Self::All),
            other => Err(format!("unknown consistency `{other}`")),
        }
    }
}

/// Queue endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Backend selection.
    #[serde(default)]
    pub backend: QueueBackendConfig,
    /// Queue URL or identifier. For the file backend, a directory path with an
    /// optional `file://` prefix; for SQS, the queue URL.
    pub url: String,
    /// Seconds a received message stays hidden before it may be delivered again.
    #[serde(default = "default_visibility_timeout_secs")]
    pub visibility_timeout_secs: u64,
    /// Messages a local queue holds before sends fail.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Seconds a local queue keeps a message after it was sent.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    /// SQS region. Falls back to the AWS environment, then `eu-west-1`.
    #[serde(default)]
    pub region: Option<String>,
    /// Override of the SQS service endpoint, e.g. for a local emulator.
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: QueueBackendConfig::default(),
            url: default_queue_url(),
            visibility_timeout_secs: default_visibility_timeout_secs(),
            max_depth: default_max_depth(),
            retention_secs: default_retention_secs(),
            region: None,
            endpoint_url: None,
        }
    }
}

/// Store endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend selection.
    #[serde(default)]
    pub backend: StoreBackendConfig,
    /// Cassandra contact point as `host[:port]`. For file and SQLite backends, a
    /// directory path.
    #[serde(default)]
    pub contact_point: String,
    /// Logical namespace the fixed `messages` table lives in.
    #[serde(default = "default_keyspace")]
    pub keyspace: String,
    /// Durability level for writes.
    #[serde(default)]
    pub consistency: Consistency,
}

/// Root relay configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Queue the producer and consumer talk to.
    pub queue: QueueConfig,
    /// Store the persister writes to.
    pub store: StoreConfig,
    /// Payload sent by the producer.
    #[serde(default = "default_payload")]
    pub payload: String,
    /// Seconds shutdown waits for each task before aborting it.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
    /// Tokio worker threads. Defaults to the number of CPUs.
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

fn default_queue_url() -> String {
    "memory://relay".into()
}

fn default_visibility_timeout_secs() -> u64 {
    30
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_retention_secs() -> u64 {
    DEFAULT_RETENTION.as_secs()
}

fn default_keyspace() -> String {
    "relay".into()
}

fn default_payload() -> String {
    DEFAULT_PAYLOAD.into()
}

fn default_shutdown_timeout_secs() -> u64 {
    10
}

impl QueueConfig {
    /// Validate queue configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.url.trim().is_empty() {
            return Err("queue url must not be empty".into());
        }
        match self.backend {
            QueueBackendConfig::File if self.file_path().is_empty() => {
                return Err("file queue url must name a directory".into());
            }
            QueueBackendConfig::Sqs if !is_http_url(&self.url) => {
                return Err(format!("sqs queue url `{}` must be an http(s) URL", self.url));
            }
            _ => {}
        }
        if self.endpoint_url.as_deref().is_some_and(|url| !is_http_url(url)) {
            return Err("endpoint_url must be an http(s) URL".into());
        }
        if self.max_depth == 0 {
            return Err("max_depth must be greater than 0".into());
        }
        if self.retention_secs == 0 {
            return Err("retention_secs must be greater than 0".into());
        }
        Ok(())
    }

    /// Queue URL without a `file://` scheme prefix.
    #[must_use]
    pub fn file_path(&self) -> &str {
        self.url.strip_prefix("file://").unwrap_or(&self.url)
    }

    /// Visibility timeout as a duration.
    #[must_use]
    pub const fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }

    /// Delivery and capacity limits for the local queue backends.
    #[must_use]
    pub const fn limits(&self) -> QueueLimits {
        QueueLimits {
            visibility_timeout: self.visibility_timeout(),
            max_depth: self.max_depth,
            retention: Duration::from_secs(self.retention_secs),
        }
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

impl StoreConfig {
    /// Validate store configuration values.
    pub fn validate(&self) -> Result<(), String> {
        let keyspace_ok = !self.keyspace.is_empty()
            && self
                .keyspace
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !keyspace_ok {
            return Err(format!(
                "keyspace `{}` must be non-empty and contain only [A-Za-z0-9_-]",
                self.keyspace
            ));
        }
        if self.backend != StoreBackendConfig::InMemory && self.contact_point.trim().is_empty() {
            return Err("store contact_point must not be empty".into());
        }
        Ok(())
    }
}

impl RelayConfig {
    /// Validate all sections.
    pub fn validate(&self) -> Result<(), String> {
        self.queue
            .validate()
            .map_err(|e| format!("queue invalid: {e}"))?;
        self.store
            .validate()
            .map_err(|e| format!("store invalid: {e}"))?;
        if self.shutdown_timeout_secs == 0 {
            return Err("shutdown_timeout_secs must be greater than 0".into());
        }
        if self.worker_threads == Some(0) {
            return Err("worker_threads must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse relay configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        Self::from_json_str(&input)
    }

    /// Build configuration from `RELAY_*` settings looked up through `lookup`.
    ///
    /// Recognised keys: `RELAY_QUEUE_BACKEND`, `RELAY_QUEUE_URL`,
    /// `RELAY_QUEUE_VISIBILITY_TIMEOUT_SECS`, `RELAY_QUEUE_MAX_DEPTH`,
    /// `RELAY_QUEUE_RETENTION_SECS`, `RELAY_QUEUE_REGION`,
    /// `RELAY_QUEUE_ENDPOINT_URL`, `RELAY_STORE_BACKEND`,
    /// `RELAY_STORE_CONTACT_POINT`, `RELAY_STORE_KEYSPACE`,
    /// `RELAY_STORE_CONSISTENCY`, `RELAY_PAYLOAD`, `RELAY_SHUTDOWN_TIMEOUT_SECS`,
    /// `RELAY_WORKER_THREADS`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let queue = QueueConfig {
            backend: match lookup("RELAY_QUEUE_BACKEND") {
                Some(raw) => parse_enum(&raw)?,
                None => QueueBackendConfig::default(),
            },
            url: lookup("RELAY_QUEUE_URL").unwrap_or_else(default_queue_url),
            visibility_timeout_secs: parse_number(
                &lookup,
                "RELAY_QUEUE_VISIBILITY_TIMEOUT_SECS",
                default_visibility_timeout_secs(),
            )?,
            max_depth: match lookup("RELAY_QUEUE_MAX_DEPTH") {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|e| format!("RELAY_QUEUE_MAX_DEPTH: {e}"))?,
                None => default_max_depth(),
            },
            retention_secs: parse_number(
                &lookup,
                "RELAY_QUEUE_RETENTION_SECS",
                default_retention_secs(),
            )?,
            region: lookup("RELAY_QUEUE_REGION"),
            endpoint_url: lookup("RELAY_QUEUE_ENDPOINT_URL"),
        };
        let store = StoreConfig {
            backend: match lookup("RELAY_STORE_BACKEND") {
                Some(raw) => parse_enum(&raw)?,
                None => StoreBackendConfig::default(),
            },
            contact_point: lookup("RELAY_STORE_CONTACT_POINT").unwrap_or_default(),
            keyspace: lookup("RELAY_STORE_KEYSPACE").unwrap_or_else(default_keyspace),
            consistency: match lookup("RELAY_STORE_CONSISTENCY") {
                Some(raw) => raw.parse()?,
                None => Consistency::default(),
            },
        };
        let worker_threads = match lookup("RELAY_WORKER_THREADS") {
            Some(raw) => Some(
                raw.trim()
                    .parse()
                    .map_err(|e| format!("RELAY_WORKER_THREADS: {e}"))?,
            ),
            None => None,
        };
        let cfg = Self {
            queue,
            store,
            payload: lookup("RELAY_PAYLOAD").unwrap_or_else(default_payload),
            shutdown_timeout_secs: parse_number(
                &lookup,
                "RELAY_SHUTDOWN_TIMEOUT_SECS",
                default_shutdown_timeout_secs(),
            )?,
            worker_threads,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the file named by [`CONFIG_PATH_ENV`] if set,
    /// otherwise from `RELAY_*` environment variables.
    pub fn from_env() -> Result<Self, String> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_json_file(path),
            Err(_) => Self::from_lookup(|key| std::env::var(key).ok()),
        }
    }

    /// Shutdown timeout as a duration.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Worker threads to run with, defaulting to the number of CPUs.
    #[must_use]
    pub fn worker_threads(&self) -> usize {
        self.worker_threads.unwrap_or_else(num_cpus::get)
    }
}

fn parse_enum<T: for<'de> Deserialize<'de>>(raw: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_ascii_lowercase()))
        .map_err(|e| format!("unknown backend `{raw}`: {e}"))
}

fn parse_number<F>(lookup: &F, key: &str, default: u64) -> Result<u64, String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim().parse().map_err(|e| format!("{key}: {e}"))
    })
}

//! Configuration module
//!
//! Settings are read once from the environment (optionally seeded from a `.env`
//! file), validated, and then treated as read-only for the life of the process.
//! Malformed numeric, boolean and duration values fall back to their defaults
//! with a warning; structural problems are fatal `AgentError::Config` errors.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;

use crate::error::{AgentError, AgentResult};
use crate::storage_types::StorageBackend;

// Defaults
const VAULT_ADDR: &str = "http://127.0.0.1:8200";
const VAULT_TIMEOUT_SECS: u64 = 60;
const SNAPSHOT_FREQUENCY_SECS: u64 = 3600;
const SNAPSHOT_PREFIX: &str = "raft-snapshot-";
const SNAPSHOT_RETAIN: usize = 5;
const SNAPSHOT_TIMEZONE: &str = "UTC";
const DUPLICATE_WINDOW_RATIO: f64 = 0.5;
const LOCAL_STORAGE_PATH: &str = "./snapshots";
const S3_REGION: &str = "us-east-1";
const MAX_SNAPSHOT_FREQUENCY: Duration = Duration::from_secs(10 * 365 * 24 * 3600);

/// Log output format
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(AgentError::Config(format!("Invalid LOG_FORMAT: {}", other))),
        }
    }
}

impl LogFormat {
    /// Read `LOG_FORMAT` on its own so logging can start before the full config loads.
    pub fn from_env() -> Self {
        env::var("LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

/// Cluster API connection and credential settings
#[derive(Clone, Debug)]
pub struct ClusterConfig {
    pub address: String,
    pub token: Option<String>,
    pub role_id: Option<String>,
    pub secret_id: Option<String>,
    /// Accept self-signed certificates on the cluster API.
    pub skip_verify: bool,
    pub timeout: Duration,
}

impl ClusterConfig {
    /// True when at least one credential mode is usable.
    pub fn has_credentials(&self) -> bool {
        self.token.is_some() || (self.role_id.is_some() && self.secret_id.is_some())
    }
}

/// Scheduling, naming and retention settings
#[derive(Clone, Debug)]
pub struct SnapshotConfig {
    pub frequency: Duration,
    pub prefix: String,
    /// Artifacts kept per backend. 0 disables retention.
    pub retain: usize,
    pub timezone: Tz,
    /// Fraction of `frequency` inside which a fresh artifact suppresses a new snapshot.
    pub duplicate_window_ratio: f64,
}

impl SnapshotConfig {
    pub fn duplicate_window(&self) -> Duration {
        Duration::try_from_secs_f64(self.frequency.as_secs_f64() * self.duplicate_window_ratio)
            .unwrap_or(self.frequency)
    }
}

/// Backend toggles and per-backend settings
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub enable_local: bool,
    pub enable_s3: bool,
    pub local_path: PathBuf,
    pub s3_bucket: Option<String>,
    pub s3_region: String,
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO, Ceph, ...)
    pub s3_endpoint: Option<String>,
}

impl StorageConfig {
    /// Enabled backends in upload order.
    pub fn enabled_backends(&self) -> Vec<StorageBackend> {
        let mut backends = Vec::new();
        if self.enable_local {
            backends.push(StorageBackend::Local);
        }
        if self.enable_s3 {
            backends.push(StorageBackend::S3);
        }
        backends
    }
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub cluster: ClusterConfig,
    pub snapshot: SnapshotConfig,
    pub storage: StorageConfig,
    pub log_format: LogFormat,
}

impl Config {
    /// Load from the process environment, seeding it from `.env` when present.
    pub fn from_env() -> AgentResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> AgentResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timezone_name = get("SNAPSHOT_TIMEZONE").unwrap_or_else(|| SNAPSHOT_TIMEZONE.to_string());
        let timezone = timezone_name.parse::<Tz>().map_err(|e| {
            AgentError::Config(format!("Invalid timezone {}: {}", timezone_name, e))
        })?;

        let log_format = match get("LOG_FORMAT") {
            Some(value) => value.parse()?,
            None => LogFormat::default(),
        };

        let config = Config {
            cluster: ClusterConfig {
                address: get("VAULT_ADDR").unwrap_or_else(|| VAULT_ADDR.to_string()),
                token: get("VAULT_TOKEN"),
                role_id: get("VAULT_ROLE_ID"),
                secret_id: get("VAULT_SECRET_ID"),
                skip_verify: bool_or("VAULT_SKIP_VERIFY", get("VAULT_SKIP_VERIFY"), true),
                timeout: duration_or(
                    "VAULT_TIMEOUT",
                    get("VAULT_TIMEOUT"),
                    Duration::from_secs(VAULT_TIMEOUT_SECS),
                ),
            },
            snapshot: SnapshotConfig {
                frequency: duration_or(
                    "SNAPSHOT_FREQUENCY",
                    get("SNAPSHOT_FREQUENCY"),
                    Duration::from_secs(SNAPSHOT_FREQUENCY_SECS),
                ),
                prefix: lookup("SNAPSHOT_PREFIX").unwrap_or_else(|| SNAPSHOT_PREFIX.to_string()),
                retain: parsed_or("SNAPSHOT_RETAIN", get("SNAPSHOT_RETAIN"), SNAPSHOT_RETAIN),
                timezone,
                duplicate_window_ratio: parsed_or(
                    "SNAPSHOT_DUPLICATE_WINDOW_RATIO",
                    get("SNAPSHOT_DUPLICATE_WINDOW_RATIO"),
                    DUPLICATE_WINDOW_RATIO,
                ),
            },
            storage: StorageConfig {
                enable_local: bool_or("ENABLE_LOCAL", get("ENABLE_LOCAL"), false),
                enable_s3: bool_or("ENABLE_S3", get("ENABLE_S3"), false),
                local_path: get("STORAGE_LOCAL_PATH")
                    .unwrap_or_else(|| LOCAL_STORAGE_PATH.to_string())
                    .into(),
                s3_bucket: get("STORAGE_S3_BUCKET"),
                s3_region: get("STORAGE_S3_REGION").unwrap_or_else(|| S3_REGION.to_string()),
                s3_access_key_id: get("AWS_ACCESS_KEY_ID"),
                s3_secret_access_key: get("AWS_SECRET_ACCESS_KEY"),
                s3_endpoint: get("AWS_ENDPOINT_URL"),
            },
            log_format,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AgentResult<()> {
        if self.storage.enabled_backends().is_empty() {
            return Err(AgentError::Config(
                "No storage provider enabled. Set ENABLE_S3=true or ENABLE_LOCAL=true".to_string(),
            ));
        }

        if self.storage.enable_s3 && self.storage.s3_bucket.is_none() {
            return Err(AgentError::Config(
                "STORAGE_S3_BUCKET must be set when ENABLE_S3=true".to_string(),
            ));
        }

        if self.snapshot.frequency.is_zero() {
            return Err(AgentError::Config(
                "SNAPSHOT_FREQUENCY must be greater than zero".to_string(),
            ));
        }

        if self.snapshot.frequency > MAX_SNAPSHOT_FREQUENCY {
            return Err(AgentError::Config(
                "SNAPSHOT_FREQUENCY must not exceed ten years".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.snapshot.duplicate_window_ratio) {
            return Err(AgentError::Config(
                "SNAPSHOT_DUPLICATE_WINDOW_RATIO must be between 0 and 1".to_string(),
            ));
        }

        if !self.cluster.has_credentials() {
            return Err(AgentError::Config(
                "No valid authentication method configured. Set VAULT_TOKEN or VAULT_ROLE_ID and VAULT_SECRET_ID"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

fn parsed_or<T: FromStr + Copy>(key: &str, value: Option<String>, default: T) -> T {
    match value {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key = key, value = %raw, "Invalid value, using default");
            default
        }),
        None => default,
    }
}

fn bool_or(key: &str, value: Option<String>, default: bool) -> bool {
    let Some(raw) = value else {
        return default;
    };
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => {
            tracing::warn!(key = key, value = %raw, "Invalid boolean, using default");
            default
        }
    }
}

fn duration_or(key: &str, value: Option<String>, default: Duration) -> Duration {
    match value {
        Some(raw) => parse_duration(&raw).unwrap_or_else(|| {
            tracing::warn!(key = key, value = %raw, "Invalid duration, using default");
            default
        }),
        None => default,
    }
}

/// Parse durations such as `90s`, `30m`, `1h30m` or `1.5h`. A bare number is seconds.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let s = input.trim();
    if let Ok(secs) = s.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    humantime::parse_duration(s).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> AgentResult<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = load(&[("VAULT_TOKEN", "s.abc"), ("ENABLE_LOCAL", "true")]).unwrap();

        assert_eq!(config.cluster.address, "http://127.0.0.1:8200");
        assert_eq!(config.snapshot.frequency, Duration::from_secs(3600));
        assert_eq!(config.snapshot.prefix, "raft-snapshot-");
        assert_eq!(config.snapshot.retain, 5);
        assert_eq!(config.snapshot.timezone, chrono_tz::UTC);
        assert_eq!(config.snapshot.duplicate_window(), Duration::from_secs(1800));
        assert_eq!(config.storage.local_path, PathBuf::from("./snapshots"));
        assert_eq!(config.storage.s3_region, "us-east-1");
        assert_eq!(config.storage.enabled_backends(), vec![StorageBackend::Local]);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn no_backend_enabled_is_fatal() {
        let err = load(&[("VAULT_TOKEN", "s.abc")]).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("No storage provider enabled"));
    }

    #[test]
    fn invalid_timezone_is_fatal() {
        let err = load(&[
            ("VAULT_TOKEN", "s.abc"),
            ("ENABLE_LOCAL", "yes"),
            ("SNAPSHOT_TIMEZONE", "Mars/Olympus"),
        ])
        .unwrap_err();
        assert!(matches!(err, AgentError::Config(ref msg) if msg.contains("Mars/Olympus")));
    }

    #[test]
    fn missing_credentials_is_fatal() {
        let err = load(&[("ENABLE_LOCAL", "on"), ("VAULT_ROLE_ID", "role")]).unwrap_err();
        assert!(matches!(err, AgentError::Config(ref msg) if msg.contains("authentication")));
    }

    #[test]
    fn approle_pair_is_accepted() {
        let config = load(&[
            ("ENABLE_LOCAL", "1"),
            ("VAULT_ROLE_ID", "role"),
            ("VAULT_SECRET_ID", "secret"),
        ])
        .unwrap();
        assert!(config.cluster.token.is_none());
        assert!(config.cluster.has_credentials());
    }

    #[test]
    fn s3_requires_bucket() {
        let err = load(&[("VAULT_TOKEN", "t"), ("ENABLE_S3", "true")]).unwrap_err();
        assert!(err.to_string().contains("STORAGE_S3_BUCKET"));

        let config = load(&[
            ("VAULT_TOKEN", "t"),
            ("ENABLE_S3", "true"),
            ("ENABLE_LOCAL", "true"),
            ("STORAGE_S3_BUCKET", "backups"),
            ("AWS_ENDPOINT_URL", "http://minio:9000"),
        ])
        .unwrap();
        assert_eq!(
            config.storage.enabled_backends(),
            vec![StorageBackend::Local, StorageBackend::S3]
        );
        assert_eq!(config.storage.s3_endpoint.as_deref(), Some("http://minio:9000"));
    }

    #[test]
    fn malformed_values_fall_back_to_defaults() {
        let config = load(&[
            ("VAULT_TOKEN", "t"),
            ("ENABLE_LOCAL", "true"),
            ("SNAPSHOT_FREQUENCY", "soon"),
            ("SNAPSHOT_RETAIN", "many"),
            ("VAULT_SKIP_VERIFY", "maybe"),
        ])
        .unwrap();
        assert_eq!(config.snapshot.frequency, Duration::from_secs(3600));
        assert_eq!(config.snapshot.retain, 5);
        assert!(config.cluster.skip_verify);
    }

    #[test]
    fn duplicate_ratio_out_of_range_is_rejected() {
        let err = load(&[
            ("VAULT_TOKEN", "t"),
            ("ENABLE_LOCAL", "true"),
            ("SNAPSHOT_DUPLICATE_WINDOW_RATIO", "1.5"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("SNAPSHOT_DUPLICATE_WINDOW_RATIO"));
    }

    #[test]
    fn parses_duration_strings() {
        assert_eq!(parse_duration("90s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("30m"), Some(Duration::from_secs(1800)));
        assert_eq!(parse_duration("1h30m"), Some(Duration::from_secs(5400)));
        assert_eq!(parse_duration("1.5h"), Some(Duration::from_secs(5400)));
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("120"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("0"), Some(Duration::ZERO));
        assert_eq!(parse_duration("h"), None);
        assert_eq!(parse_duration("1d"), Some(Duration::from_secs(86_400)));
        assert_eq!(parse_duration("ten minutes"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn oversized_frequency_is_rejected() {
        let err = load(&[
            ("VAULT_TOKEN", "t"),
            ("ENABLE_LOCAL", "true"),
            ("SNAPSHOT_FREQUENCY", "18446744073709551615"),
            ("SNAPSHOT_DUPLICATE_WINDOW_RATIO", "1.0"),
        ])
        .unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("ten years"));
    }

    #[test]
    fn duplicate_window_saturates_instead_of_panicking() {
        let snapshot = SnapshotConfig {
            frequency: Duration::MAX,
            prefix: String::new(),
            retain: 5,
            timezone: chrono_tz::UTC,
            duplicate_window_ratio: 1.0,
        };
        assert_eq!(snapshot.duplicate_window(), Duration::MAX);
    }
}

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub database: Database,
    pub retry: Retry,
    pub limits: Limits,
    pub sweep: Sweep,
}

impl Config {
    /// Read a TOML config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()))
            }
        };
        toml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for Database {
    fn default() -> Self {
        Database {
            url: "sqlite://burnbin.db?mode=rwc".into(),
            max_connections: 10,
            acquire_timeout_secs: 30,
        }
    }
}

impl Database {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

/// Backoff applied to connecting and to transient operation failures.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Retry {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for Retry {
    fn default() -> Self {
        Retry {
            max_retries: 3,
            base_delay_ms: 50,
            max_delay_ms: 2_000,
        }
    }
}

impl Retry {
    /// Delay before retry number `attempt` (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let millis = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(millis)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    pub max_paste_size: usize,
    pub operation_timeout_secs: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_paste_size: 1024 * 1024,
            operation_timeout_secs: 10,
        }
    }
}

impl Limits {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Sweep {
    pub interval_secs: u64,
}

impl Default for Sweep {
    fn default() -> Self {
        Sweep { interval_secs: 300 }
    }
}

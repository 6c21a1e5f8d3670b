use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Database section of the application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// `SeaORM` connection url, e.g. `sqlite://adminkit.db?mode=rwc`.
    pub url: String,
    pub max_conns: Option<u32>,
    pub min_conns: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    /// Forward statement logging of the driver to `tracing`.
    pub sqlx_logging: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_owned(),
            max_conns: None,
            min_conns: None,
            acquire_timeout_secs: None,
            sqlx_logging: false,
        }
    }
}

impl DatabaseConfig {
    #[must_use]
    pub fn connect_opts(&self) -> ConnectOpts {
        ConnectOpts {
            max_conns: self.max_conns,
            min_conns: self.min_conns,
            acquire_timeout: self.acquire_timeout_secs.map(Duration::from_secs),
            sqlx_logging: self.sqlx_logging,
        }
    }
}

/// Pool options applied when connecting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectOpts {
    pub max_conns: Option<u32>,
    pub min_conns: Option<u32>,
    pub acquire_timeout: Option<Duration>,
    pub sqlx_logging: bool,
}

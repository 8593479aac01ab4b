use serde::Deserialize;
use std::{net::IpAddr, time::Duration};

fn default_database_max_connections() -> u32 {
    10
}

fn default_database_acquire_timeout_seconds() -> u64 {
    5
}

fn default_database_statement_timeout_ms() -> u64 {
    5000
}

fn default_request_timeout_seconds() -> u64 {
    30
}

/// Process configuration, read from the environment (and an optional `.env` file).
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct Env {
    pub server_address: IpAddr,
    pub server_port: u16,
    pub database_url: String,
    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,
    #[serde(default = "default_database_acquire_timeout_seconds")]
    pub database_acquire_timeout_seconds: u64,
    /// Applied as Postgres `statement_timeout` on every pooled connection.
    #[serde(default = "default_database_statement_timeout_ms")]
    pub database_statement_timeout_ms: u64,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

impl Env {
    #[must_use]
    pub fn database_acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.database_acquire_timeout_seconds)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u16(key: &str, default: u16) -> u16 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub postgres: PostgresConfig,
    pub broker: BrokerConfig,
    pub sim: SimConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            postgres: PostgresConfig::from_env(),
            broker: BrokerConfig::from_env(),
            sim: SimConfig::from_env(),
        }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!(
            "  postgres:  host={}, db={}",
            self.postgres.host,
            self.postgres.database
        );
        tracing::info!("  broker:    endpoint={}", self.broker.endpoint);
        tracing::info!(
            "  sim:       lead_interval={}ms, poll_period={}ms, window={}s",
            self.sim.lead_interval_ms,
            self.sim.poll_period_ms,
            self.sim.conversion_window_secs
        );
    }
}

// ── PostgreSQL ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssl_mode: String,
    pub max_connections: u32,
}

impl PostgresConfig {
    fn from_env() -> Self {
        Self {
            host: env_or("PG_HOST", "localhost"),
            port: env_u16("PG_PORT", 5432),
            database: env_or("PG_DATABASE", "default"),
            username: env_opt("PG_USERNAME"),
            password: env_opt("PG_PASSWORD"),
            ssl_mode: env_or("PG_SSL_MODE", "disable"),
            max_connections: env_u32("PG_MAX_CONNECTIONS", 5),
        }
    }

    pub fn connection_string(&self) -> String {
        let user = self.username.as_deref().unwrap_or("loadgen");
        let pass = self.password.as_deref().unwrap_or("");
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            user, pass, self.host, self.port, self.database, self.ssl_mode
        )
    }
}

// ── Broker (prediction publishing) ────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// ZeroMQ endpoint the PUB socket binds to.
    pub endpoint: String,
}

impl BrokerConfig {
    fn from_env() -> Self {
        Self {
            endpoint: env_or("BROKER_ENDPOINT", "tcp://0.0.0.0:5555"),
        }
    }
}

// ── Simulation knobs ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Cadence of the lead pipeline, one lead per tick.
    pub lead_interval_ms: u64,
    /// Scheduler polling granularity `P`.
    pub poll_period_ms: u64,
    /// Conversions are scheduled uniformly within this many seconds.
    pub conversion_window_secs: f64,
}

impl SimConfig {
    fn from_env() -> Self {
        Self {
            lead_interval_ms: env_u64("SIM_LEAD_INTERVAL_MS", 10),
            poll_period_ms: env_u64("SIM_POLL_PERIOD_MS", 50),
            conversion_window_secs: env_f64("SIM_CONVERSION_WINDOW_SECS", 30.0),
        }
    }
}

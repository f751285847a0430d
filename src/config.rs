//! Environment-driven settings.

use std::env;
use std::net::SocketAddr;

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_url: String,
}

impl Config {
    /// Reads `.env` (if present) and the process environment, falling back to
    /// a local SQLite file on port 3000.
    pub fn from_env() -> Config {
        dotenvy::dotenv().ok();
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:kingfall.db".to_string());
        let bind_addr = env::var("BIND_ADDR")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));
        Config { bind_addr, database_url }
    }
}

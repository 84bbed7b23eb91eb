use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::services::ml_client::MlServiceConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    /// Daily-rolling log directory; stdout only when unset.
    pub log_dir: Option<PathBuf>,
    /// SQLite URL; in-memory stores are used when unset.
    pub database_url: Option<String>,
    pub ml: MlServiceConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let file_logs = std::env::var("ENABLE_FILE_LOGS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let log_dir = file_logs.then(|| {
            PathBuf::from(std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string()))
        });

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty());

        Self {
            host,
            port,
            log_level,
            log_dir,
            database_url,
            ml: MlServiceConfig::from_env(),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

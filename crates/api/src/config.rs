//! Process configuration read from the environment.

use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, bail};

use storefront_observability::LogFormat;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub use_persistent_stores: bool,
    pub database_url: Option<String>,
    pub upload_dir: PathBuf,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset and blank values take the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let use_persistent_stores = try_load(&var, "USE_PERSISTENT_STORES", "false")?;
        let database_url = var("DATABASE_URL");
        if use_persistent_stores && database_url.is_none() {
            bail!("DATABASE_URL must be set when USE_PERSISTENT_STORES=true");
        }

        Ok(Self {
            bind_addr: try_load(&var, "BIND_ADDR", "0.0.0.0:8080")?,
            jwt_secret: var("JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.to_string()),
            use_persistent_stores,
            database_url,
            upload_dir: var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            log_format: try_load(&var, "LOG_FORMAT", "json")?,
        })
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

fn try_load<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| default.to_string());
    raw.parse::<T>()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("invalid {key} value '{raw}'"))
}

use std::{env, fmt::Display, fs::read_to_string, path::PathBuf, str::FromStr};

use anyhow::{Context, Result};
use tracing::{info, warn};

pub const MEMORY_STORE: &str = "memory";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub store_url: String,
    pub frontend_url: String,
    pub uploads_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        Ok(Self {
            port: try_load("RUST_PORT", "5000")?,
            store_url: read_secret("STORE_URL").unwrap_or_else(|| {
                var("STORE_URL").unwrap_or_else(|_| {
                    info!("STORE_URL not set, using default: {MEMORY_STORE}");
                    MEMORY_STORE.to_string()
                })
            }),
            frontend_url: try_load("FRONTEND_URL", "http://localhost:3000")?,
            uploads_dir: try_load("UPLOADS_DIR", "uploads")?,
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.store_url == MEMORY_STORE
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid {key} value: {e}"))
        .context("Environment misconfigured!")
}

/// Docker secrets take precedence over plain environment variables.
fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            info!("No {secret_name} secret file ({e}), falling back to environment");
        })
        .ok()
        .filter(|s| !s.is_empty())
}

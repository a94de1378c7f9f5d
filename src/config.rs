use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::{Result, ViewerError};

pub const DEFAULT_WORKBOOK_URL: &str = "https://saxoconnection.com/data/FIX_API_CT147572INET.xlsx";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_SECRETS_PATH: &str = ".streamlit/secrets.toml";
pub const DEFAULT_STATIC_DIR: &str = "static";

/// Keys read from the secrets file. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct Secrets {
    #[serde(rename = "EXCEL_URL")]
    pub excel_url: Option<String>,
    #[serde(rename = "APP_PASSWORD")]
    pub app_password: Option<String>,
}

impl Secrets {
    /// Read a TOML secrets file; a missing file yields empty secrets.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Secrets::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| ViewerError::Config(format!("{}: {}", path.display(), e)))
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Where the workbook is downloaded from.
    pub workbook_url: String,
    /// Shared access password; empty disables the login gate.
    pub password: String,
    pub bind_addr: SocketAddr,
    pub static_dir: PathBuf,
}

impl Config {
    /// Resolve the configuration from the secrets file and the process environment.
    pub fn load() -> Result<Self> {
        let secrets_path = std::env::var("SHEETGATE_SECRETS")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SECRETS_PATH));
        let secrets = Secrets::load(&secrets_path)?;
        Self::resolve(secrets, |key| std::env::var(key).ok())
    }

    /// Secrets win over the environment, the environment wins over defaults.
    pub fn resolve(secrets: Secrets, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let workbook_url = secrets
            .excel_url
            .or_else(|| env("EXCEL_URL"))
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_WORKBOOK_URL.to_string());

        let password = secrets
            .app_password
            .or_else(|| env("APP_PASSWORD"))
            .unwrap_or_default();

        let bind = match (env("BIND_ADDR"), env("PORT")) {
            (Some(addr), _) => addr,
            (None, Some(port)) => format!("0.0.0.0:{}", port.trim()),
            (None, None) => DEFAULT_BIND_ADDR.to_string(),
        };
        let bind_addr = bind
            .parse()
            .map_err(|_| ViewerError::Config(format!("invalid bind address '{}'", bind)))?;

        let static_dir = env("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));

        Ok(Config {
            workbook_url,
            password,
            bind_addr,
            static_dir,
        })
    }

    pub fn gate_enabled(&self) -> bool {
        !self.password.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = Config::resolve(Secrets::default(), env_of(&[])).unwrap();
        assert_eq!(config.workbook_url, DEFAULT_WORKBOOK_URL);
        assert!(!config.gate_enabled());
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
    }

    #[test]
    fn secrets_take_precedence_over_env() {
        let secrets = Secrets {
            excel_url: Some("https://secret/book.xlsx".into()),
            app_password: Some("s3cret".into()),
        };
        let env = env_of(&[("EXCEL_URL", "https://env/book.xlsx"), ("APP_PASSWORD", "env")]);
        let config = Config::resolve(secrets, env).unwrap();
        assert_eq!(config.workbook_url, "https://secret/book.xlsx");
        assert_eq!(config.password, "s3cret");
    }

    #[test]
    fn port_binds_all_interfaces() {
        let config = Config::resolve(Secrets::default(), env_of(&[("PORT", "8080")])).unwrap();
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn bad_bind_address_is_a_config_error() {
        let err = Config::resolve(Secrets::default(), env_of(&[("BIND_ADDR", "nope")]));
        assert!(matches!(err, Err(ViewerError::Config(_))));
    }
}

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::generator::{DEFAULT_CODE_LENGTH, MIN_CODE_LENGTH};

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// JSON file holding every link, e.g. "./links.json"
    pub links_file: PathBuf,

    /// Host to bind the HTTP server to, e.g. "0.0.0.0"
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Public base URL used when echoing short links, e.g. "https://go.example.com"
    /// Must NOT have a trailing slash.
    pub base_url: String,

    /// Length of generated short codes
    pub code_length: usize,

    /// Re-read the links file on every lookup instead of serving the
    /// in-memory snapshot. Useful when the file is edited by hand.
    pub read_through: bool,
}

impl AppConfig {
    /// Load configuration from environment variables (populated by dotenvy before this is called).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = var("PORT")
            .unwrap_or_else(|| "3001".into())
            .parse::<u16>()
            .context("PORT must be a valid port number (1–65535)")?;

        let code_length = match var("CODE_LENGTH") {
            Some(raw) => raw
                .parse::<usize>()
                .context("CODE_LENGTH must be a positive integer")?,
            None => DEFAULT_CODE_LENGTH,
        };
        if code_length < MIN_CODE_LENGTH {
            anyhow::bail!("CODE_LENGTH must be at least {MIN_CODE_LENGTH}, got {code_length}");
        }

        let read_through = match var("STORE_READ_THROUGH").as_deref() {
            None | Some("") | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => anyhow::bail!("STORE_READ_THROUGH must be true or false, got '{other}'"),
        };

        let base_url = var("BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_owned();

        Ok(Self {
            links_file: var("LINKS_FILE")
                .unwrap_or_else(|| "./links.json".into())
                .into(),
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            base_url,
            code_length,
            read_through,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

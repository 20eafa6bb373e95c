use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::api::{FileTokenStore, TokenStoreError};

pub const DEFAULT_API_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the API, without the `/api` prefix or a trailing slash.
    pub api_url: String,
    /// Directory holding the persisted token. Defaults to the platform
    /// config directory when unset.
    pub token_dir: Option<PathBuf>,
}

impl Config {
    /// Read `SESSION_API_URL` and `SESSION_CONFIG_DIR`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = lookup("SESSION_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        reqwest::Url::parse(&api_url)
            .with_context(|| format!("SESSION_API_URL is not a valid URL: {}", api_url))?;

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token_dir: lookup("SESSION_CONFIG_DIR")
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
        })
    }

    pub fn token_store(&self) -> Result<FileTokenStore, TokenStoreError> {
        match &self.token_dir {
            Some(dir) => Ok(FileTokenStore::new(dir)),
            None => FileTokenStore::in_user_config_dir(),
        }
    }
}

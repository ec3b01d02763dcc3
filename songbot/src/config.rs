//! Process-level credentials.
//!
//! Values come from the environment (a `.env` file is honoured) and, for keys
//! the environment lacks, from an optional JSON file. Nothing here is required:
//! each missing key only switches off the features that need it.

use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Deserialize;

use crate::clients::errors::{Error, Result};

/// Bot token for the chat platform gateway.
pub const DISCORD_TOKEN: &str = "DISCORD_TOKEN";
/// Genius API access token.
pub const GENIUS_TOKEN: &str = "GENIUS_TOKEN";
/// Spotify app id.
pub const SPOTIFY_CLIENT_ID: &str = "SPOTIFY_CLIENT_ID";
/// Spotify app secret.
pub const SPOTIFY_CLIENT_SECRET: &str = "SPOTIFY_CLIENT_SECRET";

const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Spotify app credentials for the client-credentials exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct SpotifyCredentials {
    /// App id from the developer dashboard.
    pub client_id: String,
    /// App secret, never logged.
    pub client_secret: String,
}

impl SpotifyCredentials {
    /// `None` unless both halves are non-empty.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Option<Self> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        if client_id.is_empty() || client_secret.is_empty() {
            return None;
        }
        Some(SpotifyCredentials {
            client_id,
            client_secret,
        })
    }
}

impl fmt::Debug for SpotifyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

/// Resolved credentials; `None` means the key was not configured.
#[derive(Clone, Default)]
pub struct Config {
    /// Only checked and reported, the gateway itself is out of scope.
    pub discord_token: Option<String>,
    /// Enables `/guess` and query-based `/lyrics`.
    pub genius_token: Option<String>,
    /// Enables Spotify links and `/playlist`.
    pub spotify: Option<SpotifyCredentials>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &self.discord_token.as_ref().map(|_| "***"))
            .field("genius_token", &self.genius_token.as_ref().map(|_| "***"))
            .field("spotify", &self.spotify)
            .finish()
    }
}

impl Config {
    /// Keys whose absence disables a feature.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.discord_token.is_none() {
            missing.push(DISCORD_TOKEN);
        }
        if self.genius_token.is_none() {
            missing.push(GENIUS_TOKEN);
        }
        if self.spotify.is_none() {
            missing.push("SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET");
        }
        missing
    }

    /// Log one warning per feature that the current configuration disables.
    pub fn warn_missing(&self) {
        for key in self.missing_keys() {
            warn!("{key} is not configured, dependent commands will be unavailable");
        }
    }
}

/// Same keys as the environment variables.
#[derive(Deserialize, Default)]
struct FileConfig {
    #[serde(rename = "DISCORD_TOKEN")]
    discord_token: Option<String>,
    #[serde(rename = "GENIUS_TOKEN")]
    genius_token: Option<String>,
    #[serde(rename = "SPOTIFY_CLIENT_ID")]
    spotify_client_id: Option<String>,
    #[serde(rename = "SPOTIFY_CLIENT_SECRET")]
    spotify_client_secret: Option<String>,
}

impl FileConfig {
    fn get(&self, key: &str) -> Option<&String> {
        match key {
            DISCORD_TOKEN => self.discord_token.as_ref(),
            GENIUS_TOKEN => self.genius_token.as_ref(),
            SPOTIFY_CLIENT_ID => self.spotify_client_id.as_ref(),
            SPOTIFY_CLIENT_SECRET => self.spotify_client_secret.as_ref(),
            _ => None,
        }
    }
}

/// Layers the process environment over an optional JSON file.
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
}

impl ConfigBuilder {
    /// Builder reading `config.json` from the working directory.
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// JSON file consulted for keys the environment does not set.
    #[must_use]
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Load `.env` if present, then read the real process environment.
    pub async fn build(self) -> Result<Config> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(Error::ConfigurationError(e.to_string())),
        }
        self.build_with(|key| std::env::var(key).ok()).await
    }

    /// Build using `lookup` in place of the process environment.
    pub async fn build_with<F>(self, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = self
            .config_path
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        let file = read_config_file(&path).await?;

        let value = |key: &str| -> Option<String> {
            lookup(key)
                .or_else(|| file.get(key).cloned())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let spotify = match (value(SPOTIFY_CLIENT_ID), value(SPOTIFY_CLIENT_SECRET)) {
            (Some(id), Some(secret)) => SpotifyCredentials::new(id, secret),
            _ => None,
        };

        Ok(Config {
            discord_token: value(DISCORD_TOKEN),
            genius_token: value(GENIUS_TOKEN),
            spotify,
        })
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_config_file(path: &Path) -> Result<FileConfig> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => {
            debug!("Reading configuration file {}", path.display());
            serde_json::from_str(&raw).map_err(|e| {
                Error::ConfigurationError(format!("{} is not valid: {e}", path.display()))
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
        Err(e) => Err(Error::from(e)),
    }
}

//! # Configuration Management Module
//!
//! Centralized TOML configuration with validation and defaults. Sections:
//!
//! - [`GameConfig`] - session length, item cap, spawn and lifetime jitter
//! - [`PlayerConfig`] - identity handed over by the embedding chat platform
//! - [`BackendConfig`] - score backend base URL and request deadline
//! - [`RelayConfig`] - relay listen address, routing prefix, backend origin
//! - [`StorageConfig`] - local data directory
//! - [`LoggingConfig`] - level and optional log file
//!
//! ```toml
//! [game]
//! duration_secs = 45
//! max_active_items = 15
//!
//! [backend]
//! base_url = "http://127.0.0.1:8001"
//!
//! [relay]
//! port = 8080
//! route_prefix = "/relay"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;

use crate::game::session::SessionRules;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Session length in seconds.
    pub duration_secs: u32,
    /// Upper bound on simultaneously active items.
    pub max_active_items: usize,
    /// Minimum delay between spawn waves, milliseconds.
    pub spawn_delay_min_ms: u64,
    /// Maximum delay between spawn waves, milliseconds.
    pub spawn_delay_max_ms: u64,
    /// Minimum item lifetime before expiry, milliseconds.
    pub item_lifetime_min_ms: u64,
    /// Maximum item lifetime before expiry, milliseconds.
    pub item_lifetime_max_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            duration_secs: 45,
            max_active_items: 15,
            spawn_delay_min_ms: 300,
            spawn_delay_max_ms: 800,
            item_lifetime_min_ms: 2_000,
            item_lifetime_max_ms: 4_000,
        }
    }
}

impl GameConfig {
    /// Session rules for the driver. The countdown cadence is fixed at one
    /// second in production.
    pub fn rules(&self) -> SessionRules {
        SessionRules {
            duration_secs: self.duration_secs,
            countdown_tick_ms: 1_000,
            max_active_items: self.max_active_items,
            spawn_delay_ms: (self.spawn_delay_min_ms, self.spawn_delay_max_ms),
            item_lifetime_ms: (self.item_lifetime_min_ms, self.item_lifetime_max_ms),
        }
    }
}

/// Identity of the player as handed over by the embedding chat platform.
/// `user_id = 0` means anonymous; scores then stay local-only meaningful.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default)]
    pub user_id: i64,
    #[serde(default = "default_user_name")]
    pub user_name: String,
}

fn default_user_name() -> String {
    "Player".to_string()
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            user_id: 0,
            user_name: default_user_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Score backend origin, e.g. `http://127.0.0.1:8001`.
    pub base_url: String,
    /// Request deadline in seconds.
    pub timeout_seconds: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8001".to_string(),
            timeout_seconds: 5,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    /// Backend origin requests are rewritten onto.
    pub backend_origin: String,
    /// Routing prefix stripped from inbound paths, e.g. `/relay`.
    pub route_prefix: String,
    /// Upstream request deadline in seconds.
    pub timeout_seconds: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            backend_origin: "http://127.0.0.1:8001".to_string(),
            route_prefix: "/relay".to_string(),
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Validate value ranges. Called by the binary before anything runs.
    pub fn validate(&self) -> Result<()> {
        if self.game.duration_secs == 0 {
            return Err(anyhow!("game.duration_secs must be at least 1"));
        }
        if self.game.max_active_items == 0 {
            return Err(anyhow!("game.max_active_items must be at least 1"));
        }
        if self.game.spawn_delay_min_ms == 0
            || self.game.spawn_delay_min_ms > self.game.spawn_delay_max_ms
        {
            return Err(anyhow!(
                "game.spawn_delay window must satisfy 0 < min <= max"
            ));
        }
        if self.game.item_lifetime_min_ms == 0
            || self.game.item_lifetime_min_ms > self.game.item_lifetime_max_ms
        {
            return Err(anyhow!(
                "game.item_lifetime window must satisfy 0 < min <= max"
            ));
        }
        for (section, url) in [
            ("backend.base_url", &self.backend.base_url),
            ("relay.backend_origin", &self.relay.backend_origin),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(anyhow!("{} must start with http:// or https://", section));
            }
        }
        if !self.relay.route_prefix.starts_with('/') || self.relay.route_prefix.len() < 2 {
            return Err(anyhow!("relay.route_prefix must look like \"/relay\""));
        }
        if self.backend.timeout_seconds == 0 || self.relay.timeout_seconds == 0 {
            return Err(anyhow!("timeouts must be at least 1 second"));
        }
        Ok(())
    }
}

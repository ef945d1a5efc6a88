//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub plant: PlantConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    ///
    /// `WS_PORT` or `PORT` in the environment overrides the configured
    /// listening port.
    pub fn load() -> anyhow::Result<Self> {
        let path = Path::new("config.toml");
        let mut config: Self = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            info!("No config.toml found, creating default config");
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            default_config
        };

        if let Some(port) = port_from_env() {
            info!("Overriding port from environment: {}", port);
            config.server.port = port;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the home assignment cannot work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.world.width <= 0 || self.world.height <= 0 {
            anyhow::bail!("world dimensions must be positive");
        }
        if self.world.home_size <= 0
            || self.world.home_size >= self.world.width
            || self.world.home_size >= self.world.height
        {
            anyhow::bail!(
                "home_size ({}) must be positive and smaller than the world ({}x{})",
                self.world.home_size,
                self.world.width,
                self.world.height
            );
        }
        if self.plant.rate_interval_ms == 0 || self.plant.rate_burst == 0 {
            anyhow::bail!("plant rate limit must allow at least one action");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            world: WorldConfig::default(),
            plant: PlantConfig::default(),
        }
    }
}

fn port_from_env() -> Option<u16> {
    ["WS_PORT", "PORT"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find_map(|value| value.parse().ok())
}

/// Server networking and general settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Connections per IP limit.
    #[serde(default = "default_ip_limit")]
    pub ip_limit: usize,
    /// Delta broadcast interval in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            max_connections: default_max_connections(),
            ip_limit: default_ip_limit(),
            tick_interval_ms: default_tick_interval(),
        }
    }
}

fn default_port() -> u16 {
    3001
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_max_connections() -> usize {
    100
}
fn default_ip_limit() -> usize {
    8
}
fn default_tick_interval() -> u64 {
    1000
}

/// World grid configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorldConfig {
    #[serde(default = "default_world_size")]
    pub width: i32,
    #[serde(default = "default_world_size")]
    pub height: i32,
    /// Side length of each player's square home plot.
    #[serde(default = "default_home_size")]
    pub home_size: i32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: default_world_size(),
            height: default_world_size(),
            home_size: default_home_size(),
        }
    }
}

fn default_world_size() -> i32 {
    50
}
fn default_home_size() -> i32 {
    20
}

/// Planting limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlantConfig {
    /// Minimum milliseconds between successful plants per session.
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    /// Token bucket refill interval in milliseconds.
    #[serde(default = "default_rate_interval")]
    pub rate_interval_ms: u64,
    /// Token bucket capacity (burst size).
    #[serde(default = "default_rate_burst")]
    pub rate_burst: u32,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
            rate_interval_ms: default_rate_interval(),
            rate_burst: default_rate_burst(),
        }
    }
}

fn default_cooldown_ms() -> u64 {
    250
}
fn default_rate_interval() -> u64 {
    1000
}
fn default_rate_burst() -> u32 {
    20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_home_larger_than_world() {
        let mut config = Config::default();
        config.world.home_size = 50;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_rate_burst() {
        let mut config = Config::default();
        config.plant.rate_burst = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str("[server]\nport = 9000\n").unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.world.width, 50);
        assert_eq!(config.plant.cooldown_ms, 250);
    }
}

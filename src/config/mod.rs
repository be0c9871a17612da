//! Configuration management for car-teleop
//!
//! Handles loading, parsing, validation and hot-reloading of the YAML
//! configuration file. Broker credentials may also come from the environment
//! so they never have to live in the file.

pub mod watcher;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use crate::input::gamepad::DEFAULT_DEADZONE;
use crate::input::PointerGeometry;
use crate::mixer::DEFAULT_MAX_SPEED;
use crate::transport::{BrokerAddress, Credentials};

pub use watcher::ConfigWatcher;

/// Environment variable overriding `credentials.username`
pub const ENV_USERNAME: &str = "CAR_TELEOP_USERNAME";
/// Environment variable overriding `credentials.password`
pub const ENV_PASSWORD: &str = "CAR_TELEOP_PASSWORD";

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
    #[serde(default)]
    pub topics: TopicsConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub gamepad: GamepadConfig,
}

/// Broker connection settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BrokerConfig {
    /// `ws://host:port[/path]` or `wss://...`
    #[serde(default = "default_broker_url")]
    pub url: String,
    /// Client id prefix; a millisecond timestamp is appended per connect
    #[serde(default = "default_client_prefix")]
    pub client_prefix: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: default_broker_url(),
            client_prefix: default_client_prefix(),
        }
    }
}

/// Topic names
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TopicsConfig {
    #[serde(default = "default_control_topic")]
    pub control: String,
    #[serde(default = "default_status_topic")]
    pub status: String,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            control: default_control_topic(),
            status: default_status_topic(),
        }
    }
}

/// Drive tuning; the only section applied on hot reload
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ControlConfig {
    #[serde(default = "default_max_speed")]
    pub max_speed: i32,
    #[serde(default = "default_deadzone")]
    pub deadzone: f32,
    #[serde(default)]
    pub pointer: PointerGeometry,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            max_speed: default_max_speed(),
            deadzone: default_deadzone(),
            pointer: PointerGeometry::default(),
        }
    }
}

/// Gamepad polling
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GamepadConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_poll_hz")]
    pub poll_hz: u32,
}

impl Default for GamepadConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            poll_hz: default_poll_hz(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config = Self::from_yaml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from file, or fall back to defaults when the file does not exist
    pub async fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path).await
        } else {
            info!("Config file {} not found, using defaults", path);
            Ok(Self::default())
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        // An empty file is a valid "all defaults" config
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Apply environment overrides for credentials
    ///
    /// Both variables must be set for the override to take effect.
    pub fn apply_env_overrides(&mut self) {
        self.apply_credential_overrides(std::env::var(ENV_USERNAME).ok(), std::env::var(ENV_PASSWORD).ok());
    }

    fn apply_credential_overrides(&mut self, username: Option<String>, password: Option<String>) {
        if let (Some(username), Some(password)) = (username, password) {
            debug!("Using broker credentials from environment");
            self.credentials = Some(Credentials { username, password });
        }
    }

    pub fn validate(&self) -> Result<()> {
        BrokerAddress::parse(&self.broker.url)
            .with_context(|| format!("Invalid broker url '{}'", self.broker.url))?;

        if self.broker.client_prefix.trim().is_empty() {
            anyhow::bail!("broker.client_prefix cannot be empty");
        }

        if self.topics.control.is_empty() || self.topics.status.is_empty() {
            anyhow::bail!("Topic names cannot be empty");
        }

        if let Some(creds) = &self.credentials {
            if creds.username.is_empty() {
                anyhow::bail!("credentials.username cannot be empty");
            }
        }

        self.control.validate()?;

        if self.gamepad.poll_hz == 0 {
            anyhow::bail!("gamepad.poll_hz must be greater than 0");
        }

        Ok(())
    }
}

impl ControlConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_speed <= 0 {
            anyhow::bail!("control.max_speed must be greater than 0 (got {})", self.max_speed);
        }
        if !(0.0..1.0).contains(&self.deadzone) {
            anyhow::bail!("control.deadzone must be in [0, 1) (got {})", self.deadzone);
        }
        if self.pointer.radius.is_nan() || self.pointer.radius <= 0.0 {
            anyhow::bail!("control.pointer.radius must be greater than 0 (got {})", self.pointer.radius);
        }
        Ok(())
    }
}

// Default value functions
fn default_broker_url() -> String { "ws://localhost:9001/mqtt".to_string() }
fn default_client_prefix() -> String { "car-teleop".to_string() }
fn default_control_topic() -> String { "car/control".to_string() }
fn default_status_topic() -> String { "car/status".to_string() }
fn default_max_speed() -> i32 { DEFAULT_MAX_SPEED }
fn default_deadzone() -> f32 { DEFAULT_DEADZONE }
fn default_true() -> bool { true }
fn default_poll_hz() -> u32 { 60 }

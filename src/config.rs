use std::{num::NonZeroU64, path::PathBuf, time::Duration};

use poise::serenity_prelude::{ChannelId, GuildId, RoleId};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "boozebot.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(deserialize_with = "snowflake")]
    pub guild_id: GuildId,
    pub roles: RoleConfig,
    pub channels: ChannelConfig,
    pub welcome: WelcomeConfig,
    #[serde(default)]
    pub toggle: ToggleConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleConfig {
    #[serde(deserialize_with = "snowflake")]
    pub admin: RoleId,
    #[serde(deserialize_with = "snowflake")]
    pub moderator: RoleId,
    #[serde(deserialize_with = "snowflake")]
    pub sommelier: RoleId,
    #[serde(deserialize_with = "snowflake")]
    pub connoisseur: RoleId,
    #[serde(deserialize_with = "snowflake")]
    pub wine_carrier: RoleId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    #[serde(deserialize_with = "snowflake")]
    pub booze_discussions: ChannelId,
    #[serde(deserialize_with = "snowflake")]
    pub wine_carrier: ChannelId,
    #[serde(deserialize_with = "snowflake")]
    pub steve_says: ChannelId,
    /// Unset leaves `/make_wine_carrier` usable from any channel.
    #[serde(default, deserialize_with = "optional_snowflake")]
    pub make_wine_carrier: Option<ChannelId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WelcomeConfig {
    pub message_path: PathBuf,
    pub thumbnail_url: String,
    #[serde(default = "default_role_name")]
    pub role_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToggleConfig {
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_secs: u64,
    #[serde(default = "default_notify_timeout")]
    pub notify_timeout_secs: u64,
}

impl Default for ToggleConfig {
    fn default() -> Self {
        Self {
            lock_timeout_secs: default_lock_timeout(),
            notify_timeout_secs: default_notify_timeout(),
        }
    }
}

impl ToggleConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs)
    }
}

// TOML integers are signed; read IDs as plain non-zero integers.
fn snowflake<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<NonZeroU64>,
{
    NonZeroU64::deserialize(deserializer).map(T::from)
}

fn optional_snowflake<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<NonZeroU64>,
{
    Ok(Option::<NonZeroU64>::deserialize(deserializer)?.map(T::from))
}

fn default_role_name() -> String {
    "Wine Carrier".into()
}

fn default_lock_timeout() -> u64 {
    30
}

fn default_notify_timeout() -> u64 {
    15
}

impl Config {
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;

        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Picks the config path from `BOOZEBOT_CONFIG`, falling back to `boozebot.toml`.
    pub fn path_from_env() -> PathBuf {
        std::env::var("BOOZEBOT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }
}

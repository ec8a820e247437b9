//! Configuration types and loading.
//!
//! Values come from CLI flags and environment (merged by the binary before they reach
//! [`resolve_settings`]) with an optional JSON file underneath (e.g. `~/.slack-bridge/config.json`).
//! The resolved [`Settings`] are built once at startup and only read afterwards.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";

/// Top-level config file contents. Every field is optional; flags and env take precedence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Slack credentials and scoping.
    #[serde(default)]
    pub slack: SlackConfig,

    /// Interaction endpoint settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Slack bot settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlackConfig {
    /// Bot user token. Overridden by `--token` / BOT_TOKEN.
    pub bot_token: Option<String>,
    /// The bot's own user id, used to drop self-authored messages. Overridden by `--botID` / BOT_ID.
    pub bot_id: Option<String>,
    /// The single channel the message handler reacts to. Overridden by `--channelID` / BOT_CHANNEL.
    pub channel_id: Option<String>,
    /// Web API base URL (default https://slack.com/api). Overridden by SLACK_API_BASE env.
    pub api_base: Option<String>,
}

/// Interaction endpoint bind, port, and verification secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for the interaction endpoint (default 3000).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0" so the platform can reach the callback URL).
    #[serde(default = "default_gateway_bind")]
    pub bind: String,

    /// Shared secret expected in every interaction payload. Overridden by `--checkToken` / CHECK_TOKEN.
    pub check_token: Option<String>,
}

fn default_gateway_port() -> u16 {
    3000
}

fn default_gateway_bind() -> String {
    "0.0.0.0".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
            check_token: None,
        }
    }
}

/// Values supplied on the command line or through the environment. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub token: Option<String>,
    pub bot_id: Option<String>,
    pub channel_id: Option<String>,
    pub check_token: Option<String>,
    pub port: Option<u16>,
}

/// Startup validation failure. Reported before any task is spawned.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{what} expected. env {env} or arg --{flag}")]
    Missing {
        what: &'static str,
        env: &'static str,
        flag: &'static str,
    },
}

/// Bot credentials and the bot's own user id.
#[derive(Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub token: String,
    pub self_id: String,
}

impl fmt::Debug for BotIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotIdentity")
            .field("token", &"<redacted>")
            .field("self_id", &self.self_id)
            .finish()
    }
}

/// The channel the message handler is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelTarget {
    pub channel_id: String,
}

/// Shared secret that authenticates interaction callbacks.
#[derive(Clone, PartialEq, Eq)]
pub struct VerificationSecret {
    pub token: String,
}

impl fmt::Debug for VerificationSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VerificationSecret(<redacted>)")
    }
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub identity: BotIdentity,
    pub target: ChannelTarget,
    pub verification: VerificationSecret,
    pub bind: String,
    pub port: u16,
    pub api_base: String,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// First non-empty value of override then file; otherwise a [`ConfigError::Missing`].
fn require(
    over: Option<&str>,
    file: Option<&str>,
    what: &'static str,
    env: &'static str,
    flag: &'static str,
) -> Result<String, ConfigError> {
    non_empty(over)
        .or_else(|| non_empty(file))
        .ok_or(ConfigError::Missing { what, env, flag })
}

/// Resolve the Slack Web API base: env SLACK_API_BASE overrides config. Trailing slashes are dropped.
pub fn resolve_api_base(config: &Config) -> String {
    non_empty(std::env::var("SLACK_API_BASE").ok().as_deref())
        .or_else(|| non_empty(config.slack.api_base.as_deref()))
        .unwrap_or_else(|| DEFAULT_SLACK_API_BASE.to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Merge overrides over the file config and check that every required value is present.
pub fn resolve_settings(config: &Config, overrides: Overrides) -> Result<Settings, ConfigError> {
    let token = require(
        overrides.token.as_deref(),
        config.slack.bot_token.as_deref(),
        "bot token",
        "BOT_TOKEN",
        "token",
    )?;
    let self_id = require(
        overrides.bot_id.as_deref(),
        config.slack.bot_id.as_deref(),
        "botID",
        "BOT_ID",
        "botID",
    )?;
    let channel_id = require(
        overrides.channel_id.as_deref(),
        config.slack.channel_id.as_deref(),
        "bot channel",
        "BOT_CHANNEL",
        "channelID",
    )?;
    let check_token = require(
        overrides.check_token.as_deref(),
        config.gateway.check_token.as_deref(),
        "verification token",
        "CHECK_TOKEN",
        "checkToken",
    )?;
    Ok(Settings {
        identity: BotIdentity { token, self_id },
        target: ChannelTarget { channel_id },
        verification: VerificationSecret { token: check_token },
        bind: config.gateway.bind.trim().to_string(),
        port: overrides.port.unwrap_or(config.gateway.port),
        api_base: resolve_api_base(config),
    })
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("BRIDGE_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".slack-bridge").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, BRIDGE_CONFIG_PATH, or the default. Missing file => default config.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

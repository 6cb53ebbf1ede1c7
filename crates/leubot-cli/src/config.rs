//! Configuration – reads `~/.leubot/config.toml` (or `--config <path>`).

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use leubot_cockpit::{ApiConfig, DEFAULT_PORT};
use leubot_runtime::ArbitratorConfig;
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file {} does not exist", .0.display())]
    Missing(PathBuf),

    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Command-line tool that toggles the ambient light.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct LightConfig {
    pub cli_path: PathBuf,
    pub ip: String,
    pub token: String,
}

impl std::fmt::Debug for LightConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightConfig")
            .field("cli_path", &self.cli_path)
            .field("ip", &self.ip)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Everything the `leubot` binary needs, built once at startup.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind_ip")]
    pub bind_ip: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Host (and port) used when building `Location` headers.
    #[serde(default = "default_api_host")]
    pub api_host: String,

    #[serde(default = "default_api_proto")]
    pub api_proto: String,

    #[serde(default = "default_api_path")]
    pub api_path: String,

    /// Empty to drop the version segment from every route.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Speed for single-joint moves and home syncs.
    #[serde(default = "default_delta")]
    pub default_delta: u8,

    /// Administrative override token.  Empty disables the override.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub master_token: String,

    /// Idle window in seconds; `0` disables idle eviction.
    #[serde(default = "default_user_timeout_secs")]
    pub user_timeout_secs: u64,

    #[serde(default = "default_dispatch_timeout_ms")]
    pub dispatch_timeout_ms: u64,

    /// ArmLink tty.  Frames are only logged when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_device: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack_webhook_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light: Option<LightConfig>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_ip", &self.bind_ip)
            .field("port", &self.port)
            .field("api_host", &self.api_host)
            .field("api_proto", &self.api_proto)
            .field("api_path", &self.api_path)
            .field("api_version", &self.api_version)
            .field("default_delta", &self.default_delta)
            .field(
                "master_token",
                if self.master_token.is_empty() { &"<not set>" } else { &"<redacted>" },
            )
            .field("user_timeout_secs", &self.user_timeout_secs)
            .field("dispatch_timeout_ms", &self.dispatch_timeout_ms)
            .field("serial_device", &self.serial_device)
            .field(
                "slack_webhook_url",
                if self.slack_webhook_url.is_some() { &"<redacted>" } else { &"<not set>" },
            )
            .field("light", &self.light)
            .finish()
    }
}

fn default_bind_ip() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_api_host() -> String {
    "localhost:6789".to_string()
}
fn default_api_proto() -> String {
    "http://".to_string()
}
fn default_api_path() -> String {
    "leubot".to_string()
}
fn default_api_version() -> String {
    "v1".to_string()
}
fn default_delta() -> u8 {
    128
}
fn default_user_timeout_secs() -> u64 {
    900
}
fn default_dispatch_timeout_ms() -> u64 {
    2000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_ip: default_bind_ip(),
            port: default_port(),
            api_host: default_api_host(),
            api_proto: default_api_proto(),
            api_path: default_api_path(),
            api_version: default_api_version(),
            default_delta: default_delta(),
            master_token: String::new(),
            user_timeout_secs: default_user_timeout_secs(),
            dispatch_timeout_ms: default_dispatch_timeout_ms(),
            serial_device: None,
            slack_webhook_url: None,
            light: None,
        }
    }
}

impl Config {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    pub fn api(&self) -> ApiConfig {
        ApiConfig {
            host: self.api_host.clone(),
            proto: self.api_proto.clone(),
            path: self.api_path.clone(),
            version: self.api_version.clone(),
        }
    }

    pub fn arbitrator(&self) -> ArbitratorConfig {
        ArbitratorConfig {
            default_delta: self.default_delta,
            user_timeout: (self.user_timeout_secs > 0)
                .then(|| Duration::from_secs(self.user_timeout_secs)),
            dispatch_timeout: Duration::from_millis(self.dispatch_timeout_ms),
            master_token: (!self.master_token.is_empty())
                .then(|| Zeroizing::new(self.master_token.clone())),
            ..ArbitratorConfig::default()
        }
    }
}

/// Return the path to `~/.leubot/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".leubot").join("config.toml")
}

/// Load the config from `explicit`, or from [`config_path`] when `None`,
/// then apply `LEUBOT_*` overrides.
///
/// A missing default file yields the defaults; a missing explicit file is an
/// error.
pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let mut cfg = match explicit {
        Some(path) => load_from(path)?.ok_or_else(|| ConfigError::Missing(path.to_path_buf()))?,
        None => load_from(&config_path())?.unwrap_or_default(),
    };
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Parse the file at `path`.  Returns `None` if it does not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(cfg))
}

/// Apply `LEUBOT_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `LEUBOT_BIND_IP` | `bind_ip` |
/// | `LEUBOT_PORT` | `port` |
/// | `LEUBOT_MASTER_TOKEN` | `master_token` |
/// | `LEUBOT_USER_TIMEOUT_SECS` | `user_timeout_secs` |
/// | `LEUBOT_SERIAL_DEVICE` | `serial_device` |
/// | `LEUBOT_SLACK_WEBHOOK_URL` | `slack_webhook_url` |
///
/// Values that fail to parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides(cfg, |key| std::env::var(key).ok());
}

pub(crate) fn apply_overrides(cfg: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("LEUBOT_BIND_IP")
        && let Ok(ip) = v.parse::<IpAddr>()
    {
        cfg.bind_ip = ip;
    }
    if let Some(v) = var("LEUBOT_PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        cfg.port = port;
    }
    if let Some(v) = var("LEUBOT_MASTER_TOKEN") {
        cfg.master_token = v;
    }
    if let Some(v) = var("LEUBOT_USER_TIMEOUT_SECS")
        && let Ok(secs) = v.parse::<u64>()
    {
        cfg.user_timeout_secs = secs;
    }
    if let Some(v) = var("LEUBOT_SERIAL_DEVICE") {
        cfg.serial_device = Some(PathBuf::from(v));
    }
    if let Some(v) = var("LEUBOT_SLACK_WEBHOOK_URL") {
        cfg.slack_webhook_url = Some(v);
    }
}

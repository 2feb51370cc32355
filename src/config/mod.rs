use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub ring: RingConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
}

/// Ring cloud account configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RingConfig {
    /// Ring account email
    #[serde(default)]
    pub username: String,
    /// Ring account password
    #[serde(default)]
    pub password: String,
    /// Path of the cached OAuth token file
    #[serde(default = "default_token_cache")]
    pub token_cache_path: PathBuf,
    /// OAuth endpoint base
    #[serde(default = "default_oauth_url")]
    pub oauth_url: String,
    /// Device/history API base
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_token_cache() -> PathBuf {
    PathBuf::from("ring_token.cache")
}

fn default_oauth_url() -> String {
    "https://oauth.ring.com".to_string()
}

fn default_api_url() -> String {
    "https://api.ring.com".to_string()
}

fn default_user_agent() -> String {
    "RingWatch/0.1".to_string()
}

/// Which outbound notification channel is active
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Pushover,
    Sms,
}

/// Notification delivery configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifierConfig {
    /// Active delivery channel
    #[serde(default = "default_channel")]
    pub channel: ChannelKind,
    #[serde(default)]
    pub pushover: PushoverConfig,
    #[serde(default)]
    pub sms: SmsConfig,
}

fn default_channel() -> ChannelKind {
    ChannelKind::Pushover
}

/// Pushover credentials
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PushoverConfig {
    #[serde(default)]
    pub user_key: String,
    #[serde(default)]
    pub api_token: String,
    /// Notification sound name
    #[serde(default = "default_pushover_sound")]
    pub sound: String,
}

fn default_pushover_sound() -> String {
    "pushover".to_string()
}

/// Twilio SMS credentials
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SmsConfig {
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub from_number: String,
    #[serde(default)]
    pub to_number: String,
}

/// Event polling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollerConfig {
    /// Seconds between polling cycles
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    /// History entries fetched per device per cycle
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Consecutive failures before the session counts as down
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Best-effort wait before the single recording-ready check
    #[serde(default = "default_video_ready_delay")]
    pub video_ready_delay_secs: u64,
}

fn default_check_interval() -> u64 {
    10
}

fn default_history_limit() -> usize {
    5
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_video_ready_delay() -> u64 {
    5
}

impl PollerConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn video_ready_delay(&self) -> Duration {
        Duration::from_secs(self.video_ready_delay_secs)
    }
}

/// Video archive configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArchiveConfig {
    /// Whether event recordings are downloaded at all
    #[serde(default = "default_download_videos")]
    pub download_videos: bool,
    /// Directory holding downloaded clips
    #[serde(default = "default_videos_dir")]
    pub videos_dir: PathBuf,
    /// Storage quota in gigabytes, fractional allowed
    #[serde(default = "default_max_storage_gb")]
    pub max_storage_gb: f64,
}

fn default_download_videos() -> bool {
    true
}

fn default_videos_dir() -> PathBuf {
    PathBuf::from("./ring_videos")
}

fn default_max_storage_gb() -> f64 {
    10.0
}

impl ArchiveConfig {
    /// Quota in bytes
    pub fn max_storage_bytes(&self) -> u64 {
        (self.max_storage_gb * 1024.0 * 1024.0 * 1024.0) as u64
    }
}

/// Clip viewer web server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ViewerConfig {
    /// Bind address
    #[serde(default = "default_viewer_address")]
    pub address: String,
    /// Bind port
    #[serde(default = "default_viewer_port")]
    pub port: u16,
}

fn default_viewer_address() -> String {
    "0.0.0.0".to_string()
}

fn default_viewer_port() -> u16 {
    5000
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            token_cache_path: default_token_cache(),
            oauth_url: default_oauth_url(),
            api_url: default_api_url(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            pushover: PushoverConfig::default(),
            sms: SmsConfig::default(),
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval(),
            history_limit: default_history_limit(),
            failure_threshold: default_failure_threshold(),
            video_ready_delay_secs: default_video_ready_delay(),
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            download_videos: default_download_videos(),
            videos_dir: default_videos_dir(),
            max_storage_gb: default_max_storage_gb(),
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            address: default_viewer_address(),
            port: default_viewer_port(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ring: RingConfig::default(),
            notifier: NotifierConfig::default(),
            poller: PollerConfig::default(),
            archive: ArchiveConfig::default(),
            viewer: ViewerConfig::default(),
        }
    }
}

/// Load configuration from a file or use defaults, then apply
/// environment overrides
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let mut config = match config_path {
        Some(path) => {
            let config_str = std::fs::read_to_string(path)
                .context(format!("Failed to read config file: {:?}", path))?;

            if path.extension().map_or(false, |ext| ext == "json") {
                serde_json::from_str(&config_str).context("Failed to parse JSON config")?
            } else if path.extension().map_or(false, |ext| ext == "toml") {
                toml::from_str(&config_str).context("Failed to parse TOML config")?
            } else {
                return Err(anyhow::anyhow!("Unsupported config file format"));
            }
        }
        None => Config::default(),
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

fn env_string(name: &str, target: &mut String) {
    if let Ok(value) = std::env::var(name) {
        *target = value;
    }
}

/// Environment variables take precedence over file values
fn apply_env_overrides(config: &mut Config) {
    env_string("RING_USERNAME", &mut config.ring.username);
    env_string("RING_PASSWORD", &mut config.ring.password);
    if let Ok(path) = std::env::var("RING_TOKEN_CACHE") {
        config.ring.token_cache_path = PathBuf::from(path);
    }

    env_string("PUSHOVER_USER_KEY", &mut config.notifier.pushover.user_key);
    env_string("PUSHOVER_API_TOKEN", &mut config.notifier.pushover.api_token);
    env_string("TWILIO_ACCOUNT_SID", &mut config.notifier.sms.account_sid);
    env_string("TWILIO_AUTH_TOKEN", &mut config.notifier.sms.auth_token);
    env_string("TWILIO_FROM_NUMBER", &mut config.notifier.sms.from_number);
    env_string("TWILIO_TO_NUMBER", &mut config.notifier.sms.to_number);
    if let Ok(channel) = std::env::var("NOTIFY_CHANNEL") {
        match channel.to_lowercase().as_str() {
            "pushover" => config.notifier.channel = ChannelKind::Pushover,
            "sms" => config.notifier.channel = ChannelKind::Sms,
            _ => {}
        }
    }

    if let Ok(secs) = std::env::var("CHECK_INTERVAL") {
        if let Ok(secs) = secs.parse() {
            config.poller.check_interval_secs = secs;
        }
    }
    if let Ok(flag) = std::env::var("DOWNLOAD_VIDEOS") {
        config.archive.download_videos = flag.to_lowercase() == "true";
    }
    if let Ok(dir) = std::env::var("VIDEOS_DIR") {
        config.archive.videos_dir = PathBuf::from(dir);
    }
    if let Ok(gb) = std::env::var("MAX_STORAGE_GB") {
        if let Ok(gb) = gb.parse() {
            config.archive.max_storage_gb = gb;
        }
    }

    env_string("VIEWER_ADDRESS", &mut config.viewer.address);
    if let Ok(port) = std::env::var("VIEWER_PORT") {
        if let Ok(port) = port.parse() {
            config.viewer.port = port;
        }
    }
}

impl Config {
    /// Check that the credentials the active channel needs are present
    pub fn validate(&self) -> Result<(), crate::error::Error> {
        let mut missing = Vec::new();

        if self.ring.username.is_empty() {
            missing.push("RING_USERNAME");
        }
        if self.ring.password.is_empty() {
            missing.push("RING_PASSWORD");
        }

        match self.notifier.channel {
            ChannelKind::Pushover => {
                if self.notifier.pushover.user_key.is_empty() {
                    missing.push("PUSHOVER_USER_KEY");
                }
                if self.notifier.pushover.api_token.is_empty() {
                    missing.push("PUSHOVER_API_TOKEN");
                }
            }
            ChannelKind::Sms => {
                if self.notifier.sms.account_sid.is_empty() {
                    missing.push("TWILIO_ACCOUNT_SID");
                }
                if self.notifier.sms.auth_token.is_empty() {
                    missing.push("TWILIO_AUTH_TOKEN");
                }
                if self.notifier.sms.from_number.is_empty() {
                    missing.push("TWILIO_FROM_NUMBER");
                }
                if self.notifier.sms.to_number.is_empty() {
                    missing.push("TWILIO_TO_NUMBER");
                }
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(crate::error::Error::Config(format!(
                "Missing required settings: {}",
                missing.join(", ")
            )))
        }
    }
}

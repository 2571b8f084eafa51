//! Configuration file parser for the digest (`config.toml` by default).
//!
//! Unlike the optional sections, `feeds` and the `[email]` addresses are
//! required: a digest without them cannot be produced or delivered.
//! Unknown top-level keys are accepted but logged as warnings.
use secrecy::SecretString;
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::digest::Limits;
use crate::util::validate_feed_url;

/// Environment variable naming the config file when `--config` is absent.
pub const CONFIG_ENV_VAR: &str = "RSS_DIGEST_CONFIG";
/// Config file used when neither `--config` nor the env var is set.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config file: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// Well-formed TOML that does not describe a usable digest.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Validated application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Feed URLs, in the order their entries should be considered.
    pub feeds: Vec<String>,
    pub limits: Limits,
    pub email: EmailConfig,
    pub schedule: ScheduleConfig,
}

/// SMTP delivery settings from the `[email]` table.
///
/// Custom Debug impl masks `password` so it never reaches logs.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    /// Upgrade the connection with STARTTLS.
    pub use_tls: bool,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("from", &self.from)
            .field("to", &self.to)
            .field("subject", &self.subject)
            .field("use_tls", &self.use_tls)
            .finish()
    }
}

/// Daily delivery time (local time) from the `[schedule]` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub hour: u32,
    pub minute: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { hour: 8, minute: 0 }
    }
}

// ============================================================================
// Raw (pre-validation) shapes
// ============================================================================

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawConfig {
    feeds: Option<Vec<String>>,
    limits: Limits,
    email: RawEmail,
    schedule: ScheduleConfig,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawEmail {
    smtp_host: String,
    smtp_port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    from: String,
    to: Option<Recipients>,
    subject: Option<String>,
    use_tls: Option<bool>,
}

/// `to` may be a single address or a list of addresses.
#[derive(Deserialize)]
#[serde(untagged)]
enum Recipients {
    One(String),
    Many(Vec<String>),
}

impl Recipients {
    fn into_vec(self) -> Vec<String> {
        let list = match self {
            Recipients::One(addr) => vec![addr],
            Recipients::Many(addrs) => addrs,
        };
        list.into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 4] = ["feeds", "limits", "email", "schedule"];

    /// Picks the config path: explicit flag, then `RSS_DIGEST_CONFIG`, then
    /// `config.toml` in the working directory.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Load and validate configuration from a TOML file.
    ///
    /// - Missing or unreadable file → `Err(ConfigError::Io)`
    /// - Invalid TOML or wrong value types → `Err(ConfigError::Parse)`
    /// - Missing `feeds`, `email.smtp_host`, `email.from` or `email.to`,
    ///   zero limits, or an out-of-range schedule → `Err(ConfigError::Invalid)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let meta = std::fs::metadata(path)?;
        if meta.len() > Self::MAX_FILE_SIZE {
            return Err(ConfigError::TooLarge(format!(
                "Config file is {} bytes (max {} bytes)",
                meta.len(),
                Self::MAX_FILE_SIZE
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        tracing::info!(
            path = %path.display(),
            feeds = config.feeds.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let raw: RawConfig = toml::from_str(content)?;
        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> Result<Self, ConfigError> {
        let feeds = raw
            .feeds
            .ok_or_else(|| invalid("config must contain a 'feeds' list"))?;
        let feeds = feeds
            .into_iter()
            .map(|url| {
                validate_feed_url(&url)
                    .map(|_| url.trim().to_string())
                    .map_err(|e| invalid(format!("feed '{}': {}", url, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if raw.limits.max_per_feed == 0 || raw.limits.max_sentences == 0 {
            return Err(invalid("limits.max_per_feed and limits.max_sentences must be positive"));
        }
        if raw.schedule.hour > 23 || raw.schedule.minute > 59 {
            return Err(invalid(format!(
                "schedule {:02}:{:02} is not a valid time of day",
                raw.schedule.hour, raw.schedule.minute
            )));
        }

        let email = raw.email;
        if email.smtp_host.trim().is_empty() {
            return Err(invalid("email.smtp_host is required"));
        }
        let to = email.to.map(Recipients::into_vec).unwrap_or_default();
        if email.from.trim().is_empty() || to.is_empty() {
            return Err(invalid("email.from and email.to are required"));
        }

        Ok(Self {
            feeds,
            limits: raw.limits,
            email: EmailConfig {
                smtp_host: email.smtp_host.trim().to_string(),
                smtp_port: email.smtp_port.unwrap_or(587),
                username: email.username.filter(|u| !u.is_empty()),
                password: email
                    .password
                    .filter(|p| !p.is_empty())
                    .map(SecretString::from),
                from: email.from.trim().to_string(),
                to,
                subject: email
                    .subject
                    .unwrap_or_else(|| "Daily RSS Summary".to_string()),
                use_tls: email.use_tls.unwrap_or(true),
            },
            schedule: raw.schedule,
        })
    }

    /// Removes `dead` URLs from the `feeds` list of the file at `path`.
    ///
    /// Only the `feeds` array is rewritten; every other key is preserved,
    /// though TOML comments and formatting are not. The file is replaced
    /// atomically. Returns `(removed, remaining)`.
    pub fn remove_feeds(path: &Path, dead: &[String]) -> Result<(usize, usize), ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut table: toml::Table = content.parse()?;

        let feeds = match table.get_mut("feeds") {
            Some(toml::Value::Array(feeds)) => feeds,
            _ => return Err(invalid("config must contain a 'feeds' list")),
        };

        let before = feeds.len();
        feeds.retain(|v| {
            v.as_str()
                .map_or(true, |url| !dead.iter().any(|d| d.trim() == url.trim()))
        });
        let remaining = feeds.len();
        let removed = before - remaining;

        if removed > 0 {
            let serialized = toml::to_string(&table)?;
            atomic_write(path, serialized.as_bytes())?;
            tracing::info!(
                path = %path.display(),
                removed = removed,
                remaining = remaining,
                "Removed dead feeds from config"
            );
        }

        Ok((removed, remaining))
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

/// Write `content` to `dst` via write-to-temp-then-rename, so the config is
/// never left half-written.
fn atomic_write(dst: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::time::{SystemTime, UNIX_EPOCH};
    // Unpredictable temp name; create_new refuses to follow a planted symlink.
    let random_suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = dst.with_extension(format!("tmp.{:016x}", random_suffix));

    let result = (|| {
        let mut temp_file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)?;
        temp_file.write_all(content)?;
        temp_file.sync_all()?;
        drop(temp_file);

        // On Windows, rename fails if destination exists.
        #[cfg(windows)]
        if dst.exists() {
            std::fs::remove_file(dst)?;
        }
        std::fs::rename(&temp_path, dst)
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    result
}

// ============================================================================
// Tests
// ============================================================================

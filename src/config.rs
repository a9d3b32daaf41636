use std::fmt;
use std::path::PathBuf;

/// Connect timeout for outbound Telegram API calls, in seconds.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;
/// Read timeout for outbound Telegram API calls, in seconds.
pub const READ_TIMEOUT_SECS: u64 = 30;

const DEFAULT_PORT: u16 = 8000;

/// The fallback secret shipped by earlier deployments. Refused outright:
/// a process running with it would accept link payloads from anyone.
const PLACEHOLDER_SECRET: &str = "changeme";

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// A required environment variable is not set.
    MissingVar { name: &'static str },
    /// An environment variable is set to a value that cannot be used.
    InvalidVar { name: &'static str, detail: String },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVar { name } => {
                write!(f, "required environment variable {name} is not set")
            }
            Self::InvalidVar { name, detail } => {
                write!(f, "invalid value for {name}: {detail}")
            }
            Self::Validation(msg) => write!(f, "config validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Process-wide configuration, loaded once at startup and passed to each
/// component at construction time. Immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot token (`API_KEY`).
    pub api_key: String,
    /// Chat that receives QR images for payloads accepted on
    /// `/receive_link` (`RECEIVER_TARGET_CHAT_ID`). When unset, accepted
    /// payloads are encoded and logged but not delivered anywhere.
    pub target_chat_id: Option<i64>,
    /// Shared secret authenticating the partner service
    /// (`OTHER_BOT_SECRET`).
    pub webhook_secret: String,
    /// `USE_HMAC=1` switches the verifier from exact header comparison to
    /// HMAC-SHA256 over the request body.
    pub use_hmac: bool,
    /// HTTP listen port (`PORT`).
    pub port: u16,
    /// Directory for state files: `logs/` and the audit log (`DATA_DIR`).
    pub data_dir: PathBuf,
    /// `USE_POLLING=1` consumes Telegram updates by long polling instead of
    /// the webhook route.
    pub use_polling: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup. Tests supply a map
    /// here so they never touch the process environment.
    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("API_KEY")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingVar { name: "API_KEY" })?;

        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = api_key.split(':').collect();
        if token_parts.len() != 2
            || token_parts[0].parse::<u64>().is_err()
            || token_parts[1].is_empty()
        {
            return Err(ConfigError::Validation(
                "API_KEY appears invalid (expected format: 123456789:ABCdefGHI...)".into(),
            ));
        }

        let webhook_secret = lookup("OTHER_BOT_SECRET")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingVar { name: "OTHER_BOT_SECRET" })?;
        if webhook_secret == PLACEHOLDER_SECRET {
            return Err(ConfigError::Validation(
                "OTHER_BOT_SECRET is set to the placeholder value; pick a real secret".into(),
            ));
        }

        let target_chat_id = match lookup("RECEIVER_TARGET_CHAT_ID").filter(|v| !v.is_empty()) {
            Some(raw) => Some(raw.parse::<i64>().map_err(|e| ConfigError::InvalidVar {
                name: "RECEIVER_TARGET_CHAT_ID",
                detail: e.to_string(),
            })?),
            None => None,
        };

        let port = match lookup("PORT").filter(|v| !v.is_empty()) {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::InvalidVar {
                name: "PORT",
                detail: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let data_dir = lookup("DATA_DIR")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            api_key,
            target_chat_id,
            webhook_secret,
            use_hmac: lookup("USE_HMAC").is_some_and(|v| v == "1"),
            port,
            data_dir,
            use_polling: lookup("USE_POLLING").is_some_and(|v| v == "1"),
        })
    }

    pub fn secret_mode(&self) -> crate::signature::SecretMode {
        if self.use_hmac {
            crate::signature::SecretMode::Hmac
        } else {
            crate::signature::SecretMode::Plain
        }
    }
}

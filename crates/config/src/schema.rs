//! Config schema types.

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    pub server: ServerConfig,
    pub telegram: TelegramConfig,
}

/// HTTP control-plane listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8000,
        }
    }
}

/// How the client logs in.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// User account: phone number plus an out-of-band verification code.
    #[default]
    Phone,
    /// Bot account: token from @BotFather, no interactive step.
    Bot,
}

impl std::str::FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "phone" => Ok(Self::Phone),
            "bot" => Ok(Self::Bot),
            other => Err(format!("unknown auth mode: {other}")),
        }
    }
}

/// Telegram account and relay settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Application id from my.telegram.org.
    pub api_id: i32,

    /// Application hash from my.telegram.org.
    #[serde(serialize_with = "serialize_secret")]
    pub api_hash: Secret<String>,

    /// Phone number used for [`AuthMode::Phone`].
    pub phone: String,

    /// Bot token used for [`AuthMode::Bot`].
    #[serde(serialize_with = "serialize_secret")]
    pub bot_token: Secret<String>,

    /// Comma-separated usernames or numeric channel ids to monitor.
    pub channels: String,

    /// Bare id of the channel matched messages are relayed to.
    pub target_channel_id: i64,

    pub auth_mode: AuthMode,
}

impl TelegramConfig {
    /// Configured source handles, trimmed, empty entries dropped.
    #[must_use]
    pub fn channel_handles(&self) -> Vec<String> {
        self.channels
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("api_id", &self.api_id)
            .field("api_hash", &"[REDACTED]")
            .field("phone", &self.phone)
            .field("bot_token", &"[REDACTED]")
            .field("channels", &self.channels)
            .field("target_channel_id", &self.target_channel_id)
            .field("auth_mode", &self.auth_mode)
            .finish()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_id: 0,
            api_hash: Secret::new(String::new()),
            phone: String::new(),
            bot_token: Secret::new(String::new()),
            channels: String::new(),
            target_channel_id: 0,
            auth_mode: AuthMode::default(),
        }
    }
}

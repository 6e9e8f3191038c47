//! The messaging-platform capability surface the monitor is built on.
//!
//! The monitor never talks to the platform directly: it allocates a
//! [`Transport`] per session through a [`TransportFactory`] and drives it
//! through these traits. The Bot API implementation lives in
//! `courier-telegram`; tests use in-memory stubs.

use std::sync::Arc;

use {
    async_trait::async_trait,
    courier_config::{AuthMode, TelegramConfig},
    secrecy::Secret,
    serde::Serialize,
};

use crate::{
    Result,
    event::{EventKind, InboundEvent, RelayMessage},
    peer::PeerId,
};

/// What a handle refers to before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    /// Public username, with or without a leading `@`.
    Username(String),
    /// Raw bare channel id.
    Channel(i64),
}

impl EntityRef {
    /// Numeric handles are raw channel ids, anything else is a username.
    ///
    /// Numbers outside the valid channel id range (`0`, or too large to
    /// mark) stay usernames and fail resolution instead.
    #[must_use]
    pub fn parse(handle: &str) -> Self {
        if !handle.is_empty()
            && handle.bytes().all(|b| b.is_ascii_digit())
            && let Ok(id) = handle.parse::<i64>()
            && PeerId::is_valid_channel_id(id)
        {
            return Self::Channel(id);
        }
        Self::Username(handle.to_string())
    }
}

/// Result of entity resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Entity {
    Channel {
        id: i64,
        title: String,
        username: Option<String>,
    },
    Group {
        id: i64,
        title: String,
    },
    User {
        id: i64,
        username: Option<String>,
    },
}

impl Entity {
    /// Bare channel id, only for [`Entity::Channel`].
    #[must_use]
    pub fn channel_id(&self) -> Option<i64> {
        match self {
            Self::Channel { id, .. } => Some(*id),
            Self::Group { .. } | Self::User { .. } => None,
        }
    }
}

/// An open conversation of the connected account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    pub name: String,
    pub entity: Entity,
}

/// Credentials handed to [`Transport::authenticate`].
#[derive(Clone)]
pub struct Credentials {
    pub mode: AuthMode,
    pub api_id: i32,
    pub api_hash: Secret<String>,
    pub phone: String,
    pub bot_token: Secret<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("mode", &self.mode)
            .field("api_id", &self.api_id)
            .field("phone", &self.phone)
            .finish_non_exhaustive()
    }
}

impl From<&TelegramConfig> for Credentials {
    fn from(config: &TelegramConfig) -> Self {
        Self {
            mode: config.auth_mode,
            api_id: config.api_id,
            api_hash: config.api_hash.clone(),
            phone: config.phone.clone(),
            bot_token: config.bot_token.clone(),
        }
    }
}

/// Supplies the out-of-band verification code during phone login.
#[async_trait]
pub trait CodeSource: Send + Sync {
    /// Suspend until a code is available and return it.
    async fn next_code(&self) -> String;
}

/// Receives events for one subscription.
///
/// Implementations contain their own failures; a handler never reports
/// back to the transport.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: InboundEvent);
}

/// One connection to the messaging platform.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self) -> Result<()>;

    /// Log in. Phone-based flows pull the verification code from `codes`.
    async fn authenticate(&self, credentials: &Credentials, codes: &dyn CodeSource) -> Result<()>;

    async fn resolve_entity(&self, entity: &EntityRef) -> Result<Entity>;

    /// Dialogs the connected account is a member of.
    async fn dialogs(&self) -> Result<Vec<Dialog>>;

    async fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) -> Result<()>;

    /// Re-send the message content as a new message from this account.
    async fn send_message(&self, to: PeerId, message: &RelayMessage) -> Result<()>;

    /// Forward the message, keeping the original attribution.
    async fn forward_message(&self, to: PeerId, message: &RelayMessage) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;

    /// Whether the platform still considers this connection authorized.
    async fn is_authorized(&self) -> Result<bool>;
}

/// Allocates a fresh transport for each session.
pub trait TransportFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn Transport>>;
}

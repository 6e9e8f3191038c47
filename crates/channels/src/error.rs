use std::error::Error as StdError;

use serde::Serialize;

/// Crate-wide result type for monitor and transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Stable, serializable classification of an [`Error`].
///
/// Control-plane callers map this to their own response format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotRunning,
    AuthenticationFailed,
    NotAChannel,
    ResolutionFailed,
    NotFound,
    ChannelSeedFailed,
    DisconnectError,
    Cancelled,
    Unsupported,
    InvalidInput,
    External,
}

/// Typed errors shared by the registry, the lifecycle controller and
/// transports.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The operation needs an active session but none exists.
    #[error("telegram client is not running")]
    NotRunning,

    /// Credentials or verification code rejected by the platform.
    #[error("authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// The handle resolved to something other than a channel.
    #[error("not a valid channel: {handle}")]
    NotAChannel { handle: String },

    /// Entity lookup for the handle failed.
    #[error("failed to resolve {handle}: {source}")]
    ResolutionFailed {
        handle: String,
        #[source]
        source: Box<Error>,
    },

    /// No monitored channel has this handle.
    #[error("channel not found: {handle}")]
    NotFound { handle: String },

    /// A configured channel could not be added during startup.
    #[error("failed to seed channel {handle}: {source}")]
    ChannelSeedFailed {
        handle: String,
        #[source]
        source: Box<Error>,
    },

    /// The transport reported an error while disconnecting.
    #[error("error stopping telegram client: {source}")]
    DisconnectError {
        #[source]
        source: Box<Error>,
    },

    /// The session was stopped while the operation was in flight.
    #[error("operation cancelled: session stopped")]
    Cancelled,

    /// The transport cannot perform this operation.
    #[error("unsupported by transport: {message}")]
    Unsupported { message: String },

    /// Input payload or parameter is invalid.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Unclassified transport error, surfaced as-is.
    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn authentication_failed(message: impl std::fmt::Display) -> Self {
        Self::AuthenticationFailed {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn not_a_channel(handle: impl Into<String>) -> Self {
        Self::NotAChannel {
            handle: handle.into(),
        }
    }

    #[must_use]
    pub fn resolution_failed(handle: impl Into<String>, source: Error) -> Self {
        Self::ResolutionFailed {
            handle: handle.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn not_found(handle: impl Into<String>) -> Self {
        Self::NotFound {
            handle: handle.into(),
        }
    }

    #[must_use]
    pub fn channel_seed_failed(handle: impl Into<String>, source: Error) -> Self {
        Self::ChannelSeedFailed {
            handle: handle.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn disconnect(source: Error) -> Self {
        Self::DisconnectError {
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn unsupported(message: impl std::fmt::Display) -> Self {
        Self::Unsupported {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotRunning => ErrorKind::NotRunning,
            Self::AuthenticationFailed { .. } => ErrorKind::AuthenticationFailed,
            Self::NotAChannel { .. } => ErrorKind::NotAChannel,
            Self::ResolutionFailed { .. } => ErrorKind::ResolutionFailed,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::ChannelSeedFailed { .. } => ErrorKind::ChannelSeedFailed,
            Self::DisconnectError { .. } => ErrorKind::DisconnectError,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::External { .. } => ErrorKind::External,
        }
    }
}

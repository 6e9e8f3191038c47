//! Peer identity normalisation.
//!
//! Telegram hands out "marked" chat ids that encode the peer type in the
//! sign and a `-100…` prefix: users are positive, basic groups are
//! negative, and channels/supergroups are offset by `-10^12`. The registry
//! is keyed by the bare id, so every inbound chat id goes through
//! [`PeerId::resolve`] before lookup.

use std::fmt;

use serde::Serialize;

/// Offset applied to channel ids when marking them.
const CHANNEL_MARK: i64 = 1_000_000_000_000;

/// Largest bare channel id that still has a marked form.
pub const MAX_CHANNEL_ID: i64 = i64::MAX - CHANNEL_MARK;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerKind {
    User,
    Group,
    Channel,
}

/// A bare peer id together with its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PeerId {
    pub kind: PeerKind,
    pub id: i64,
}

impl PeerId {
    #[must_use]
    pub fn user(id: i64) -> Self {
        Self {
            kind: PeerKind::User,
            id,
        }
    }

    #[must_use]
    pub fn group(id: i64) -> Self {
        Self {
            kind: PeerKind::Group,
            id,
        }
    }

    #[must_use]
    pub fn channel(id: i64) -> Self {
        Self {
            kind: PeerKind::Channel,
            id,
        }
    }

    /// Split a marked id into its bare id and peer kind.
    #[must_use]
    pub fn resolve(marked: i64) -> Self {
        if marked >= 0 {
            return Self::user(marked);
        }
        let unsigned = marked.saturating_neg();
        if unsigned > CHANNEL_MARK {
            Self::channel(unsigned - CHANNEL_MARK)
        } else {
            Self::group(unsigned)
        }
    }

    /// The marked form of this peer, as the Bot API expects it.
    ///
    /// Only channel ids in `1..=MAX_CHANNEL_ID` round-trip through
    /// [`PeerId::resolve`]; anything else saturates instead of overflowing.
    #[must_use]
    pub fn marked(self) -> i64 {
        match self.kind {
            PeerKind::User => self.id,
            PeerKind::Group => self.id.saturating_neg(),
            PeerKind::Channel => CHANNEL_MARK.saturating_add(self.id).saturating_neg(),
        }
    }

    /// Whether `id` is a bare channel id with a marked form.
    #[must_use]
    pub fn is_valid_channel_id(id: i64) -> bool {
        (1..=MAX_CHANNEL_ID).contains(&id)
    }

    #[must_use]
    pub fn is_channel(self) -> bool {
        self.kind == PeerKind::Channel
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            PeerKind::User => "user",
            PeerKind::Group => "group",
            PeerKind::Channel => "channel",
        };
        write!(f, "{kind}:{}", self.id)
    }
}

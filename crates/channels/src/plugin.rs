use std::collections::BTreeMap;

use {async_trait::async_trait, serde::Serialize};

use crate::{Result, registry::ChannelInfo};

/// Outcome of a successful [`ChannelMonitor::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    /// A new session was authenticated, seeded and subscribed.
    Started,
    /// A session was already active; nothing changed.
    AlreadyRunning,
}

/// A channel the connected account is a member of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberChannel {
    pub id: i64,
    pub name: String,
    pub username: Option<String>,
}

/// Control-plane surface of a channel monitor.
///
/// Every operation returns a typed result; response formatting belongs to
/// the caller (the HTTP gateway, the CLI, tests).
#[async_trait]
pub trait ChannelMonitor: Send + Sync {
    /// Connect, authenticate, seed configured channels and subscribe.
    async fn start(&self) -> Result<StartOutcome>;

    /// Disconnect and drop the session.
    async fn stop(&self) -> Result<()>;

    /// Liveness of the underlying connection.
    async fn is_running(&self) -> Result<bool>;

    /// Hand in the out-of-band login code.
    async fn provide_verification_code(&self, code: &str) -> Result<()>;

    async fn add_channel(&self, handle: &str) -> Result<ChannelInfo>;

    async fn remove_channel(&self, handle: &str) -> Result<ChannelInfo>;

    /// Snapshot of monitored channels, id → handle.
    fn list_channels(&self) -> BTreeMap<i64, String>;

    async fn list_all_member_channels(&self) -> Result<Vec<MemberChannel>>;
}

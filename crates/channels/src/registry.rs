use std::{
    collections::{BTreeMap, HashMap},
    sync::{PoisonError, RwLock},
};

use {serde::Serialize, tracing::info};

use crate::{
    Error, Result,
    transport::{EntityRef, Transport},
};

/// A monitored source channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelInfo {
    pub channel_id: i64,
    /// The handle exactly as the caller supplied it.
    pub handle: String,
}

/// Registry of monitored channels, keyed by bare channel id.
///
/// Event filtering reads it while control-plane calls write it; the lock
/// is never held across an `.await`, and the last writer wins.
pub struct ChannelRegistry {
    channels: RwLock<HashMap<i64, String>>,
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve `handle` through `transport` and start monitoring it.
    ///
    /// Re-adding a channel overwrites the stored handle.
    pub async fn add(&self, transport: &dyn Transport, handle: &str) -> Result<ChannelInfo> {
        let info = Self::resolve(transport, handle).await?;
        self.insert(info.channel_id, handle);
        info!(channel_id = info.channel_id, handle, "added channel");
        Ok(info)
    }

    /// Resolve `handle` to a channel without registering it.
    pub async fn resolve(transport: &dyn Transport, handle: &str) -> Result<ChannelInfo> {
        let entity = transport
            .resolve_entity(&EntityRef::parse(handle))
            .await
            .map_err(|e| Error::resolution_failed(handle, e))?;

        let Some(channel_id) = entity.channel_id() else {
            return Err(Error::not_a_channel(handle));
        };
        Ok(ChannelInfo {
            channel_id,
            handle: handle.to_string(),
        })
    }

    /// Insert an already-resolved channel. Returns the handle it replaced.
    pub fn insert(&self, channel_id: i64, handle: impl Into<String>) -> Option<String> {
        self.channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(channel_id, handle.into())
    }

    /// Stop monitoring the channel that was added under `handle`.
    pub fn remove(&self, handle: &str) -> Result<ChannelInfo> {
        let mut channels = self
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let channel_id = channels
            .iter()
            .find_map(|(id, h)| (h == handle).then_some(*id))
            .ok_or_else(|| Error::not_found(handle))?;
        channels.remove(&channel_id);
        drop(channels);

        info!(channel_id, handle, "removed channel");
        Ok(ChannelInfo {
            channel_id,
            handle: handle.to_string(),
        })
    }

    /// Snapshot of the id → handle mapping.
    pub fn list(&self) -> BTreeMap<i64, String> {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, handle)| (*id, handle.clone()))
            .collect()
    }

    pub fn contains(&self, channel_id: i64) -> bool {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&channel_id)
    }

    pub fn len(&self) -> usize {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

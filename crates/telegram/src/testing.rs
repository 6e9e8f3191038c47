//! In-memory transport used by the unit tests of this crate.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use {async_trait::async_trait, tokio::sync::Notify};

use courier_channels::{
    CodeSource, Credentials, Dialog, Entity, EntityRef, Error, EventHandler, EventKind,
    InboundEvent, PeerId, RelayMessage, Result, Transport, TransportFactory,
};

/// Outbound call recorded by [`StubTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Forward { to: PeerId, message_id: i32 },
    Send { to: PeerId, message_id: i32 },
}

impl Call {
    pub fn message_id(&self) -> i32 {
        match self {
            Self::Forward { message_id, .. } | Self::Send { message_id, .. } => *message_id,
        }
    }
}

/// A post in the channel with bare id `channel_id`.
pub fn channel_post(channel_id: i64, message_id: i32, text: &str) -> RelayMessage {
    RelayMessage {
        id: message_id,
        chat_id: PeerId::channel(channel_id).marked(),
        chat_title: Some(format!("channel {channel_id}")),
        text: Some(text.to_string()),
    }
}

/// Counting transport with a fixed entity directory.
pub struct StubTransport {
    entities: HashMap<String, Entity>,
    expected_code: Option<String>,
    fail_forward: bool,
    fail_send: bool,
    fail_disconnect: bool,
    connected: AtomicBool,
    authorized: AtomicBool,
    hold_resolution: AtomicBool,
    resolution_started: Notify,
    resolution_released: Notify,
    calls: Mutex<Vec<Call>>,
    subscriptions: Mutex<Vec<(EventKind, Arc<dyn EventHandler>)>>,
    codes_seen: Mutex<Vec<String>>,
}

impl Default for StubTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl StubTransport {
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            expected_code: None,
            fail_forward: false,
            fail_send: false,
            fail_disconnect: false,
            connected: AtomicBool::new(false),
            authorized: AtomicBool::new(false),
            hold_resolution: AtomicBool::new(false),
            resolution_started: Notify::new(),
            resolution_released: Notify::new(),
            calls: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
            codes_seen: Mutex::new(Vec::new()),
        }
    }

    /// Make `handle` (and its numeric form) resolve to a channel.
    pub fn with_channel(mut self, handle: &str, id: i64) -> Self {
        let entity = Entity::Channel {
            id,
            title: format!("{handle} title"),
            username: Some(handle.to_string()),
        };
        self.entities.insert(id.to_string(), entity.clone());
        self.entities.insert(handle.to_string(), entity);
        self
    }

    pub fn with_user(mut self, handle: &str, id: i64) -> Self {
        self.entities.insert(handle.to_string(), Entity::User {
            id,
            username: Some(handle.to_string()),
        });
        self
    }

    /// Require a phone-login code; any other code is rejected.
    pub fn expecting_code(mut self, code: &str) -> Self {
        self.expected_code = Some(code.to_string());
        self
    }

    pub fn failing_forward(mut self) -> Self {
        self.fail_forward = true;
        self
    }

    pub fn failing_send(mut self) -> Self {
        self.fail_send = true;
        self
    }

    pub fn failing_disconnect(mut self) -> Self {
        self.fail_disconnect = true;
        self
    }

    /// Park every later `resolve_entity` until [`Self::release_resolution`].
    pub fn hold_resolution(&self) {
        self.hold_resolution.store(true, Ordering::SeqCst);
    }

    /// Wait until a held `resolve_entity` has started.
    pub async fn resolution_started(&self) {
        self.resolution_started.notified().await;
    }

    pub fn release_resolution(&self) {
        self.hold_resolution.store(false, Ordering::SeqCst);
        self.resolution_released.notify_one();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn subscriptions(&self) -> Vec<EventKind> {
        self.subscriptions
            .lock()
            .unwrap()
            .iter()
            .map(|(kind, _)| *kind)
            .collect()
    }

    pub fn codes_seen(&self) -> Vec<String> {
        self.codes_seen.lock().unwrap().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Deliver `event` to every handler subscribed to its kind.
    pub async fn emit(&self, event: InboundEvent) {
        let handlers: Vec<Arc<dyn EventHandler>> = self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .filter(|(kind, _)| *kind == event.kind())
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler.handle(event.clone()).await;
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn connect(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn authenticate(&self, _credentials: &Credentials, codes: &dyn CodeSource) -> Result<()> {
        if let Some(expected) = &self.expected_code {
            let code = codes.next_code().await;
            self.codes_seen.lock().unwrap().push(code.clone());
            if &code != expected {
                return Err(Error::invalid_input("the confirmation code is invalid"));
            }
        }
        self.authorized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn resolve_entity(&self, entity: &EntityRef) -> Result<Entity> {
        if self.hold_resolution.load(Ordering::SeqCst) {
            self.resolution_started.notify_one();
            self.resolution_released.notified().await;
        }
        let key = match entity {
            EntityRef::Username(name) => name.clone(),
            EntityRef::Channel(id) => id.to_string(),
        };
        self.entities
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::invalid_input(format!("cannot find any entity for {key}")))
    }

    async fn dialogs(&self) -> Result<Vec<Dialog>> {
        let mut dialogs: Vec<Dialog> = self
            .entities
            .iter()
            .filter(|(key, entity)| match entity {
                Entity::Channel { username, .. } => username.as_deref() == Some(key.as_str()),
                Entity::User { .. } | Entity::Group { .. } => true,
            })
            .map(|(key, entity)| Dialog {
                name: key.clone(),
                entity: entity.clone(),
            })
            .collect();
        dialogs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(dialogs)
    }

    async fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) -> Result<()> {
        self.subscriptions.lock().unwrap().push((kind, handler));
        Ok(())
    }

    async fn send_message(&self, to: PeerId, message: &RelayMessage) -> Result<()> {
        self.record(Call::Send {
            to,
            message_id: message.id,
        });
        if self.fail_send {
            return Err(Error::invalid_input("CHAT_WRITE_FORBIDDEN"));
        }
        Ok(())
    }

    async fn forward_message(&self, to: PeerId, message: &RelayMessage) -> Result<()> {
        self.record(Call::Forward {
            to,
            message_id: message.id,
        });
        if self.fail_forward {
            return Err(Error::invalid_input("CHAT_FORWARDS_RESTRICTED"));
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        self.authorized.store(false, Ordering::SeqCst);
        if self.fail_disconnect {
            return Err(Error::invalid_input("connection reset during disconnect"));
        }
        Ok(())
    }

    async fn is_authorized(&self) -> Result<bool> {
        Ok(self.authorized.load(Ordering::SeqCst))
    }
}

/// Hands out the same stub for every session and counts allocations.
pub struct StubFactory {
    transport: Arc<StubTransport>,
    created: AtomicUsize,
}

impl StubFactory {
    pub fn new(transport: Arc<StubTransport>) -> Self {
        Self {
            transport,
            created: AtomicUsize::new(0),
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl TransportFactory for StubFactory {
    fn create(&self) -> Result<Arc<dyn Transport>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.transport) as Arc<dyn Transport>)
    }
}

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use {
    async_trait::async_trait,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use {
    courier_channels::{
        ChannelInfo, ChannelMonitor, ChannelRegistry, Credentials, Entity, Error, EventHandler,
        EventKind, MemberChannel, Result, StartOutcome, Transport, TransportFactory,
        VerificationGate,
    },
    courier_config::{AuthMode, TelegramConfig},
};

use crate::{
    handlers::EventRouter,
    outbound::Forwarder,
    state::{AuthState, ClientSession, Lifecycle, Phase},
};

/// Lifecycle controller for one Telegram client session.
///
/// Owns the transport of the active session, the monitored-channel
/// registry and the verification gate. State moves
/// `Stopped → Authenticating → Running → Stopped`; `stop()` or a failed
/// start returns to `Stopped` from either active phase.
pub struct TelegramMonitor {
    config: TelegramConfig,
    factory: Arc<dyn TransportFactory>,
    registry: Arc<ChannelRegistry>,
    gate: Arc<VerificationGate>,
    // std Mutex: never held across `.await`.
    lifecycle: Mutex<Lifecycle>,
}

impl TelegramMonitor {
    pub fn new(config: TelegramConfig, factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            config,
            factory,
            registry: Arc::new(ChannelRegistry::new()),
            gate: Arc::new(VerificationGate::new()),
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    pub fn phase(&self) -> Phase {
        self.lifecycle().phase
    }

    /// Authentication state of the current session, if one exists.
    pub fn auth_state(&self) -> Option<AuthState> {
        self.lifecycle().session.as_ref().map(|s| s.auth)
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate a transport and enter `Authenticating`, unless a session
    /// is already active.
    fn begin_session(&self) -> Result<Option<(u64, Arc<dyn Transport>, CancellationToken)>> {
        let mut lifecycle = self.lifecycle();
        if lifecycle.phase != Phase::Stopped {
            debug!(phase = ?lifecycle.phase, "telegram client already active, start ignored");
            return Ok(None);
        }
        let transport = self.factory.create()?;
        let session = lifecycle.begin(transport);
        Ok(Some((
            session.id,
            Arc::clone(&session.transport),
            session.cancel.clone(),
        )))
    }

    fn set_auth_state(&self, session_id: u64, auth: AuthState) {
        if let Some(session) = self.lifecycle().current_mut(session_id) {
            session.auth = auth;
        }
    }

    fn is_current_and_running(&self, session_id: u64) -> bool {
        let mut lifecycle = self.lifecycle();
        lifecycle.phase == Phase::Running && lifecycle.current_mut(session_id).is_some()
    }

    fn running_transport(&self) -> Result<Arc<dyn Transport>> {
        self.lifecycle()
            .running_transport()
            .ok_or(Error::NotRunning)
    }

    fn running_session(&self) -> Result<(u64, Arc<dyn Transport>)> {
        let lifecycle = self.lifecycle();
        match (&lifecycle.phase, &lifecycle.session) {
            (Phase::Running, Some(session)) => Ok((session.id, Arc::clone(&session.transport))),
            _ => Err(Error::NotRunning),
        }
    }

    /// Insert a resolved channel, unless session `session_id` has been
    /// stopped while it was resolving. The lifecycle lock is held across
    /// the insert so a concurrent `stop()` clears it afterwards.
    fn register_if_current(&self, session_id: u64, info: &ChannelInfo) -> bool {
        let mut lifecycle = self.lifecycle();
        if lifecycle.phase != Phase::Running || lifecycle.current_mut(session_id).is_none() {
            return false;
        }
        self.registry.insert(info.channel_id, info.handle.as_str());
        info!(channel_id = info.channel_id, handle = %info.handle, "added channel");
        true
    }

    async fn login(&self, session_id: u64, transport: &dyn Transport) -> Result<()> {
        transport.connect().await?;

        let credentials = Credentials::from(&self.config);
        if credentials.mode == AuthMode::Phone {
            self.set_auth_state(session_id, AuthState::AwaitingCode);
        }

        transport
            .authenticate(&credentials, self.gate.as_ref())
            .await
            .map_err(|e| match e {
                Error::AuthenticationFailed { .. } | Error::Unsupported { .. } | Error::Cancelled => {
                    e
                },
                other => Error::authentication_failed(other),
            })
    }

    /// Add every configured channel; the first failure aborts. Channels
    /// added before the failure stay registered.
    async fn seed_channels(&self, session_id: u64, transport: &dyn Transport) -> Result<()> {
        for handle in self.config.channel_handles() {
            let info = ChannelRegistry::resolve(transport, &handle)
                .await
                .map_err(|e| Error::channel_seed_failed(handle.as_str(), e))?;
            if !self.register_if_current(session_id, &info) {
                return Err(Error::Cancelled);
            }
        }
        Ok(())
    }

    async fn install_subscriptions(
        &self,
        session_id: u64,
        transport: &Arc<dyn Transport>,
    ) -> Result<()> {
        if !self.is_current_and_running(session_id) {
            return Err(Error::Cancelled);
        }

        let router: Arc<dyn EventHandler> = Arc::new(EventRouter::new(
            Arc::clone(&self.registry),
            Forwarder::new(Arc::clone(transport), self.config.target_channel_id),
        ));
        for kind in EventKind::ALL {
            transport.subscribe(kind, Arc::clone(&router)).await?;
            debug!(session_id, event_kind = %kind, "subscribed to events");
        }
        Ok(())
    }

    /// Tear down session `session_id` after a failed start. Does nothing if
    /// `stop()` already took it.
    async fn abandon(&self, session_id: u64) {
        let session = self.lifecycle().end(session_id);
        let Some(ClientSession {
            transport, cancel, ..
        }) = session
        else {
            return;
        };
        cancel.cancel();
        if let Err(e) = transport.disconnect().await {
            warn!(session_id, error = %e, "error disconnecting abandoned session");
        }
    }
}

#[async_trait]
impl ChannelMonitor for TelegramMonitor {
    async fn start(&self) -> Result<StartOutcome> {
        let Some((session_id, transport, cancel)) = self.begin_session()? else {
            return Ok(StartOutcome::AlreadyRunning);
        };
        info!(session_id, auth_mode = ?self.config.auth_mode, "starting telegram client");

        let login = tokio::select! {
            () = cancel.cancelled() => Err(Error::Cancelled),
            result = self.login(session_id, transport.as_ref()) => result,
        };
        if let Err(e) = login {
            warn!(session_id, error = %e, "telegram client failed to authenticate");
            self.abandon(session_id).await;
            return Err(e);
        }

        let promoted = self.lifecycle().promote(session_id);
        if !promoted {
            return Err(Error::Cancelled);
        }
        info!(
            session_id,
            channels = %self.config.channels,
            "telegram client started successfully, adding channels"
        );

        if let Err(e) = self.seed_channels(session_id, transport.as_ref()).await {
            error!(session_id, error = %e, "failed to seed channels, aborting startup");
            self.abandon(session_id).await;
            return Err(e);
        }

        if let Err(e) = self.install_subscriptions(session_id, &transport).await {
            warn!(session_id, error = %e, "failed to install event subscriptions");
            self.abandon(session_id).await;
            return Err(e);
        }

        info!(
            session_id,
            channels = self.registry.len(),
            target_channel_id = self.config.target_channel_id,
            "monitoring started"
        );
        Ok(StartOutcome::Started)
    }

    async fn stop(&self) -> Result<()> {
        let session = {
            let mut lifecycle = self.lifecycle();
            if lifecycle.phase == Phase::Stopped {
                return Err(Error::NotRunning);
            }
            lifecycle.end_any()
        };
        self.registry.clear();

        let Some(session) = session else {
            return Ok(());
        };
        session.cancel.cancel();
        match session.transport.disconnect().await {
            Ok(()) => {
                info!(session_id = session.id, "telegram client stopped successfully");
                Ok(())
            },
            Err(e) => {
                error!(session_id = session.id, error = %e, "error stopping telegram client");
                Err(Error::disconnect(e))
            },
        }
    }

    async fn is_running(&self) -> Result<bool> {
        let transport = self
            .lifecycle()
            .session
            .as_ref()
            .map(|s| Arc::clone(&s.transport))
            .ok_or(Error::NotRunning)?;
        transport.is_authorized().await.inspect_err(|e| {
            error!(error = %e, "error checking if telegram client is running");
        })
    }

    async fn provide_verification_code(&self, code: &str) -> Result<()> {
        let code = code.trim();
        if code.is_empty() {
            return Err(Error::invalid_input("verification code must not be empty"));
        }
        let phase = self.phase();
        if phase != Phase::Authenticating {
            warn!(?phase, "verification code provided outside of login, buffering it");
        }
        self.gate.submit_code(code);
        Ok(())
    }

    async fn add_channel(&self, handle: &str) -> Result<ChannelInfo> {
        let handle = handle.trim();
        if handle.is_empty() {
            return Err(Error::invalid_input("channel handle must not be empty"));
        }
        let (session_id, transport) = self.running_session()?;
        let info = ChannelRegistry::resolve(transport.as_ref(), handle)
            .await
            .inspect_err(|e| error!(handle, error = %e, "error adding channel"))?;
        if !self.register_if_current(session_id, &info) {
            warn!(handle, "session stopped while resolving channel, not adding it");
            return Err(Error::Cancelled);
        }
        Ok(info)
    }

    async fn remove_channel(&self, handle: &str) -> Result<ChannelInfo> {
        self.registry.remove(handle.trim())
    }

    fn list_channels(&self) -> BTreeMap<i64, String> {
        self.registry.list()
    }

    async fn list_all_member_channels(&self) -> Result<Vec<MemberChannel>> {
        let transport = self.running_transport()?;
        let dialogs = transport.dialogs().await?;
        Ok(dialogs
            .into_iter()
            .filter_map(|dialog| match dialog.entity {
                Entity::Channel { id, username, .. } => Some(MemberChannel {
                    id,
                    name: dialog.name,
                    username,
                }),
                Entity::Group { .. } | Entity::User { .. } => None,
            })
            .collect())
    }
}

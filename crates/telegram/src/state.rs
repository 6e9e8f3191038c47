use std::sync::Arc;

use {courier_channels::Transport, serde::Serialize, tokio_util::sync::CancellationToken};

/// Lifecycle phase of the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Stopped,
    Authenticating,
    Running,
}

/// Authentication progress of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    Unauthenticated,
    AwaitingCode,
    Authenticated,
}

/// One authenticated connection instance, owned by the monitor.
pub struct ClientSession {
    pub id: u64,
    pub transport: Arc<dyn Transport>,
    pub auth: AuthState,
    /// Cancelled on stop; aborts a login still waiting for its code.
    pub cancel: CancellationToken,
}

/// Phase and session, guarded together so every check-and-transition is
/// a single critical section.
pub struct Lifecycle {
    pub phase: Phase,
    pub session: Option<ClientSession>,
    next_id: u64,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            phase: Phase::Stopped,
            session: None,
            next_id: 1,
        }
    }
}

impl Lifecycle {
    /// Install a fresh session and enter `Authenticating`.
    pub fn begin(&mut self, transport: Arc<dyn Transport>) -> &ClientSession {
        let id = self.next_id;
        self.next_id += 1;
        self.phase = Phase::Authenticating;
        self.session.insert(ClientSession {
            id,
            transport,
            auth: AuthState::Unauthenticated,
            cancel: CancellationToken::new(),
        })
    }

    /// The current session, if it is still the one identified by `id`.
    pub fn current_mut(&mut self, id: u64) -> Option<&mut ClientSession> {
        self.session.as_mut().filter(|s| s.id == id)
    }

    /// Move session `id` from `Authenticating` to `Running`.
    ///
    /// Returns `false` if the session was stopped in the meantime.
    pub fn promote(&mut self, id: u64) -> bool {
        if self.phase != Phase::Authenticating {
            return false;
        }
        let Some(session) = self.current_mut(id) else {
            return false;
        };
        session.auth = AuthState::Authenticated;
        self.phase = Phase::Running;
        true
    }

    /// Drop session `id` and return to `Stopped`. No-op if another
    /// session has replaced it.
    pub fn end(&mut self, id: u64) -> Option<ClientSession> {
        self.current_mut(id)?;
        self.phase = Phase::Stopped;
        self.session.take()
    }

    /// Drop whatever session is active.
    pub fn end_any(&mut self) -> Option<ClientSession> {
        self.phase = Phase::Stopped;
        self.session.take()
    }

    /// The transport of the running session, if any.
    pub fn running_transport(&self) -> Option<Arc<dyn Transport>> {
        if self.phase != Phase::Running {
            return None;
        }
        self.session.as_ref().map(|s| Arc::clone(&s.transport))
    }
}

//! Single-slot rendezvous for the interactive login code.
//!
//! The transport's login routine blocks on [`VerificationGate::await_code`]
//! while the code arrives later through a separate control-plane call to
//! [`VerificationGate::submit_code`]. The gate is reused across attempts.

use std::sync::{Mutex, PoisonError};

use {async_trait::async_trait, tokio::sync::Notify, tracing::info};

use crate::transport::CodeSource;

/// Pending verification code plus its "code available" signal.
#[derive(Default)]
pub struct VerificationGate {
    // std Mutex: only touched in short synchronous sections.
    code: Mutex<Option<String>>,
    signal: Notify,
}

impl VerificationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until a code has been submitted, then take it.
    ///
    /// Returns immediately if a code is already buffered. There is no
    /// timeout; callers that need one must race this future themselves.
    pub async fn await_code(&self) -> String {
        loop {
            if let Some(code) = self.take() {
                return code;
            }
            // A permit left over from an earlier submit only causes one
            // extra pass through the loop.
            self.signal.notified().await;
        }
    }

    /// Store `code`, replacing any unconsumed one, and wake one waiter.
    pub fn submit_code(&self, code: impl Into<String>) {
        let replaced = self
            .code
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(code.into())
            .is_some();
        self.signal.notify_one();
        info!(replaced, "verification code provided");
    }

    /// Whether a submitted code is waiting to be consumed.
    pub fn has_pending(&self) -> bool {
        self.code
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn take(&self) -> Option<String> {
        self.code
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[async_trait]
impl CodeSource for VerificationGate {
    async fn next_code(&self) -> String {
        info!("waiting for verification code to be provided");
        self.await_code().await
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use {super::*, tokio::time::timeout};

    const SHORT: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn buffered_code_returns_immediately() {
        let gate = VerificationGate::new();
        gate.submit_code("123456");
        assert!(gate.has_pending());

        let code = timeout(SHORT, gate.await_code()).await.unwrap();
        assert_eq!(code, "123456");
        assert!(!gate.has_pending());
    }

    #[tokio::test]
    async fn second_await_suspends_until_next_submit() {
        let gate = Arc::new(VerificationGate::new());
        gate.submit_code("123456");
        assert_eq!(gate.await_code().await, "123456");

        assert!(timeout(SHORT, gate.await_code()).await.is_err());

        let waiter = tokio::spawn({
            let gate = Arc::clone(&gate);
            async move { gate.await_code().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        gate.submit_code("654321");
        assert_eq!(waiter.await.unwrap(), "654321");
    }

    #[tokio::test]
    async fn last_submitted_code_wins() {
        let gate = VerificationGate::new();
        gate.submit_code("111111");
        gate.submit_code("222222");

        assert_eq!(gate.await_code().await, "222222");
        assert!(timeout(SHORT, gate.await_code()).await.is_err());
    }

    #[tokio::test]
    async fn wakes_a_blocked_waiter() {
        let gate = Arc::new(VerificationGate::new());
        let waiter = tokio::spawn({
            let gate = Arc::clone(&gate);
            async move { gate.next_code().await }
        });

        tokio::task::yield_now().await;
        gate.submit_code("424242");

        let code = timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(code, "424242");
    }
}

use std::sync::Arc;

use {
    async_trait::async_trait,
    tracing::{debug, info},
};

use courier_channels::{ChannelRegistry, EventHandler, InboundEvent, PeerId};

use crate::outbound::{DeliveryReport, Forwarder};

/// How the router disposed of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The event did not name its chat.
    NoChat,
    /// The chat is not a monitored channel.
    Unmonitored,
    /// Deletion in a monitored channel; nothing to relay.
    DeletionIgnored,
    Relayed(DeliveryReport),
}

/// Filters inbound events against the registry and hands matches to the
/// forwarder.
///
/// Shared by the new/edited/deleted subscriptions of one session. The
/// only state touched per event is a registry read.
pub struct EventRouter {
    registry: Arc<ChannelRegistry>,
    forwarder: Forwarder,
}

impl EventRouter {
    pub fn new(registry: Arc<ChannelRegistry>, forwarder: Forwarder) -> Self {
        Self {
            registry,
            forwarder,
        }
    }

    pub async fn route(&self, event: &InboundEvent) -> RouteOutcome {
        let kind = event.kind();
        let Some(marked) = event.chat_id() else {
            debug!(event_kind = %kind, "event without chat id, skipping");
            return RouteOutcome::NoChat;
        };

        let peer = PeerId::resolve(marked);
        let title = event
            .message()
            .and_then(|m| m.chat_title.as_deref())
            .unwrap_or("?");
        debug!(
            event_kind = %kind,
            chat = title,
            real_id = peer.id,
            peer_kind = ?peer.kind,
            "received event"
        );

        if !peer.is_channel() || !self.registry.contains(peer.id) {
            debug!(event_kind = %kind, chat = title, real_id = peer.id, "unmonitored channel");
            return RouteOutcome::Unmonitored;
        }

        match event {
            InboundEvent::NewMessage(message) | InboundEvent::MessageEdited(message) => {
                info!(
                    event_kind = %kind,
                    channel_id = peer.id,
                    message_id = message.id,
                    text = %message.preview(50),
                    "relaying message"
                );
                RouteOutcome::Relayed(self.forwarder.relay(message).await)
            },
            InboundEvent::MessageDeleted { message_ids, .. } => {
                info!(
                    channel_id = peer.id,
                    ?message_ids,
                    "message deleted in monitored channel, nothing to relay"
                );
                RouteOutcome::DeletionIgnored
            },
        }
    }
}

#[async_trait]
impl EventHandler for EventRouter {
    async fn handle(&self, event: InboundEvent) {
        let outcome = self.route(&event).await;
        debug!(event_kind = %event.kind(), ?outcome, "event processed");
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::testing::{Call, StubTransport, channel_post},
        courier_channels::{RelayMessage, Transport},
    };

    const SOURCE: i64 = 100;
    const TARGET: i64 = 900;

    fn router(transport: &Arc<StubTransport>) -> (EventRouter, Arc<ChannelRegistry>) {
        let registry = Arc::new(ChannelRegistry::new());
        registry.insert(SOURCE, "news");
        let forwarder = Forwarder::new(Arc::clone(transport) as Arc<dyn Transport>, TARGET);
        (EventRouter::new(Arc::clone(&registry), forwarder), registry)
    }

    #[tokio::test]
    async fn unmonitored_channel_produces_no_calls() {
        let transport = Arc::new(StubTransport::new());
        let (router, _) = router(&transport);

        let outcome = router
            .route(&InboundEvent::NewMessage(channel_post(555, 1, "x")))
            .await;

        assert_eq!(outcome, RouteOutcome::Unmonitored);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn monitored_message_is_forwarded_then_sent() {
        let transport = Arc::new(StubTransport::new());
        let (router, _) = router(&transport);

        router
            .handle(InboundEvent::NewMessage(channel_post(SOURCE, 7, "hello")))
            .await;

        assert_eq!(transport.calls(), vec![
            Call::Forward {
                to: PeerId::channel(TARGET),
                message_id: 7
            },
            Call::Send {
                to: PeerId::channel(TARGET),
                message_id: 7
            },
        ]);
    }

    #[tokio::test]
    async fn edited_message_is_relayed() {
        let transport = Arc::new(StubTransport::new());
        let (router, _) = router(&transport);

        let outcome = router
            .route(&InboundEvent::MessageEdited(channel_post(SOURCE, 8, "v2")))
            .await;

        assert!(matches!(outcome, RouteOutcome::Relayed(_)));
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn deletion_in_monitored_channel_is_filtered() {
        let transport = Arc::new(StubTransport::new());
        let (router, _) = router(&transport);

        let outcome = router
            .route(&InboundEvent::MessageDeleted {
                chat_id: Some(PeerId::channel(SOURCE).marked()),
                message_ids: vec![3, 4],
            })
            .await;

        assert_eq!(outcome, RouteOutcome::DeletionIgnored);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn deletion_without_chat_is_skipped() {
        let transport = Arc::new(StubTransport::new());
        let (router, _) = router(&transport);

        let outcome = router
            .route(&InboundEvent::MessageDeleted {
                chat_id: None,
                message_ids: vec![3],
            })
            .await;

        assert_eq!(outcome, RouteOutcome::NoChat);
    }

    #[tokio::test]
    async fn user_peer_with_same_bare_id_is_not_monitored() {
        let transport = Arc::new(StubTransport::new());
        let (router, _) = router(&transport);
        let message = RelayMessage {
            id: 1,
            chat_id: SOURCE,
            chat_title: None,
            text: Some("dm".into()),
        };

        let outcome = router.route(&InboundEvent::NewMessage(message)).await;

        assert_eq!(outcome, RouteOutcome::Unmonitored);
    }

    #[tokio::test]
    async fn failed_forward_does_not_affect_next_event() {
        let transport = Arc::new(StubTransport::new().failing_forward());
        let (router, _) = router(&transport);

        router
            .handle(InboundEvent::NewMessage(channel_post(SOURCE, 1, "a")))
            .await;
        router
            .handle(InboundEvent::NewMessage(channel_post(SOURCE, 2, "b")))
            .await;

        let ids: Vec<i32> = transport.calls().iter().map(Call::message_id).collect();
        assert_eq!(ids, vec![1, 1, 2, 2]);
    }

    #[tokio::test]
    async fn removal_takes_effect_for_later_events() {
        let transport = Arc::new(StubTransport::new());
        let (router, registry) = router(&transport);

        registry.remove("news").unwrap();
        let outcome = router
            .route(&InboundEvent::NewMessage(channel_post(SOURCE, 1, "x")))
            .await;

        assert_eq!(outcome, RouteOutcome::Unmonitored);
        assert!(transport.calls().is_empty());
    }
}

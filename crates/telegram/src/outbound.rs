use std::sync::Arc;

use tracing::{debug, warn};

use courier_channels::{PeerId, RelayMessage, Transport};

/// What happened to one relayed message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub forwarded: bool,
    pub sent: bool,
}

/// Delivers matched messages to the single target channel.
///
/// Each message goes out twice: once forwarded (original attribution kept)
/// and once re-sent as a new message from this account. The two attempts
/// fail independently, are never retried, and never raise.
pub struct Forwarder {
    transport: Arc<dyn Transport>,
    target: PeerId,
}

impl Forwarder {
    /// `target_channel_id` is the bare id of the destination channel.
    pub fn new(transport: Arc<dyn Transport>, target_channel_id: i64) -> Self {
        Self {
            transport,
            target: PeerId::channel(target_channel_id),
        }
    }

    /// Forward, then send. Failures are logged and reported, not returned.
    pub async fn relay(&self, message: &RelayMessage) -> DeliveryReport {
        let forwarded = match self.transport.forward_message(self.target, message).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    target_peer = %self.target,
                    message_id = message.id,
                    error = %e,
                    "error forwarding message"
                );
                false
            },
        };

        let sent = match self.transport.send_message(self.target, message).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    target_peer = %self.target,
                    message_id = message.id,
                    error = %e,
                    "error sending message"
                );
                false
            },
        };

        debug!(
            target_peer = %self.target,
            message_id = message.id,
            forwarded,
            sent,
            "relayed message"
        );
        DeliveryReport { forwarded, sent }
    }
}

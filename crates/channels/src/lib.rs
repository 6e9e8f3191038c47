//! Platform-agnostic core of the channel relay.
//!
//! Defines the transport capability a messaging platform has to provide,
//! the monitored-channel registry, the verification-code rendezvous used
//! during interactive login, and the control-plane trait the gateway
//! talks to.

pub mod error;
pub mod event;
pub mod peer;
pub mod plugin;
pub mod registry;
pub mod transport;
pub mod verification;

pub use {
    error::{Error, ErrorKind, Result},
    event::{EventKind, InboundEvent, RelayMessage},
    peer::{MAX_CHANNEL_ID, PeerId, PeerKind},
    plugin::{ChannelMonitor, MemberChannel, StartOutcome},
    registry::{ChannelInfo, ChannelRegistry},
    transport::{
        CodeSource, Credentials, Dialog, Entity, EntityRef, EventHandler, Transport,
        TransportFactory,
    },
    verification::VerificationGate,
};

//! Telegram side of the channel relay.
//!
//! [`TelegramMonitor`] drives one client session through login, channel
//! seeding and event subscription, and relays posts from monitored
//! channels to the target channel. [`BotTransport`] talks to the Bot API
//! via teloxide.

pub mod bot;
pub mod error;
pub mod handlers;
pub mod monitor;
pub mod outbound;
pub mod state;

#[cfg(test)]
mod testing;

pub use {
    bot::{BotTransport, BotTransportFactory},
    error::{Error, Result},
    handlers::{EventRouter, RouteOutcome},
    monitor::TelegramMonitor,
    outbound::{DeliveryReport, Forwarder},
    state::{AuthState, Phase},
};

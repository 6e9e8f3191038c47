use std::{
    collections::HashMap,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, Chat, ChatId, Message, MessageId, Recipient, UpdateKind},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use {
    courier_channels::{
        CodeSource, Credentials, Dialog, Entity, EntityRef, Error as ChannelError, EventHandler,
        EventKind, InboundEvent, PeerId, RelayMessage, Result, Transport, TransportFactory,
    },
    courier_config::{AuthMode, TelegramConfig},
};

use crate::error::Error;

/// Client timeout, longer than the long-polling timeout so the HTTP client
/// doesn't abort `getUpdates` before Telegram answers.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(45);
const POLL_TIMEOUT_SECS: u32 = 30;
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

type HandlerMap = Arc<RwLock<HashMap<EventKind, Vec<Arc<dyn EventHandler>>>>>;

/// [`Transport`] over the Telegram Bot API.
///
/// The bot must be an administrator of every monitored channel to receive
/// its posts. The Bot API has no deletion updates and no dialog listing,
/// so `MessageDeleted` subscriptions never fire and [`Transport::dialogs`]
/// is unsupported.
pub struct BotTransport {
    token: Secret<String>,
    bot: RwLock<Option<Bot>>,
    handlers: HandlerMap,
    polling: AtomicBool,
    cancel: CancellationToken,
}

impl BotTransport {
    pub fn new(token: Secret<String>) -> Self {
        Self {
            token,
            bot: RwLock::new(None),
            handlers: Arc::new(RwLock::new(HashMap::new())),
            polling: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    fn bot(&self) -> Result<Bot> {
        self.bot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(ChannelError::NotRunning)
    }

    fn spawn_polling(&self, bot: Bot) {
        let handlers = Arc::clone(&self.handlers);
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            info!("starting telegram polling loop");
            tokio::select! {
                () = cancel.cancelled() => info!("telegram polling stopped"),
                () = poll_updates(bot, handlers, cancel.clone()) => {},
            }
        });
    }
}

async fn poll_updates(bot: Bot, handlers: HandlerMap, cancel: CancellationToken) {
    let mut offset: i32 = 0;
    loop {
        let result = bot
            .get_updates()
            .offset(offset)
            .timeout(POLL_TIMEOUT_SECS)
            .allowed_updates(vec![
                AllowedUpdate::ChannelPost,
                AllowedUpdate::EditedChannelPost,
            ])
            .await;

        match result {
            Ok(updates) => {
                debug!(count = updates.len(), "got telegram updates");
                for update in updates {
                    offset = update.id.as_offset();
                    let Some(event) = inbound_event(update.kind) else {
                        continue;
                    };
                    dispatch(&handlers, event).await;
                }
            },
            Err(e) => {
                if matches!(&e, RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) {
                    warn!(
                        "telegram polling disabled: another instance is already running with this token"
                    );
                    cancel.cancel();
                    return;
                }
                warn!(error = %e, "telegram getUpdates failed");
                tokio::time::sleep(POLL_RETRY_DELAY).await;
            },
        }
    }
}

async fn dispatch(handlers: &HandlerMap, event: InboundEvent) {
    let subscribed: Vec<Arc<dyn EventHandler>> = handlers
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&event.kind())
        .cloned()
        .unwrap_or_default();
    for handler in subscribed {
        handler.handle(event.clone()).await;
    }
}

fn inbound_event(kind: UpdateKind) -> Option<InboundEvent> {
    match kind {
        UpdateKind::ChannelPost(msg) => Some(InboundEvent::NewMessage(relay_message(&msg))),
        UpdateKind::EditedChannelPost(msg) => {
            Some(InboundEvent::MessageEdited(relay_message(&msg)))
        },
        other => {
            debug!("ignoring non-channel update: {other:?}");
            None
        },
    }
}

fn relay_message(msg: &Message) -> RelayMessage {
    RelayMessage {
        id: msg.id.0,
        chat_id: msg.chat.id.0,
        chat_title: msg.chat.title().map(String::from),
        text: msg.text().or_else(|| msg.caption()).map(String::from),
    }
}

fn recipient(entity: &EntityRef) -> Recipient {
    match entity {
        EntityRef::Username(name) => {
            Recipient::ChannelUsername(format!("@{}", name.trim_start_matches('@')))
        },
        EntityRef::Channel(id) => Recipient::Id(ChatId(PeerId::channel(*id).marked())),
    }
}

fn chat_id(peer: PeerId) -> ChatId {
    ChatId(peer.marked())
}

fn entity_from_chat(chat: &Chat) -> Entity {
    let id = PeerId::resolve(chat.id.0).id;
    if chat.is_channel() {
        Entity::Channel {
            id,
            title: chat.title().unwrap_or_default().to_string(),
            username: chat.username().map(String::from),
        }
    } else if chat.is_private() {
        Entity::User {
            id,
            username: chat.username().map(String::from),
        }
    } else {
        Entity::Group {
            id,
            title: chat.title().unwrap_or_default().to_string(),
        }
    }
}

#[async_trait]
impl Transport for BotTransport {
    async fn connect(&self) -> Result<()> {
        let client = teloxide::net::default_reqwest_settings()
            .timeout(CLIENT_TIMEOUT)
            .build()
            .map_err(|e| ChannelError::external("telegram http client", e))?;
        let bot = Bot::with_client(self.token.expose_secret(), client);

        // Long polling only works without a webhook.
        bot.delete_webhook().send().await.map_err(Error::from)?;

        *self.bot.write().unwrap_or_else(PoisonError::into_inner) = Some(bot);
        debug!("telegram bot client connected (webhook cleared)");
        Ok(())
    }

    async fn authenticate(&self, credentials: &Credentials, _codes: &dyn CodeSource) -> Result<()> {
        if credentials.mode == AuthMode::Phone {
            return Err(ChannelError::unsupported(
                "phone login needs a user client; set telegram.auth_mode = \"bot\"",
            ));
        }
        let me = self
            .bot()?
            .get_me()
            .await
            .map_err(ChannelError::authentication_failed)?;
        info!(username = ?me.username, "telegram bot authenticated");
        Ok(())
    }

    async fn resolve_entity(&self, entity: &EntityRef) -> Result<Entity> {
        let chat = self
            .bot()?
            .get_chat(recipient(entity))
            .await
            .map_err(Error::from)?;
        Ok(entity_from_chat(&chat))
    }

    async fn dialogs(&self) -> Result<Vec<Dialog>> {
        Err(ChannelError::unsupported(
            "the bot API cannot list the chats a bot is a member of",
        ))
    }

    async fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) -> Result<()> {
        let bot = self.bot()?;
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push(handler);
        if kind == EventKind::MessageDeleted {
            debug!("bot api has no deletion updates, subscription will stay idle");
        }
        if !self.polling.swap(true, Ordering::SeqCst) {
            self.spawn_polling(bot);
        }
        Ok(())
    }

    async fn send_message(&self, to: PeerId, message: &RelayMessage) -> Result<()> {
        self.bot()?
            .copy_message(chat_id(to), ChatId(message.chat_id), MessageId(message.id))
            .await
            .map_err(Error::from)?;
        Ok(())
    }

    async fn forward_message(&self, to: PeerId, message: &RelayMessage) -> Result<()> {
        self.bot()?
            .forward_message(chat_id(to), ChatId(message.chat_id), MessageId(message.id))
            .await
            .map_err(Error::from)?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.cancel.cancel();
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.bot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }

    async fn is_authorized(&self) -> Result<bool> {
        let Ok(bot) = self.bot() else {
            return Ok(false);
        };
        match bot.get_me().await {
            Ok(_) => Ok(true),
            Err(RequestError::Api(ApiError::InvalidToken)) => Ok(false),
            Err(e) => {
                error!(error = %e, "telegram getMe failed");
                Err(Error::from(e).into())
            },
        }
    }
}

/// Builds one [`BotTransport`] per session from the configured token.
pub struct BotTransportFactory {
    token: Secret<String>,
}

impl BotTransportFactory {
    /// Fails for configs this transport can never log in with: phone mode,
    /// or bot mode without a token.
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        if config.auth_mode == AuthMode::Phone {
            return Err(ChannelError::unsupported(
                "the bot api transport cannot log in by phone, set telegram.auth_mode = \"bot\"",
            ));
        }
        if config.bot_token.expose_secret().is_empty() {
            return Err(ChannelError::invalid_input("telegram.bot_token is not set"));
        }
        Ok(Self {
            token: config.bot_token.clone(),
        })
    }
}

impl TransportFactory for BotTransportFactory {
    fn create(&self) -> Result<Arc<dyn Transport>> {
        Ok(Arc::new(BotTransport::new(self.token.clone())))
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        courier_channels::{ErrorKind, VerificationGate},
        rstest::rstest,
    };

    fn transport() -> BotTransport {
        BotTransport::new(Secret::new("123:abc".into()))
    }

    #[rstest]
    #[case(EntityRef::Username("news".into()), "@news")]
    #[case(EntityRef::Username("@news".into()), "@news")]
    fn usernames_become_channel_recipients(#[case] entity: EntityRef, #[case] expected: &str) {
        assert_eq!(
            recipient(&entity),
            Recipient::ChannelUsername(expected.into())
        );
    }

    #[test]
    fn unmarkable_numbers_resolve_as_usernames() {
        assert_eq!(
            recipient(&EntityRef::parse("9223372036854775807")),
            Recipient::ChannelUsername("@9223372036854775807".into())
        );
    }

    #[test]
    fn numeric_handles_become_marked_chat_ids() {
        assert_eq!(
            recipient(&EntityRef::Channel(1_234_567_890)),
            Recipient::Id(ChatId(-1_001_234_567_890))
        );
    }

    #[tokio::test]
    async fn phone_login_is_unsupported() {
        let credentials = Credentials::from(&TelegramConfig::default());
        let err = transport()
            .authenticate(&credentials, &VerificationGate::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[tokio::test]
    async fn dialogs_are_unsupported() {
        let err = transport().dialogs().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[tokio::test]
    async fn requests_before_connect_are_not_running() {
        let transport = transport();
        let err = transport
            .resolve_entity(&EntityRef::Username("news".into()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotRunning);
        assert!(!transport.is_authorized().await.unwrap());
    }

    #[tokio::test]
    async fn disconnect_without_connect_is_ok() {
        transport().disconnect().await.unwrap();
    }

    #[test]
    fn factory_rejects_phone_mode() {
        let config = TelegramConfig {
            phone: "+15550100".into(),
            bot_token: Secret::new("123:abc".into()),
            ..Default::default()
        };
        let err = BotTransportFactory::new(&config).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn factory_requires_token() {
        let config = TelegramConfig {
            auth_mode: AuthMode::Bot,
            ..Default::default()
        };
        let err = BotTransportFactory::new(&config).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let config = TelegramConfig {
            auth_mode: AuthMode::Bot,
            bot_token: Secret::new("123:abc".into()),
            ..Default::default()
        };
        assert!(BotTransportFactory::new(&config).unwrap().create().is_ok());
    }
}

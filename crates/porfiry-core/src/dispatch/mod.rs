//! Per-event routing: binding flows, message logging and cooldown-gated
//! completion replies.

mod binding;
mod command;
mod cooldown;
mod trigger;


pub use command::{command_argument, is_command};
pub use cooldown::{CooldownDecision, CooldownTracker};

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::events::IncomingEvent;
use crate::gateway::CompletionGateway;
use crate::messenger::{Messenger, OutgoingMessage};
use crate::persona::Persona;
use crate::storage::{ChatRegistry, MessageLog};
use crate::types::{AllowList, ChatId, UserId};
use std::sync::Arc;

pub const NAX_COMMAND: &str = "/nax";
pub const SEARCH_COMMAND: &str = "/search";
pub const BIND_COMMAND: &str = "/bind";
pub const START_COMMAND: &str = "/start";
pub const BIND_CALLBACK: &str = "bind_chat";

/// Who the bot is on the platform, as reported at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub user_id: UserId,
    pub username: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub bot: BotIdentity,
    pub allow_list: AllowList,
    pub cooldown_secs: u64,
    /// Logged messages prepended to a prompt as context.
    pub context_messages: usize,
    /// Replies are cut to this many characters.
    pub reply_max_chars: usize,
}

impl DispatcherConfig {
    pub fn new(bot: BotIdentity) -> Self {
        Self {
            bot,
            allow_list: AllowList::default(),
            cooldown_secs: 20,
            context_messages: 10,
            reply_max_chars: 4000,
        }
    }

    pub fn with_allow_list(mut self, allow_list: AllowList) -> Self {
        self.allow_list = allow_list;
        self
    }

    pub fn with_cooldown_secs(mut self, secs: u64) -> Self {
        self.cooldown_secs = secs;
        self
    }
}

/// What handling one event amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not for us: unknown chat, filtered chat, or an event we do not handle.
    Ignored,
    /// Stored in the message log, nothing else.
    Logged,
    /// Answered with a fixed text (instructions, refusals, usage hints).
    Informed,
    Bound { chat_id: ChatId },
    CooledDown { remaining_secs: u64 },
    Answered,
    GatewayFailed,
}

/// Routes [`IncomingEvent`]s. One instance serves every chat; all mutable
/// state (the cooldown map) is owned here.
pub struct Dispatcher {
    registry: Arc<dyn ChatRegistry>,
    log: Arc<dyn MessageLog>,
    gateway: Arc<dyn CompletionGateway>,
    messenger: Arc<dyn Messenger>,
    persona: Persona,
    cooldown: CooldownTracker,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<dyn ChatRegistry>,
        log: Arc<dyn MessageLog>,
        gateway: Arc<dyn CompletionGateway>,
        messenger: Arc<dyn Messenger>,
        persona: Persona,
        config: DispatcherConfig,
    ) -> Self {
        Self::with_clock(
            registry,
            log,
            gateway,
            messenger,
            persona,
            config,
            Arc::new(SystemClock),
        )
    }

    pub fn with_clock(
        registry: Arc<dyn ChatRegistry>,
        log: Arc<dyn MessageLog>,
        gateway: Arc<dyn CompletionGateway>,
        messenger: Arc<dyn Messenger>,
        persona: Persona,
        config: DispatcherConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cooldown = CooldownTracker::new(config.cooldown_secs, clock);
        Self {
            registry,
            log,
            gateway,
            messenger,
            persona,
            cooldown,
            config,
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Handle one event. Remote failures are turned into chat replies; only
    /// local registry/log I/O errors are returned.
    pub async fn dispatch(&self, event: IncomingEvent) -> Result<DispatchOutcome> {
        match event {
            IncomingEvent::Message(msg) => {
                if is_command(msg.text(), START_COMMAND, self.bot_username()) {
                    return Ok(self.handle_start(&msg).await);
                }
                if msg.chat.kind.is_group() {
                    self.handle_group_message(&msg).await
                } else if msg.chat.kind == crate::events::ChatKind::Private {
                    self.handle_private_message(&msg).await
                } else {
                    Ok(DispatchOutcome::Ignored)
                }
            }
            IncomingEvent::MembershipChange(change) => self.handle_membership_change(&change).await,
            IncomingEvent::Callback(callback) => Ok(self.handle_callback(&callback).await),
        }
    }

    fn bot_username(&self) -> Option<&str> {
        self.config.bot.username.as_deref()
    }

    /// Send, logging instead of failing: an undeliverable reply must not
    /// take the event loop down.
    async fn send(&self, message: OutgoingMessage) {
        let chat_id = message.chat_id;
        if let Err(e) = self.messenger.send(message).await {
            log::warn!("Failed to send message to chat {}: {}", chat_id, e);
        }
    }
}

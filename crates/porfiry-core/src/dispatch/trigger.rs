use super::command::{command_argument, is_command};
use super::cooldown::CooldownDecision;
use super::{DispatchOutcome, Dispatcher, BIND_COMMAND, NAX_COMMAND, SEARCH_COMMAND};
use crate::error::Result;
use crate::events::MessageEvent;
use crate::messenger::OutgoingMessage;
use crate::types::truncate_chars;

const NAX_USAGE: &str = "Give me some text after /nax or reply to a message with it.";
const SEARCH_USAGE: &str = "Give me a query after /search or reply to a message with it.";

/// Why a group message asks for a completion.
enum Trigger<'a> {
    /// `/nax <target>`, or `/nax` replying to a message.
    Command { target: String },
    /// `/search <query>`.
    Search { query: String },
    /// A reply to one of the bot's own messages.
    FollowUp { bot_message: &'a str, reply: &'a str },
}

impl Dispatcher {
    pub(super) async fn handle_group_message(&self, msg: &MessageEvent) -> Result<DispatchOutcome> {
        let chat_id = msg.chat.id;
        let text = msg.text();
        // `/bind` answers even outside the allow-list, with a refusal.
        if is_command(text, BIND_COMMAND, self.bot_username()) {
            return self.handle_bind_command(msg).await;
        }
        if !self.config.allow_list.permits(chat_id) {
            return Ok(DispatchOutcome::Ignored);
        }
        if !self.registry.is_bound(chat_id)? {
            return Ok(DispatchOutcome::Ignored);
        }

        if !text.is_empty() {
            self.log.append(chat_id, msg.sender_name(), text)?;
        }

        let Some(classified) = self.classify(msg) else {
            return Ok(DispatchOutcome::Logged);
        };

        // Any trigger takes the chat's cooldown, a bare command included.
        if let CooldownDecision::Wait { remaining_secs } = self.cooldown.try_acquire(chat_id) {
            log::info!("Cooldown hit in chat {}, wait={}s", chat_id, remaining_secs);
            self.send(
                OutgoingMessage::new(
                    chat_id,
                    format!("Cool it. Next call in {remaining_secs} s."),
                )
                .reply_to(msg.message_id),
            )
            .await;
            return Ok(DispatchOutcome::CooledDown { remaining_secs });
        }

        let trigger = match classified {
            Ok(trigger) => trigger,
            Err(usage) => {
                self.send(OutgoingMessage::new(chat_id, usage).reply_to(msg.message_id))
                    .await;
                return Ok(DispatchOutcome::Informed);
            }
        };

        log::info!(
            "Reply triggered in chat {} by user {}",
            chat_id,
            msg.sender
                .as_ref()
                .map(|s| s.id.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        );

        let result = match &trigger {
            Trigger::Search { query } => self.gateway.search(query).await,
            Trigger::Command { target } => {
                let context = self.log.last_n(chat_id, self.config.context_messages)?;
                let prompt = self.persona.command_prompt(&context, target);
                self.gateway
                    .complete(&self.persona.system_prompt(), &prompt)
                    .await
            }
            Trigger::FollowUp { bot_message, reply } => {
                let context = self.log.last_n(chat_id, self.config.context_messages)?;
                let prompt = self.persona.follow_up_prompt(&context, bot_message, reply);
                self.gateway
                    .complete(&self.persona.system_prompt(), &prompt)
                    .await
            }
        };

        match result {
            Ok(answer) => {
                let answer = truncate_chars(&answer, self.config.reply_max_chars);
                self.send(OutgoingMessage::new(chat_id, answer).reply_to(msg.message_id))
                    .await;
                Ok(DispatchOutcome::Answered)
            }
            Err(e) => {
                log::error!("Completion failed in chat {}: {}", chat_id, e);
                self.send(
                    OutgoingMessage::new(chat_id, format!("Something went wrong: {e}"))
                        .reply_to(msg.message_id),
                )
                .await;
                Ok(DispatchOutcome::GatewayFailed)
            }
        }
    }

    /// `None` when the message is not a trigger; `Some(Err(hint))` when it is
    /// a command without anything to work on.
    fn classify<'a>(&self, msg: &'a MessageEvent) -> Option<std::result::Result<Trigger<'a>, &'static str>> {
        let text = msg.text();
        let replied_text = msg
            .reply_to
            .as_ref()
            .and_then(|r| r.text.as_deref())
            .unwrap_or("");

        if let Some(arg) = command_argument(text, NAX_COMMAND, self.bot_username()) {
            let target = if arg.is_empty() { replied_text } else { arg };
            return Some(if target.is_empty() {
                Err(NAX_USAGE)
            } else {
                Ok(Trigger::Command {
                    target: target.to_string(),
                })
            });
        }

        if is_command(text, SEARCH_COMMAND, self.bot_username()) {
            let arg = command_argument(text, SEARCH_COMMAND, self.bot_username()).unwrap_or("");
            let query = if arg.is_empty() { replied_text } else { arg };
            return Some(if query.is_empty() {
                Err(SEARCH_USAGE)
            } else {
                Ok(Trigger::Search {
                    query: query.to_string(),
                })
            });
        }

        let replies_to_bot = msg
            .reply_to
            .as_ref()
            .is_some_and(|r| r.sender_id == Some(self.config.bot.user_id));
        if replies_to_bot && !text.is_empty() {
            return Some(Ok(Trigger::FollowUp {
                bot_message: replied_text,
                reply: text,
            }));
        }

        None
    }
}

use super::{DispatchOutcome, Dispatcher, BIND_CALLBACK, NAX_COMMAND};
use crate::error::Result;
use crate::events::{CallbackEvent, ForwardOrigin, MembershipChangeEvent, MessageEvent};
use crate::messenger::OutgoingMessage;

const START_TEXT: &str = "Add me to a group as an administrator, then type /bind right in that group.\n\
Or press the button and forward any message from the group here (works only if the sender \
allows forwarding).\n\nCall me in the chat with /nax";
const START_BUTTON: &str = "Bind a chat";
const FORWARD_HINT: &str = "Forward me any message from the group.\n\
If that does not work, type /bind right in that group.";
const NOT_ALLOWED: &str = "This chat is not on the allow-list.";
const NEED_GROUP_FORWARD: &str = "I need a forward from a group.";

fn bound_text(chat_id: i64) -> String {
    format!("Bound. chat_id={chat_id}. Call me with {NAX_COMMAND}.")
}

impl Dispatcher {
    pub(super) async fn handle_start(&self, msg: &MessageEvent) -> DispatchOutcome {
        self.send(
            OutgoingMessage::new(msg.chat.id, START_TEXT).with_button(START_BUTTON, BIND_CALLBACK),
        )
        .await;
        DispatchOutcome::Informed
    }

    pub(super) async fn handle_callback(&self, callback: &CallbackEvent) -> DispatchOutcome {
        let outcome = match (callback.data.as_deref(), callback.chat_id) {
            (Some(BIND_CALLBACK), Some(chat_id)) => {
                self.send(OutgoingMessage::new(chat_id, FORWARD_HINT)).await;
                DispatchOutcome::Informed
            }
            _ => DispatchOutcome::Ignored,
        };
        if let Err(e) = self.messenger.answer_callback(&callback.callback_id).await {
            log::warn!("Failed to answer callback {}: {}", callback.callback_id, e);
        }
        outcome
    }

    /// `/bind` typed inside a group.
    pub(super) async fn handle_bind_command(&self, msg: &MessageEvent) -> Result<DispatchOutcome> {
        let chat = &msg.chat;
        log::info!("Bind command in chat {} ({:?})", chat.id, chat.title);

        if !self.config.allow_list.permits(chat.id) {
            log::warn!("Bind command from chat {} outside the allow-list", chat.id);
            self.send(OutgoingMessage::new(chat.id, NOT_ALLOWED).reply_to(msg.message_id))
                .await;
            return Ok(DispatchOutcome::Informed);
        }

        self.registry.bind(chat.id, chat.title.as_deref())?;
        self.send(OutgoingMessage::new(chat.id, bound_text(chat.id)).reply_to(msg.message_id))
            .await;
        Ok(DispatchOutcome::Bound { chat_id: chat.id })
    }

    /// The bot itself was added to, promoted in, or removed from a chat.
    pub(super) async fn handle_membership_change(
        &self,
        change: &MembershipChangeEvent,
    ) -> Result<DispatchOutcome> {
        let chat = &change.chat;
        if !chat.kind.is_group() {
            return Ok(DispatchOutcome::Ignored);
        }
        log::info!(
            "Membership change: chat={} ({:?}) new_status={:?}",
            chat.id,
            chat.title,
            change.new_status
        );

        if !change.new_status.is_present() {
            log::info!("Bot removed from chat {} ({:?})", chat.id, chat.title);
            return Ok(DispatchOutcome::Ignored);
        }
        if !self.config.allow_list.permits(chat.id) {
            log::warn!("Chat {} is not on the allow-list, not binding", chat.id);
            return Ok(DispatchOutcome::Ignored);
        }

        self.registry.bind(chat.id, chat.title.as_deref())?;
        self.send(OutgoingMessage::new(chat.id, bound_text(chat.id)))
            .await;
        Ok(DispatchOutcome::Bound { chat_id: chat.id })
    }

    /// Private chat: the only thing we act on is a forward from a group.
    pub(super) async fn handle_private_message(
        &self,
        msg: &MessageEvent,
    ) -> Result<DispatchOutcome> {
        let Some(origin) = &msg.forward_origin else {
            log::debug!(
                "Unhandled private message in chat {}: {:?}",
                msg.chat.id,
                msg.text().chars().take(80).collect::<String>()
            );
            return Ok(DispatchOutcome::Ignored);
        };

        let reply = |text: String| OutgoingMessage::new(msg.chat.id, text);
        match origin {
            ForwardOrigin::Chat(source) | ForwardOrigin::Channel(source) => {
                if !source.kind.is_group() {
                    self.send(reply(NEED_GROUP_FORWARD.to_string())).await;
                    return Ok(DispatchOutcome::Informed);
                }
                if !self.config.allow_list.permits(source.id) {
                    log::warn!("Forwarded chat {} is not on the allow-list", source.id);
                    self.send(reply(NOT_ALLOWED.to_string())).await;
                    return Ok(DispatchOutcome::Informed);
                }

                let binding = self.registry.bind(source.id, source.title.as_deref())?;
                log::info!("Chat bound via forward: {} ({})", binding.title, source.id);
                self.send(reply(format!(
                    "Done. Bound chat: {} ({})",
                    binding.title, source.id
                )))
                .await;
                Ok(DispatchOutcome::Bound { chat_id: source.id })
            }
            ForwardOrigin::User { .. } | ForwardOrigin::HiddenUser { .. } => {
                log::warn!(
                    "Forward origin '{}' carries no chat id, cannot bind",
                    origin.label()
                );
                self.send(reply(format!(
                    "Can't get a chat_id from this forward (origin: {}).\n\
                     Telegram hides the source because of the sender's privacy settings.\n\n\
                     Use /bind right in the group instead, it is more reliable.",
                    origin.label()
                )))
                .await;
                Ok(DispatchOutcome::Informed)
            }
        }
    }
}

use crate::types::{ChatId, UserId};

/// Everything the dispatcher reacts to, already decoded from the platform's
/// wire format.
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingEvent {
    Message(MessageEvent),
    MembershipChange(MembershipChangeEvent),
    Callback(CallbackEvent),
}

impl IncomingEvent {
    /// The chat this event belongs to, when it has one.
    pub fn chat_id(&self) -> Option<ChatId> {
        match self {
            IncomingEvent::Message(msg) => Some(msg.chat.id),
            IncomingEvent::MembershipChange(change) => Some(change.chat.id),
            IncomingEvent::Callback(callback) => callback.chat_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    /// Groups and supergroups are where the bot listens and jokes.
    pub fn is_group(self) -> bool {
        matches!(self, ChatKind::Group | ChatKind::Supergroup)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRef {
    pub id: ChatId,
    pub kind: ChatKind,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sender {
    pub id: UserId,
    pub display_name: String,
}

/// The message a new message replies to.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyRef {
    pub message_id: i64,
    pub sender_id: Option<UserId>,
    /// Text or caption.
    pub text: Option<String>,
}

/// Where a forwarded message originally came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ForwardOrigin {
    /// Posted in a chat on behalf of that chat (groups, anonymous admins).
    Chat(ChatRef),
    Channel(ChatRef),
    User { display_name: String },
    /// The sender hides their account; no chat id can be recovered.
    HiddenUser { name: String },
}

impl ForwardOrigin {
    pub fn label(&self) -> &'static str {
        match self {
            ForwardOrigin::Chat(_) => "chat",
            ForwardOrigin::Channel(_) => "channel",
            ForwardOrigin::User { .. } => "user",
            ForwardOrigin::HiddenUser { .. } => "hidden_user",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    pub message_id: i64,
    pub chat: ChatRef,
    pub sender: Option<Sender>,
    /// Text, or the caption of a media message.
    pub text: Option<String>,
    pub reply_to: Option<ReplyRef>,
    pub forward_origin: Option<ForwardOrigin>,
}

impl MessageEvent {
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn sender_name(&self) -> &str {
        self.sender
            .as_ref()
            .map(|s| s.display_name.as_str())
            .unwrap_or("unknown")
    }
}

/// The bot's own membership status in a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
}

impl MemberStatus {
    pub fn is_present(self) -> bool {
        matches!(
            self,
            MemberStatus::Creator | MemberStatus::Administrator | MemberStatus::Member
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MembershipChangeEvent {
    pub chat: ChatRef,
    pub new_status: MemberStatus,
}

/// An inline-keyboard button press.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackEvent {
    pub callback_id: String,
    /// Chat of the message carrying the keyboard, when still accessible.
    pub chat_id: Option<ChatId>,
    pub data: Option<String>,
}

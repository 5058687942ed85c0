use porfiry_core::events::*;
use serde::Deserialize;

/// Envelope of every Bot API response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
}

/// One entry of `getUpdates`. Only the update kinds the bot subscribes to
/// are modelled; anything else deserializes with every field `None`.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
    pub my_chat_member: Option<ChatMemberUpdated>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl User {
    /// First and last name, the way clients show it.
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

impl Chat {
    fn to_ref(&self) -> Option<ChatRef> {
        let kind = match self.kind.as_str() {
            "private" => ChatKind::Private,
            "group" => ChatKind::Group,
            "supergroup" => ChatKind::Supergroup,
            "channel" => ChatKind::Channel,
            other => {
                tracing::debug!("Unknown chat type '{}' for chat {}", other, self.id);
                return None;
            }
        };
        let title = self
            .title
            .clone()
            .or_else(|| self.username.clone())
            .or_else(|| self.first_name.clone());
        Some(ChatRef {
            id: self.id,
            kind,
            title,
        })
    }
}

/// Bot API 7.0+ forward origin.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum MessageOrigin {
    #[serde(rename = "user")]
    User { sender_user: User },

    #[serde(rename = "hidden_user")]
    HiddenUser { sender_user_name: String },

    #[serde(rename = "chat")]
    Chat { sender_chat: Chat },

    #[serde(rename = "channel")]
    Channel { chat: Chat },

    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub reply_to_message: Option<Box<Message>>,
    pub forward_origin: Option<MessageOrigin>,
    /// Pre-7.0 forward fields, still sent by some servers.
    pub forward_from_chat: Option<Chat>,
    pub forward_from: Option<User>,
    pub forward_sender_name: Option<String>,
}

impl Message {
    /// Text, or the caption of a media message.
    pub fn body(&self) -> Option<&str> {
        self.text.as_deref().or(self.caption.as_deref())
    }

    fn origin(&self) -> Option<ForwardOrigin> {
        if let Some(origin) = &self.forward_origin {
            return match origin {
                MessageOrigin::User { sender_user } => Some(ForwardOrigin::User {
                    display_name: sender_user.full_name(),
                }),
                MessageOrigin::HiddenUser { sender_user_name } => Some(ForwardOrigin::HiddenUser {
                    name: sender_user_name.clone(),
                }),
                MessageOrigin::Chat { sender_chat } => sender_chat.to_ref().map(ForwardOrigin::Chat),
                MessageOrigin::Channel { chat } => chat.to_ref().map(ForwardOrigin::Channel),
                MessageOrigin::Unknown => None,
            };
        }

        if let Some(chat) = &self.forward_from_chat {
            let source = chat.to_ref()?;
            return Some(if source.kind == ChatKind::Channel {
                ForwardOrigin::Channel(source)
            } else {
                ForwardOrigin::Chat(source)
            });
        }
        if let Some(user) = &self.forward_from {
            return Some(ForwardOrigin::User {
                display_name: user.full_name(),
            });
        }
        self.forward_sender_name
            .as_ref()
            .map(|name| ForwardOrigin::HiddenUser { name: name.clone() })
    }

    pub fn to_event(&self) -> Option<MessageEvent> {
        Some(MessageEvent {
            message_id: self.message_id,
            chat: self.chat.to_ref()?,
            sender: self.from.as_ref().map(|u| Sender {
                id: u.id,
                display_name: u.full_name(),
            }),
            text: self.body().map(str::to_string),
            reply_to: self.reply_to_message.as_ref().map(|r| ReplyRef {
                message_id: r.message_id,
                sender_id: r.from.as_ref().map(|u| u.id),
                text: r.body().map(str::to_string),
            }),
            forward_origin: self.origin(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMember {
    pub status: String,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMemberUpdated {
    pub chat: Chat,
    pub new_chat_member: ChatMember,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

fn member_status(raw: &str) -> Option<MemberStatus> {
    Some(match raw {
        "creator" => MemberStatus::Creator,
        "administrator" => MemberStatus::Administrator,
        "member" => MemberStatus::Member,
        "restricted" => MemberStatus::Restricted,
        "left" => MemberStatus::Left,
        "kicked" => MemberStatus::Kicked,
        _ => return None,
    })
}

impl Update {
    /// Convert to the dispatcher's event type. `None` for update kinds or
    /// chat types the bot does not handle.
    pub fn to_event(&self) -> Option<IncomingEvent> {
        if let Some(message) = &self.message {
            return message.to_event().map(IncomingEvent::Message);
        }

        if let Some(change) = &self.my_chat_member {
            let status = member_status(&change.new_chat_member.status);
            if status.is_none() {
                tracing::debug!(
                    "Unknown member status '{}' in update {}",
                    change.new_chat_member.status,
                    self.update_id
                );
            }
            return Some(IncomingEvent::MembershipChange(MembershipChangeEvent {
                chat: change.chat.to_ref()?,
                new_status: status?,
            }));
        }

        if let Some(query) = &self.callback_query {
            // A private chat with a user has the user's id.
            let chat_id = query
                .message
                .as_ref()
                .map(|m| m.chat.id)
                .unwrap_or(query.from.id);
            return Some(IncomingEvent::Callback(CallbackEvent {
                callback_id: query.id.clone(),
                chat_id: Some(chat_id),
                data: query.data.clone(),
            }));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Update {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_group_text_message() {
        let update = parse(json!({
            "update_id": 1,
            "message": {
                "message_id": 55,
                "chat": {"id": -1001, "type": "supergroup", "title": "The Lads"},
                "from": {"id": 7, "is_bot": false, "first_name": "Anna", "last_name": "K"},
                "text": "/nax hello",
                "date": 1700000000
            }
        }));

        let Some(IncomingEvent::Message(msg)) = update.to_event() else {
            panic!("expected a message event");
        };
        assert_eq!(msg.message_id, 55);
        assert_eq!(msg.chat.kind, ChatKind::Supergroup);
        assert_eq!(msg.chat.title.as_deref(), Some("The Lads"));
        assert_eq!(msg.sender_name(), "Anna K");
        assert_eq!(msg.text(), "/nax hello");
        assert!(msg.forward_origin.is_none());
    }

    #[test]
    fn test_caption_and_reply() {
        let update = parse(json!({
            "update_id": 2,
            "message": {
                "message_id": 56,
                "chat": {"id": -1001, "type": "group", "title": "G"},
                "from": {"id": 7, "first_name": "Anna"},
                "caption": "look at this",
                "reply_to_message": {
                    "message_id": 40,
                    "chat": {"id": -1001, "type": "group", "title": "G"},
                    "from": {"id": 999, "is_bot": true, "first_name": "Porfiry"},
                    "text": "earlier joke"
                }
            }
        }));

        let Some(IncomingEvent::Message(msg)) = update.to_event() else {
            panic!("expected a message event");
        };
        assert_eq!(msg.text(), "look at this");
        let reply = msg.reply_to.unwrap();
        assert_eq!(reply.message_id, 40);
        assert_eq!(reply.sender_id, Some(999));
        assert_eq!(reply.text.as_deref(), Some("earlier joke"));
    }

    #[test]
    fn test_forward_origins() {
        let from_chat = parse(json!({
            "update_id": 3,
            "message": {
                "message_id": 1,
                "chat": {"id": 42, "type": "private", "first_name": "Admin"},
                "forward_origin": {
                    "type": "chat",
                    "date": 1700000000,
                    "sender_chat": {"id": -1001, "type": "supergroup", "title": "The Lads"}
                }
            }
        }));
        let Some(IncomingEvent::Message(msg)) = from_chat.to_event() else {
            panic!("expected a message event");
        };
        assert_eq!(msg.chat.title.as_deref(), Some("Admin"));
        match msg.forward_origin {
            Some(ForwardOrigin::Chat(chat)) => assert_eq!(chat.id, -1001),
            other => panic!("unexpected origin {other:?}"),
        }

        let hidden = parse(json!({
            "update_id": 4,
            "message": {
                "message_id": 2,
                "chat": {"id": 42, "type": "private"},
                "forward_origin": {"type": "hidden_user", "date": 1, "sender_user_name": "Ghost"}
            }
        }));
        let Some(IncomingEvent::Message(msg)) = hidden.to_event() else {
            panic!("expected a message event");
        };
        assert_eq!(
            msg.forward_origin,
            Some(ForwardOrigin::HiddenUser {
                name: "Ghost".to_string()
            })
        );
    }

    #[test]
    fn test_legacy_forward_fields() {
        let update = parse(json!({
            "update_id": 5,
            "message": {
                "message_id": 3,
                "chat": {"id": 42, "type": "private"},
                "forward_from_chat": {"id": -1002, "type": "channel", "title": "News"}
            }
        }));
        let Some(IncomingEvent::Message(msg)) = update.to_event() else {
            panic!("expected a message event");
        };
        assert!(matches!(msg.forward_origin, Some(ForwardOrigin::Channel(ref c)) if c.id == -1002));
    }

    #[test]
    fn test_unknown_origin_type_is_tolerated() {
        let update = parse(json!({
            "update_id": 6,
            "message": {
                "message_id": 4,
                "chat": {"id": 42, "type": "private"},
                "forward_origin": {"type": "something_new", "date": 1}
            }
        }));
        let Some(IncomingEvent::Message(msg)) = update.to_event() else {
            panic!("expected a message event");
        };
        assert!(msg.forward_origin.is_none());
    }

    #[test]
    fn test_my_chat_member() {
        let update = parse(json!({
            "update_id": 7,
            "my_chat_member": {
                "chat": {"id": -1001, "type": "supergroup", "title": "The Lads"},
                "from": {"id": 7, "first_name": "Anna"},
                "date": 1700000000,
                "old_chat_member": {"status": "left", "user": {"id": 999, "is_bot": true, "first_name": "Porfiry"}},
                "new_chat_member": {"status": "administrator", "user": {"id": 999, "is_bot": true, "first_name": "Porfiry"}}
            }
        }));
        match update.to_event() {
            Some(IncomingEvent::MembershipChange(change)) => {
                assert_eq!(change.chat.id, -1001);
                assert_eq!(change.new_status, MemberStatus::Administrator);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_callback_query() {
        let update = parse(json!({
            "update_id": 8,
            "callback_query": {
                "id": "cb-77",
                "from": {"id": 42, "first_name": "Admin"},
                "data": "bind_chat",
                "message": {
                    "message_id": 9,
                    "chat": {"id": 42, "type": "private"}
                }
            }
        }));
        assert_eq!(
            update.to_event(),
            Some(IncomingEvent::Callback(CallbackEvent {
                callback_id: "cb-77".to_string(),
                chat_id: Some(42),
                data: Some("bind_chat".to_string()),
            }))
        );
    }

    #[test]
    fn test_unhandled_update_kind() {
        let update = parse(json!({
            "update_id": 9,
            "edited_message": {"message_id": 1, "chat": {"id": 1, "type": "private"}}
        }));
        assert_eq!(update.to_event(), None);
    }

    #[test]
    fn test_api_envelope() {
        let ok: ApiResponse<Vec<Update>> =
            serde_json::from_value(json!({"ok": true, "result": [{"update_id": 10}]})).unwrap();
        assert!(ok.ok);
        assert_eq!(ok.result.unwrap()[0].update_id, 10);

        let err: ApiResponse<Vec<Update>> = serde_json::from_value(
            json!({"ok": false, "error_code": 409, "description": "Conflict"}),
        )
        .unwrap();
        assert!(!err.ok);
        assert_eq!(err.error_code, Some(409));
    }
}

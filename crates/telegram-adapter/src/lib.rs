//! Telegram Bot API wire types and their mapping onto porfiry-core events.

pub mod types;

pub use types::{
    ApiResponse, CallbackQuery, Chat, ChatMember, ChatMemberUpdated, Message, MessageOrigin,
    Update, User,
};

/// Update kinds requested from `getUpdates`.
pub const ALLOWED_UPDATES: [&str; 3] = ["message", "callback_query", "my_chat_member"];

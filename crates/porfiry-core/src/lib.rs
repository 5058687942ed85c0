pub mod types;
pub mod error;
pub mod clock;
pub mod storage;
pub mod policies;
pub mod events;
pub mod messenger;
pub mod persona;
pub mod gateway;
pub mod dispatch;
pub mod digest;

pub use error::{PorfiryError, Result};
pub use types::*;
pub use clock::{Clock, ManualClock, SystemClock};
pub use storage::{ChatRegistry, JsonChatRegistry, JsonlMessageLog, MessageLog};
pub use policies::{RetentionConfig, RetentionEngine};
pub use events::{
    CallbackEvent, ChatKind, ChatRef, ForwardOrigin, IncomingEvent, MemberStatus,
    MembershipChangeEvent, MessageEvent, ReplyRef, Sender,
};
pub use messenger::{InlineButton, Messenger, OutgoingMessage, RecordingMessenger};
pub use persona::{HumorMode, Persona};
pub use gateway::{
    CometClient, CompletionError, CompletionGateway, GatewayConfig, MockGateway, MockReply,
};
pub use dispatch::{BotIdentity, DispatchOutcome, Dispatcher, DispatcherConfig};
pub use digest::{DailySchedule, DigestConfig, DigestEngine, DigestReport};

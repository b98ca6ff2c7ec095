//! Chat client: the conversation state holder that talks to the proxy.

mod conversation;
mod proxy;
mod session;

pub use conversation::{Conversation, ConversationTurn, Role, Source};
pub use proxy::{ChatProxy, HttpChatProxy};
pub use session::{ChatSession, GENERATION_FAILED_MESSAGE};

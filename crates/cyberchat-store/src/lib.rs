pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use error::StoreError;
pub use store::ConversationStore;
pub use types::{Conversation, Message, NewMessage};

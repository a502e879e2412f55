pub mod providers;
pub mod types;
pub mod utils;

pub use providers::openrouter::{ChatOptions, send_chat_completion};
pub use types::{LLMClient, LLMMessage, LLMMessageType, LLMUserType};

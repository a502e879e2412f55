pub mod openrouter;

pub use openrouter::{ChatOptions, DEFAULT_OPENROUTER_ENDPOINT, send_chat_completion};

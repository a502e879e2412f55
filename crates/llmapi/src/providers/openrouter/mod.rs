mod api;
pub mod models;

pub use api::{ChatOptions, send_chat_completion};

pub const DEFAULT_OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1";

pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const DEFAULT_IMAGE_MODEL: &str = "google/gemini-3-pro-image-preview";
pub const DEFAULT_REVIEW_MODEL: &str = "google/gemini-3-pro-preview";
pub const DEFAULT_MAX_ITERATIONS: u32 = 2;
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const REVIEW_MAX_TOKENS: u32 = 1024;
pub const APP_TITLE: &str = "schematic-gen";
pub const APP_URL: &str = "https://github.com/schematic-gen/schematic-gen";
pub const REVIEW_LOG_SUFFIX: &str = "_review_log.json";

use std::fmt;
use std::time::Duration;

use llmapi::providers::DEFAULT_OPENROUTER_ENDPOINT;

use crate::constants::{
    API_KEY_ENV, DEFAULT_IMAGE_MODEL, DEFAULT_REVIEW_MODEL, DEFAULT_TIMEOUT_SECS,
};
use crate::error::{Result, SchematicError};
use crate::models::DocType;

/// Immutable session settings for a [`crate::SchematicGenerator`].
///
/// Built once at startup; the `with_*` setters consume and return the value so
/// nothing can change it after it is handed to the generator.
#[derive(Clone)]
pub struct GeneratorConfig {
    api_key: String,
    image_model: String,
    review_model: String,
    verbose: bool,
    endpoint: String,
    quality_threshold: f32,
    timeout: Duration,
}

impl GeneratorConfig {
    /// Fails with a configuration error when `api_key` is blank.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(missing_key_error());
        }

        Ok(Self {
            api_key,
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            review_model: DEFAULT_REVIEW_MODEL.to_string(),
            verbose: false,
            endpoint: DEFAULT_OPENROUTER_ENDPOINT.to_string(),
            quality_threshold: DocType::default().quality_threshold(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Uses `explicit` when given, otherwise asks `lookup` for the
    /// `OPENROUTER_API_KEY` variable. An explicit key never consults `lookup`.
    pub fn from_lookup<F>(explicit: Option<String>, lookup: F) -> Result<Self>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        let api_key = match explicit {
            Some(key) => key,
            None => lookup(API_KEY_ENV)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(missing_key_error)?,
        };
        Self::new(api_key)
    }

    /// [`GeneratorConfig::from_lookup`] against the process environment.
    pub fn from_env(explicit: Option<String>) -> Result<Self> {
        Self::from_lookup(explicit, |name| std::env::var(name).ok())
    }

    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    pub fn with_review_model(mut self, model: impl Into<String>) -> Self {
        self.review_model = model.into();
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_quality_threshold(mut self, threshold: f32) -> Result<Self> {
        if !(0.0..=10.0).contains(&threshold) {
            return Err(SchematicError::Configuration(format!(
                "quality threshold must be between 0 and 10, got {threshold}"
            )));
        }
        self.quality_threshold = threshold;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    pub fn review_model(&self) -> &str {
        &self.review_model
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn quality_threshold(&self) -> f32 {
        self.quality_threshold
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("api_key", &"<redacted>")
            .field("image_model", &self.image_model)
            .field("review_model", &self.review_model)
            .field("verbose", &self.verbose)
            .field("endpoint", &self.endpoint)
            .field("quality_threshold", &self.quality_threshold)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn missing_key_error() -> SchematicError {
    SchematicError::Configuration(format!(
        "no API key supplied; pass one explicitly or set the {API_KEY_ENV} environment variable"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_key_ignores_lookup() {
        let config = GeneratorConfig::from_lookup(Some("test_key".into()), |_| {
            panic!("lookup must not run when a key is supplied")
        })
        .unwrap();
        assert_eq!(config.api_key(), "test_key");
        assert_eq!(config.image_model(), DEFAULT_IMAGE_MODEL);
        assert_eq!(config.review_model(), DEFAULT_REVIEW_MODEL);
        assert!(!config.verbose());
    }

    #[test]
    fn key_is_read_from_the_named_variable() {
        let config = GeneratorConfig::from_lookup(None, |name| {
            (name == "OPENROUTER_API_KEY").then(|| "env_key".to_string())
        })
        .unwrap();
        assert_eq!(config.api_key(), "env_key");
    }

    #[test]
    fn missing_key_names_the_variable() {
        let err = GeneratorConfig::from_lookup(None, |_| None).unwrap_err();
        assert!(matches!(err, SchematicError::Configuration(_)));
        assert!(err.to_string().contains("OPENROUTER_API_KEY"), "{err}");
    }

    #[test]
    fn blank_keys_are_rejected() {
        assert!(GeneratorConfig::new("   ").is_err());
        let err = GeneratorConfig::from_lookup(None, |_| Some(String::new())).unwrap_err();
        assert!(err.to_string().contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn threshold_must_be_on_the_review_scale() {
        let config = GeneratorConfig::new("k").unwrap();
        assert!(config.clone().with_quality_threshold(11.0).is_err());
        let config = config.with_quality_threshold(9.0).unwrap();
        assert_eq!(config.quality_threshold(), 9.0);
    }

    #[test]
    fn debug_output_hides_the_key() {
        let config = GeneratorConfig::new("sk-or-secret").unwrap();
        assert!(!format!("{config:?}").contains("sk-or-secret"));
    }
}

use async_trait::async_trait;
use llmapi::utils::{decode_base64, encode_byte_to_base64};
use llmapi::{send_chat_completion, ChatOptions, LLMClient, LLMMessage, LLMMessageType};
use tracing::{debug, info, warn};

use crate::config::GeneratorConfig;
use crate::constants::{APP_TITLE, APP_URL, REVIEW_MAX_TOKENS};
use crate::error::{Result, SchematicError};
use crate::models::{
    GeneratedImage, GenerationRequest, IterationRecord, IterativeOutcome, ReviewResult,
};
use crate::prompts::{build_generation_prompt, build_review_prompt, improve_prompt, parse_review};

/// The generate → review → refine capabilities of a schematic generator.
///
/// `generate_iterative` is provided on top of the three primitives, so any
/// implementor gets the same bounded loop.
#[async_trait]
pub trait SchematicPipeline: Send + Sync {
    async fn generate_image(&self, request: &GenerationRequest) -> Result<GeneratedImage>;

    async fn review_image(&self, image: &GeneratedImage) -> Result<ReviewResult>;

    fn improve_prompt(&self, original: &str, critique: &str, iteration: u32) -> String {
        improve_prompt(original, critique, iteration)
    }

    /// Runs at most `max_iterations` generate/review cycles.
    ///
    /// Stops at the first accepted image. When the budget runs out the last
    /// image is returned with `accepted == false`. Any upstream error aborts
    /// the loop.
    async fn generate_iterative(
        &self,
        initial_prompt: &str,
        max_iterations: u32,
    ) -> Result<IterativeOutcome> {
        if max_iterations == 0 {
            return Err(SchematicError::Validation(
                "max_iterations must be at least 1".into(),
            ));
        }
        if initial_prompt.trim().is_empty() {
            return Err(SchematicError::Validation("prompt cannot be empty".into()));
        }

        let mut prompt = initial_prompt.to_string();
        let mut history = Vec::new();
        let mut images = Vec::new();
        let mut iteration = 1;

        loop {
            info!(iteration, max_iterations, "generating image");
            let request = GenerationRequest::new(prompt.clone(), iteration);
            let image = self.generate_image(&request).await?;

            info!(iteration, "reviewing image");
            let review = self.review_image(&image).await?;
            info!(
                iteration,
                score = ?review.score,
                accepted = review.accepted,
                "review complete"
            );

            history.push(IterationRecord {
                iteration,
                prompt: prompt.clone(),
                review: review.clone(),
                image_file: None,
            });
            images.push(image.clone());

            if review.accepted || iteration >= max_iterations {
                if !review.accepted {
                    warn!(iteration, "iteration budget exhausted without an accepted image");
                }
                return Ok(IterativeOutcome {
                    image,
                    iterations: iteration,
                    accepted: review.accepted,
                    history,
                    images,
                });
            }

            iteration += 1;
            prompt = self.improve_prompt(&prompt, &review.critique, iteration);
        }
    }
}

/// [`SchematicPipeline`] backed by OpenRouter: one model draws, another reviews.
#[derive(Debug)]
pub struct SchematicGenerator {
    config: GeneratorConfig,
    image_client: LLMClient,
    review_client: LLMClient,
}

impl SchematicGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| {
                SchematicError::Configuration(format!("failed to build HTTP client: {err}"))
            })?;

        let image_client = LLMClient::new(config.api_key(), config.endpoint(), config.image_model())
            .with_http_client(http);
        let review_client = image_client.with_model(config.review_model());

        debug!(?config, "schematic generator ready");

        Ok(Self {
            config,
            image_client,
            review_client,
        })
    }

    /// Resolves the key from `api_key` or `OPENROUTER_API_KEY`.
    pub fn from_env(api_key: Option<String>) -> Result<Self> {
        Self::new(GeneratorConfig::from_env(api_key)?)
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn api_key(&self) -> &str {
        self.config.api_key()
    }

    pub fn image_model(&self) -> &str {
        self.config.image_model()
    }

    pub fn review_model(&self) -> &str {
        self.config.review_model()
    }

    fn chat_options(&self, base: ChatOptions) -> ChatOptions {
        ChatOptions {
            app_title: Some(APP_TITLE.to_string()),
            app_url: Some(APP_URL.to_string()),
            ..base
        }
    }
}

#[async_trait]
impl SchematicPipeline for SchematicGenerator {
    async fn generate_image(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        if self.config.verbose() {
            info!(iteration = request.iteration, prompt = %request.prompt, "image prompt");
        }

        let messages = vec![LLMMessage::new(
            None,
            "user",
            vec![LLMMessageType::text(build_generation_prompt(&request.prompt))],
        )];

        let reply = send_chat_completion(
            &self.image_client,
            messages,
            &self.chat_options(ChatOptions::image_output()),
        )
        .await
        .map_err(|err| SchematicError::upstream("image generation request failed", err))?;

        extract_generated_image(request, &reply, self.image_model())
    }

    async fn review_image(&self, image: &GeneratedImage) -> Result<ReviewResult> {
        let threshold = self.config.quality_threshold();

        let messages = vec![LLMMessage::new(
            None,
            "user",
            vec![
                LLMMessageType::text(build_review_prompt(&image.request.prompt, threshold)),
                LLMMessageType::image(encode_byte_to_base64(&image.bytes), image.mime_type.as_str()),
            ],
        )];

        let options = ChatOptions {
            max_tokens: Some(REVIEW_MAX_TOKENS),
            ..ChatOptions::default()
        };
        let reply = send_chat_completion(&self.review_client, messages, &self.chat_options(options))
            .await
            .map_err(|err| SchematicError::upstream("image review request failed", err))?;

        let text = reply.text();
        if text.trim().is_empty() {
            return Err(SchematicError::Upstream(format!(
                "review model {} returned an empty reply",
                self.review_model()
            )));
        }
        if self.config.verbose() {
            info!(iteration = image.request.iteration, review = %text, "raw review");
        }

        Ok(parse_review(&text, threshold))
    }
}

fn extract_generated_image(
    request: &GenerationRequest,
    reply: &LLMMessage,
    model: &str,
) -> Result<GeneratedImage> {
    let (data_b64, mime_type) = reply.images().next().ok_or_else(|| {
        let text = reply.text();
        let detail = if text.trim().is_empty() {
            String::new()
        } else {
            format!(": {}", text.trim())
        };
        SchematicError::Upstream(format!("model {model} did not return an image{detail}"))
    })?;

    let bytes = decode_base64(data_b64)
        .map_err(|err| SchematicError::upstream("failed to decode generated image", err))?;

    let model_text = Some(reply.text().trim().to_string()).filter(|text| !text.is_empty());

    Ok(GeneratedImage {
        request: request.clone(),
        mime_type: mime_type.to_string(),
        bytes,
        model_text,
    })
}

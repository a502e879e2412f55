use anyhow::{Context, Result, anyhow};
use serde_json::{Value, json};
use tracing::debug;

use crate::types::{LLMClient, LLMMessage, LLMMessageType, LLMUserType};
use crate::utils::{
    detect_mime_type_from_url, download_image, encode_byte_to_base64, is_http_url, split_data_url,
};

use super::models::{ChatCompletionResponse, ChatContent, ChatContentPart};

/// Per-request knobs on top of the model's defaults.
#[derive(Clone, Debug, Default)]
pub struct ChatOptions {
    /// Output modalities, e.g. `["image", "text"]` for image models.
    pub modalities: Vec<String>,
    pub max_tokens: Option<u32>,
    /// Sent as `X-Title` for OpenRouter app attribution.
    pub app_title: Option<String>,
    /// Sent as `HTTP-Referer` for OpenRouter app attribution.
    pub app_url: Option<String>,
}

impl ChatOptions {
    pub fn image_output() -> Self {
        Self {
            modalities: vec!["image".into(), "text".into()],
            ..Self::default()
        }
    }
}

pub async fn send_chat_completion(
    client: &LLMClient,
    messages: Vec<LLMMessage>,
    options: &ChatOptions,
) -> Result<LLMMessage> {
    let url = format!(
        "{}/chat/completions",
        client.endpoint().trim_end_matches('/')
    );

    let mut payload = json!({
        "model": client.default_model(),
        "messages": convert_messages_to_openrouter(messages),
    });
    if !options.modalities.is_empty() {
        payload["modalities"] = json!(options.modalities);
    }
    if let Some(max_tokens) = options.max_tokens {
        payload["max_tokens"] = json!(max_tokens);
    }

    debug!(model = client.default_model(), %url, "sending chat completion");

    let mut request = client
        .http()
        .post(&url)
        .bearer_auth(client.api_key())
        .header("Content-Type", "application/json");
    if let Some(title) = &options.app_title {
        request = request.header("X-Title", title);
    }
    if let Some(referer) = &options.app_url {
        request = request.header("HTTP-Referer", referer);
    }

    let response = request
        .json(&payload)
        .send()
        .await
        .with_context(|| format!("OpenRouter request to {url} failed"))?;

    let status = response.status();
    let response_text = response
        .text()
        .await
        .context("Failed to read OpenRouter response body")?;

    if !status.is_success() {
        return Err(anyhow!(
            "OpenRouter returned status {} body {}",
            status,
            response_text
        ));
    }

    let response: ChatCompletionResponse = serde_json::from_str(&response_text)
        .with_context(|| format!("Failed to decode OpenRouter response JSON: {response_text}"))?;

    convert_openrouter_response(client, response).await
}

fn convert_messages_to_openrouter(messages: Vec<LLMMessage>) -> Vec<Value> {
    messages.into_iter().map(convert_message).collect()
}

fn convert_message(message: LLMMessage) -> Value {
    let role = match message.role {
        LLMUserType::Human => "user",
        LLMUserType::AI => "assistant",
        LLMUserType::System => "system",
    };

    let mut content_items = Vec::new();
    let mut text_segments = Vec::new();
    let mut only_text = true;

    for part in message.content {
        match part {
            LLMMessageType::TEXT(text) => {
                text_segments.push(text.clone());
                content_items.push(json!({
                    "type": "text",
                    "text": text
                }));
            }
            LLMMessageType::IMAGE {
                data_b64,
                mime_type,
            } => {
                only_text = false;
                content_items.push(json!({
                    "type": "image_url",
                    "image_url": { "url": format!("data:{mime_type};base64,{data_b64}") }
                }));
            }
        }
    }

    if content_items.is_empty() {
        return json!({
            "role": role,
            "content": ""
        });
    }

    if only_text {
        json!({
            "role": role,
            "content": text_segments.join("\n")
        })
    } else {
        json!({
            "role": role,
            "content": content_items
        })
    }
}

async fn convert_openrouter_response(
    client: &LLMClient,
    response: ChatCompletionResponse,
) -> Result<LLMMessage> {
    if let Some(error) = response.error {
        return Err(anyhow!("OpenRouter error: {}", error.message));
    }

    let first_choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No choices returned from OpenRouter"))?;

    let role = first_choice
        .message
        .role
        .unwrap_or_else(|| "assistant".to_string());

    let mut image_parts = Vec::new();
    let mut contents = match first_choice.message.content {
        Some(ChatContent::Text(text)) => vec![LLMMessageType::text(text)],
        Some(ChatContent::Parts(parts)) => {
            let mut texts = Vec::new();
            for part in parts {
                match part.kind.as_str() {
                    "text" | "output_text" => {
                        if let Some(text) = part.text {
                            texts.push(LLMMessageType::text(text));
                        }
                    }
                    _ => image_parts.push(part),
                }
            }
            texts
        }
        None => Vec::new(),
    };
    image_parts.extend(first_choice.message.images);

    for part in image_parts {
        if let Some(image) = convert_image_part(client, part).await? {
            contents.push(image);
        }
    }

    if contents.is_empty() {
        contents.push(LLMMessageType::text(""));
    }

    Ok(LLMMessage::new(response.id, &role, contents))
}

async fn convert_image_part(
    client: &LLMClient,
    part: ChatContentPart,
) -> Result<Option<LLMMessageType>> {
    let Some(image_url) = part.image_url else {
        debug!(kind = %part.kind, "skipping unsupported content part");
        return Ok(None);
    };

    if let Some((mime, data_b64)) = split_data_url(&image_url.url) {
        return Ok(Some(LLMMessageType::image(data_b64, mime)));
    }

    if is_http_url(&image_url.url) {
        let (bytes, content_type) = download_image(client.http(), &image_url.url).await?;
        // Non-image types such as application/octet-stream fall back to the URL path.
        let mime = content_type
            .filter(|mime| mime.starts_with("image/"))
            .unwrap_or_else(|| detect_mime_type_from_url(&image_url.url));
        return Ok(Some(LLMMessageType::image(
            encode_byte_to_base64(&bytes),
            mime,
        )));
    }

    Err(anyhow!("Unrecognised image URL in OpenRouter response"))
}

use anyhow::{Context, Result};
use base64::Engine as _;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::path::Path;

pub fn detect_mime_type<P: AsRef<Path>>(path: P) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("image/png")
        .to_string()
}

/// Guesses from the URL path only; query string and fragment are ignored.
pub fn detect_mime_type_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    detect_mime_type(path)
}

/// Downloads `url`, returning the body and the mime type from `Content-Type`.
pub async fn download_image(client: &Client, url: &str) -> Result<(Vec<u8>, Option<String>)> {
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to send request to {}", url))?
        .error_for_status()
        .with_context(|| format!("Non-success HTTP status from {}", url))?;

    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty());

    let bytes = resp
        .bytes()
        .await
        .context("Failed to read response bytes")?;

    Ok((bytes.to_vec(), content_type))
}

pub fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

pub fn encode_byte_to_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

pub fn decode_base64(data_b64: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(data_b64.trim())
        .context("Base64 decoding failed")
}

/// Splits `data:<mime>;base64,<payload>` into `(mime, payload)`.
pub fn split_data_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    Some((mime, payload))
}

pub fn extension_for_mime(mime_type: &str) -> String {
    let mime = mime_type.trim().to_lowercase();
    let ext = match mime.as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/svg+xml" => Some("svg"),
        _ => None,
    };

    if let Some(value) = ext {
        return value.to_string();
    }

    mime_guess::get_mime_extensions_str(&mime)
        .and_then(|exts| exts.first())
        .map(|value| value.to_string())
        .unwrap_or_else(|| "bin".to_string())
}

pub fn current_timestamp_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

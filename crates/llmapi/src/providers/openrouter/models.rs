use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<ChatContent>,
    #[serde(default)]
    pub images: Vec<ChatContentPart>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ChatContent {
    Text(String),
    Parts(Vec<ChatContentPart>),
}

#[derive(Debug, Deserialize)]
pub struct ChatContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<String>,
    pub image_url: Option<ChatContentImageUrl>,
}

#[derive(Debug, Deserialize)]
pub struct ChatContentImageUrl {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub message: String,
}

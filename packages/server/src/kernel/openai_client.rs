//! OpenAI-backed analysis and image generation clients.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::traits::{BaseAnalysis, BaseImageGen};

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const IMAGE_GENERATIONS_URL: &str = "https://api.openai.com/v1/images/generations";

/// Default model for the analysis phases.
pub const DEFAULT_ANALYSIS_MODEL: &str = "gpt-4o-mini";

/// OpenAI API client for text analysis and image generation.
pub struct OpenAiClient {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
}

impl OpenAiClient {
    /// Create a new OpenAI client with the default analysis model.
    pub fn new(api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            model: DEFAULT_ANALYSIS_MODEL.to_string(),
            client,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl BaseAnalysis for OpenAiClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
        };

        let response = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send chat completion request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API error {}: {}", status, body);
        }

        let chat: ChatResponse = response
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .context("chat completion returned no content")
    }
}

#[async_trait]
impl BaseImageGen for OpenAiClient {
    async fn generate_image(&self, prompt: &str) -> Result<String> {
        let request = ImageRequest {
            model: "dall-e-3",
            prompt,
            n: 1,
            size: "1024x1024",
        };

        let response = self
            .client
            .post(IMAGE_GENERATIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send image generation request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI image API error {}: {}", status, body);
        }

        let images: ImageResponse = response
            .json()
            .await
            .context("Failed to parse image generation response")?;

        images
            .data
            .into_iter()
            .next()
            .and_then(|d| d.url)
            .context("image generation returned no URL")
    }
}

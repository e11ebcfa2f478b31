//! OpenAI-compatible chat completions backend (Groq by default).

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::prompt::build_prompt;
use super::SummaryBackend;
use crate::client::{endpoint, ensure_success};
use crate::config::SummaryConfig;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
  model: &'a str,
  messages: Vec<ChatMessage>,
  temperature: f32,
  max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
  role: String,
  #[serde(default)]
  content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
  #[serde(default)]
  choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
  message: ChatMessage,
}

impl ChatResponse {
  /// Trimmed content of the first choice.
  fn into_text(self) -> Result<String> {
    self
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .map(|text| text.trim().to_string())
      .ok_or_else(|| eyre!("Summary backend returned no choices"))
  }
}

/// Generates summaries through a `/chat/completions` endpoint.
pub struct ChatCompletionsBackend {
  http: reqwest::Client,
  completions_url: Url,
  api_key: String,
  model: String,
  temperature: f32,
  max_tokens: u32,
}

impl ChatCompletionsBackend {
  pub fn new(config: &SummaryConfig, http: reqwest::Client, api_key: String) -> Result<Self> {
    Ok(Self {
      http,
      completions_url: endpoint(&config.api_base, "chat/completions")?,
      api_key,
      model: config.model.clone(),
      temperature: config.temperature,
      max_tokens: config.max_tokens,
    })
  }

  fn request(&self, review_bodies: &[String]) -> ChatRequest<'_> {
    ChatRequest {
      model: &self.model,
      messages: vec![ChatMessage {
        role: "user".to_string(),
        content: Some(build_prompt(review_bodies)),
      }],
      temperature: self.temperature,
      max_tokens: self.max_tokens,
    }
  }
}

#[async_trait]
impl SummaryBackend for ChatCompletionsBackend {
  async fn generate(&self, review_bodies: &[String]) -> Result<String> {
    debug!(model = %self.model, reviews = review_bodies.len(), "Requesting summary");

    let response = self
      .http
      .post(self.completions_url.clone())
      .bearer_auth(&self.api_key)
      .json(&self.request(review_bodies))
      .send()
      .await
      .map_err(|e| eyre!("Failed to reach summary backend: {}", e))?;

    let body: ChatResponse = ensure_success(response, "Summary generation")
      .await?
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse summary response: {}", e))?;

    body.into_text()
  }
}

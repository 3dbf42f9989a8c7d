//! Chat-completions analysis client
//!
//! Sends the (truncated) source with a fixed instruction asking for a JSON
//! assessment and hands the reply text to [`parse_signal`].

use super::parse::parse_signal;
use super::{AnalysisError, AnalysisService};
use async_trait::async_trait;
use cadence_common::config::AnalysisConfig;
use cadence_common::CodeSignal;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("cadence/", env!("CARGO_PKG_VERSION"));

const SYSTEM_PROMPT: &str = "You assess source code for a music generator. Reply with one JSON object \
with the keys complexity (simple|moderate|complex|very_complex), mood (calm|focused|energetic|intense), \
patterns (array of short strings), codeType (algorithm|data_structure|ui_frontend|backend_api|utility|test), \
recommendedBPM (integer 60-140), energy (integer 1-10), genre (string) and description (one sentence).";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// HTTP analysis client
pub struct HttpAnalysisClient {
    http_client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    max_source_chars: usize,
}

impl HttpAnalysisClient {
    /// Build a client; fails without an API key
    pub fn new(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(AnalysisError::MissingApiKey)?;

        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AnalysisError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            max_source_chars: config.max_source_chars,
        })
    }

    fn user_message(&self, source: &str, language: &str) -> String {
        format!(
            "Language: {}\n\n```\n{}\n```",
            language,
            truncate_chars(source, self.max_source_chars)
        )
    }
}

/// First `max` characters of `text`, never splitting a code point
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisClient {
    async fn analyze(&self, source: &str, language: &str) -> Result<CodeSignal, AnalysisError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: self.user_message(source, language),
                },
            ],
            temperature: 0.2,
        };

        debug!(
            endpoint = %self.endpoint,
            language = %language,
            chars = source.chars().count().min(self.max_source_chars),
            "Requesting code analysis"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalysisError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AnalysisError::Api(status.as_u16(), "invalid API key".to_string()));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Api(status.as_u16(), error_text));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::Parse(e.to_string()))?;

        let reply = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(AnalysisError::EmptyResponse)?;

        parse_signal(&reply, language)
    }
}

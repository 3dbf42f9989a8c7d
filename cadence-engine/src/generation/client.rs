//! Generation service HTTP client
//!
//! Endpoints:
//! - `POST {base_url}/api/generate`: submit `{prompt, tags, make_instrumental}`
//! - `GET {base_url}/api/get?ids={id}`: clip status array
//!
//! Submission answers either a single clip object or an array of clips; the
//! first clip is tracked.

use super::{ClipInfo, GenerationError, GenerationService, SubmitPayload};
use async_trait::async_trait;
use cadence_common::config::GenerationConfig;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("cadence/", env!("CARGO_PKG_VERSION"));

/// Submission response shapes accepted from the service
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SubmitResponse {
    Many(Vec<ClipInfo>),
    One(ClipInfo),
}

/// HTTP generation client
pub struct HttpGenerationClient {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpGenerationClient {
    pub fn new(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(header::AUTHORIZATION, format!("Bearer {}", key)),
            None => request,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, GenerationError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GenerationError::Unauthorized);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api(status.as_u16(), error_text));
        }
        Ok(response)
    }
}

#[async_trait]
impl GenerationService for HttpGenerationClient {
    async fn submit(&self, payload: &SubmitPayload) -> Result<ClipInfo, GenerationError> {
        let url = format!("{}/api/generate", self.base_url);
        debug!(url = %url, tags = %payload.tags, "Submitting generation job");

        let response = self
            .authorized(self.http_client.post(&url).json(payload))
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;
        let response = Self::check(response).await?;

        let parsed: SubmitResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;

        let clip = match parsed {
            SubmitResponse::One(clip) => clip,
            SubmitResponse::Many(clips) => clips
                .into_iter()
                .next()
                .ok_or_else(|| GenerationError::Parse("empty submission response".to_string()))?,
        };

        info!(job_id = %clip.id, status = %clip.status, "Generation job accepted");
        Ok(clip)
    }

    async fn status(&self, job_id: &str) -> Result<Vec<ClipInfo>, GenerationError> {
        let url = format!("{}/api/get", self.base_url);

        let response = self
            .authorized(self.http_client.get(&url).query(&[("ids", job_id)]))
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GenerationError::JobNotFound(job_id.to_string()));
        }
        let response = Self::check(response).await?;

        response
            .json::<Vec<ClipInfo>>()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation_trims_base_url() {
        let config = GenerationConfig {
            base_url: "http://localhost:3000/".to_string(),
            ..Default::default()
        };
        let client = HttpGenerationClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_submit_response_accepts_object_or_array() {
        let one: SubmitResponse =
            serde_json::from_str(r#"{"id":"a","status":"submitted","metadata":{"bpm":90}}"#).unwrap();
        assert!(matches!(one, SubmitResponse::One(ref clip) if clip.id == "a"));

        let many: SubmitResponse = serde_json::from_str(
            r#"[{"id":"a","status":"submitted"},{"id":"b","status":"submitted"}]"#,
        )
        .unwrap();
        assert!(matches!(many, SubmitResponse::Many(ref clips) if clips.len() == 2));
    }

    #[test]
    fn test_status_payload_parses_streaming_clip() {
        let clips: Vec<ClipInfo> = serde_json::from_str(
            r#"[{"id":"a","status":"streaming","audio_url":"https://cdn/a.mp3","title":"Loop",
                "image_url":null,"metadata":{"genre":"lo-fi","duration":null}}]"#,
        )
        .unwrap();
        assert_eq!(clips[0].audio_url.as_deref(), Some("https://cdn/a.mp3"));
        assert_eq!(clips[0].metadata.as_ref().unwrap().genre.as_deref(), Some("lo-fi"));
    }
}

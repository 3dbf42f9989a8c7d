//! Remote music generation
//!
//! - [`client`]: HTTP client for the generation service
//! - [`lifecycle`]: submission + poll state machine with playback handoff

pub mod client;
pub mod lifecycle;

pub use client::HttpGenerationClient;
pub use lifecycle::{GenerationLifecycle, PollConfig, PollOutcome};

use async_trait::async_trait;
use cadence_common::MusicRequest;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Generation service errors
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Authentication rejected by generation service")]
    Unauthorized,

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Job {0} not found")]
    JobNotFound(String),
}

/// Remote job status
///
/// Ordered by lifecycle progress; `Error` is reachable from anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Submitted,
    Queued,
    Streaming,
    Complete,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Submitted => "submitted",
            JobStatus::Queued => "queued",
            JobStatus::Streaming => "streaming",
            JobStatus::Complete => "complete",
            JobStatus::Error => "error",
        }
    }

    /// Parse a remote status string; unknown values yield `None`
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "submitted" => Some(JobStatus::Submitted),
            "queued" | "pending" => Some(JobStatus::Queued),
            "streaming" => Some(JobStatus::Streaming),
            "complete" | "completed" => Some(JobStatus::Complete),
            "error" | "failed" => Some(JobStatus::Error),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }

    fn rank(&self) -> u8 {
        match self {
            JobStatus::Submitted => 0,
            JobStatus::Queued => 1,
            JobStatus::Streaming => 2,
            JobStatus::Complete => 3,
            JobStatus::Error => 4,
        }
    }

    /// Whether moving from `self` to `next` respects lifecycle order
    ///
    /// Terminal states never move; `Error` is always reachable otherwise.
    pub fn can_advance_to(&self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == JobStatus::Error || next.rank() >= self.rank()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job metadata echoed by the service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobMetadata {
    pub bpm: Option<u32>,
    pub genre: Option<String>,
    pub duration: Option<f64>,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
}

/// Locally tracked generation job
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationJob {
    pub id: String,
    pub status: JobStatus,
    pub audio_url: Option<String>,
    pub title: Option<String>,
    pub image_url: Option<String>,
    pub metadata: JobMetadata,
}

impl GenerationJob {
    /// Placeholder record for a submission that never reached the service
    pub fn failed_submission(request: &MusicRequest, message: impl Into<String>) -> Self {
        Self {
            id: format!("local-{}", uuid::Uuid::new_v4()),
            status: JobStatus::Error,
            audio_url: None,
            title: None,
            image_url: None,
            metadata: JobMetadata {
                bpm: Some(request.bpm),
                genre: Some(request.genre.clone()),
                duration: Some(request.duration as f64),
                error_type: Some("submission_failed".to_string()),
                error_message: Some(message.into()),
            },
        }
    }

    pub fn from_clip(clip: &ClipInfo) -> Option<Self> {
        Some(Self {
            id: clip.id.clone(),
            status: JobStatus::parse(&clip.status)?,
            audio_url: clip.audio_url.clone().filter(|u| !u.trim().is_empty()),
            title: clip.title.clone(),
            image_url: clip.image_url.clone(),
            metadata: clip.metadata.clone().unwrap_or_default(),
        })
    }
}

/// Clip record as returned by the status endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipInfo {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub metadata: Option<JobMetadata>,
}

/// Submission payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitPayload {
    pub prompt: String,
    /// Comma-separated style tags
    pub tags: String,
    pub make_instrumental: bool,
    pub wait_audio: bool,
}

impl SubmitPayload {
    pub fn from_request(request: &MusicRequest, instrumental: bool) -> Self {
        let mut tags = vec![request.genre.clone(), request.mood.clone()];
        tags.extend(request.instruments.iter().take(3).cloned());
        Self {
            prompt: request.prompt.clone(),
            tags: tags.join(", "),
            make_instrumental: instrumental,
            wait_audio: false,
        }
    }
}

/// Remote generation service
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Submit a job; returns the accepted clip
    async fn submit(&self, payload: &SubmitPayload) -> Result<ClipInfo, GenerationError>;

    /// Fetch current clip records for a job id
    async fn status(&self, job_id: &str) -> Result<Vec<ClipInfo>, GenerationError>;
}

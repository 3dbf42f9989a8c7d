//! Local audio playback
//!
//! The lifecycle only ever talks to a [`Player`] at state transitions; it never
//! polls player state.

mod process;

pub use process::ProcessPlayer;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Failed to start player '{command}': {message}")]
    Spawn { command: String, message: String },

    #[error("Failed to stop player: {0}")]
    Stop(String),
}

/// Audio handle handed to the player
///
/// The generation service reports both under the same field, but a live
/// stream and a finished file are different resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// Live endpoint of a job that is still generating
    Stream(String),
    /// Final downloadable asset
    Asset(String),
}

impl AudioSource {
    pub fn url(&self) -> &str {
        match self {
            AudioSource::Stream(url) | AudioSource::Asset(url) => url,
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, AudioSource::Stream(_))
    }
}

/// Single playback channel
///
/// `play` replaces whatever is currently playing; there is never more than one
/// active source.
#[async_trait]
pub trait Player: Send + Sync {
    async fn play(&self, source: &AudioSource) -> Result<(), PlaybackError>;
    async fn stop(&self) -> Result<(), PlaybackError>;
    async fn mute(&self) -> Result<(), PlaybackError>;
    async fn unmute(&self) -> Result<(), PlaybackError>;
}

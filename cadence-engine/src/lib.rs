//! # Cadence Engine
//!
//! Turns a live signal about a developer's work into music:
//!
//! - [`synthesis`]: code/diagnostic signal → `MusicRequest`
//! - [`success`]: success event classification with cooldown
//! - [`generation`]: remote generation job lifecycle and playback handoff
//! - [`analysis`]: remote code analysis with per-language fallback
//! - [`playback`]: local audio player
//! - [`session`]: editor event loop tying the above together

pub mod analysis;
pub mod debounce;
pub mod generation;
pub mod playback;
pub mod session;
pub mod success;
pub mod synthesis;

pub use generation::{GenerationLifecycle, PollConfig, PollOutcome};
pub use session::{EditorEvent, Session};
pub use success::SuccessClassifier;
pub use synthesis::ParameterSynthesizer;

//! # Cadence Common Library
//!
//! Shared code for the Cadence workspace:
//! - Data model (CodeSignal, MusicRequest, CelebrationType)
//! - Event types (CadenceEvent) and the EventBus
//! - Configuration loading
//! - Common error type

pub mod config;
pub mod error;
pub mod events;
pub mod music;
pub mod signal;

pub use error::{Error, Result};
pub use music::{CelebrationType, MusicRequest};
pub use signal::{CodeSignal, CodeType, Complexity, Mood};

//! Music generation request types

use serde::{Deserialize, Serialize};

/// Fully resolved set of musical generation parameters
///
/// Built in stages by the synthesizers. `prompt` is rendered last, from the
/// other fields only, and is never edited afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicRequest {
    pub bpm: u32,
    pub mood: String,
    pub genre: String,
    /// Energy on a 1-10 scale, one decimal place
    pub energy: f64,
    pub complexity: String,
    pub instruments: Vec<String>,
    pub structure: String,
    /// Target length in seconds
    pub duration: u32,
    pub tags: Vec<String>,
    pub prompt: String,
    pub context: String,
}

impl MusicRequest {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Kind of positive outcome worth celebrating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CelebrationType {
    CompilationSuccess,
    BugFix,
    TestPass,
    Deployment,
}

impl CelebrationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CelebrationType::CompilationSuccess => "compilation_success",
            CelebrationType::BugFix => "bug_fix",
            CelebrationType::TestPass => "test_pass",
            CelebrationType::Deployment => "deployment",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "compilation_success" | "build" | "compile" => Some(CelebrationType::CompilationSuccess),
            "bug_fix" | "fix" => Some(CelebrationType::BugFix),
            "test_pass" | "test" => Some(CelebrationType::TestPass),
            "deployment" | "deploy" => Some(CelebrationType::Deployment),
            _ => None,
        }
    }
}

impl std::fmt::Display for CelebrationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Code signal produced by the analysis step
//!
//! A `CodeSignal` is the coarse assessment of a source snippet that feeds the
//! parameter synthesizer. Every field is already validated against its domain:
//! the analysis layer never hands out raw model output.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Lowest tempo hint accepted from the analysis service
pub const MIN_RECOMMENDED_BPM: u32 = 60;
/// Highest tempo hint accepted from the analysis service
pub const MAX_RECOMMENDED_BPM: u32 = 140;
/// Lowest energy hint accepted from the analysis service
pub const MIN_SIGNAL_ENERGY: u32 = 1;
/// Highest energy hint accepted from the analysis service
pub const MAX_SIGNAL_ENERGY: u32 = 10;

/// Structural complexity tier of the analysed code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
    VeryComplex,
}

impl Complexity {
    /// All tiers, least to most complex
    pub const ALL: [Complexity; 4] = [
        Complexity::Simple,
        Complexity::Moderate,
        Complexity::Complex,
        Complexity::VeryComplex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Moderate => "moderate",
            Complexity::Complex => "complex",
            Complexity::VeryComplex => "very_complex",
        }
    }

    /// Lenient parse of a model-supplied label ("very complex", "Very_Complex", ...)
    pub fn parse(value: &str) -> Option<Self> {
        match normalize_label(value).as_str() {
            "simple" => Some(Complexity::Simple),
            "moderate" => Some(Complexity::Moderate),
            "complex" => Some(Complexity::Complex),
            "very_complex" => Some(Complexity::VeryComplex),
            _ => None,
        }
    }
}

/// Emotional register suggested for the code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Calm,
    Focused,
    Energetic,
    Intense,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Calm => "calm",
            Mood::Focused => "focused",
            Mood::Energetic => "energetic",
            Mood::Intense => "intense",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match normalize_label(value).as_str() {
            "calm" => Some(Mood::Calm),
            "focused" => Some(Mood::Focused),
            "energetic" => Some(Mood::Energetic),
            "intense" => Some(Mood::Intense),
            _ => None,
        }
    }
}

/// Broad category of the analysed code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeType {
    Algorithm,
    DataStructure,
    UiFrontend,
    BackendApi,
    Utility,
    Test,
}

impl CodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeType::Algorithm => "algorithm",
            CodeType::DataStructure => "data_structure",
            CodeType::UiFrontend => "ui_frontend",
            CodeType::BackendApi => "backend_api",
            CodeType::Utility => "utility",
            CodeType::Test => "test",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match normalize_label(value).as_str() {
            "algorithm" => Some(CodeType::Algorithm),
            "data_structure" => Some(CodeType::DataStructure),
            "ui_frontend" => Some(CodeType::UiFrontend),
            "backend_api" => Some(CodeType::BackendApi),
            "utility" => Some(CodeType::Utility),
            "test" => Some(CodeType::Test),
            _ => None,
        }
    }
}

/// Validated assessment of a source snippet
///
/// `recommended_bpm` and `energy` are hints: `None` means the hint was missing
/// or outside its domain and the synthesizer draws from the tier range instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSignal {
    pub complexity: Complexity,
    pub mood: Mood,
    pub patterns: BTreeSet<String>,
    pub code_type: CodeType,
    pub recommended_bpm: Option<u32>,
    pub energy: Option<u32>,
    pub genre: String,
    pub description: String,
}

impl CodeSignal {
    /// Keep the tempo hint only when it lies in [60, 140]
    pub fn validated_bpm(value: Option<i64>) -> Option<u32> {
        value
            .filter(|bpm| (MIN_RECOMMENDED_BPM as i64..=MAX_RECOMMENDED_BPM as i64).contains(bpm))
            .map(|bpm| bpm as u32)
    }

    /// Keep the energy hint only when it lies in [1, 10]
    pub fn validated_energy(value: Option<i64>) -> Option<u32> {
        value
            .filter(|energy| (MIN_SIGNAL_ENERGY as i64..=MAX_SIGNAL_ENERGY as i64).contains(energy))
            .map(|energy| energy as u32)
    }
}

fn normalize_label(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .replace(['-', ' '], "_")
}

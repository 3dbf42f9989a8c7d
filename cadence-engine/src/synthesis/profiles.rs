//! Static profile tables for parameter synthesis
//!
//! Tables are visible data, not hidden logic: every musical choice the
//! synthesizers make traces back to a row here.

use cadence_common::{CelebrationType, Complexity};
use std::ops::RangeInclusive;

/// Per-complexity base profile
#[derive(Debug, Clone)]
pub struct TierProfile {
    pub bpm_range: RangeInclusive<u32>,
    pub energy_range: RangeInclusive<u32>,
    pub instruments: &'static [&'static str],
    pub genre: &'static str,
    pub stress_factor: f64,
    pub tension: &'static str,
    pub structure: &'static str,
}

pub fn tier_profile(complexity: Complexity) -> TierProfile {
    match complexity {
        Complexity::Simple => TierProfile {
            bpm_range: 60..=80,
            energy_range: 2..=4,
            instruments: &["soft piano", "acoustic guitar", "light strings", "ambient pads"],
            genre: "ambient",
            stress_factor: 1.0,
            tension: "relaxed",
            structure: "ambient-flow",
        },
        Complexity::Moderate => TierProfile {
            bpm_range: 80..=110,
            energy_range: 4..=6,
            instruments: &["piano", "strings", "soft drums", "bass"],
            genre: "lo-fi",
            stress_factor: 1.2,
            tension: "focused",
            structure: "verse-chorus",
        },
        Complexity::Complex => TierProfile {
            bpm_range: 100..=130,
            energy_range: 6..=8,
            instruments: &["strings", "drums", "synth", "bass", "piano"],
            genre: "electronic",
            stress_factor: 1.5,
            tension: "tense",
            structure: "build-release",
        },
        Complexity::VeryComplex => TierProfile {
            bpm_range: 120..=150,
            energy_range: 7..=10,
            instruments: &["orchestral strings", "heavy drums", "brass", "synth", "distorted bass"],
            genre: "cinematic",
            stress_factor: 2.0,
            tension: "intense",
            structure: "crescendo",
        },
    }
}

/// Per-language contextual override
#[derive(Debug, Clone)]
pub struct LanguageOverride {
    pub genre: &'static str,
    pub instruments: &'static [&'static str],
    pub tags: &'static [&'static str],
    pub energy_delta: i32,
}

/// Override for a language identifier; `None` for unknown languages
pub fn language_override(language_id: &str) -> Option<LanguageOverride> {
    let row = match language_id.trim().to_lowercase().as_str() {
        "python" => LanguageOverride {
            genre: "algorithmic ambient",
            instruments: &["piano", "synth pads", "soft percussion"],
            tags: &["pythonic", "flowing"],
            energy_delta: 0,
        },
        "javascript" | "javascriptreact" => LanguageOverride {
            genre: "electronic pop",
            instruments: &["synth", "electronic drums", "bass"],
            tags: &["dynamic", "web"],
            energy_delta: 1,
        },
        "typescript" | "typescriptreact" => LanguageOverride {
            genre: "structured electronic",
            instruments: &["synth", "piano", "electronic drums"],
            tags: &["typed", "structured"],
            energy_delta: 0,
        },
        "rust" => LanguageOverride {
            genre: "industrial electronic",
            instruments: &["heavy synth", "metallic percussion", "bass"],
            tags: &["systems", "precise"],
            energy_delta: 1,
        },
        "go" => LanguageOverride {
            genre: "minimal techno",
            instruments: &["synth", "drum machine", "bass"],
            tags: &["concurrent", "minimal"],
            energy_delta: 0,
        },
        "java" | "kotlin" => LanguageOverride {
            genre: "orchestral",
            instruments: &["strings", "brass", "timpani"],
            tags: &["enterprise", "structured"],
            energy_delta: 0,
        },
        "c" | "cpp" => LanguageOverride {
            genre: "dark electronic",
            instruments: &["synth", "bass", "drums"],
            tags: &["low-level", "raw"],
            energy_delta: 1,
        },
        "html" | "css" | "scss" => LanguageOverride {
            genre: "chillwave",
            instruments: &["synth pads", "soft drums", "bells"],
            tags: &["visual", "design"],
            energy_delta: -1,
        },
        "markdown" | "plaintext" => LanguageOverride {
            genre: "ambient",
            instruments: &["piano", "ambient pads"],
            tags: &["writing", "reflective"],
            energy_delta: -2,
        },
        _ => return None,
    };
    Some(row)
}

/// Appended at 50 lines and above
pub const TENSION_INSTRUMENTS: [&str; 2] = ["tense strings", "pulsing bass"];
/// Appended at 150 lines and above
pub const ESCALATING_INSTRUMENTS: [&str; 3] = ["driving percussion", "dissonant brass", "rising synth"];
/// Appended at 300 lines and above
pub const MAXIMUM_STRESS_INSTRUMENTS: [&str; 3] =
    ["pounding timpani", "chaotic orchestral hits", "alarm synth"];

/// Fixed musical profile (diagnostic severities, celebrations)
#[derive(Debug, Clone)]
pub struct FixedProfile {
    pub bpm: u32,
    pub mood: &'static str,
    pub genre: &'static str,
    pub energy: f64,
    pub complexity: &'static str,
    pub instruments: &'static [&'static str],
    pub structure: &'static str,
    pub duration: u32,
}

/// Diagnostic severity buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

pub fn severity_profile(severity: Severity) -> FixedProfile {
    match severity {
        Severity::Low => FixedProfile {
            bpm: 85,
            mood: "focused",
            genre: "lo-fi",
            energy: 4.0,
            complexity: "simple",
            instruments: &["piano", "soft drums", "bass"],
            structure: "loop",
            duration: 45,
        },
        Severity::Medium => FixedProfile {
            bpm: 100,
            mood: "concerned",
            genre: "downtempo electronic",
            energy: 5.0,
            complexity: "moderate",
            instruments: &["synth", "drums", "bass", "strings"],
            structure: "verse-chorus",
            duration: 45,
        },
        Severity::High => FixedProfile {
            bpm: 120,
            mood: "tense",
            genre: "dark electronic",
            energy: 7.0,
            complexity: "complex",
            instruments: &["distorted synth", "heavy drums", "tense strings", "bass"],
            structure: "build-release",
            duration: 60,
        },
        Severity::Critical => FixedProfile {
            bpm: 140,
            mood: "urgent",
            genre: "industrial",
            energy: 9.0,
            complexity: "very_complex",
            instruments: &["alarm synth", "pounding drums", "dissonant brass", "distorted bass"],
            structure: "crescendo",
            duration: 60,
        },
    }
}

/// Used whenever the error count is going down, regardless of magnitude
pub const HOPEFUL_PROFILE: FixedProfile = FixedProfile {
    bpm: 95,
    mood: "hopeful",
    genre: "uplifting ambient",
    energy: 5.0,
    complexity: "moderate",
    instruments: &["piano", "warm strings", "light percussion", "bells"],
    structure: "rising",
    duration: 60,
};

pub fn celebration_profile(celebration: CelebrationType) -> FixedProfile {
    match celebration {
        CelebrationType::CompilationSuccess => FixedProfile {
            bpm: 128,
            mood: "triumphant",
            genre: "uplifting electronic",
            energy: 8.0,
            complexity: "moderate",
            instruments: &["bright synth", "claps", "bass", "bells"],
            structure: "short fanfare",
            duration: 20,
        },
        CelebrationType::BugFix => FixedProfile {
            bpm: 110,
            mood: "relieved",
            genre: "feel-good funk",
            energy: 7.0,
            complexity: "moderate",
            instruments: &["funky guitar", "bass", "drums", "horns"],
            structure: "groove",
            duration: 20,
        },
        CelebrationType::TestPass => FixedProfile {
            bpm: 120,
            mood: "joyful",
            genre: "celebratory pop",
            energy: 8.0,
            complexity: "simple",
            instruments: &["piano", "claps", "drums", "bright synth"],
            structure: "short fanfare",
            duration: 15,
        },
        CelebrationType::Deployment => FixedProfile {
            bpm: 140,
            mood: "epic",
            genre: "cinematic orchestral",
            energy: 9.0,
            complexity: "complex",
            instruments: &["orchestral strings", "brass", "timpani", "choir"],
            structure: "crescendo",
            duration: 30,
        },
    }
}

pub fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers_widen_and_rise() {
        let mut previous: Option<TierProfile> = None;
        for complexity in Complexity::ALL {
            let profile = tier_profile(complexity);
            if let Some(prev) = previous {
                assert!(profile.bpm_range.start() >= prev.bpm_range.start());
                assert!(profile.bpm_range.end() >= prev.bpm_range.end());
                assert!(profile.energy_range.end() >= prev.energy_range.end());
                assert!(profile.stress_factor > prev.stress_factor);
            }
            previous = Some(profile);
        }
    }

    #[test]
    fn test_language_override_lookup_is_case_insensitive() {
        let python = language_override("Python").unwrap();
        assert_eq!(python.genre, "algorithmic ambient");
        assert!(language_override("cobol").is_none());
    }
}

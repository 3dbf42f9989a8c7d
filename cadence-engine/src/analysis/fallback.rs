//! Per-language default signals
//!
//! Used whenever the analysis service is unavailable or its answer cannot be
//! parsed, and as the source of replacement values for individual invalid
//! fields.

use cadence_common::{CodeSignal, CodeType, Complexity, Mood};
use std::collections::BTreeSet;

struct LanguageDefault {
    complexity: Complexity,
    mood: Mood,
    code_type: CodeType,
    genre: &'static str,
}

fn language_default(language: &str) -> LanguageDefault {
    let (complexity, mood, code_type, genre) = match language.trim().to_lowercase().as_str() {
        "python" => (Complexity::Moderate, Mood::Focused, CodeType::Algorithm, "ambient electronic"),
        "javascript" | "javascriptreact" => (Complexity::Moderate, Mood::Energetic, CodeType::UiFrontend, "lo-fi"),
        "typescript" | "typescriptreact" => (Complexity::Moderate, Mood::Focused, CodeType::UiFrontend, "lo-fi"),
        "rust" => (Complexity::Complex, Mood::Focused, CodeType::Algorithm, "electronic"),
        "go" => (Complexity::Moderate, Mood::Focused, CodeType::BackendApi, "electronic"),
        "java" | "kotlin" => (Complexity::Complex, Mood::Focused, CodeType::BackendApi, "orchestral"),
        "c" | "cpp" => (Complexity::Complex, Mood::Intense, CodeType::Algorithm, "electronic"),
        "html" | "css" | "scss" => (Complexity::Simple, Mood::Calm, CodeType::UiFrontend, "ambient"),
        "markdown" | "plaintext" => (Complexity::Simple, Mood::Calm, CodeType::Utility, "ambient"),
        _ => (Complexity::Moderate, Mood::Focused, CodeType::Utility, "lo-fi"),
    };
    LanguageDefault {
        complexity,
        mood,
        code_type,
        genre,
    }
}

/// Default signal for `language`; numeric hints are left to the tier draw
pub fn fallback_signal(language: &str) -> CodeSignal {
    let default = language_default(language);
    CodeSignal {
        complexity: default.complexity,
        mood: default.mood,
        patterns: BTreeSet::new(),
        code_type: default.code_type,
        recommended_bpm: None,
        energy: None,
        genre: default.genre.to_string(),
        description: format!("Default profile for {}", display_language(language)),
    }
}

fn display_language(language: &str) -> &str {
    let trimmed = language.trim();
    if trimmed.is_empty() {
        "unknown language"
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_language_profile() {
        let signal = fallback_signal("Rust");
        assert_eq!(signal.complexity, Complexity::Complex);
        assert_eq!(signal.code_type, CodeType::Algorithm);
        assert_eq!(signal.recommended_bpm, None);
        assert_eq!(signal.energy, None);
    }

    #[test]
    fn test_unknown_language_uses_neutral_profile() {
        let signal = fallback_signal("");
        assert_eq!(signal.complexity, Complexity::Moderate);
        assert_eq!(signal.genre, "lo-fi");
        assert_eq!(signal.description, "Default profile for unknown language");
    }
}

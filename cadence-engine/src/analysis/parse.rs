//! Extraction and validation of model replies
//!
//! The analysis model answers in free text that usually, but not always,
//! contains a JSON object. The first balanced `{...}` found anywhere in the
//! reply is taken; later candidates are ignored.

use super::fallback::fallback_signal;
use super::AnalysisError;
use cadence_common::{CodeSignal, CodeType, Complexity, Mood};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

/// Byte slice of the first balanced JSON object in `text`
///
/// Braces inside string literals (including escaped quotes) do not count.
pub fn extract_first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Unvalidated reply fields; accepts snake_case and camelCase keys
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSignal {
    complexity: Option<Value>,
    mood: Option<Value>,
    patterns: Option<Value>,
    #[serde(alias = "codeType")]
    code_type: Option<Value>,
    #[serde(alias = "recommendedBPM", alias = "recommendedBpm")]
    recommended_bpm: Option<Value>,
    energy: Option<Value>,
    genre: Option<Value>,
    description: Option<Value>,
}

/// Parse a model reply into a validated signal
///
/// Errors only when no usable JSON object exists; individual invalid fields
/// are replaced from the language default.
pub fn parse_signal(reply: &str, language: &str) -> Result<CodeSignal, AnalysisError> {
    let json = extract_first_json_object(reply).ok_or(AnalysisError::NoJson)?;
    let raw: RawSignal =
        serde_json::from_str(json).map_err(|e| AnalysisError::Parse(e.to_string()))?;
    Ok(validate(raw, language))
}

fn validate(raw: RawSignal, language: &str) -> CodeSignal {
    let default = fallback_signal(language);

    let complexity = label(&raw.complexity).and_then(Complexity::parse);
    let mood = label(&raw.mood).and_then(Mood::parse);
    let code_type = label(&raw.code_type).and_then(CodeType::parse);
    if complexity.is_none() || mood.is_none() || code_type.is_none() {
        debug!(language = %language, "Replacing invalid enum fields with language defaults");
    }

    CodeSignal {
        complexity: complexity.unwrap_or(default.complexity),
        mood: mood.unwrap_or(default.mood),
        patterns: patterns(raw.patterns.as_ref()),
        code_type: code_type.unwrap_or(default.code_type),
        recommended_bpm: CodeSignal::validated_bpm(integer(&raw.recommended_bpm)),
        energy: CodeSignal::validated_energy(integer(&raw.energy)),
        genre: text(&raw.genre).unwrap_or(default.genre),
        description: text(&raw.description).unwrap_or(default.description),
    }
}

fn label(value: &Option<Value>) -> Option<&str> {
    value.as_ref().and_then(Value::as_str)
}

fn text(value: &Option<Value>) -> Option<String> {
    label(value)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Integer hint; accepts numbers and numeric strings, rounds fractions
fn integer(value: &Option<Value>) -> Option<i64> {
    match value.as_ref()? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    }
}

fn patterns(value: Option<&Value>) -> BTreeSet<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect(),
        _ => BTreeSet::new(),
    }
}

//! Stage 3: prompt rendering
//!
//! Shared by the code and diagnostic pipelines. Rendering is a pure function of
//! the request's other fields; the existing `prompt` value is ignored and no
//! numeric field is touched.

use cadence_common::MusicRequest;

/// Instruments mentioned in a prompt
pub const MAX_PROMPT_INSTRUMENTS: usize = 4;

/// Line count at which the stress tier turns high
const HIGH_STRESS_LINES: usize = 150;
/// Line count at which the stress tier turns medium
const MEDIUM_STRESS_LINES: usize = 50;
/// Below this tempo an unstressed request reads as calm
const CALM_BPM: u32 = 70;

/// Families kept in the instrument clause under high stress
const HIGH_STRESS_FAMILIES: [&str; 6] = ["percussion", "drum", "strings", "brass", "orchestral", "piano"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StressLevel {
    High,
    Medium,
    Calm,
    Steady,
}

impl StressLevel {
    pub fn clause(&self) -> &'static str {
        match self {
            StressLevel::High => "High-stress, urgent atmosphere with mounting tension",
            StressLevel::Medium => "Moderate tension with focused intensity",
            StressLevel::Calm => "Calm, relaxed atmosphere",
            StressLevel::Steady => "Steady, comfortable flow",
        }
    }
}

/// Line count recorded in a `N_lines` tag, if any
pub fn tagged_line_count(request: &MusicRequest) -> Option<usize> {
    request
        .tags
        .iter()
        .find_map(|tag| tag.strip_suffix("_lines").and_then(|n| n.parse().ok()))
}

pub fn stress_level(request: &MusicRequest) -> StressLevel {
    let lines = tagged_line_count(request).unwrap_or(0);
    let complexity = request.complexity.as_str();

    if request.has_tag("high_stress") || lines >= HIGH_STRESS_LINES || complexity == "very_complex" {
        StressLevel::High
    } else if lines >= MEDIUM_STRESS_LINES || complexity == "complex" {
        StressLevel::Medium
    } else if request.bpm < CALM_BPM {
        StressLevel::Calm
    } else {
        StressLevel::Steady
    }
}

/// Pick at most four instruments for the prompt
///
/// Under high stress, percussion/strings/brass/orchestral/piano instruments
/// are preferred; when none qualify the list order is used as-is.
pub fn prompt_instruments(instruments: &[String], level: StressLevel) -> Vec<String> {
    if level == StressLevel::High {
        let filtered: Vec<String> = instruments
            .iter()
            .filter(|instrument| {
                let lower = instrument.to_lowercase();
                HIGH_STRESS_FAMILIES.iter().any(|family| lower.contains(family))
            })
            .take(MAX_PROMPT_INSTRUMENTS)
            .cloned()
            .collect();
        if !filtered.is_empty() {
            return filtered;
        }
    }

    instruments.iter().take(MAX_PROMPT_INSTRUMENTS).cloned().collect()
}

/// Render the natural-language prompt for a request
pub fn render_prompt(request: &MusicRequest) -> String {
    let level = stress_level(request);
    let instruments = prompt_instruments(&request.instruments, level);

    let mut sentences = vec![
        format!("{} at {} BPM with a {} mood", request.genre, request.bpm, request.mood),
        level.clause().to_string(),
    ];
    if !instruments.is_empty() {
        sentences.push(format!("Featuring {}", instruments.join(", ")));
    }
    sentences.push(format!(
        "{} musical complexity",
        capitalize(&request.complexity.replace('_', " "))
    ));
    sentences.push(format!(
        "Energy {:.1}/10, {} seconds, instrumental",
        request.energy, request.duration
    ));

    let mut prompt = sentences.join(". ");
    prompt.push('.');
    capitalize(&prompt)
}

/// Return a copy of `request` carrying its rendered prompt
pub fn with_prompt(request: &MusicRequest) -> MusicRequest {
    MusicRequest {
        prompt: render_prompt(request),
        ..request.clone()
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

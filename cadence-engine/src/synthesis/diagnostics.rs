//! Diagnostic feedback synthesizer
//!
//! Maps error/warning counts and their trend to a fixed severity profile.
//! Any drop in the error count selects the hopeful profile, whatever the
//! remaining magnitude.

use super::profiles::{severity_profile, to_strings, FixedProfile, Severity, HOPEFUL_PROFILE};
use super::prompt;
use cadence_common::MusicRequest;

/// Assessment of a diagnostics snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiagnosticAssessment {
    pub is_improving: bool,
    /// errors + 0.5 × warnings
    pub total_issues: f64,
    /// `None` when improving (severity is not consulted)
    pub severity: Option<Severity>,
}

/// Severity from counts
///
/// Critical needs both a high error count and a high weighted total; the
/// lower buckets are reached by either measure alone.
pub fn severity(error_count: u32, total_issues: f64) -> Severity {
    if error_count >= 10 && total_issues >= 15.0 {
        Severity::Critical
    } else if error_count >= 5 || total_issues >= 10.0 {
        Severity::High
    } else if error_count >= 2 || total_issues >= 5.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

pub fn assess(error_count: u32, warning_count: u32, previous_error_count: Option<u32>) -> DiagnosticAssessment {
    let is_improving = previous_error_count.is_some_and(|previous| error_count < previous);
    let total_issues = error_count as f64 + 0.5 * warning_count as f64;

    DiagnosticAssessment {
        is_improving,
        total_issues,
        severity: (!is_improving).then(|| severity(error_count, total_issues)),
    }
}

/// Diagnostics → music request synthesizer
#[derive(Debug, Clone, Default)]
pub struct DiagnosticSynthesizer;

impl DiagnosticSynthesizer {
    pub fn new() -> Self {
        Self
    }

    pub fn synthesize(
        &self,
        error_count: u32,
        warning_count: u32,
        previous_error_count: Option<u32>,
    ) -> MusicRequest {
        let assessment = assess(error_count, warning_count, previous_error_count);

        let (profile, label): (FixedProfile, &str) = match assessment.severity {
            None => (HOPEFUL_PROFILE, "improving"),
            Some(severity) => (severity_profile(severity), severity.as_str()),
        };

        let mut tags = vec![label.to_string(), "diagnostics".to_string()];
        if matches!(assessment.severity, Some(Severity::High | Severity::Critical)) {
            tags.push("high_stress".to_string());
        }
        tags.push(format!("{}_errors", error_count));
        tags.push(format!("{}_warnings", warning_count));

        let request = MusicRequest {
            bpm: profile.bpm,
            mood: profile.mood.to_string(),
            genre: profile.genre.to_string(),
            energy: profile.energy,
            complexity: profile.complexity.to_string(),
            instruments: to_strings(profile.instruments),
            structure: profile.structure.to_string(),
            duration: profile.duration,
            tags,
            prompt: String::new(),
            context: format!("diagnostic feedback: {}", label),
        };

        prompt::with_prompt(&request)
    }
}

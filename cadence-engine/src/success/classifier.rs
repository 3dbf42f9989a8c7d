//! Success classifier
//!
//! Scores an event's text against the pattern table and decides whether to
//! celebrate. A cooldown window suppresses the burst of correlated signals a
//! single command produces (task end + terminal output + diagnostics).

use super::patterns::{success_patterns, SuccessPattern};
use super::{Celebration, CelebrationSource, SuccessEvent, SuccessEventKind};
use crate::synthesis::celebration_request;
use cadence_common::config::CelebrationConfig;
use cadence_common::CelebrationType;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Confidence of a decision made from a zero exit code
pub const EXIT_CODE_CONFIDENCE: f64 = 0.9;

/// Keyword sets for task commands, checked in order
static EXIT_CODE_KEYWORDS: Lazy<Vec<(Regex, CelebrationType)>> = Lazy::new(|| {
    [
        (r"(?i)\b(deploy|docker push|kubectl apply|helm upgrade|publish|release)\b", CelebrationType::Deployment),
        (r"(?i)\b(tests?|jest|mocha|pytest|vitest|spec)\b", CelebrationType::TestPass),
        (r"(?i)\b(build|compile|tsc|make|webpack|gradle|mvn)\b", CelebrationType::CompilationSuccess),
    ]
    .into_iter()
    .map(|(pattern, celebration)| (Regex::new(pattern).expect("invalid task keyword pattern"), celebration))
    .collect()
});

/// Celebration type for a task command, by keyword
pub fn task_celebration_type(task_name: &str, command: &str) -> Option<CelebrationType> {
    let text = format!("{} {}", task_name, command);
    EXIT_CODE_KEYWORDS
        .iter()
        .find(|(re, _)| re.is_match(&text))
        .map(|(_, celebration)| *celebration)
}

/// Cooldown-gated success classifier
///
/// Holds the only mutable state of success detection: the time of the last
/// accepted celebration. One instance per session.
pub struct SuccessClassifier {
    cooldown: Duration,
    acceptance_ratio: f64,
    patterns: &'static [SuccessPattern],
    last_celebration: Option<Instant>,
}

impl SuccessClassifier {
    pub fn new(config: &CelebrationConfig) -> Self {
        Self::with_settings(config.cooldown(), config.acceptance_ratio)
    }

    pub fn with_settings(cooldown: Duration, acceptance_ratio: f64) -> Self {
        Self {
            cooldown,
            acceptance_ratio,
            patterns: success_patterns(),
            last_celebration: None,
        }
    }

    /// Classify at the current time
    pub fn classify(&mut self, event: &SuccessEvent) -> Option<Celebration> {
        self.classify_at(event, Instant::now())
    }

    /// Classify as if observed at `now`
    pub fn classify_at(&mut self, event: &SuccessEvent, now: Instant) -> Option<Celebration> {
        if let Some(last) = self.last_celebration {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.cooldown {
                debug!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Success event ignored during cooldown"
                );
                return None;
            }
        }

        let (celebration_type, confidence, description, source) = self.decide(event)?;

        self.last_celebration = Some(now);
        info!(
            celebration = %celebration_type,
            confidence,
            source = ?source,
            "Celebration accepted: {}",
            description
        );

        Some(Celebration {
            celebration_type,
            confidence,
            description,
            source,
            request: celebration_request(celebration_type),
        })
    }

    /// Reset the cooldown (used when the user stops playback manually)
    pub fn reset_cooldown(&mut self) {
        self.last_celebration = None;
    }

    /// Highest-scoring accepted pattern for `text`
    pub fn best_pattern(&self, text: &str) -> Option<(&'static SuccessPattern, f64)> {
        let lowered = text.to_lowercase();
        let mut best: Option<(&'static SuccessPattern, f64)> = None;

        for pattern in self.patterns {
            let score = pattern.score(text, &lowered);
            if score <= 0.0 || score < self.acceptance_ratio * pattern.confidence {
                continue;
            }
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((pattern, score));
            }
        }

        best
    }

    fn decide(&self, event: &SuccessEvent) -> Option<(CelebrationType, f64, String, CelebrationSource)> {
        if let SuccessEventKind::Manual {
            description,
            celebration_type: Some(celebration_type),
        } = &event.kind
        {
            return Some((*celebration_type, 1.0, description.clone(), CelebrationSource::Manual));
        }

        // A task only counts once it has exited cleanly
        if let SuccessEventKind::TaskSuccess { exit_code, .. } = &event.kind {
            if *exit_code != Some(0) {
                debug!(exit_code = ?exit_code, "Task did not exit cleanly");
                return None;
            }
        }

        let text = event.analyzable_text();
        if let Some((pattern, score)) = self.best_pattern(&text) {
            return Some((
                pattern.celebration_type,
                score,
                pattern.description.to_string(),
                CelebrationSource::Pattern,
            ));
        }

        // Only reached when the general table found nothing
        if let SuccessEventKind::TaskSuccess {
            task_name,
            command,
            exit_code: Some(0),
        } = &event.kind
        {
            if let Some(celebration_type) = task_celebration_type(task_name, command) {
                return Some((
                    celebration_type,
                    EXIT_CODE_CONFIDENCE,
                    format!("Task '{}' exited cleanly", task_name),
                    CelebrationSource::ExitCode,
                ));
            }
        }

        None
    }
}

//! Success detection
//!
//! Observers (terminal, task runner, diagnostics, filesystem) produce
//! [`SuccessEvent`]s; the [`SuccessClassifier`] decides whether one deserves a
//! celebration.

pub mod classifier;
pub mod patterns;

pub use classifier::SuccessClassifier;

use cadence_common::{CelebrationType, MusicRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind-specific payload of a success event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SuccessEventKind {
    /// Text written to an integrated terminal
    TerminalOutput { message: String },
    /// A task process ended
    TaskSuccess {
        task_name: String,
        command: String,
        exit_code: Option<i32>,
    },
    /// Error count on a resource went down
    DiagnosticImprovement { previous_errors: u32, current_errors: u32 },
    /// A file appeared under a build-output path
    FileSystem { path: String },
    /// User asked for a celebration
    Manual {
        description: String,
        #[serde(default)]
        celebration_type: Option<CelebrationType>,
    },
}

/// One observed occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessEvent {
    #[serde(flatten)]
    pub kind: SuccessEventKind,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl SuccessEvent {
    pub fn new(kind: SuccessEventKind) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
        }
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        Self::new(SuccessEventKind::TerminalOutput {
            message: message.into(),
        })
    }

    pub fn task(task_name: impl Into<String>, command: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::new(SuccessEventKind::TaskSuccess {
            task_name: task_name.into(),
            command: command.into(),
            exit_code,
        })
    }

    /// Single analyzable text for pattern scoring
    pub fn analyzable_text(&self) -> String {
        match &self.kind {
            SuccessEventKind::TerminalOutput { message } => message.clone(),
            SuccessEventKind::TaskSuccess { task_name, command, .. } => {
                format!("Task {} with command {} completed", task_name, command)
            }
            SuccessEventKind::DiagnosticImprovement {
                previous_errors,
                current_errors,
            } => {
                if *current_errors == 0 {
                    format!(
                        "Errors reduced from {} to 0, all errors resolved",
                        previous_errors
                    )
                } else {
                    format!("Errors reduced from {} to {}", previous_errors, current_errors)
                }
            }
            SuccessEventKind::FileSystem { path } => format!("Build output created: {}", path),
            SuccessEventKind::Manual { description, .. } => description.clone(),
        }
    }
}

/// What produced an accepted decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CelebrationSource {
    /// General pattern table
    Pattern,
    /// Zero exit code on a recognised build/test/deploy task
    ExitCode,
    /// Explicit manual request
    Manual,
}

/// Accepted celebration decision
#[derive(Debug, Clone, PartialEq)]
pub struct Celebration {
    pub celebration_type: CelebrationType,
    pub confidence: f64,
    pub description: String,
    pub source: CelebrationSource,
    /// Request to hand to the generation lifecycle
    pub request: MusicRequest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_text_mentions_task_and_command() {
        let event = SuccessEvent::task("unit tests", "npx jest", Some(0));
        assert_eq!(event.analyzable_text(), "Task unit tests with command npx jest completed");
    }

    #[test]
    fn test_diagnostic_text_notes_full_resolution() {
        let event = SuccessEvent::new(SuccessEventKind::DiagnosticImprovement {
            previous_errors: 4,
            current_errors: 0,
        });
        assert!(event.analyzable_text().contains("all errors resolved"));

        let event = SuccessEvent::new(SuccessEventKind::DiagnosticImprovement {
            previous_errors: 4,
            current_errors: 2,
        });
        assert_eq!(event.analyzable_text(), "Errors reduced from 4 to 2");
    }

    #[test]
    fn test_event_deserializes_from_flat_json() {
        let event: SuccessEvent = serde_json::from_str(
            r#"{"kind":"task_success","task_name":"build","command":"cargo build","exit_code":0}"#,
        )
        .unwrap();
        assert!(matches!(
            event.kind,
            SuccessEventKind::TaskSuccess { exit_code: Some(0), .. }
        ));
    }
}

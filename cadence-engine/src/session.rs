//! Editor session loop
//!
//! Single consumer of everything the editor integration delivers. Document
//! edits are debounced per URI and analysed off-loop; results come back over
//! an internal channel and are discarded if the document changed meanwhile.
//! Diagnostics and success events are handled inline.

use crate::analysis::{Analysis, CodeAnalyzer};
use crate::debounce::Debouncer;
use crate::generation::GenerationLifecycle;
use crate::playback::Player;
use crate::success::{Celebration, SuccessClassifier, SuccessEvent, SuccessEventKind};
use crate::synthesis::diagnostics::DiagnosticSynthesizer;
use crate::synthesis::{complexity_score, ParameterSynthesizer};
use cadence_common::config::TomlConfig;
use cadence_common::events::{CadenceEvent, EventBus};
use cadence_common::MusicRequest;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Event delivered by the editor integration
///
/// Deserialisable from JSON lines, e.g.
/// `{"type":"document_changed","uri":"file:///a.rs","language":"rust","text":"..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditorEvent {
    DocumentChanged {
        uri: String,
        language: String,
        text: String,
    },
    DiagnosticsChanged {
        uri: String,
        errors: u32,
        warnings: u32,
    },
    DocumentClosed {
        uri: String,
    },
    Success(SuccessEvent),
    Stop,
    Mute,
    Unmute,
    Shutdown,
}

struct TrackedDocument {
    language: String,
    text: String,
    version: u64,
}

struct AnalysisDone {
    uri: String,
    version: u64,
    language: String,
    line_count: usize,
    analysis: Analysis,
}

pub struct Session {
    analyzer: CodeAnalyzer,
    synthesizer: ParameterSynthesizer,
    diagnostics: DiagnosticSynthesizer,
    classifier: SuccessClassifier,
    lifecycle: GenerationLifecycle,
    player: Arc<dyn Player>,
    bus: EventBus,
    debouncer: Debouncer<String>,
    documents: HashMap<String, TrackedDocument>,
    /// Last (errors, warnings) seen per URI
    diagnostic_counts: HashMap<String, (u32, u32)>,
    celebrations_enabled: bool,
    diagnostics_enabled: bool,
    results_tx: mpsc::UnboundedSender<AnalysisDone>,
    results_rx: mpsc::UnboundedReceiver<AnalysisDone>,
}

impl Session {
    pub fn new(
        config: &TomlConfig,
        analyzer: CodeAnalyzer,
        lifecycle: GenerationLifecycle,
        player: Arc<dyn Player>,
        bus: EventBus,
    ) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Self {
            analyzer,
            synthesizer: ParameterSynthesizer::new(),
            diagnostics: DiagnosticSynthesizer::new(),
            classifier: SuccessClassifier::new(&config.celebration),
            lifecycle,
            player,
            bus,
            debouncer: Debouncer::new(config.debounce.quiet_period()),
            documents: HashMap::new(),
            diagnostic_counts: HashMap::new(),
            celebrations_enabled: config.celebration.enabled,
            diagnostics_enabled: config.diagnostics.enabled,
            results_tx,
            results_rx,
        }
    }

    /// Replace the synthesizer (seeded instances make runs reproducible)
    pub fn with_synthesizer(mut self, synthesizer: ParameterSynthesizer) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    /// Run until `Shutdown` or the event channel closes
    pub async fn run(mut self, mut events: mpsc::Receiver<EditorEvent>) {
        info!(
            quiet_period_ms = self.debouncer.quiet_period().as_millis() as u64,
            celebrations = self.celebrations_enabled,
            diagnostics = self.diagnostics_enabled,
            "Session started"
        );

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    None | Some(EditorEvent::Shutdown) => break,
                    Some(event) => self.handle_event(event).await,
                },
                Some(uri) = self.debouncer.next_due(), if !self.debouncer.is_empty() => {
                    self.start_analysis(uri);
                }
                Some(done) = self.results_rx.recv() => {
                    self.finish_analysis(done).await;
                }
            }
        }

        self.lifecycle.stop().await;
        info!("Session stopped");
    }

    async fn handle_event(&mut self, event: EditorEvent) {
        match event {
            EditorEvent::DocumentChanged { uri, language, text } => {
                self.document_changed(uri, language, text);
            }
            EditorEvent::DiagnosticsChanged { uri, errors, warnings } => {
                self.diagnostics_changed(uri, errors, warnings).await;
            }
            EditorEvent::DocumentClosed { uri } => {
                self.document_closed(uri);
            }
            EditorEvent::Success(event) => {
                self.success(&event).await;
            }
            EditorEvent::Stop => {
                self.lifecycle.stop().await;
                self.classifier.reset_cooldown();
            }
            EditorEvent::Mute => {
                if let Err(e) = self.player.mute().await {
                    warn!("Mute failed: {}", e);
                }
            }
            EditorEvent::Unmute => {
                if let Err(e) = self.player.unmute().await {
                    warn!("Unmute failed: {}", e);
                }
            }
            // Handled by the loop
            EditorEvent::Shutdown => {}
        }
    }

    fn document_changed(&mut self, uri: String, language: String, text: String) {
        if text.trim().is_empty() {
            self.documents.remove(&uri);
            self.debouncer.cancel(&uri);
            return;
        }

        let version = self.documents.get(&uri).map_or(1, |doc| doc.version + 1);
        self.documents.insert(
            uri.clone(),
            TrackedDocument {
                language,
                text,
                version,
            },
        );
        debug!(uri = %uri, version, "Document changed");
        self.debouncer.touch(uri);
    }

    /// Forget everything tracked for `uri`; in-flight analysis becomes stale
    fn document_closed(&mut self, uri: String) {
        let tracked = self.documents.remove(&uri).is_some();
        self.diagnostic_counts.remove(&uri);
        self.debouncer.cancel(&uri);
        debug!(uri = %uri, tracked, "Document closed");
    }

    fn start_analysis(&mut self, uri: String) {
        let Some(document) = self.documents.get(&uri) else {
            return;
        };

        let analyzer = self.analyzer.clone();
        let results = self.results_tx.clone();
        let version = document.version;
        let language = document.language.clone();
        let text = document.text.clone();

        debug!(uri = %uri, version, language = %language, "Starting analysis");
        tokio::spawn(async move {
            let analysis = analyzer.analyze(&text, &language).await;
            let _ = results.send(AnalysisDone {
                uri,
                version,
                language,
                line_count: text.lines().count(),
                analysis,
            });
        });
    }

    async fn finish_analysis(&mut self, done: AnalysisDone) {
        let current = self.documents.get(&done.uri).map(|doc| doc.version);
        if current != Some(done.version) || self.debouncer.is_pending(&done.uri) {
            debug!(
                uri = %done.uri,
                version = done.version,
                current = ?current,
                "Discarding stale analysis"
            );
            return;
        }

        let request = self
            .synthesizer
            .synthesize(&done.analysis.signal, &done.language, done.line_count);
        let score = complexity_score(done.analysis.signal.complexity, done.line_count, request.energy);

        info!(
            uri = %done.uri,
            language = %done.language,
            lines = done.line_count,
            complexity = done.analysis.signal.complexity.as_str(),
            complexity_score = score,
            fallback = done.analysis.fallback,
            "Analysis completed"
        );
        self.bus.emit_lossy(CadenceEvent::AnalysisCompleted {
            document: done.uri,
            language: done.language,
            complexity: done.analysis.signal.complexity.as_str().to_string(),
            complexity_score: score,
            fallback: done.analysis.fallback,
            timestamp: Utc::now(),
        });

        self.generate(&request).await;
    }

    async fn diagnostics_changed(&mut self, uri: String, errors: u32, warnings: u32) {
        let previous = self.diagnostic_counts.insert(uri.clone(), (errors, warnings));
        if previous == Some((errors, warnings)) {
            return;
        }
        let previous_errors = previous.map(|(errors, _)| errors);

        if let Some(previous_errors) = previous_errors.filter(|&p| errors < p) {
            let event = SuccessEvent::new(SuccessEventKind::DiagnosticImprovement {
                previous_errors,
                current_errors: errors,
            });
            // A celebration replaces the diagnostic track
            if self.success(&event).await {
                return;
            }
        }

        if !self.diagnostics_enabled {
            return;
        }

        debug!(uri = %uri, errors, warnings, previous = ?previous_errors, "Diagnostics changed");
        let request = self.diagnostics.synthesize(errors, warnings, previous_errors);
        self.generate(&request).await;
    }

    /// Classify and, if accepted, celebrate; returns whether it did
    async fn success(&mut self, event: &SuccessEvent) -> bool {
        if !self.celebrations_enabled {
            return false;
        }
        match self.classifier.classify(event) {
            Some(celebration) => {
                self.celebrate(celebration).await;
                true
            }
            None => false,
        }
    }

    async fn celebrate(&mut self, celebration: Celebration) {
        self.bus.emit_lossy(CadenceEvent::CelebrationTriggered {
            celebration_type: celebration.celebration_type,
            confidence: celebration.confidence,
            description: celebration.description.clone(),
            timestamp: Utc::now(),
        });
        self.generate(&celebration.request).await;
    }

    async fn generate(&mut self, request: &MusicRequest) {
        let job = self.lifecycle.submit(request).await;
        debug!(job_id = %job.id, status = %job.status, context = %request.context, "Request dispatched");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editor_events_parse_from_json_lines() {
        let event: EditorEvent = serde_json::from_str(
            r#"{"type":"document_changed","uri":"file:///a.py","language":"python","text":"x = 1"}"#,
        )
        .unwrap();
        assert!(matches!(event, EditorEvent::DocumentChanged { ref language, .. } if language == "python"));

        let event: EditorEvent =
            serde_json::from_str(r#"{"type":"diagnostics_changed","uri":"a","errors":3,"warnings":1}"#).unwrap();
        assert_eq!(
            event,
            EditorEvent::DiagnosticsChanged {
                uri: "a".to_string(),
                errors: 3,
                warnings: 1
            }
        );

        let event: EditorEvent = serde_json::from_str(r#"{"type":"mute"}"#).unwrap();
        assert_eq!(event, EditorEvent::Mute);

        let event: EditorEvent =
            serde_json::from_str(r#"{"type":"document_closed","uri":"file:///a.py"}"#).unwrap();
        assert_eq!(
            event,
            EditorEvent::DocumentClosed {
                uri: "file:///a.py".to_string()
            }
        );
    }

    #[test]
    fn test_success_event_parses_nested_kind() {
        let event: EditorEvent = serde_json::from_str(
            r#"{"type":"success","kind":"task_success","task_name":"unit","command":"npx jest","exit_code":0}"#,
        )
        .unwrap();
        match event {
            EditorEvent::Success(success) => assert_eq!(
                success.kind,
                SuccessEventKind::TaskSuccess {
                    task_name: "unit".to_string(),
                    command: "npx jest".to_string(),
                    exit_code: Some(0),
                }
            ),
            other => panic!("unexpected event {:?}", other),
        }
    }
}

//! Session loop wiring: debounce, diagnostics, celebrations

use async_trait::async_trait;
use cadence_common::config::TomlConfig;
use cadence_common::events::{CadenceEvent, EventBus};
use cadence_engine::analysis::CodeAnalyzer;
use cadence_engine::generation::{
    ClipInfo, GenerationError, GenerationLifecycle, GenerationService, PollConfig, SubmitPayload,
};
use cadence_engine::playback::{AudioSource, PlaybackError, Player};
use cadence_engine::session::{EditorEvent, Session};
use cadence_engine::success::SuccessEvent;
use cadence_engine::ParameterSynthesizer;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Completes every job on submission
#[derive(Default)]
struct InstantService {
    prompts: Mutex<Vec<String>>,
    counter: AtomicUsize,
}

#[async_trait]
impl GenerationService for InstantService {
    async fn submit(&self, payload: &SubmitPayload) -> Result<ClipInfo, GenerationError> {
        self.prompts.lock().unwrap().push(payload.prompt.clone());
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(ClipInfo {
            id: format!("job-{}", n),
            status: "complete".to_string(),
            audio_url: Some(format!("https://cdn/{}.mp3", n)),
            title: None,
            image_url: None,
            metadata: None,
        })
    }

    async fn status(&self, job_id: &str) -> Result<Vec<ClipInfo>, GenerationError> {
        Err(GenerationError::JobNotFound(job_id.to_string()))
    }
}

#[derive(Default)]
struct SilentPlayer {
    muted: Mutex<bool>,
}

#[async_trait]
impl Player for SilentPlayer {
    async fn play(&self, _source: &AudioSource) -> Result<(), PlaybackError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), PlaybackError> {
        Ok(())
    }

    async fn mute(&self) -> Result<(), PlaybackError> {
        *self.muted.lock().unwrap() = true;
        Ok(())
    }

    async fn unmute(&self) -> Result<(), PlaybackError> {
        *self.muted.lock().unwrap() = false;
        Ok(())
    }
}

struct Harness {
    events: mpsc::Sender<EditorEvent>,
    outcomes: broadcast::Receiver<CadenceEvent>,
    service: Arc<InstantService>,
    player: Arc<SilentPlayer>,
    handle: JoinHandle<()>,
}

impl Harness {
    fn start() -> Self {
        let config = TomlConfig::default();
        let bus = EventBus::new(256);
        let outcomes = bus.subscribe();
        let service = Arc::new(InstantService::default());
        let player = Arc::new(SilentPlayer::default());

        let lifecycle = GenerationLifecycle::new(
            service.clone(),
            player.clone(),
            bus.clone(),
            PollConfig::from(&config.generation),
            true,
        );
        let session = Session::new(&config, CodeAnalyzer::offline(), lifecycle, player.clone(), bus)
            .with_synthesizer(ParameterSynthesizer::with_seed(1));

        let (events, rx) = mpsc::channel(16);
        let handle = tokio::spawn(session.run(rx));
        Self {
            events,
            outcomes,
            service,
            player,
            handle,
        }
    }

    async fn send(&self, event: EditorEvent) {
        self.events.send(event).await.unwrap();
    }

    fn drain(&mut self) -> Vec<CadenceEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.outcomes.try_recv() {
            events.push(event);
        }
        events
    }

    async fn shutdown(self) {
        self.send(EditorEvent::Shutdown).await;
        self.handle.await.unwrap();
    }
}

fn changed(text: &str) -> EditorEvent {
    EditorEvent::DocumentChanged {
        uri: "file:///src/lib.rs".to_string(),
        language: "rust".to_string(),
        text: text.to_string(),
    }
}

fn diagnostics(errors: u32, warnings: u32) -> EditorEvent {
    EditorEvent::DiagnosticsChanged {
        uri: "file:///src/lib.rs".to_string(),
        errors,
        warnings,
    }
}

#[tokio::test(start_paused = true)]
async fn test_rapid_edits_are_analysed_once() {
    let mut harness = Harness::start();

    harness.send(changed("fn a() {}")).await;
    tokio::time::sleep(Duration::from_millis(1000)).await;
    harness.send(changed("fn a() {}\nfn b() {}")).await;
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert!(harness.service.prompts.lock().unwrap().is_empty());

    tokio::time::sleep(Duration::from_millis(1000)).await;
    let events = harness.drain();
    let analyses: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            CadenceEvent::AnalysisCompleted { fallback, .. } => Some(*fallback),
            _ => None,
        })
        .collect();
    assert_eq!(analyses, vec![true]);
    assert_eq!(harness.service.prompts.lock().unwrap().len(), 1);

    harness.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_error_drop_to_zero_celebrates_instead_of_diagnostic_track() {
    let mut harness = Harness::start();

    harness.send(diagnostics(4, 1)).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    harness.send(diagnostics(0, 1)).await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    let events = harness.drain();
    let contexts: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            CadenceEvent::MusicRequested { context, .. } => Some(context.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        contexts,
        vec!["diagnostic feedback: medium".to_string(), "celebration:bug_fix".to_string()]
    );
    assert!(events
        .iter()
        .any(|e| matches!(e, CadenceEvent::CelebrationTriggered { .. })));

    harness.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_diagnostics_do_not_resubmit() {
    let harness = Harness::start();

    harness.send(diagnostics(2, 0)).await;
    harness.send(diagnostics(2, 0)).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(harness.service.prompts.lock().unwrap().len(), 1);

    harness.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_success_events_respect_cooldown() {
    let mut harness = Harness::start();

    harness
        .send(EditorEvent::Success(SuccessEvent::task("unit", "npx jest", Some(0))))
        .await;
    harness
        .send(EditorEvent::Success(SuccessEvent::terminal("Compiled successfully!")))
        .await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    let celebrations = harness
        .drain()
        .into_iter()
        .filter(|e| matches!(e, CadenceEvent::CelebrationTriggered { .. }))
        .count();
    assert_eq!(celebrations, 1);

    tokio::time::sleep(Duration::from_secs(5)).await;
    harness
        .send(EditorEvent::Success(SuccessEvent::terminal("Compiled successfully!")))
        .await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(harness
        .drain()
        .iter()
        .any(|e| matches!(e, CadenceEvent::CelebrationTriggered { .. })));

    harness.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_mute_and_unmute_reach_player() {
    let harness = Harness::start();

    harness.send(EditorEvent::Mute).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(*harness.player.muted.lock().unwrap());

    harness.send(EditorEvent::Unmute).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!*harness.player.muted.lock().unwrap());

    harness.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_closed_document_is_forgotten() {
    let mut harness = Harness::start();
    let uri = "file:///src/lib.rs".to_string();

    // Closing inside the quiet period drops the pending analysis
    harness.send(changed("fn a() {}")).await;
    harness
        .send(EditorEvent::DocumentClosed { uri: uri.clone() })
        .await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!harness
        .drain()
        .iter()
        .any(|e| matches!(e, CadenceEvent::AnalysisCompleted { .. })));

    // Counts recorded before the close no longer suppress the same report
    harness.send(diagnostics(2, 0)).await;
    harness.send(EditorEvent::DocumentClosed { uri }).await;
    harness.send(diagnostics(2, 0)).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(harness.service.prompts.lock().unwrap().len(), 2);

    harness.shutdown().await;
}

//! Generation lifecycle coordinator
//!
//! Owns at most one remote job at a time. `submit` cancels whatever is being
//! polled, hands the request to the generation service and spawns a poll task
//! that walks the job through `submitted → queued → streaming → complete|error`.
//!
//! Playback is handed off at the earliest safe moment: the live stream as soon
//! as a `streaming` observation carries an audio URL, then the final asset on
//! `complete`. Every player call from a poll task goes through the playback
//! gate, an epoch counter bumped on each submit/cancel, so a superseded poll
//! can never start audio after a newer submission.

use super::{GenerationJob, GenerationService, JobStatus, SubmitPayload};
use super::{ClipInfo, GenerationError};
use crate::playback::{AudioSource, Player};
use cadence_common::config::GenerationConfig;
use cadence_common::events::{CadenceEvent, EventBus};
use cadence_common::MusicRequest;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Shortest interval the poll loop will tick at
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Poll loop settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 60,
        }
    }
}

impl From<&GenerationConfig> for PollConfig {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            max_attempts: config.max_poll_attempts,
        }
    }
}

/// How a poll task ended
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed {
        job: GenerationJob,
    },
    Failed {
        job: GenerationJob,
        error_type: Option<String>,
        error_message: Option<String>,
    },
    TimedOut {
        job_id: String,
        last_status: JobStatus,
        attempts: u32,
    },
    Cancelled {
        job_id: String,
    },
}

impl PollOutcome {
    pub fn job_id(&self) -> &str {
        match self {
            PollOutcome::Completed { job } | PollOutcome::Failed { job, .. } => &job.id,
            PollOutcome::TimedOut { job_id, .. } | PollOutcome::Cancelled { job_id } => job_id,
        }
    }
}

struct ActivePoll {
    job_id: String,
    token: CancellationToken,
    handle: JoinHandle<PollOutcome>,
}

/// Submission + polling state machine
pub struct GenerationLifecycle {
    service: Arc<dyn GenerationService>,
    player: Arc<dyn Player>,
    bus: EventBus,
    config: PollConfig,
    instrumental: bool,
    active: Option<ActivePoll>,
    /// Playback gate: current submission epoch
    gate: Arc<Mutex<u64>>,
}

impl GenerationLifecycle {
    pub fn new(
        service: Arc<dyn GenerationService>,
        player: Arc<dyn Player>,
        bus: EventBus,
        config: PollConfig,
        instrumental: bool,
    ) -> Self {
        Self {
            service,
            player,
            bus,
            config,
            instrumental,
            active: None,
            gate: Arc::new(Mutex::new(0)),
        }
    }

    /// Submit a request, superseding any job currently being polled
    ///
    /// Never fails: a rejected submission comes back as an `error` job with a
    /// local id and nothing is polled.
    pub async fn submit(&mut self, request: &MusicRequest) -> GenerationJob {
        let epoch = self.cancel().await;

        self.bus.emit_lossy(CadenceEvent::MusicRequested {
            prompt: request.prompt.clone(),
            bpm: request.bpm,
            genre: request.genre.clone(),
            context: request.context.clone(),
            timestamp: Utc::now(),
        });

        let payload = SubmitPayload::from_request(request, self.instrumental);
        let clip = match self.service.submit(&payload).await {
            Ok(clip) => clip,
            Err(e) => {
                warn!(context = %request.context, "Generation submission failed: {}", e);
                self.bus.emit_lossy(CadenceEvent::GenerationSubmitFailed {
                    message: e.to_string(),
                    timestamp: Utc::now(),
                });
                return GenerationJob::failed_submission(request, e.to_string());
            }
        };

        let job = accepted_job(clip);
        info!(job_id = %job.id, status = %job.status, bpm = request.bpm, "Generation job submitted");
        self.bus.emit_lossy(CadenceEvent::GenerationSubmitted {
            job_id: job.id.clone(),
            timestamp: Utc::now(),
        });

        let token = CancellationToken::new();
        let task = PollTask {
            service: Arc::clone(&self.service),
            player: Arc::clone(&self.player),
            bus: self.bus.clone(),
            config: self.config,
            token: token.clone(),
            gate: Arc::clone(&self.gate),
            epoch,
        };
        let handle = tokio::spawn(task.run(job.clone()));

        self.active = Some(ActivePoll {
            job_id: job.id.clone(),
            token,
            handle,
        });
        job
    }

    /// Cancel the active poll (if any) and close the playback gate on it
    ///
    /// Returns the new epoch.
    pub async fn cancel(&mut self) -> u64 {
        // Taking the gate waits out any player call already in progress
        let epoch = {
            let mut gate = self.gate.lock().await;
            *gate += 1;
            *gate
        };

        if let Some(active) = self.active.take() {
            debug!(job_id = %active.job_id, "Cancelling active poll");
            active.token.cancel();
        }
        epoch
    }

    /// Cancel polling and silence the player
    pub async fn stop(&mut self) {
        self.cancel().await;
        if let Err(e) = self.player.stop().await {
            warn!("Failed to stop playback: {}", e);
        }
    }

    /// Wait for the active poll task to finish
    pub async fn wait(&mut self) -> Option<PollOutcome> {
        let active = self.active.take()?;
        match active.handle.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(job_id = %active.job_id, "Poll task panicked or was aborted: {}", e);
                None
            }
        }
    }

    pub fn is_polling(&self) -> bool {
        self.active
            .as_ref()
            .map_or(false, |active| !active.handle.is_finished())
    }

    pub fn active_job_id(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.job_id.as_str())
    }
}

/// Job record for an accepted submission
///
/// An unrecognised initial status is treated as `submitted`.
fn accepted_job(clip: ClipInfo) -> GenerationJob {
    match GenerationJob::from_clip(&clip) {
        Some(job) => job,
        None => {
            debug!(job_id = %clip.id, status = %clip.status, "Unrecognised initial status");
            let clip = ClipInfo {
                status: JobStatus::Submitted.as_str().to_string(),
                ..clip
            };
            GenerationJob::from_clip(&clip).unwrap_or_else(|| GenerationJob {
                id: clip.id.clone(),
                status: JobStatus::Submitted,
                audio_url: None,
                title: None,
                image_url: None,
                metadata: Default::default(),
            })
        }
    }
}

/// What the poll loop reacts to
type Observation = (JobStatus, bool);

fn observation(job: &GenerationJob) -> Observation {
    (job.status, job.audio_url.is_some())
}

struct PollTask {
    service: Arc<dyn GenerationService>,
    player: Arc<dyn Player>,
    bus: EventBus,
    config: PollConfig,
    token: CancellationToken,
    gate: Arc<Mutex<u64>>,
    epoch: u64,
}

impl PollTask {
    async fn run(self, submitted: GenerationJob) -> PollOutcome {
        let job_id = submitted.id.clone();
        let mut current = GenerationJob {
            status: JobStatus::Submitted,
            audio_url: None,
            ..submitted.clone()
        };
        let mut streaming_started = false;

        // The submission response may already carry progress
        if let Some(outcome) = self
            .observe(&mut current, submitted, &mut streaming_started)
            .await
        {
            return outcome;
        }

        let period = self.config.interval.max(MIN_POLL_INTERVAL);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for attempt in 1..=self.config.max_attempts {
            tokio::select! {
                _ = self.token.cancelled() => return self.cancelled(&job_id),
                _ = ticker.tick() => {}
            }

            let fetched = tokio::select! {
                _ = self.token.cancelled() => return self.cancelled(&job_id),
                fetched = self.service.status(&job_id) => fetched,
            };

            let clips = match fetched {
                Ok(clips) => clips,
                Err(GenerationError::Unauthorized) => {
                    error!(job_id = %job_id, "Generation service rejected credentials while polling");
                    return self.failed(
                        current,
                        Some("unauthorized".to_string()),
                        Some(GenerationError::Unauthorized.to_string()),
                    );
                }
                Err(e) => {
                    warn!(job_id = %job_id, attempt, "Status poll failed: {}", e);
                    continue;
                }
            };

            let clip = clips
                .iter()
                .find(|clip| clip.id == job_id)
                .or_else(|| clips.first());
            let Some(observed) = clip.and_then(GenerationJob::from_clip) else {
                debug!(job_id = %job_id, attempt, "No usable clip in status response");
                continue;
            };

            if let Some(outcome) = self
                .observe(&mut current, observed, &mut streaming_started)
                .await
            {
                return outcome;
            }
        }

        warn!(
            job_id = %job_id,
            last_status = %current.status,
            attempts = self.config.max_attempts,
            "Generation poll budget exhausted"
        );
        self.bus.emit_lossy(CadenceEvent::GenerationTimedOut {
            job_id: job_id.clone(),
            last_status: current.status.to_string(),
            attempts: self.config.max_attempts,
            timestamp: Utc::now(),
        });
        PollOutcome::TimedOut {
            job_id,
            last_status: current.status,
            attempts: self.config.max_attempts,
        }
    }

    /// Apply one observation; returns an outcome once the job is terminal
    async fn observe(
        &self,
        current: &mut GenerationJob,
        observed: GenerationJob,
        streaming_started: &mut bool,
    ) -> Option<PollOutcome> {
        if observation(&observed) == observation(current) {
            return None;
        }
        if observed.status != current.status && !current.status.can_advance_to(observed.status) {
            debug!(
                job_id = %current.id,
                from = %current.status,
                to = %observed.status,
                "Ignoring backward status report"
            );
            return None;
        }

        let previous = current.status;
        // A URL only carries over between reports of the same status: stream
        // and asset URLs name different resources
        let audio_url = match (&observed.audio_url, observed.status == previous) {
            (Some(url), _) => Some(url.clone()),
            (None, true) => current.audio_url.clone(),
            (None, false) => None,
        };
        *current = GenerationJob {
            audio_url,
            ..observed
        };

        if previous != current.status {
            debug!(job_id = %current.id, from = %previous, to = %current.status, "Job status changed");
            self.bus.emit_lossy(CadenceEvent::GenerationStatusChanged {
                job_id: current.id.clone(),
                old_status: previous.to_string(),
                new_status: current.status.to_string(),
                timestamp: Utc::now(),
            });
        }

        match current.status {
            JobStatus::Streaming => {
                if let (false, Some(url)) = (*streaming_started, current.audio_url.clone()) {
                    if self.play(&AudioSource::Stream(url.clone())).await {
                        *streaming_started = true;
                        info!(job_id = %current.id, "Streaming playback started");
                        self.bus.emit_lossy(CadenceEvent::StreamingStarted {
                            job_id: current.id.clone(),
                            audio_url: url,
                            timestamp: Utc::now(),
                        });
                    }
                }
                None
            }
            JobStatus::Complete => {
                match current.audio_url.clone() {
                    Some(url) => {
                        self.play(&AudioSource::Asset(url)).await;
                    }
                    None if *streaming_started => {
                        warn!(job_id = %current.id, "Job completed without an audio URL, keeping the stream")
                    }
                    None => warn!(job_id = %current.id, "Job completed without an audio URL"),
                }
                info!(job_id = %current.id, title = ?current.title, "Generation completed");
                self.bus.emit_lossy(CadenceEvent::GenerationCompleted {
                    job_id: current.id.clone(),
                    audio_url: current.audio_url.clone(),
                    title: current.title.clone(),
                    timestamp: Utc::now(),
                });
                Some(PollOutcome::Completed {
                    job: current.clone(),
                })
            }
            JobStatus::Error => {
                let error_type = current.metadata.error_type.clone();
                let error_message = current.metadata.error_message.clone();
                warn!(
                    job_id = %current.id,
                    error_type = ?error_type,
                    "Generation failed: {}",
                    error_message.as_deref().unwrap_or("no message")
                );
                Some(self.failed(current.clone(), error_type, error_message))
            }
            JobStatus::Submitted | JobStatus::Queued => None,
        }
    }

    /// Gated player call; false when this poll has been superseded
    async fn play(&self, source: &AudioSource) -> bool {
        let gate = self.gate.lock().await;
        if *gate != self.epoch || self.token.is_cancelled() {
            debug!(stream = source.is_stream(), "Superseded poll dropped playback handoff");
            return false;
        }
        match self.player.play(source).await {
            Ok(()) => true,
            Err(e) => {
                warn!(stream = source.is_stream(), "Playback handoff failed: {}", e);
                false
            }
        }
    }

    fn failed(
        &self,
        job: GenerationJob,
        error_type: Option<String>,
        error_message: Option<String>,
    ) -> PollOutcome {
        self.bus.emit_lossy(CadenceEvent::GenerationFailed {
            job_id: job.id.clone(),
            error_type: error_type.clone(),
            error_message: error_message.clone(),
            timestamp: Utc::now(),
        });
        PollOutcome::Failed {
            job,
            error_type,
            error_message,
        }
    }

    fn cancelled(&self, job_id: &str) -> PollOutcome {
        debug!(job_id = %job_id, "Poll cancelled");
        PollOutcome::Cancelled {
            job_id: job_id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(status: &str, audio: Option<&str>) -> ClipInfo {
        ClipInfo {
            id: "job-1".to_string(),
            status: status.to_string(),
            audio_url: audio.map(str::to_string),
            title: None,
            image_url: None,
            metadata: None,
        }
    }

    #[test]
    fn test_poll_config_from_generation_config() {
        let config = GenerationConfig {
            poll_interval_secs: 2,
            max_poll_attempts: 7,
            ..Default::default()
        };
        let poll = PollConfig::from(&config);
        assert_eq!(poll.interval, Duration::from_secs(2));
        assert_eq!(poll.max_attempts, 7);
    }

    #[test]
    fn test_accepted_job_defaults_unknown_status() {
        let job = accepted_job(clip("warming_up", None));
        assert_eq!(job.status, JobStatus::Submitted);
        assert_eq!(job.id, "job-1");
    }

    #[test]
    fn test_observation_includes_audio_presence() {
        let without = GenerationJob::from_clip(&clip("streaming", None)).unwrap();
        let with = GenerationJob::from_clip(&clip("streaming", Some("https://cdn/live"))).unwrap();
        assert_ne!(observation(&without), observation(&with));
    }
}

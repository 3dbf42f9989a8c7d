//! Player backed by an external command (ffplay, mpv, ...)

use super::{AudioSource, PlaybackError, Player};
use async_trait::async_trait;
use cadence_common::config::PlaybackConfig;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Default)]
struct ProcessState {
    child: Option<Child>,
    /// Source currently selected, kept while muted so unmute can resume it
    current: Option<AudioSource>,
    muted: bool,
}

/// Spawns one player process per source; a new `play` kills the previous one
pub struct ProcessPlayer {
    command: String,
    args: Vec<String>,
    state: Mutex<ProcessState>,
}

impl ProcessPlayer {
    pub fn new(config: &PlaybackConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            state: Mutex::new(ProcessState::default()),
        }
    }

    fn spawn(&self, source: &AudioSource) -> Result<Child, PlaybackError> {
        debug!(command = %self.command, url = %source.url(), "Spawning player process");
        Command::new(&self.command)
            .args(&self.args)
            .arg(source.url())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PlaybackError::Spawn {
                command: self.command.clone(),
                message: e.to_string(),
            })
    }

    /// Wait for the current player process, if any, to exit on its own
    pub async fn wait_idle(&self) -> Result<(), PlaybackError> {
        let mut state = self.state.lock().await;
        if let Some(child) = state.child.as_mut() {
            child
                .wait()
                .await
                .map_err(|e| PlaybackError::Stop(e.to_string()))?;
            state.child = None;
        }
        Ok(())
    }

    async fn kill(state: &mut ProcessState) -> Result<(), PlaybackError> {
        if let Some(mut child) = state.child.take() {
            if let Err(e) = child.kill().await {
                // Process may already have exited on its own
                if e.kind() != std::io::ErrorKind::InvalidInput {
                    return Err(PlaybackError::Stop(e.to_string()));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Player for ProcessPlayer {
    async fn play(&self, source: &AudioSource) -> Result<(), PlaybackError> {
        let mut state = self.state.lock().await;
        Self::kill(&mut state).await?;
        state.current = Some(source.clone());

        if state.muted {
            info!(stream = source.is_stream(), "Muted; source queued for unmute");
            return Ok(());
        }

        state.child = Some(self.spawn(source)?);
        info!(stream = source.is_stream(), url = %source.url(), "Playback started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), PlaybackError> {
        let mut state = self.state.lock().await;
        state.current = None;
        Self::kill(&mut state).await?;
        info!("Playback stopped");
        Ok(())
    }

    async fn mute(&self) -> Result<(), PlaybackError> {
        let mut state = self.state.lock().await;
        state.muted = true;
        Self::kill(&mut state).await
    }

    async fn unmute(&self) -> Result<(), PlaybackError> {
        let mut state = self.state.lock().await;
        if !state.muted {
            return Ok(());
        }
        state.muted = false;

        if let Some(source) = state.current.clone() {
            match self.spawn(&source) {
                Ok(child) => state.child = Some(child),
                Err(e) => {
                    warn!("Resume after unmute failed: {}", e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(command: &str) -> ProcessPlayer {
        ProcessPlayer::new(&PlaybackConfig {
            command: command.to_string(),
            args: Vec::new(),
        })
    }

    #[tokio::test]
    async fn test_missing_command_reports_spawn_error() {
        let player = player("cadence-definitely-not-a-player");
        let err = player
            .play(&AudioSource::Asset("https://cdn/a.mp3".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, PlaybackError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_play_while_muted_does_not_spawn() {
        let player = player("cadence-definitely-not-a-player");
        player.mute().await.unwrap();
        // Would fail if a process were spawned
        player
            .play(&AudioSource::Stream("https://cdn/live".to_string()))
            .await
            .unwrap();
        assert!(player.unmute().await.is_err());
    }

    #[tokio::test]
    async fn test_stop_without_process_is_ok() {
        let player = player("cadence-definitely-not-a-player");
        player.stop().await.unwrap();
    }
}

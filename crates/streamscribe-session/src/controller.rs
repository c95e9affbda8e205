use crate::session::StreamingSession;
use std::sync::Arc;
use std::time::Duration;
use streamscribe_audio::{frame_queue, AudioDeviceDirectory};
use streamscribe_core::{EndOutcome, SessionError, SessionSettings, SessionState, TranscriptEvent};
use tokio::sync::{mpsc, watch, Mutex};

/// What `stop()` found and did.
#[derive(Debug, Clone, PartialEq)]
pub enum StopOutcome {
    /// No session was active; nothing happened.
    WasIdle,
    /// The session wound down; the wrapped outcome says how cleanly.
    Stopped(EndOutcome),
}

/// The start/stop surface front-ends drive. Owns the single active
/// session; start and stop serialize through one lock so two sessions
/// can never run concurrently.
pub struct SessionController {
    directory: Arc<dyn AudioDeviceDirectory>,
    settings: SessionSettings,
    events: mpsc::UnboundedSender<TranscriptEvent>,
    state_tx: watch::Sender<SessionState>,
    active: Mutex<Option<StreamingSession>>,
}

impl SessionController {
    pub fn new(
        directory: Arc<dyn AudioDeviceDirectory>,
        settings: SessionSettings,
        events: mpsc::UnboundedSender<TranscriptEvent>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        Self {
            directory,
            settings,
            events,
            state_tx,
            active: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Watch the session lifecycle; front-ends use this for status display.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    /// Begin a new session capturing from `selector` ("default" for the
    /// default input device).
    ///
    /// Returns `AlreadyActive` if a session is live: a double-pressed
    /// start is safe and opens neither a second device nor a second
    /// connection. The device is opened before the network is touched,
    /// so a missing microphone fails without a connection attempt.
    pub async fn start(&self, selector: &str) -> Result<(), SessionError> {
        let mut active = self.active.lock().await;
        if let Some(session) = active.as_ref() {
            if !session.is_finished() {
                return Err(SessionError::AlreadyActive);
            }
            // The previous session reached a terminal state on its own.
            active.take();
        }

        let (frame_tx, frame_rx) = frame_queue();
        let capture = self
            .directory
            .open(selector, self.settings.audio_format(), frame_tx)?;

        self.state_tx.send_replace(SessionState::Connecting);
        match StreamingSession::connect(
            self.settings.clone(),
            frame_rx,
            capture,
            self.events.clone(),
            self.state_tx.clone(),
        )
        .await
        {
            Ok(session) => {
                *active = Some(session);
                Ok(())
            }
            Err(e) => {
                // The capture handle was consumed and dropped on the way,
                // so the device is already released.
                self.state_tx.send_replace(SessionState::Failed);
                Err(e)
            }
        }
    }

    /// Stop the active session: raise the stop signal, let the EOF
    /// handshake drain within the grace period, force-close past it.
    /// A no-op when nothing is active.
    pub async fn stop(&self) -> StopOutcome {
        let mut active = self.active.lock().await;
        let Some(mut session) = active.take() else {
            return StopOutcome::WasIdle;
        };

        if session.is_finished() {
            // Ended on its own (remote close or failure); just reap it.
            let _ = session.wait().await;
            self.state_tx.send_replace(SessionState::Idle);
            return StopOutcome::WasIdle;
        }

        self.state_tx.send_replace(SessionState::Draining);
        session.request_stop();

        // The receiver bounds its own drain by the grace period; the extra
        // margin covers task scheduling.
        let grace = self.settings.stop_grace + Duration::from_secs(1);
        let outcome = match tokio::time::timeout(grace, session.wait()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!("graceful stop overran the grace period, force-closing");
                session.force_abort();
                tokio::time::timeout(Duration::from_secs(2), session.wait())
                    .await
                    .unwrap_or(EndOutcome::ForcedClose)
            }
        };
        // The session object is released; the controller is idle again.
        self.state_tx.send_replace(SessionState::Idle);
        StopOutcome::Stopped(outcome)
    }
}

use crate::protocol::Envelope;
use crate::receiver::{ReceiverExit, ReceiverLoop};
use crate::sender::SenderLoop;
use chrono::Local;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use streamscribe_audio::{CaptureHandle, FrameQueue};
use streamscribe_core::{EndOutcome, SessionError, SessionSettings, SessionState, TranscriptEvent};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

pub(crate) type WsSink =
    SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
pub(crate) type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Header telling the service to take our samples as-is instead of
/// resampling server-side.
pub const RESAMPLE_HEADER: &str = "x-disable-resampling";

/// Last-inbound-activity clock shared between the loops: the receiver
/// stamps it on every inbound message, the sender reads it to decide
/// whether the keep-alive window has lapsed.
#[derive(Clone)]
pub(crate) struct Liveness(Arc<AtomicU64>);

impl Liveness {
    pub(crate) fn new() -> Self {
        let liveness = Self(Arc::new(AtomicU64::new(0)));
        liveness.touch();
        liveness
    }

    fn now_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    pub(crate) fn touch(&self) {
        self.0.store(Self::now_ms(), Ordering::SeqCst);
    }

    pub(crate) fn idle_for(&self) -> Duration {
        Duration::from_millis(Self::now_ms().saturating_sub(self.0.load(Ordering::SeqCst)))
    }
}

fn build_request(
    settings: &SessionSettings,
) -> Result<tokio_tungstenite::tungstenite::handshake::client::Request, SessionError> {
    let mut request = settings
        .endpoint
        .as_str()
        .into_client_request()
        .map_err(|e| SessionError::ConnectionFailure(format!("invalid endpoint: {e}")))?;

    if let Some(token) = &settings.auth_token {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| SessionError::ConnectionFailure(format!("invalid auth token: {e}")))?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }
    request.headers_mut().insert(
        HeaderName::from_static(RESAMPLE_HEADER),
        HeaderValue::from_static("true"),
    );

    Ok(request)
}

/// One end-to-end conversation with the recognition service.
///
/// `connect` performs the handshake (dial, then the config envelope,
/// always the first request on the wire) and spawns the sender loop,
/// the receiver loop, and a supervisor that joins both, releases the
/// capture device, and emits `SessionEnded` exactly once.
pub(crate) struct StreamingSession {
    stop: CancellationToken,
    abort: CancellationToken,
    supervisor: JoinHandle<EndOutcome>,
}

impl StreamingSession {
    pub(crate) async fn connect(
        settings: SessionSettings,
        frames: FrameQueue,
        capture: CaptureHandle,
        events: mpsc::UnboundedSender<TranscriptEvent>,
        state: watch::Sender<SessionState>,
    ) -> Result<Self, SessionError> {
        let request = build_request(&settings)?;
        let (ws, _response) = connect_async(request)
            .await
            .map_err(|e| SessionError::ConnectionFailure(e.to_string()))?;
        let (mut ws_tx, ws_rx) = ws.split();

        let config_json = Envelope::config(&settings).to_json()?;
        ws_tx
            .send(Message::Text(config_json.into()))
            .await
            .map_err(|e| SessionError::ConnectionFailure(format!("config send failed: {e}")))?;

        state.send_replace(SessionState::Streaming);
        let _ = events.send(TranscriptEvent::SessionBegan {
            started_at: Local::now(),
        });
        tracing::info!(endpoint = %settings.endpoint, "session streaming");

        let stop = CancellationToken::new();
        let abort = CancellationToken::new();
        let liveness = Liveness::new();

        let sender = SenderLoop {
            ws_tx,
            frames,
            stop: stop.clone(),
            abort: abort.clone(),
            liveness: liveness.clone(),
            keepalive_interval: settings.keepalive_interval,
            keepalive_timeout: settings.keepalive_timeout,
        };
        let receiver = ReceiverLoop {
            ws_rx,
            events: events.clone(),
            stop: stop.clone(),
            abort: abort.clone(),
            liveness,
            drain_grace: settings.stop_grace,
        };

        let sender_handle = tokio::spawn(sender.run());
        let receiver_handle = tokio::spawn(receiver.run());
        let supervisor = tokio::spawn(supervise(
            sender_handle,
            receiver_handle,
            capture,
            events,
            state,
        ));

        Ok(Self {
            stop,
            abort,
            supervisor,
        })
    }

    /// Raise the stop signal: the sender performs the EOF handshake, the
    /// receiver drains until close or the grace deadline.
    pub(crate) fn request_stop(&self) {
        self.stop.cancel();
    }

    /// Abandon the handshake and unblock both loops immediately.
    pub(crate) fn force_abort(&self) {
        self.abort.cancel();
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.supervisor.is_finished()
    }

    pub(crate) async fn wait(&mut self) -> EndOutcome {
        match (&mut self.supervisor).await {
            Ok(outcome) => outcome,
            Err(e) => EndOutcome::Failed(format!("session task failed: {e}")),
        }
    }
}

async fn supervise(
    sender: JoinHandle<Result<(), SessionError>>,
    receiver: JoinHandle<Result<ReceiverExit, SessionError>>,
    mut capture: CaptureHandle,
    events: mpsc::UnboundedSender<TranscriptEvent>,
    state: watch::Sender<SessionState>,
) -> EndOutcome {
    let sender_result = flatten(sender.await);
    // The sender is done pulling frames; release the microphone before
    // the drain finishes.
    capture.close();
    let receiver_result = flatten(receiver.await);

    let outcome = classify(sender_result, receiver_result);
    match &outcome {
        EndOutcome::Completed => tracing::info!("session closed"),
        EndOutcome::ForcedClose => tracing::warn!("session force-closed after grace period"),
        EndOutcome::Failed(cause) => tracing::error!(%cause, "session failed"),
    }

    let terminal = match outcome {
        EndOutcome::Failed(_) => SessionState::Failed,
        _ => SessionState::Closed,
    };
    state.send_replace(terminal);
    let _ = events.send(TranscriptEvent::SessionEnded {
        outcome: outcome.clone(),
    });
    outcome
}

fn flatten<T>(joined: Result<Result<T, SessionError>, tokio::task::JoinError>) -> Result<T, SessionError> {
    match joined {
        Ok(inner) => inner,
        Err(e) => Err(SessionError::ConnectionFailure(format!(
            "loop task failed: {e}"
        ))),
    }
}

/// Terminal-state classification: a completed EOF handshake is a normal
/// close, a drain that outlived the grace period is degraded but closed,
/// anything else that errored is a failure.
fn classify(
    sender: Result<(), SessionError>,
    receiver: Result<ReceiverExit, SessionError>,
) -> EndOutcome {
    match (sender, receiver) {
        (Ok(()), Ok(ReceiverExit::Done)) => EndOutcome::Completed,
        (Ok(()), Ok(ReceiverExit::Cancelled)) => EndOutcome::ForcedClose,
        (Err(e), _) => EndOutcome::Failed(e.to_string()),
        (Ok(()), Err(SessionError::StopTimeout)) => EndOutcome::ForcedClose,
        (Ok(()), Err(e)) => EndOutcome::Failed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_clean_drain_is_completed() {
        let outcome = classify(Ok(()), Ok(ReceiverExit::Done));
        assert_eq!(outcome, EndOutcome::Completed);
    }

    #[test]
    fn test_classify_drain_timeout_is_forced_close() {
        let outcome = classify(Ok(()), Err(SessionError::StopTimeout));
        assert_eq!(outcome, EndOutcome::ForcedClose);
    }

    #[test]
    fn test_classify_aborted_receiver_is_forced_close() {
        let outcome = classify(Ok(()), Ok(ReceiverExit::Cancelled));
        assert_eq!(outcome, EndOutcome::ForcedClose);
    }

    #[test]
    fn test_classify_sender_failure_wins() {
        let outcome = classify(
            Err(SessionError::ConnectionFailure("broken pipe".to_string())),
            Ok(ReceiverExit::Cancelled),
        );
        match outcome {
            EndOutcome::Failed(cause) => assert!(cause.contains("broken pipe")),
            _ => panic!("expected Failed"),
        }
    }

    #[test]
    fn test_classify_transport_drop_is_failure() {
        let outcome = classify(
            Ok(()),
            Err(SessionError::TransportClosed("reset".to_string())),
        );
        assert!(matches!(outcome, EndOutcome::Failed(_)));
    }

    #[test]
    fn test_liveness_touch_resets_idle() {
        let liveness = Liveness::new();
        std::thread::sleep(Duration::from_millis(15));
        assert!(liveness.idle_for() >= Duration::from_millis(10));
        liveness.touch();
        assert!(liveness.idle_for() < Duration::from_millis(10));
    }

    #[test]
    fn test_build_request_carries_headers() {
        let settings = SessionSettings {
            endpoint: "ws://127.0.0.1:9010/recognize".to_string(),
            auth_token: Some("tok123".to_string()),
            ..SessionSettings::default()
        };
        let request = build_request(&settings).unwrap();
        assert_eq!(
            request.headers().get(AUTHORIZATION).unwrap(),
            "Bearer tok123"
        );
        assert_eq!(request.headers().get(RESAMPLE_HEADER).unwrap(), "true");
    }

    #[test]
    fn test_build_request_without_token_omits_authorization() {
        let settings = SessionSettings::default();
        let request = build_request(&settings).unwrap();
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_build_request_rejects_bad_endpoint() {
        let settings = SessionSettings {
            endpoint: "not a url".to_string(),
            ..SessionSettings::default()
        };
        assert!(matches!(
            build_request(&settings),
            Err(SessionError::ConnectionFailure(_))
        ));
    }
}

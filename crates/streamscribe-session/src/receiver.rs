use crate::protocol::Envelope;
use crate::session::{Liveness, WsSource};
use futures_util::StreamExt;
use std::time::Duration;
use streamscribe_core::{SessionError, TranscriptEvent};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

#[derive(Debug, PartialEq)]
pub(crate) enum ReceiverExit {
    /// Connection closed after the session requested draining.
    Done,
    /// Unblocked by the abort token; the failure is reported elsewhere.
    Cancelled,
}

/// Reads inbound envelopes, classifies results as interim or final, and
/// forwards them on the event channel. Once the stop signal is raised
/// the remaining reads are bounded by the drain grace period.
pub(crate) struct ReceiverLoop {
    pub(crate) ws_rx: WsSource,
    pub(crate) events: mpsc::UnboundedSender<TranscriptEvent>,
    pub(crate) stop: CancellationToken,
    pub(crate) abort: CancellationToken,
    pub(crate) liveness: Liveness,
    pub(crate) drain_grace: Duration,
}

impl ReceiverLoop {
    pub(crate) async fn run(mut self) -> Result<ReceiverExit, SessionError> {
        let result = self.drive().await;
        if result.is_err() {
            self.abort.cancel();
        }
        result
    }

    async fn drive(&mut self) -> Result<ReceiverExit, SessionError> {
        let mut deadline: Option<tokio::time::Instant> = None;

        loop {
            // The sleep arm needs a target even while disabled.
            let drain_until = deadline
                .unwrap_or_else(|| tokio::time::Instant::now() + Duration::from_secs(3600));

            tokio::select! {
                _ = self.abort.cancelled() => {
                    return Ok(ReceiverExit::Cancelled);
                }

                _ = self.stop.cancelled(), if deadline.is_none() => {
                    deadline = Some(tokio::time::Instant::now() + self.drain_grace);
                }

                _ = tokio::time::sleep_until(drain_until), if deadline.is_some() => {
                    return Err(SessionError::StopTimeout);
                }

                message = self.ws_rx.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            self.liveness.touch();
                            self.handle_text(&text);
                        }
                        Some(Ok(Message::Pong(_))) => {
                            self.liveness.touch();
                        }
                        // tungstenite queues the pong reply itself.
                        Some(Ok(Message::Ping(_))) => {
                            self.liveness.touch();
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            return self.closed("remote closed the connection");
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            return self.closed(&e.to_string());
                        }
                    }
                }
            }
        }
    }

    /// A close after the stop signal is the normal end of the EOF
    /// handshake; before it, the remote dropped us mid-stream.
    fn closed(&self, detail: &str) -> Result<ReceiverExit, SessionError> {
        if self.stop.is_cancelled() {
            Ok(ReceiverExit::Done)
        } else {
            Err(SessionError::TransportClosed(detail.to_string()))
        }
    }

    fn handle_text(&mut self, text: &str) {
        let envelope = match Envelope::parse(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                // Malformed inbound traffic is skipped, never session-fatal.
                tracing::warn!("skipping malformed inbound message: {}", e);
                return;
            }
        };

        let Envelope::Response(response) = envelope else {
            tracing::debug!("ignoring non-response inbound envelope");
            return;
        };

        for update in response.updates() {
            let event = if update.is_final {
                tracing::debug!(text = %update.text, "final result");
                TranscriptEvent::Final(update.text)
            } else {
                tracing::trace!(text = %update.text, "interim result");
                TranscriptEvent::Interim(update.text)
            };
            if self.events.send(event).is_err() {
                tracing::debug!("event consumer dropped, discarding result");
            }
        }
    }
}

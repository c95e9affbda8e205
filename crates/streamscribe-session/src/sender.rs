use crate::protocol::Envelope;
use crate::session::{Liveness, WsSink};
use futures_util::SinkExt;
use std::time::Duration;
use streamscribe_audio::FrameQueue;
use streamscribe_core::SessionError;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

/// Drains the frame queue onto the wire in capture order, keeps the
/// connection alive with pings, and performs the EOF handshake when the
/// stop signal is raised.
///
/// The wait for the next frame is a select over the queue and the two
/// cancellation tokens, so the loop wakes immediately on new audio or on
/// stop, never on a fixed-delay poll.
pub(crate) struct SenderLoop {
    pub(crate) ws_tx: WsSink,
    pub(crate) frames: FrameQueue,
    pub(crate) stop: CancellationToken,
    pub(crate) abort: CancellationToken,
    pub(crate) liveness: Liveness,
    pub(crate) keepalive_interval: Duration,
    pub(crate) keepalive_timeout: Duration,
}

impl SenderLoop {
    pub(crate) async fn run(mut self) -> Result<(), SessionError> {
        let result = self.drive().await;
        if result.is_err() {
            // Unblock the receiver; the session is over.
            self.abort.cancel();
        }
        result
    }

    async fn drive(&mut self) -> Result<(), SessionError> {
        let mut ping = tokio::time::interval(self.keepalive_interval);
        ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut frames_open = true;
        let mut sent = 0usize;

        loop {
            tokio::select! {
                biased;

                _ = self.stop.cancelled() => {
                    tracing::debug!(frames = sent, "stop signal observed, sending EOF");
                    return self.send_eof().await;
                }

                _ = self.abort.cancelled() => {
                    return Ok(());
                }

                frame = self.frames.recv(), if frames_open => {
                    match frame {
                        Some(frame) => {
                            let json = Envelope::audio(&frame.samples).to_json()?;
                            self.ws_tx
                                .send(Message::Text(json.into()))
                                .await
                                .map_err(|e| {
                                    SessionError::ConnectionFailure(format!(
                                        "audio write failed: {e}"
                                    ))
                                })?;
                            sent += 1;
                        }
                        None => {
                            // Capture closed without a stop signal; keep the
                            // connection alive and wait for stop.
                            frames_open = false;
                        }
                    }
                }

                _ = ping.tick() => {
                    if self.liveness.idle_for() > self.keepalive_timeout {
                        return Err(SessionError::ConnectionFailure(
                            "keep-alive timeout: no response within window".to_string(),
                        ));
                    }
                    self.ws_tx
                        .send(Message::Ping(Vec::new().into()))
                        .await
                        .map_err(|e| {
                            SessionError::ConnectionFailure(format!("ping failed: {e}"))
                        })?;
                }
            }
        }
    }

    async fn send_eof(&mut self) -> Result<(), SessionError> {
        let json = Envelope::eof().to_json()?;
        self.ws_tx
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| SessionError::TransportClosed(format!("EOF write failed: {e}")))?;
        let _ = self.ws_tx.flush().await;
        Ok(())
    }
}

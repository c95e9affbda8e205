use streamscribe_core::AudioFrame;
use tokio::sync::mpsc;

/// Producer half of the capture-to-sender handoff. `push` never blocks,
/// so it is safe to call from the audio callback.
#[derive(Clone)]
pub struct FrameSender {
    tx: mpsc::UnboundedSender<AudioFrame>,
}

impl FrameSender {
    pub fn push(&self, frame: AudioFrame) {
        // A dropped consumer means the session is gone; the frame is discarded.
        let _ = self.tx.send(frame);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half. `recv` suspends until a frame arrives or every sender
/// is dropped, so the sender loop can select over it together with the
/// stop signal instead of polling on a fixed delay.
pub struct FrameQueue {
    rx: mpsc::UnboundedReceiver<AudioFrame>,
}

impl FrameQueue {
    pub async fn recv(&mut self) -> Option<AudioFrame> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<AudioFrame> {
        self.rx.try_recv().ok()
    }
}

/// Create the queue pair shared between the capture callback and the
/// sender loop.
pub fn frame_queue() -> (FrameSender, FrameQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (FrameSender { tx }, FrameQueue { rx })
}

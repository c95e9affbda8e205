use crate::frame_queue::FrameSender;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig};
use streamscribe_core::{AudioError, AudioFormat, AudioFrame};

/// Handle to a running capture stream. The cpal stream itself lives on a
/// dedicated thread (it is not `Send`); this handle only signals it.
///
/// `close` is idempotent, and dropping the handle closes the stream too.
pub struct CaptureHandle {
    stop_tx: Option<std::sync::mpsc::Sender<()>>,
    join: Option<std::thread::JoinHandle<()>>,
}

impl CaptureHandle {
    pub fn close(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }

    /// Handle for a capture source that needs no teardown signal beyond
    /// thread shutdown (used by scripted directories).
    pub(crate) fn from_parts(
        stop_tx: std::sync::mpsc::Sender<()>,
        join: std::thread::JoinHandle<()>,
    ) -> Self {
        Self {
            stop_tx: Some(stop_tx),
            join: Some(join),
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Spawn the capture thread: build the input stream, start it, then park
/// until the handle is closed. The audio callback only accumulates
/// samples and pushes completed frames; no I/O, bounded time.
pub(crate) fn spawn_capture_thread(
    device: Device,
    format: AudioFormat,
    frames: FrameSender,
) -> Result<CaptureHandle, AudioError> {
    let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(), AudioError>>();
    let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();

    let join = std::thread::Builder::new()
        .name("capture".to_string())
        .spawn(move || {
            let config = StreamConfig {
                channels: 1,
                sample_rate: SampleRate(format.sample_rate),
                buffer_size: cpal::BufferSize::Fixed(format.frame_size as u32),
            };

            let sample_rate = format.sample_rate;
            let frame_size = format.frame_size;
            let mut pending: Vec<i16> = Vec::with_capacity(frame_size * 2);

            let err_callback = |err: cpal::StreamError| {
                tracing::error!("capture stream error: {}", err);
            };

            let stream = device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    pending.extend_from_slice(data);
                    while pending.len() >= frame_size {
                        let samples: Vec<i16> = pending.drain(..frame_size).collect();
                        frames.push(AudioFrame {
                            samples,
                            sample_rate,
                        });
                    }
                },
                err_callback,
                None,
            );

            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    let _ = ready_tx.send(Err(AudioError::StreamBuild(e.to_string())));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(AudioError::StreamBuild(e.to_string())));
                return;
            }

            let _ = ready_tx.send(Ok(()));

            // Parked until close(); returns on signal or handle drop.
            let _ = stop_rx.recv();
            drop(stream);
        })
        .map_err(|e| AudioError::StreamBuild(e.to_string()))?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(CaptureHandle {
            stop_tx: Some(stop_tx),
            join: Some(join),
        }),
        Ok(Err(e)) => {
            let _ = join.join();
            Err(e)
        }
        Err(_) => {
            let _ = join.join();
            Err(AudioError::StreamBuild(
                "capture thread exited during setup".to_string(),
            ))
        }
    }
}

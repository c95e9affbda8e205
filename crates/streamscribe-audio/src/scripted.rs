use crate::capture::CaptureHandle;
use crate::directory::AudioDeviceDirectory;
use crate::frame_queue::FrameSender;
use std::time::Duration;
use streamscribe_core::{AudioError, AudioFormat, AudioFrame};

/// A hardware-free device directory that replays a fixed list of frames.
/// Lets the full engine run in tests and headless environments where no
/// microphone exists.
///
/// Any selector other than `"default"` or `"scripted"` fails with
/// `DeviceUnavailable`, so device-missing paths are testable too.
pub struct ScriptedDirectory {
    frames: Vec<AudioFrame>,
    interval: Duration,
}

impl ScriptedDirectory {
    pub fn new(frames: Vec<AudioFrame>) -> Self {
        Self {
            frames,
            interval: Duration::from_millis(10),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl AudioDeviceDirectory for ScriptedDirectory {
    fn list_inputs(&self) -> Result<Vec<String>, AudioError> {
        Ok(vec!["scripted".to_string()])
    }

    fn open(
        &self,
        selector: &str,
        _format: AudioFormat,
        frames: FrameSender,
    ) -> Result<CaptureHandle, AudioError> {
        if selector != "default" && selector != "scripted" {
            return Err(AudioError::DeviceUnavailable(format!(
                "input device not found: {}",
                selector
            )));
        }

        let script = self.frames.clone();
        let interval = self.interval;
        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();

        let join = std::thread::Builder::new()
            .name("scripted-capture".to_string())
            .spawn(move || {
                for frame in script {
                    match stop_rx.recv_timeout(interval) {
                        Ok(()) | Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => return,
                        Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
                    }
                    frames.push(frame);
                }
                // Script exhausted; stay "open" until closed, like a quiet mic.
                let _ = stop_rx.recv();
            })
            .map_err(|e| AudioError::StreamBuild(e.to_string()))?;

        Ok(CaptureHandle::from_parts(stop_tx, join))
    }
}

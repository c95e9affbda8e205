use crate::capture::{spawn_capture_thread, CaptureHandle};
use crate::frame_queue::FrameSender;
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};
use streamscribe_core::{AudioError, AudioFormat};

/// Seam between the engine and the machine's audio devices. The engine
/// only needs "open the default or selected input and feed this queue";
/// front-ends may use `list_inputs` for device pickers.
pub trait AudioDeviceDirectory: Send + Sync {
    fn list_inputs(&self) -> Result<Vec<String>, AudioError>;

    fn open(
        &self,
        selector: &str,
        format: AudioFormat,
        frames: FrameSender,
    ) -> Result<CaptureHandle, AudioError>;
}

/// Directory over the system's default cpal host.
pub struct CpalDirectory {
    host: Host,
}

impl CpalDirectory {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    fn input_device(&self, selector: &str) -> Result<Device, AudioError> {
        if selector == "default" {
            return self.host.default_input_device().ok_or_else(|| {
                AudioError::DeviceUnavailable("no default input device".to_string())
            });
        }

        let devices = self
            .host
            .input_devices()
            .map_err(|e| AudioError::DeviceEnumeration(e.to_string()))?;
        for device in devices {
            if device.name().map(|n| n == selector).unwrap_or(false) {
                return Ok(device);
            }
        }
        Err(AudioError::DeviceUnavailable(format!(
            "input device not found: {}",
            selector
        )))
    }
}

impl Default for CpalDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioDeviceDirectory for CpalDirectory {
    fn list_inputs(&self) -> Result<Vec<String>, AudioError> {
        let devices = self
            .host
            .input_devices()
            .map_err(|e| AudioError::DeviceEnumeration(e.to_string()))?;

        let mut result = Vec::new();
        for device in devices {
            result.push(device.name().unwrap_or_else(|_| "unknown".to_string()));
        }
        Ok(result)
    }

    fn open(
        &self,
        selector: &str,
        format: AudioFormat,
        frames: FrameSender,
    ) -> Result<CaptureHandle, AudioError> {
        let device = self.input_device(selector)?;
        tracing::info!(
            device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_rate = format.sample_rate,
            frame_size = format.frame_size,
            "opening capture device"
        );
        spawn_capture_thread(device, format, frames)
    }
}

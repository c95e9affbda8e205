pub mod capture;
pub mod directory;
pub mod frame_queue;
pub mod scripted;

pub use capture::CaptureHandle;
pub use directory::{AudioDeviceDirectory, CpalDirectory};
pub use frame_queue::{frame_queue, FrameQueue, FrameSender};
pub use scripted::ScriptedDirectory;

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, SinkConfig};
pub use error::{AudioError, ConfigError, SessionError, SinkError};
pub use types::{
    AudioFormat, AudioFrame, EndOutcome, RecognitionUpdate, SessionSettings, SessionState,
    TranscriptEvent,
};

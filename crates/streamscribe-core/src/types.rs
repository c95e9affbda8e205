use chrono::{DateTime, Local};
use std::time::Duration;

/// One fixed-size block of captured audio: mono, signed 16-bit
/// little-endian samples. Frames carry no explicit sequence number;
/// FIFO order through the frame queue is the sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

/// Capture format requested when opening an input device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub frame_size: usize,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            frame_size: 1024,
        }
    }
}

/// One classified recognition alternative pulled out of a response.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionUpdate {
    pub text: String,
    pub is_final: bool,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum EndOutcome {
    /// EOF handshake completed and the connection closed normally.
    Completed,
    /// The grace period elapsed before the handshake finished; the
    /// connection was force-closed. Degraded, not fatal.
    ForcedClose,
    /// Unrecoverable transport or connection error mid-session.
    Failed(String),
}

/// Typed events flowing from the streaming engine to transcript sinks.
///
/// `Interim` text is provisional and supersedable; only `Final` text is
/// authoritative. `SessionEnded` is emitted exactly once per session.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEvent {
    SessionBegan { started_at: DateTime<Local> },
    Interim(String),
    Final(String),
    SessionEnded { outcome: EndOutcome },
}

/// Session lifecycle states, published through a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Connecting,
    Streaming,
    Draining,
    Closed,
    Failed,
}

impl SessionState {
    pub fn is_active(self) -> bool {
        matches!(
            self,
            SessionState::Connecting | SessionState::Streaming | SessionState::Draining
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Streaming => "streaming",
            SessionState::Draining => "draining",
            SessionState::Closed => "closed",
            SessionState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Resolved runtime settings for one streaming session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub endpoint: String,
    pub auth_token: Option<String>,
    pub language: String,
    pub punctuation: bool,
    pub single_utterance: bool,
    pub sample_rate: u32,
    pub frame_size: usize,
    pub keepalive_interval: Duration,
    pub keepalive_timeout: Duration,
    pub stop_grace: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:9010/recognize".to_string(),
            auth_token: None,
            language: "zh-HK".to_string(),
            punctuation: true,
            single_utterance: false,
            sample_rate: 16_000,
            frame_size: 1024,
            keepalive_interval: Duration::from_secs(20),
            keepalive_timeout: Duration::from_secs(20),
            stop_grace: Duration::from_secs(5),
        }
    }
}

impl SessionSettings {
    pub fn audio_format(&self) -> AudioFormat {
        AudioFormat {
            sample_rate: self.sample_rate,
            frame_size: self.frame_size,
        }
    }
}

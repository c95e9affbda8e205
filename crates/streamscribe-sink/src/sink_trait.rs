use async_trait::async_trait;
use chrono::{DateTime, Local};
use streamscribe_core::{EndOutcome, SinkError};

/// A consumer of transcript text: a file, a console, a UI pane.
///
/// Implementations are registered via [`SinkRegistry`](crate::SinkRegistry)
/// and driven by [`SinkHost`](crate::SinkHost) from the engine's event
/// channel. Only final text is authoritative; `append_interim` carries
/// provisional, supersedable text and defaults to a no-op.
#[async_trait]
pub trait TranscriptSink: Send + Sync {
    /// Returns the sink's plugin name (e.g. `"file"`, `"stdout"`).
    fn name(&self) -> &str;
    /// One-time initialisation with sink-specific TOML configuration.
    async fn initialize(&mut self, config: toml::Value) -> Result<(), SinkError>;
    /// A session has started streaming.
    async fn begin_session(&self, started_at: DateTime<Local>) -> Result<(), SinkError>;
    /// Append one finalized transcript line.
    async fn append_final(&self, text: &str) -> Result<(), SinkError>;
    /// Surface a provisional in-progress result. Optional.
    async fn append_interim(&self, _text: &str) -> Result<(), SinkError> {
        Ok(())
    }
    /// The session reached a terminal state. Fired exactly once.
    async fn end_session(&self, outcome: &EndOutcome) -> Result<(), SinkError>;
    /// Returns `true` if the sink is currently able to accept text.
    fn is_healthy(&self) -> bool;
    /// Gracefully shut down the sink, releasing resources.
    async fn shutdown(&self) -> Result<(), SinkError>;
}

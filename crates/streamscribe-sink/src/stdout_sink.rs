use crate::sink_trait::TranscriptSink;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicBool, Ordering};
use streamscribe_core::{EndOutcome, SinkError};

/// Console sink: finals as plain lines, interim results as live
/// "recognizing" previews when enabled.
pub struct StdoutSink {
    show_interim: AtomicBool,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            show_interim: AtomicBool::new(true),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptSink for StdoutSink {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn initialize(&mut self, config: toml::Value) -> Result<(), SinkError> {
        let show = config
            .get("show_interim")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
        self.show_interim.store(show, Ordering::Relaxed);
        Ok(())
    }

    async fn begin_session(&self, started_at: DateTime<Local>) -> Result<(), SinkError> {
        println!(
            "--- session started {} ---",
            started_at.format("%Y-%m-%d %H:%M:%S")
        );
        Ok(())
    }

    async fn append_final(&self, text: &str) -> Result<(), SinkError> {
        println!("{}", text);
        Ok(())
    }

    async fn append_interim(&self, text: &str) -> Result<(), SinkError> {
        if self.show_interim.load(Ordering::Relaxed) {
            println!("recognizing: {}", text);
        }
        Ok(())
    }

    async fn end_session(&self, outcome: &EndOutcome) -> Result<(), SinkError> {
        match outcome {
            EndOutcome::Completed => println!("--- session ended ---"),
            EndOutcome::ForcedClose => println!("--- session ended (forced) ---"),
            EndOutcome::Failed(cause) => println!("--- session failed: {} ---", cause),
        }
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        true
    }

    async fn shutdown(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdout_sink_name() {
        assert_eq!(StdoutSink::new().name(), "stdout");
    }

    #[tokio::test]
    async fn test_stdout_sink_initialize_accepts_empty_config() {
        let mut sink = StdoutSink::new();
        assert!(sink
            .initialize(toml::Value::Table(Default::default()))
            .await
            .is_ok());
        assert!(sink.is_healthy());
    }

    #[tokio::test]
    async fn test_stdout_sink_calls_do_not_fail() {
        let mut sink = StdoutSink::new();
        sink.initialize(toml::Value::Table(Default::default()))
            .await
            .unwrap();
        sink.begin_session(Local::now()).await.unwrap();
        sink.append_interim("he").await.unwrap();
        sink.append_final("hello").await.unwrap();
        sink.end_session(&EndOutcome::Completed).await.unwrap();
        sink.shutdown().await.unwrap();
    }
}

use crate::sink_trait::TranscriptSink;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use streamscribe_core::{EndOutcome, SinkError};

/// Line-oriented transcript file. Each `begin_session` truncates the
/// file and writes a session header; finals append one line each; the
/// end marker records how the session closed. Interim text is not
/// persisted unless `persist_interim` is set.
pub struct FileSink {
    output_path: Mutex<Option<PathBuf>>,
    persist_interim: AtomicBool,
}

impl FileSink {
    pub fn new() -> Self {
        Self {
            output_path: Mutex::new(None),
            persist_interim: AtomicBool::new(false),
        }
    }

    fn append_line(&self, line: &str) -> Result<(), SinkError> {
        let guard = self.output_path.lock().unwrap();
        let path = guard
            .as_ref()
            .ok_or_else(|| SinkError::WriteFailed("not initialized".to_string()))?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| SinkError::WriteFailed(e.to_string()))?;
        writeln!(file, "{}", line).map_err(|e| SinkError::WriteFailed(e.to_string()))?;
        file.flush().map_err(|e| SinkError::WriteFailed(e.to_string()))
    }
}

impl Default for FileSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptSink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    async fn initialize(&mut self, config: toml::Value) -> Result<(), SinkError> {
        let path = config.get("path").and_then(|v| v.as_str()).ok_or_else(|| {
            SinkError::InitializationFailed("missing 'path' in config".to_string())
        })?;
        *self.output_path.lock().unwrap() = Some(PathBuf::from(path));

        let persist = config
            .get("persist_interim")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        self.persist_interim.store(persist, Ordering::Relaxed);
        Ok(())
    }

    async fn begin_session(&self, started_at: DateTime<Local>) -> Result<(), SinkError> {
        let guard = self.output_path.lock().unwrap();
        let path = guard
            .as_ref()
            .ok_or_else(|| SinkError::WriteFailed("not initialized".to_string()))?;

        // A new session starts a fresh transcript.
        let mut file =
            std::fs::File::create(path).map_err(|e| SinkError::WriteFailed(e.to_string()))?;
        writeln!(
            file,
            "=== New Recording Session - {} ===\n",
            started_at.format("%Y-%m-%d %H:%M:%S")
        )
        .map_err(|e| SinkError::WriteFailed(e.to_string()))
    }

    async fn append_final(&self, text: &str) -> Result<(), SinkError> {
        self.append_line(text)
    }

    async fn append_interim(&self, text: &str) -> Result<(), SinkError> {
        if self.persist_interim.load(Ordering::Relaxed) {
            self.append_line(text)
        } else {
            Ok(())
        }
    }

    async fn end_session(&self, outcome: &EndOutcome) -> Result<(), SinkError> {
        match outcome {
            EndOutcome::Completed | EndOutcome::ForcedClose => {
                self.append_line("\n=== End of Recording ===\n")
            }
            EndOutcome::Failed(cause) => {
                self.append_line(&format!("\n=== Recording Failed: {} ===\n", cause))
            }
        }
    }

    fn is_healthy(&self) -> bool {
        self.output_path.lock().unwrap().is_some()
    }

    async fn shutdown(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(path: &std::path::Path, persist_interim: Option<bool>) -> toml::Value {
        let mut table = toml::map::Map::new();
        table.insert(
            "path".to_string(),
            toml::Value::String(path.to_string_lossy().to_string()),
        );
        if let Some(persist) = persist_interim {
            table.insert("persist_interim".to_string(), toml::Value::Boolean(persist));
        }
        toml::Value::Table(table)
    }

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("streamscribe_file_sink");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = std::fs::remove_file(&path);
        path
    }

    #[test]
    fn test_file_sink_name() {
        assert_eq!(FileSink::new().name(), "file");
    }

    #[tokio::test]
    async fn test_file_sink_initialize_missing_path_fails() {
        let mut sink = FileSink::new();
        let result = sink.initialize(toml::Value::Table(Default::default())).await;
        match result {
            Err(SinkError::InitializationFailed(msg)) => assert!(msg.contains("path")),
            _ => panic!("expected InitializationFailed"),
        }
    }

    #[test]
    fn test_file_sink_unhealthy_before_init() {
        assert!(!FileSink::new().is_healthy());
    }

    #[tokio::test]
    async fn test_file_sink_session_header_and_footer() {
        let path = temp_path("header.txt");
        let mut sink = FileSink::new();
        sink.initialize(config_for(&path, None)).await.unwrap();

        let started = Local::now();
        sink.begin_session(started).await.unwrap();
        sink.append_final("hello world").await.unwrap();
        sink.end_session(&EndOutcome::Completed).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("=== New Recording Session - "));
        assert!(contents.contains("hello world\n"));
        assert!(contents.contains("=== End of Recording ==="));
    }

    #[tokio::test]
    async fn test_file_sink_begin_session_truncates() {
        let path = temp_path("truncate.txt");
        let mut sink = FileSink::new();
        sink.initialize(config_for(&path, None)).await.unwrap();

        sink.begin_session(Local::now()).await.unwrap();
        sink.append_final("from session one").await.unwrap();

        sink.begin_session(Local::now()).await.unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("from session one"));
    }

    #[tokio::test]
    async fn test_file_sink_interim_not_persisted_by_default() {
        let path = temp_path("interim_off.txt");
        let mut sink = FileSink::new();
        sink.initialize(config_for(&path, None)).await.unwrap();

        sink.begin_session(Local::now()).await.unwrap();
        sink.append_interim("he").await.unwrap();
        sink.append_final("hello").await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("he\n"));
        assert!(contents.contains("hello\n"));
    }

    #[tokio::test]
    async fn test_file_sink_interim_persisted_when_enabled() {
        let path = temp_path("interim_on.txt");
        let mut sink = FileSink::new();
        sink.initialize(config_for(&path, Some(true))).await.unwrap();

        sink.begin_session(Local::now()).await.unwrap();
        sink.append_interim("he").await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("he\n"));
    }

    #[tokio::test]
    async fn test_file_sink_failed_session_records_cause() {
        let path = temp_path("failed.txt");
        let mut sink = FileSink::new();
        sink.initialize(config_for(&path, None)).await.unwrap();

        sink.begin_session(Local::now()).await.unwrap();
        sink.end_session(&EndOutcome::Failed("connection reset".to_string()))
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Recording Failed: connection reset"));
    }

    #[tokio::test]
    async fn test_file_sink_append_before_initialize_fails() {
        let sink = FileSink::new();
        assert!(matches!(
            sink.append_final("text").await,
            Err(SinkError::WriteFailed(_))
        ));
    }
}

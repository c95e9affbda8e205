use crate::registry::SinkRegistry;
use crate::sink_trait::TranscriptSink;
use streamscribe_core::{SinkError, TranscriptEvent};
use tokio::sync::mpsc;

/// Fans the engine's transcript events out to every configured sink.
/// Per-sink errors are logged and isolated: one failing sink never
/// blocks the others or the session.
pub struct SinkHost {
    registry: SinkRegistry,
    sinks: Vec<Box<dyn TranscriptSink>>,
    event_rx: Option<mpsc::UnboundedReceiver<TranscriptEvent>>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl SinkHost {
    pub fn new(event_rx: mpsc::UnboundedReceiver<TranscriptEvent>) -> Self {
        Self {
            registry: SinkRegistry::new(),
            sinks: Vec::new(),
            event_rx: Some(event_rx),
            task_handle: None,
        }
    }

    pub async fn add_sink(
        &mut self,
        plugin_name: &str,
        config: toml::Value,
    ) -> Result<(), SinkError> {
        if self.event_rx.is_none() {
            // start() already handed the sink set to the dispatch task.
            return Err(SinkError::InitializationFailed(
                "sink host already started".to_string(),
            ));
        }
        let mut sink = self.registry.create(plugin_name)?;
        sink.initialize(config).await?;
        self.sinks.push(sink);
        Ok(())
    }

    pub fn start(&mut self) {
        let Some(mut rx) = self.event_rx.take() else {
            tracing::warn!("sink host already started");
            return;
        };
        let sinks = std::mem::take(&mut self.sinks);

        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                for sink in &sinks {
                    let result = match &event {
                        TranscriptEvent::SessionBegan { started_at } => {
                            sink.begin_session(*started_at).await
                        }
                        TranscriptEvent::Interim(text) => sink.append_interim(text).await,
                        TranscriptEvent::Final(text) => sink.append_final(text).await,
                        TranscriptEvent::SessionEnded { outcome } => {
                            sink.end_session(outcome).await
                        }
                    };
                    if let Err(e) = result {
                        tracing::error!(sink = %sink.name(), "sink delivery failed: {e}");
                    }
                }
            }
            for sink in &sinks {
                if let Err(e) = sink.shutdown().await {
                    tracing::warn!(sink = %sink.name(), "sink shutdown failed: {e}");
                }
            }
        });

        self.task_handle = Some(handle);
    }

    pub async fn shutdown(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
    }
}

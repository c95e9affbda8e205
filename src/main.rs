use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use streamscribe_core::{AppConfig, SessionError};
use streamscribe_session::{SessionController, StopOutcome};
use streamscribe_sink::SinkHost;
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "streamscribe", about = "Live microphone transcription client")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_found = cli.config.exists();
    let config = if config_found {
        AppConfig::load_from_file(&cli.config)
            .with_context(|| format!("failed to load config from {:?}", cli.config))?
    } else {
        AppConfig::from_toml_str("").context("builtin default config")?
    };

    let env_filter = EnvFilter::try_new(&config.general.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    if config_found {
        tracing::info!("loaded config from {:?}", cli.config);
    } else {
        tracing::info!("config file {:?} not found, using defaults", cli.config);
    }

    let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel();

    let mut sink_host = SinkHost::new(event_rx);
    if config.sink.is_empty() {
        // No sinks configured: at least show transcripts on the console.
        sink_host
            .add_sink("stdout", toml::Value::Table(Default::default()))
            .await
            .context("failed to add default stdout sink")?;
    } else {
        for sink_cfg in &config.sink {
            sink_host
                .add_sink(&sink_cfg.plugin, sink_cfg.extra.clone())
                .await
                .with_context(|| format!("failed to add sink '{}'", sink_cfg.plugin))?;
            tracing::info!("transcript sink '{}' configured", sink_cfg.plugin);
        }
    }
    sink_host.start();

    let directory = Arc::new(streamscribe_audio::CpalDirectory::new());
    let controller = SessionController::new(directory, config.session_settings(), event_tx);

    println!("streamscribe ready (s: start, q: stop, x: exit)");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("stdin read failed")? else {
                    break; // EOF
                };
                match line.trim() {
                    "s" => match controller.start(&config.audio.device).await {
                        Ok(()) => tracing::info!("session started"),
                        Err(SessionError::AlreadyActive) => {
                            tracing::warn!("already recording; press 'q' to stop first");
                        }
                        Err(e) => tracing::error!("failed to start session: {e}"),
                    },
                    "q" => match controller.stop().await {
                        StopOutcome::WasIdle => tracing::info!("nothing to stop"),
                        StopOutcome::Stopped(outcome) => {
                            tracing::info!("session stopped: {:?}", outcome);
                        }
                    },
                    "x" => break,
                    "" => {}
                    other => println!("unknown command: {other} (s: start, q: stop, x: exit)"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    tracing::info!("shutting down");
    controller.stop().await;
    drop(controller); // releases the event channel so the sink host drains out
    sink_host.shutdown().await;

    Ok(())
}

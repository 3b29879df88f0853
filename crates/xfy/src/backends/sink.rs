use anyhow::Result;
use async_trait::async_trait;

use crate::app_config::SinkConfig;
use crate::backends::{file, in_mem, stdio};

/// 🕳️ A sink that writes pre-composed NDJSON payloads. Pure I/O, zero logic.
///
/// # Contract 📜
/// - `send` writes one payload as-is. The convert worker already composed it.
/// - `close` flushes. MUST be called, async Drop is not a thing.
#[async_trait]
pub(crate) trait Sink: std::fmt::Debug + Send {
    async fn send(&mut self, payload: String) -> Result<()>;
    async fn close(&mut self) -> Result<()>;
}

/// 🎭 Mirrors `SourceBackend` on the other end of the pipeline.
#[derive(Debug)]
pub(crate) enum SinkBackend {
    InMemory(in_mem::InMemorySink),
    File(file::FileSink),
    Stdout(stdio::StdoutSink),
}

impl SinkBackend {
    /// 🏗️ Create (or truncate) whatever the config points at.
    pub(crate) async fn from_config(config: &SinkConfig) -> Result<Self> {
        Ok(match config {
            SinkConfig::InMemory => SinkBackend::InMemory(in_mem::InMemorySink::dry_run()),
            SinkConfig::File(config) => SinkBackend::File(file::FileSink::new(config.clone()).await?),
            SinkConfig::Stdout => SinkBackend::Stdout(stdio::StdoutSink::new()),
        })
    }
}

#[async_trait]
impl Sink for SinkBackend {
    async fn send(&mut self, payload: String) -> Result<()> {
        match self {
            SinkBackend::InMemory(sink) => sink.send(payload).await,
            SinkBackend::File(sink) => sink.send(payload).await,
            SinkBackend::Stdout(sink) => sink.send(payload).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            SinkBackend::InMemory(sink) => sink.close().await,
            SinkBackend::File(sink) => sink.close().await,
            SinkBackend::Stdout(sink) => sink.close().await,
        }
    }
}

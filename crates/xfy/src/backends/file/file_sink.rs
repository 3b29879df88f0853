use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::{
    fs::File,
    io::{self, AsyncWriteExt},
};
use tracing::trace;

use crate::backends::Sink;

/// 🚰 FileSinkConfig: where the statements land. The file is truncated on open.
#[derive(Debug, Deserialize, Clone)]
pub struct FileSinkConfig {
    pub file_name: String,
}

impl FileSinkConfig {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }
}

/// 🚰 FileSink: writes composed NDJSON payloads to disk through a `BufWriter`.
///
/// ⚠️ `File::create` truncates if the file exists. No warning. No backup.
#[derive(Debug)]
pub(crate) struct FileSink {
    file_buf: io::BufWriter<File>,
    sink_config: FileSinkConfig,
}

impl FileSink {
    pub(crate) async fn new(sink_config: FileSinkConfig) -> Result<Self> {
        let file_handle = File::create(&sink_config.file_name).await.context(format!(
            "💀 The statement file '{}' could not be created. \
             We stared at the path. The path stared back. \
             One of us was wrong about whether the parent directory existed.",
            &sink_config.file_name
        ))?;
        Ok(Self {
            file_buf: io::BufWriter::new(file_handle),
            sink_config,
        })
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn send(&mut self, payload: String) -> Result<()> {
        trace!(
            "📬 {} bytes of statements headed for '{}'",
            payload.len(),
            self.sink_config.file_name
        );
        self.file_buf
            .write_all(payload.as_bytes())
            .await
            .context(format!(
                "💀 Writing statements to '{}' failed. Disk full? Disk gone? Disk tired?",
                self.sink_config.file_name
            ))
    }

    async fn close(&mut self) -> Result<()> {
        trace!("🎬 final flush of '{}'", self.sink_config.file_name);
        self.file_buf.flush().await.context(
            "💀 Error flushing the statement file. The bytes were SO close to the disk.",
        )
    }
}

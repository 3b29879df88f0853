//! 🐚 stdin / stdout: for `zcat tracking.log.gz | xfy-cli > statements.ndjson` people.
//!
//! stdout carries statements ONLY. Logs go to stderr, the CLI makes sure of it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{self, AsyncWriteExt};

use crate::backends::source::read_page;
use crate::backends::{CommonSourceConfig, Sink, Source};

/// 🐚 Page sizing for stdin, nothing else to say about a pipe.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct StdinSourceConfig {
    #[serde(default)]
    pub common_config: CommonSourceConfig,
}

/// 🐚 Reads tracking log lines from stdin until the pipe closes.
#[derive(Debug)]
pub(crate) struct StdinSource {
    reader: io::BufReader<io::Stdin>,
    common_config: CommonSourceConfig,
    unreadable: u64,
}

impl StdinSource {
    pub(crate) fn new(common_config: CommonSourceConfig) -> Self {
        Self {
            reader: io::BufReader::new(io::stdin()),
            common_config,
            unreadable: 0,
        }
    }
}

#[async_trait]
impl Source for StdinSource {
    async fn next_page(&mut self) -> Result<Option<String>> {
        let page = read_page(&mut self.reader, &self.common_config)
            .await
            .context("💀 stdin went away mid-read")?;
        self.unreadable += page.unreadable as u64;
        Ok(page.into_text())
    }

    fn unreadable_lines(&self) -> u64 {
        self.unreadable
    }
}

/// 📢 Writes payloads to stdout.
#[derive(Debug)]
pub(crate) struct StdoutSink {
    out: io::BufWriter<io::Stdout>,
}

impl StdoutSink {
    pub(crate) fn new() -> Self {
        Self {
            out: io::BufWriter::new(io::stdout()),
        }
    }
}

#[async_trait]
impl Sink for StdoutSink {
    async fn send(&mut self, payload: String) -> Result<()> {
        self.out
            .write_all(payload.as_bytes())
            .await
            .context("💀 stdout hung up on us (closed pipe?)")
    }

    async fn close(&mut self) -> Result<()> {
        self.out.flush().await.context("💀 Error flushing stdout")
    }
}

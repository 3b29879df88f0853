//! 🧪 In-memory source and sink. No disk. No heartbeat. Just heap.
//!
//! - `InMemorySource` pours its configured lines as ONE page, then yields nothing further.
//! - `InMemorySink` hoards payloads behind an `Arc<Mutex<..>>` so a test can keep a clone and
//!   peek after the pipeline is done. Configured from the app config it is a dry run:
//!   statements are converted and counted, then dropped on the floor.
//!
//! ⚠️ This is for tests and dry runs. If you're deploying this to prod, please also deploy a
//! therapist. 🦆

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{info, trace};

use crate::backends::{Sink, Source};

/// 🧪 The lines an in-memory source will hand out.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct InMemorySourceConfig {
    #[serde(default)]
    pub lines: Vec<String>,
}

/// 📦 A source that knows its lines by heart and tells them exactly once.
#[derive(Debug, Default)]
pub(crate) struct InMemorySource {
    lines: Option<Vec<String>>,
}

impl InMemorySource {
    pub(crate) fn new(lines: Vec<String>) -> Self {
        Self { lines: Some(lines) }
    }
}

#[async_trait]
impl Source for InMemorySource {
    async fn next_page(&mut self) -> Result<Option<String>> {
        // -- once yielded, forever yielded
        let Some(lines) = self.lines.take() else {
            return Ok(None);
        };
        let page = lines
            .iter()
            .map(|line| line.trim_end_matches(['\n', '\r']))
            .filter(|line| !line.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        Ok((!page.is_empty()).then_some(page))
    }
}

/// 📦 A sink that never forgets, unless it was told it is a dry run.
#[derive(Debug, Default, Clone)]
pub(crate) struct InMemorySink {
    pub(crate) received: Arc<Mutex<Vec<String>>>,
    dry_run: bool,
    payloads: u64,
    bytes: u64,
}

impl InMemorySink {
    /// 🧪 Counts what it is sent and keeps none of it.
    pub(crate) fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Sink for InMemorySink {
    async fn send(&mut self, payload: String) -> Result<()> {
        self.payloads += 1;
        self.bytes += payload.len() as u64;
        if self.dry_run {
            trace!("🧪 dry run swallowed {} bytes of statements", payload.len());
        } else {
            self.received.lock().await.push(payload);
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        // -- nothing to flush, we live in RAM
        if self.dry_run {
            info!(
                "🧪 dry run: {} payloads, {} bytes of statements went nowhere",
                self.payloads, self.bytes
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn the_one_where_the_source_only_talks_once() -> Result<()> {
        let mut source = InMemorySource::new(vec!["a".into(), "".into(), "b\n".into()]);
        assert_eq!(source.next_page().await?.as_deref(), Some("a\nb"));
        assert_eq!(source.next_page().await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_clones_share_the_vault() -> Result<()> {
        let peek = InMemorySink::default();
        let mut sink = peek.clone();
        sink.send("x\n".to_string()).await?;
        sink.close().await?;
        assert_eq!(*peek.received.lock().await, ["x\n"]);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_dry_run_keeps_nothing_but_the_count() -> Result<()> {
        let mut sink = InMemorySink::dry_run();
        sink.send("a\nb\n".to_string()).await?;
        sink.send("c\n".to_string()).await?;
        sink.close().await?;
        assert!(sink.received.lock().await.is_empty());
        assert_eq!((sink.payloads, sink.bytes), (2, 6));
        Ok(())
    }
}

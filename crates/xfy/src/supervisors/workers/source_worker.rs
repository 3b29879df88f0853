//! 🚰 The SourceWorker: pulls pages and pushes them down the channel until the well is dry.

use anyhow::{Context, Result};
use async_channel::Sender;
use tokio::task::JoinHandle;
use tracing::debug;

use super::Worker;
use crate::backends::{Source, SourceBackend};

/// 🧾 What the source side saw, for the final report.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(in crate::supervisors) struct SourceTally {
    pub(in crate::supervisors) pages: u64,
    /// 🙈 lines the source dropped before they ever became text
    pub(in crate::supervisors) unreadable_lines: u64,
}

#[derive(Debug)]
pub(in crate::supervisors) struct SourceWorker {
    tx: Sender<String>,
    source: SourceBackend,
}

impl SourceWorker {
    pub(in crate::supervisors) fn new(tx: Sender<String>, source: SourceBackend) -> Self {
        Self { tx, source }
    }
}

impl Worker for SourceWorker {
    type Output = SourceTally;

    fn start(mut self) -> JoinHandle<Result<SourceTally>> {
        tokio::spawn(async move {
            debug!("🚰 SourceWorker started pouring pages...");
            let mut pages = 0u64;
            while let Some(page) = self
                .source
                .next_page()
                .await
                .context("💀 SourceWorker could not read the next page")?
            {
                self.tx.send(page).await.context(
                    "💀 SourceWorker found the channel closed. The convert worker left early, \
                     its error is the one worth reading.",
                )?;
                pages += 1;
            }
            debug!("🏁 SourceWorker: EOF after {} pages. Closing the channel.", pages);
            // -- dropping the last sender closes the channel
            drop(self.tx);
            Ok(SourceTally {
                pages,
                unreadable_lines: self.source.unreadable_lines(),
            })
        })
    }
}

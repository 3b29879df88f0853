use std::io::BufReader as BlockingBufReader;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use flate2::read::MultiGzDecoder;
use serde::Deserialize;
use tokio::{fs::File, io};
use tracing::trace;

use crate::backends::source::{Page, read_page, read_page_blocking};
use crate::backends::{CommonSourceConfig, Source};
use crate::progress::ProgressMetrics;

/// 📂 FileSourceConfig: where the tracking log lives and how big a bite to take.
#[derive(Debug, Deserialize, Clone)]
pub struct FileSourceConfig {
    pub file_name: String,
    #[serde(default)]
    pub common_config: CommonSourceConfig,
}

impl FileSourceConfig {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            common_config: CommonSourceConfig::default(),
        }
    }

    fn is_gzip(&self) -> bool {
        Path::new(&self.file_name)
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("gz"))
    }
}

type GzipReader = BlockingBufReader<MultiGzDecoder<std::fs::File>>;

/// 📖 The two ways a file gets read.
enum Reader {
    Plain(io::BufReader<File>),
    /// 🫁 `Option` so the reader can be moved onto the blocking pool and back.
    Gzip(Option<GzipReader>),
}

/// 📂 FileSource: reads a tracking log page by page until EOF.
///
/// 📊 Reports progress in raw bytes. For gzip files the total is unknown (the file size is
/// compressed, the bytes we count are not) so the bar shows throughput only.
pub(crate) struct FileSource {
    reader: Reader,
    source_config: FileSourceConfig,
    progress: ProgressMetrics,
    unreadable: u64,
}

impl std::fmt::Debug for FileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSource")
            .field("source_config", &self.source_config)
            .finish()
    }
}

impl FileSource {
    /// 🚀 Open the file and set up the progress bar.
    pub(crate) async fn new(source_config: FileSourceConfig) -> Result<Self> {
        let file_handle = File::open(&source_config.file_name).await.context(format!(
            "💀 The tracking log '{}' would not open. It might not exist, it might not be ours \
             to read. Either way, there are no events in it for us today.",
            source_config.file_name
        ))?;

        let (reader, total_size) = if source_config.is_gzip() {
            let file_handle = file_handle.into_std().await;
            let decoder = MultiGzDecoder::new(file_handle);
            (Reader::Gzip(Some(BlockingBufReader::new(decoder))), 0)
        } else {
            // -- 0 = unknown, the bar copes
            let file_size = file_handle.metadata().await.map(|m| m.len()).unwrap_or(0);
            (Reader::Plain(io::BufReader::new(file_handle)), file_size)
        };

        let progress = ProgressMetrics::new(source_config.file_name.clone(), total_size);
        Ok(Self {
            reader,
            source_config,
            progress,
            unreadable: 0,
        })
    }

    async fn read(&mut self) -> Result<Page> {
        let limits = &self.source_config.common_config;
        match &mut self.reader {
            Reader::Plain(reader) => read_page(reader, limits).await,
            Reader::Gzip(slot) => {
                let mut reader = slot
                    .take()
                    .context("💀 the gzip reader went out for a page and never came back")?;
                let limits = limits.clone();
                let (reader, page) = tokio::task::spawn_blocking(move || {
                    let page = read_page_blocking(&mut reader, &limits);
                    (reader, page)
                })
                .await
                .context("💀 the blocking pool dropped our gzip read")?;
                *slot = Some(reader);
                page.context(format!(
                    "💀 '{}' is not the gzip it claims to be, or it got cut short",
                    self.source_config.file_name
                ))
            }
        }
    }
}

#[async_trait]
impl Source for FileSource {
    async fn next_page(&mut self) -> Result<Option<String>> {
        let page = self.read().await?;
        trace!(
            "📖 hauled {} bytes ({} lines) out of '{}'",
            page.bytes, page.lines, self.source_config.file_name
        );
        self.progress.update(page.bytes as u64, page.lines as u64);
        self.unreadable += page.unreadable as u64;

        let page = page.into_text();
        if page.is_none() {
            self.progress.finish();
        }
        Ok(page)
    }

    fn unreadable_lines(&self) -> u64 {
        self.unreadable
    }
}

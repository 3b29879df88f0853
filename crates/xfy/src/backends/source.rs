use std::io::BufRead;

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};

use crate::app_config::SourceConfig;
use crate::backends::{CommonSourceConfig, file, in_mem, stdio};

/// 🚰 A source that produces one raw page of tracking log lines per call.
///
/// # Contract 📜
/// - `next_page` returns `Option<String>`: newline-joined lines, no trailing newline.
/// - `None` = EOF. The well is dry. 🏁
/// - The source does NOT parse lines. Garbage in, garbage forwarded, the selector deals with it.
/// - Blank lines are dropped here, they are not events and not worth a log line.
/// - Lines that are not UTF-8 are dropped here too, logged, and tallied in
///   `unreadable_lines`. One mangled line never ends the stream.
#[async_trait]
pub(crate) trait Source: std::fmt::Debug + Send {
    async fn next_page(&mut self) -> Result<Option<String>>;

    /// 🙈 Lines skipped so far because they were not text.
    fn unreadable_lines(&self) -> u64 {
        0
    }
}

/// 🎭 Enum dispatch over the concrete sources. No vtables, no surprises.
#[derive(Debug)]
pub(crate) enum SourceBackend {
    InMemory(in_mem::InMemorySource),
    File(file::FileSource),
    Stdin(stdio::StdinSource),
}

impl SourceBackend {
    /// 🏗️ Open whatever the config points at.
    pub(crate) async fn from_config(config: &SourceConfig) -> Result<Self> {
        Ok(match config {
            SourceConfig::InMemory(config) => {
                SourceBackend::InMemory(in_mem::InMemorySource::new(config.lines.clone()))
            }
            SourceConfig::File(config) => {
                SourceBackend::File(file::FileSource::new(config.clone()).await?)
            }
            SourceConfig::Stdin(config) => {
                SourceBackend::Stdin(stdio::StdinSource::new(config.common_config.clone()))
            }
        })
    }
}

#[async_trait]
impl Source for SourceBackend {
    async fn next_page(&mut self) -> Result<Option<String>> {
        match self {
            SourceBackend::InMemory(source) => source.next_page().await,
            SourceBackend::File(source) => source.next_page().await,
            SourceBackend::Stdin(source) => source.next_page().await,
        }
    }

    fn unreadable_lines(&self) -> u64 {
        match self {
            SourceBackend::InMemory(source) => source.unreadable_lines(),
            SourceBackend::File(source) => source.unreadable_lines(),
            SourceBackend::Stdin(source) => source.unreadable_lines(),
        }
    }
}

/// 📄 One page being filled, plus what it cost to fill it.
#[derive(Debug)]
pub(crate) struct Page {
    text: String,
    /// 📏 raw bytes consumed, newlines and blank lines included
    pub(crate) bytes: usize,
    pub(crate) lines: usize,
    /// 🙈 lines dropped because they were not UTF-8
    pub(crate) unreadable: usize,
}

impl Page {
    fn new() -> Self {
        Self {
            text: String::new(),
            bytes: 0,
            lines: 0,
            unreadable: 0,
        }
    }

    /// ✍️ Account for one raw line (as returned by `read_until`, newline included).
    fn push(&mut self, raw: &[u8]) {
        self.bytes += raw.len();
        let raw = match std::str::from_utf8(raw) {
            Ok(raw) => raw,
            Err(err) => {
                self.unreadable += 1;
                info!("🙈 Skipping a line that is not valid UTF-8");
                debug!("🔍 Error: {} For line: {}", err, String::from_utf8_lossy(raw));
                return;
            }
        };
        let trimmed = raw.trim_end_matches('\n').trim_end_matches('\r');
        if trimmed.trim().is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(trimmed);
        self.lines += 1;
    }

    /// 📏 Only a page with at least one line can be full: an empty page means EOF.
    fn is_full(&self, limits: &CommonSourceConfig) -> bool {
        self.lines > 0
            && (self.lines >= limits.max_batch_size_docs
                || self.bytes > limits.max_batch_size_bytes)
    }

    /// 📦 The page text, or `None` if nothing but blank lines showed up.
    pub(crate) fn into_text(self) -> Option<String> {
        (!self.text.is_empty()).then_some(self.text)
    }
}

/// 📖 Read one page from an async reader. An empty page means EOF.
pub(crate) async fn read_page<R>(reader: &mut R, limits: &CommonSourceConfig) -> Result<Page>
where
    R: AsyncBufRead + Unpin + Send,
{
    let mut page = Page::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        page.push(&line);
        if page.is_full(limits) {
            break;
        }
    }
    Ok(page)
}

/// 📖 The blocking twin of [`read_page`], for readers that only speak `std::io`
/// (gzip decoders). Call it from `spawn_blocking`.
pub(crate) fn read_page_blocking<R: BufRead>(
    reader: &mut R,
    limits: &CommonSourceConfig,
) -> Result<Page> {
    let mut page = Page::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        page.push(&line);
        if page.is_full(limits) {
            break;
        }
    }
    Ok(page)
}

//! 🔄 The ConvertWorker: pages in, NDJSON statements out.
//!
//! 🎬 *[a page arrives. a thousand lines. some are events. some are lies.]*
//!
//! 🧠 Knowledge graph:
//! - Lines are found with `memchr` on the page bytes, no per-line allocation until a line
//!   actually becomes a statement.
//! - Every line ends up in exactly one bucket of the `ConversionReport`.
//! - A `ConversionError` ends the run, unless `ignore_conversion_errors` says to log it,
//!   count it, and move on. The selector never makes that call, we do.
//! - Converting a page means argon2, which is CPU work. Each page goes to the blocking pool
//!   together with the selector, and both come back when the page is done.

use anyhow::{Context, Result};
use async_channel::Receiver;
use memchr::memchr_iter;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::Worker;
use crate::backends::{Sink, SinkBackend};
use crate::composers::{Composer, NdjsonComposer};
use crate::progress::ConversionReport;
use crate::selector::ConverterSelector;

/// ✂️ Non-blank lines of a page, borrowed straight out of it.
fn split_lines(page: &str) -> impl Iterator<Item = &str> {
    let mut start = 0;
    memchr_iter(b'\n', page.as_bytes())
        .chain(std::iter::once(page.len()))
        .map(move |end| {
            let line = &page[start..end];
            start = end + 1;
            line
        })
        .filter(|line| !line.trim().is_empty())
}

#[derive(Debug)]
pub(in crate::supervisors) struct ConvertWorker {
    rx: Receiver<String>,
    /// 🏊 `Option` so the selector can be moved onto the blocking pool and back.
    selector: Option<ConverterSelector>,
    composer: NdjsonComposer,
    sink: SinkBackend,
    ignore_conversion_errors: bool,
    report: ConversionReport,
}

impl ConvertWorker {
    pub(in crate::supervisors) fn new(
        rx: Receiver<String>,
        selector: ConverterSelector,
        sink: SinkBackend,
        ignore_conversion_errors: bool,
    ) -> Self {
        Self {
            rx,
            selector: Some(selector),
            composer: NdjsonComposer,
            sink,
            ignore_conversion_errors,
            report: ConversionReport::default(),
        }
    }

    /// 🏊 Convert one page on the blocking pool.
    async fn convert_page(&mut self, page: String) -> Result<Vec<String>> {
        let mut selector = self
            .selector
            .take()
            .context("💀 the selector went out for a page and never came back")?;
        let mut report = self.report;
        let ignore_conversion_errors = self.ignore_conversion_errors;
        let (selector, report, statements) = tokio::task::spawn_blocking(move || {
            let statements =
                convert_lines(&mut selector, &mut report, ignore_conversion_errors, &page);
            (selector, report, statements)
        })
        .await
        .context("💀 the blocking pool dropped a page mid-conversion")?;
        self.selector = Some(selector);
        self.report = report;
        statements
    }
}

/// 🔄 Convert every line of one page, in order.
fn convert_lines(
    selector: &mut ConverterSelector,
    report: &mut ConversionReport,
    ignore_conversion_errors: bool,
    page: &str,
) -> Result<Vec<String>> {
    let mut statements = Vec::new();
    for line in split_lines(page) {
        report.lines += 1;
        match selector.convert_line(line) {
            Ok(Some(statement)) => {
                report.statements += 1;
                statements.push(statement);
            }
            Ok(None) => report.skipped += 1,
            Err(err) if ignore_conversion_errors => {
                report.failed += 1;
                warn!("⚠️ line {} failed to convert, moving on: {}", report.lines, err);
                debug!("🔍 Line: {}", line);
            }
            Err(err) => {
                debug!("🔍 Line: {}", line);
                return Err(err).context(format!(
                    "💀 line {} could not be converted. Set runtime.ignore_conversion_errors \
                     to log and skip lines like this one.",
                    report.lines
                ));
            }
        }
    }
    Ok(statements)
}

impl Worker for ConvertWorker {
    type Output = ConversionReport;

    fn start(mut self) -> JoinHandle<Result<ConversionReport>> {
        tokio::spawn(async move {
            debug!("🔄 ConvertWorker started draining the channel...");
            while let Ok(page) = self.rx.recv().await {
                let statements = self.convert_page(page).await?;
                if statements.is_empty() {
                    continue;
                }
                let payload = self.composer.compose(&statements);
                self.sink
                    .send(payload)
                    .await
                    .context("💀 ConvertWorker could not hand statements to the sink")?;
            }
            debug!("🏁 ConvertWorker: channel closed. {:?}", self.report);
            self.sink
                .close()
                .await
                .context("💀 ConvertWorker failed to close the sink")?;
            Ok(self.report)
        })
    }
}

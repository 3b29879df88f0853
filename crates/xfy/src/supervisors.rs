//! 🎬 *[camera pans across a dimly lit server room]*
//! 🎬 "In a world where tracking logs pile up by the gigabyte..."
//! 🎬 "One supervisor dared to turn them into statements."
//! 🎬 *[record scratch]* 🦆
//!
//! 📦 The Supervisor wires a source worker and a convert worker together with a bounded
//! channel, waits for both, and reports.
//!
//! ⚠️ DO NOT MAKE THE WORKERS PUB. They are the supervisor's private little minions.

mod workers;

use anyhow::{Context, Result};
use tracing::info;

use crate::app_config::AppConfig;
use crate::backends::{SinkBackend, SourceBackend};
use crate::progress::ConversionReport;
use crate::selector::ConverterSelector;
use workers::{ConvertWorker, SourceWorker, Worker};

pub(crate) struct Supervisor {
    app_config: AppConfig,
}

impl Supervisor {
    pub(crate) fn new(app_config: AppConfig) -> Self {
        Self { app_config }
    }

    /// 🧵 Build everything from config and run the pipeline to the end.
    ///
    /// The selector comes first: a bad hash index list should fail before any file
    /// gets opened, let alone truncated.
    pub(crate) async fn start_workers(&self) -> Result<ConversionReport> {
        let selector = ConverterSelector::new(&self.app_config.xapi)
            .context("💀 The xapi settings are not usable, nothing was converted")?;
        let source = SourceBackend::from_config(&self.app_config.source_config)
            .await
            .context("💀 Could not open the source")?;
        let sink = SinkBackend::from_config(&self.app_config.sink_config)
            .await
            .context("💀 Could not open the sink")?;
        self.run_with(selector, source, sink).await
    }

    /// 🔌 Run the pipeline over already built parts.
    pub(crate) async fn run_with(
        &self,
        selector: ConverterSelector,
        source: SourceBackend,
        sink: SinkBackend,
    ) -> Result<ConversionReport> {
        let runtime = &self.app_config.runtime;
        let (tx, rx) = async_channel::bounded(runtime.queue_capacity.max(1));

        let source_handle = SourceWorker::new(tx, source).start();
        let convert_handle =
            ConvertWorker::new(rx, selector, sink, runtime.ignore_conversion_errors).start();

        let (source_result, convert_result) = tokio::join!(source_handle, convert_handle);
        // -- the convert error goes first: when it fails, the source only ever sees a closed channel
        let mut report = convert_result.context("💀 The convert worker panicked")??;
        let tally = source_result.context("💀 The source worker panicked")??;
        // -- unreadable lines never reached the convert worker, they are skips all the same
        report += ConversionReport {
            lines: tally.unreadable_lines,
            skipped: tally.unreadable_lines,
            ..ConversionReport::default()
        };

        info!(
            "✅ {} pages, {} lines, {} statements, {} skipped, {} failed",
            tally.pages, report.lines, report.statements, report.skipped, report.failed
        );
        Ok(report)
    }
}

//! 📊 progress.rs: "Are we there yet?" asks every conversion, every time, forever.
//!
//! 🧠 Knowledge graph:
//! - `ProgressMetrics`: the live indicatif bar a `FileSource` feeds with bytes and lines read.
//!   The message under the bar is a borderless comfy-table with rates and an ETA.
//! - `ConversionReport`: the final tally the convert worker returns and the CLI prints.
//!
//! ⚠️ Watching this progress bar will not make it go faster. Science says no. 🦆

use std::collections::VecDeque;
use std::ops::AddAssign;
use std::time::{Duration, Instant};

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::NOTHING};
use indicatif::{ProgressBar, ProgressStyle};

const MIB: u64 = 1024 * 1024;

/// 📏 Bytes, scaled to the size of the thing we are reading.
fn format_bytes(bytes: u64, file_size: u64) -> String {
    if file_size >= 512 * MIB {
        format!("{:.2} MiB", bytes as f64 / MIB as f64)
    } else if file_size >= MIB {
        format!("{:.2} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} bytes")
    }
}

/// 🔢 "1000000" → "1,000,000"
fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// ⏱️ MM:SS, or HH:MM:SS for the week-of-logs crowd.
fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

/// 📡 Throughput over the sliding window.
struct Rates {
    lines_per_sec: f64,
    mib_per_sec: f64,
}

/// 📊 Live progress of one source: totals, a 5 second rate window, and the bar.
pub(crate) struct ProgressMetrics {
    source_name: String,
    /// 📏 0 when unknown (stdin, gzip)
    total_size: u64,
    total_bytes: u64,
    total_lines: u64,
    progress_bar: ProgressBar,
    rate_samples: VecDeque<(Instant, u64, u64)>,
    start_time: Instant,
}

impl std::fmt::Debug for ProgressMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressMetrics")
            .field("source_name", &self.source_name)
            .field("total_size", &self.total_size)
            .field("total_bytes", &self.total_bytes)
            .field("total_lines", &self.total_lines)
            .finish()
    }
}

impl ProgressMetrics {
    pub(crate) fn new(source_name: String, total_size: u64) -> Self {
        let progress_bar = ProgressBar::new(total_size);
        // -- the template is a literal, a bad one falls back to indicatif's default look
        if let Ok(style) = ProgressStyle::default_bar().template("{msg}\n| [{bar:40.cyan/blue}]") {
            progress_bar.set_style(style.progress_chars("=>-"));
        }

        let start_time = Instant::now();
        let mut rate_samples = VecDeque::new();
        rate_samples.push_back((start_time, 0u64, 0u64));

        Self {
            source_name,
            total_size,
            total_bytes: 0,
            total_lines: 0,
            progress_bar,
            rate_samples,
            start_time,
        }
    }

    /// 🔄 Account for one page read.
    pub(crate) fn update(&mut self, bytes_read: u64, lines_read: u64) {
        self.total_bytes += bytes_read;
        self.total_lines += lines_read;
        let rates = self.calculate_rates();
        self.render(rates);
        self.progress_bar.set_position(self.total_bytes);
    }

    pub(crate) fn finish(&self) {
        self.progress_bar.finish();
    }

    fn calculate_rates(&mut self) -> Rates {
        let now = Instant::now();
        let window = Duration::from_secs(5);
        while let Some(&(timestamp, _, _)) = self.rate_samples.front() {
            if now.duration_since(timestamp) > window {
                self.rate_samples.pop_front();
            } else {
                break;
            }
        }
        self.rate_samples
            .push_back((now, self.total_bytes, self.total_lines));

        match self.rate_samples.front() {
            Some(&(oldest_time, oldest_bytes, oldest_lines)) => {
                let elapsed = now.duration_since(oldest_time).as_secs_f64();
                if elapsed <= 0.0 {
                    return Rates {
                        lines_per_sec: 0.0,
                        mib_per_sec: 0.0,
                    };
                }
                let bytes_delta = self.total_bytes.saturating_sub(oldest_bytes);
                let lines_delta = self.total_lines.saturating_sub(oldest_lines);
                Rates {
                    lines_per_sec: lines_delta as f64 / elapsed,
                    mib_per_sec: (bytes_delta as f64 / elapsed) / MIB as f64,
                }
            }
            None => Rates {
                lines_per_sec: 0.0,
                mib_per_sec: 0.0,
            },
        }
    }

    /// 🎨 Two right-aligned columns under the source name:
    /// ```text
    ///   <lines/s>     <total lines>
    ///   <MiB/s>       <bytes progress>
    ///   <elapsed>     <remaining>
    /// ```
    fn render(&self, rates: Rates) {
        let percent = if self.total_size > 0 {
            (self.total_bytes as f64 / self.total_size as f64) * 100.0
        } else {
            0.0
        };

        let elapsed = self.start_time.elapsed();
        let remaining = if percent > 0.0 {
            // 🔮 linear extrapolation, the future looks like the past
            let total_estimated = elapsed.as_secs_f64() / (percent / 100.0);
            let remaining_secs = total_estimated - elapsed.as_secs_f64();
            if remaining_secs > 0.0 {
                format_duration(Duration::from_secs_f64(remaining_secs))
            } else {
                "--:--".to_string()
            }
        } else {
            "--:--".to_string()
        };

        let bytes_progress = if self.total_size > 0 {
            format!(
                "{} / {} ({percent:.2}%)",
                format_bytes(self.total_bytes, self.total_size),
                format_bytes(self.total_size, self.total_size)
            )
        } else {
            format_bytes(self.total_bytes, self.total_bytes)
        };

        let mut table = Table::new();
        table.load_preset(NOTHING);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.add_row(vec![
            Cell::new(format!("{} Lines/s", format_number(rates.lines_per_sec as u64)))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{} Lines", format_number(self.total_lines)))
                .set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{:.2} MiB/s", rates.mib_per_sec)).set_alignment(CellAlignment::Right),
            Cell::new(bytes_progress).set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{} elapsed", format_duration(elapsed)))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{remaining} remaining")).set_alignment(CellAlignment::Right),
        ]);

        self.progress_bar
            .set_message(format!("source: {}\n{}", self.source_name, table));
    }
}

/// 🧾 What happened to every line, once the pipeline is done.
///
/// `lines = statements + skipped + failed`, always.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionReport {
    /// 📄 non-blank lines read
    pub lines: u64,
    /// ✅ statements written
    pub statements: u64,
    /// 🙈 unparseable, unroutable or invalid lines
    pub skipped: u64,
    /// 💀 lines whose conversion raised an error (only non-zero with `ignore_conversion_errors`)
    pub failed: u64,
}

impl AddAssign for ConversionReport {
    fn add_assign(&mut self, other: Self) {
        self.lines += other.lines;
        self.statements += other.statements;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

impl ConversionReport {
    /// 🍽️ The report as a comfy-table, ready for a terminal.
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.set_header(vec!["", "count"]);
        for (label, count) in [
            ("lines", self.lines),
            ("statements", self.statements),
            ("skipped", self.skipped),
            ("failed", self.failed),
        ] {
            table.add_row(vec![
                Cell::new(label),
                Cell::new(format_number(count)).set_alignment(CellAlignment::Right),
            ]);
        }
        table
    }
}

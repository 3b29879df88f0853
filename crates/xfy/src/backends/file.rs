//! 📂 File I/O: tracking logs in, statements out.
//!
//! The disk was quiet. Too quiet. Somewhere in `/var/log/tracking` sat a week of
//! `tracking.log-20210101.gz`, each one a gzip of a million JSON lines, each line an event
//! nobody had looked at since it was written.
//!
//! 🧠 Knowledge graph:
//! - `FileSource`: reads lines in pages. A `.gz` file name is decompressed on the fly
//!   (flate2, read on the blocking pool). Plain files go through tokio's async `BufReader`.
//! - `FileSink`: a `BufWriter` around a freshly created file. `close()` flushes.
//! - Configs live next to the backend that reads them.
//!
//! 🚰 File → pages → channel → convert worker → NDJSON payload → FileSink
//! 🦆 (mandatory, no notes)

mod file_sink;
mod file_source;

pub(crate) use file_sink::FileSink;
pub use file_sink::FileSinkConfig;
pub(crate) use file_source::FileSource;
pub use file_source::FileSourceConfig;

//! 🔌 Backends: where the real I/O happens.
//!
//! 🚰 Sources pour pages of tracking log lines, sinks slurp up NDJSON statement payloads.
//! In between sits the convert worker, and it is none of our business here.
//!
//! 🧠 Knowledge graph:
//! - Pattern: trait → concrete impls → `SourceBackend` / `SinkBackend` enum → `from_config`.
//! - Sources: file (plain or `.gz`), stdin, in-memory.
//! - Sinks: file, stdout, in-memory.
//! - Each backend's config lives in the backend's own file; `app_config` only assembles them.
//!
//! 🦆 The duck is here because every file must have one. This is law.

mod common_config;
mod file;
mod in_mem;
mod sink;
pub(crate) mod source;
mod stdio;

pub use common_config::CommonSourceConfig;
pub use file::{FileSinkConfig, FileSourceConfig};
pub use in_mem::InMemorySourceConfig;
pub use stdio::StdinSourceConfig;

pub(crate) use in_mem::{InMemorySink, InMemorySource};
pub(crate) use sink::{Sink, SinkBackend};
pub(crate) use source::{Source, SourceBackend};

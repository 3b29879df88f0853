//! 🧵 Workers: the ones who actually do the work while the Supervisor takes all the credit
//! in the sprint retro.
//!
//! 🧠 Knowledge graph:
//! - `SourceWorker`: source → pages → bounded channel. Drops the sender at EOF, which is how
//!   the convert worker learns the show is over.
//! - `ConvertWorker`: channel → lines → `ConverterSelector` → NDJSON payload → sink.
//!   Owns the selector, and with it every converter buffer. Nobody else touches them.
//!
//! ⚠️ "If you're reading this, the code review went poorly." 🦆

use anyhow::Result;
use tokio::task::JoinHandle;

mod convert_worker;
mod source_worker;

pub(super) use convert_worker::ConvertWorker;
pub(super) use source_worker::SourceWorker;

/// 🏗️ A background worker, that does work. duh.
pub(crate) trait Worker {
    /// 🧾 What the worker hands back when it is done.
    type Output: Send + 'static;

    /// 🚀 Start the worker. Returns a JoinHandle because we trust but verify.
    fn start(self) -> JoinHandle<Result<Self::Output>>;
}

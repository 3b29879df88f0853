//! 🎓 xfy: edX tracking logs in, xAPI statements out.
//!
//! 🧠 Knowledge graph:
//! - Core engine: `paths` → `converters` (field extractors, rule tables, converter) with a
//!   `validation` gate in front, `anonymize` for actor names.
//! - Domain: `schemas` (edX event rules) and `xapi` (statement rule tables), glued together by
//!   the `selector`, which is the one thing most callers need.
//! - Ambient pipeline: `app_config` → supervisor → source worker → convert worker → sink,
//!   returning a `ConversionReport`.
//!
//! ```text
//!   lines ──▶ ConverterSelector ──▶ Converter(schema ✔) ──▶ statement
//!                 │ skip (log)            │ None (log)
//! ```

use anyhow::{Context, Result};

pub mod anonymize;
pub mod app_config;
mod backends;
mod composers;
pub mod converters;
pub mod errors;
pub mod paths;
pub mod progress;
pub mod schemas;
pub mod selector;
mod supervisors;
pub mod validation;
pub mod xapi;

pub use app_config::{AppConfig, load_config};
pub use progress::ConversionReport;
pub use selector::{ConverterSelector, Statements, XapiConfig};

use supervisors::Supervisor;

/// 🚀 Run the whole pipeline described by `app_config` and report what happened.
pub async fn run(app_config: AppConfig) -> Result<ConversionReport> {
    Supervisor::new(app_config)
        .start_workers()
        .await
        .context("💀 The conversion pipeline stopped")
}

//! 📦 **Common Source Config**: the knobs every line source shares.
//!
//! 🧠 Knowledge graph:
//! - Embedded in `FileSourceConfig` and `StdinSourceConfig` as `common_config`.
//! - A "page" is what one `next_page()` call returns: newline-joined lines, capped by count
//!   AND by bytes, whichever trips first.
//! - Lives in `backends` (not `app_config`) so the backends never import the app config.
//!   `app_config` imports them, not the other way around. 🦆

use serde::Deserialize;

/// 📦 How big a page a source pours per call.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CommonSourceConfig {
    /// 📄 Max lines per page
    #[serde(default = "default_max_batch_size_docs")]
    pub max_batch_size_docs: usize,
    /// 📏 Max bytes per page, checked after each line so one giant line still gets through
    #[serde(default = "default_max_batch_size_bytes")]
    pub max_batch_size_bytes: usize,
}

// -- tracking log lines hover around 1-2 KiB, so 1000 lines is a page of a MiB or two
fn default_max_batch_size_docs() -> usize {
    1000
}

fn default_max_batch_size_bytes() -> usize {
    4 * 1024 * 1024
}

impl Default for CommonSourceConfig {
    fn default() -> Self {
        Self {
            max_batch_size_docs: default_max_batch_size_docs(),
            max_batch_size_bytes: default_max_batch_size_bytes(),
        }
    }
}

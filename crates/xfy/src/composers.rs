//! 🎼 Composers: turn a page worth of serialized statements into one sink payload.
//!
//! 🧠 Knowledge graph:
//! - The convert worker converts a page, hands the statements to the composer, and sends the
//!   resulting payload to the sink in ONE call. One page in, at most one write out.
//! - NDJSON is the only wire format an LRS bulk import or a `jq` pipeline wants, so it is
//!   the only composer. The trait stays as the seam for the next one. 🦆

mod ndjson;

pub(crate) use ndjson::NdjsonComposer;

/// 🎼 Assemble serialized statements into a wire-format payload.
pub(crate) trait Composer: std::fmt::Debug + Send {
    fn compose(&self, statements: &[String]) -> String;
}

//! 🎓 edX → xAPI rule tables.
//!
//! 🧠 Knowledge graph:
//! - `base`: the shared statement skeleton (actor, verb, object, mounted context, timestamp).
//! - `server`: every server event becomes *viewed page*.
//! - `browser`: `page_close`, `seq_*` and `textbook.pdf.*` each get their own spec.
//! - `constants`: IRIs and display names. Strings you do not want to typo twice.

mod base;
mod browser;
pub mod constants;
mod server;

pub use base::{XapiContext, activity, context_spec, extension, payload_field, statement, verb};
pub use browser::{browser_specs, page_close_spec, sequence_spec, textbook_spec};
pub use server::server_event_spec;

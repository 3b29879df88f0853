//! 🛂 edX tracking-log schemas: the business rules an event must satisfy before conversion.
//!
//! 🧠 Knowledge graph:
//! - `BaseContextSchema` validates the `context` sub-document. It is mounted, not called directly:
//!   the converter hands it the narrowed `context` slice.
//! - `ServerEventSchema` and `BrowserEventSchema` validate the whole event, sharing the
//!   base field rules from `base::check_base_event`.
//! - Every schema collects ALL its problems via `Checks` and reports them as one `Diagnostic`.

mod base;
mod browser;
mod server;

pub use base::BaseContextSchema;
pub use browser::{BROWSER_EVENT_TYPES, BROWSER_BOOK_NAMES, BrowserEventSchema};
pub use server::ServerEventSchema;

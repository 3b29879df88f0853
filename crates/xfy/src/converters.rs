//! 🔄 Converters: the declarative transformation engine.
//!
//! 🧠 Knowledge graph:
//! - `field`: `GetFromField` and `GoTo`, the things that pull values out of an event.
//! - `rules`: `RuleTable`, `Rule`, `Mount`, `ConverterSpec`, the static declaration of an output shape.
//! - `converter`: `Converter`, the per-instance engine that turns a spec into output documents.
//!
//! Specs are declared once and shared. Converters are built from specs and owned by whoever
//! converts. Data flows spec → converter → document, never backwards. 🦆

mod converter;
mod field;
mod rules;

pub use converter::Converter;
pub use field::{GetFromField, GoTo, Links};
pub use rules::{ConverterSpec, Generator, Mount, Rule, RuleTable};

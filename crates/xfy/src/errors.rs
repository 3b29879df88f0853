//! 💀 Errors: the taxonomy of things going sideways.
//!
//! 🧠 Knowledge graph:
//! - `PathError`: somebody handed `paths::set` a path of length zero. Filter before you set.
//! - `ConversionError`: a transform could not produce a value. Fatal to the current event,
//!   propagates out of `Converter::convert` and out of the selector's stream.
//! - `ConfigurationError`: bad settings at construction time. The selector refuses to exist.
//!
//! Parse, routing and validation failures are NOT errors here. They are skips,
//! logged and forgotten, like a voicemail from an unknown number. 🦆

use thiserror::Error;

/// 🛤️ The only way to hold a path wrong.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("💀 cannot set a value at an empty path, there is nowhere to put it")]
    Empty,
}

/// 🔥 A transform could not compute a value. No defaults are substituted, ever.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// 🧂 argon2 refused the parameters or the salt.
    #[error("💀 unable to pseudonymize the actor identifier: {0}")]
    Hashing(String),

    /// 🔢 a configured hash index points outside the encoded hash.
    #[error("💀 hash index {index} is out of range for an encoded hash of {len} characters")]
    HashIndex { index: i64, len: usize },

    /// 🧩 a field transform gave up.
    #[error("💀 field `{field}` could not be converted: {reason}")]
    Field { field: String, reason: String },

    /// 📦 the assembled statement would not serialize.
    #[error("💀 the converted statement could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),

    /// 🛤️ a rule tried to write to nowhere.
    #[error(transparent)]
    Path(#[from] PathError),
}

impl ConversionError {
    /// 🔧 Shorthand for the most common failure: a field that would not cooperate.
    pub fn field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Field {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 🔧 Bad settings, caught at startup instead of at event number 4,000,001.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error(
        "💀 The XFY_XAPI__ANONYMIZATION__HASH_INDEXES setting should consist of a comma \
         separated sequence of integers (got `{0}`)"
    )]
    HashIndexes(String),

    #[error("💀 the platform URL must not be empty, actor home pages and activity ids are built from it")]
    PlatformUrl,
}

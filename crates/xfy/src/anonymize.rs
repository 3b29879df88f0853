//! 🧂 Anonymization: turn a user id into an opaque, stable, salted token.
//!
//! 🧠 Knowledge graph:
//! - Falsy identifiers (missing, null, `""`, `0`, `false`) become the literal `"student"`.
//! - Anonymization off: the identifier is stringified and passed through.
//! - Anonymization on: Argon2id over the identifier, keyed by the salt, base64 encoded
//!   (padded), then the characters at the configured indexes are picked in LIST order.
//!   Repeats are fine. Negative indexes count from the end.
//! - The index list is parsed at construction. A bad list is a `ConfigurationError` and the
//!   anonymizer refuses to exist. Bad cost parameters or a short salt are only discovered when
//!   hashing, and surface as a `ConversionError` for that event. Never a plaintext fallback.
//!
//! 🔒 The salt is a secret. It is not logged. Not even at trace. Not even on Fridays.

use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::{ConfigurationError, ConversionError};

/// 🎭 What a falsy identifier turns into.
pub const ANONYMOUS_ACTOR: &str = "student";

/// 🔧 Anonymization settings, nested under `xapi.anonymization` in the app config.
#[derive(Clone, Deserialize)]
pub struct AnonymizationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub salt: String,
    #[serde(default = "default_time_cost")]
    pub time_cost: u32,
    /// 📏 in KiB, like argon2 wants it
    #[serde(default = "default_memory_cost")]
    pub memory_cost: u32,
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
    #[serde(default = "default_hash_length")]
    pub hash_length: usize,
    /// 🔢 comma separated character positions into the encoded hash, e.g. `"1,2,3,10"`
    #[serde(default)]
    pub hash_indexes: String,
}

// -- hand-rolled so the salt never ends up in a debug log by accident
impl std::fmt::Debug for AnonymizationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnonymizationConfig")
            .field("enabled", &self.enabled)
            .field("salt", &"<redacted>")
            .field("time_cost", &self.time_cost)
            .field("memory_cost", &self.memory_cost)
            .field("parallelism", &self.parallelism)
            .field("hash_length", &self.hash_length)
            .field("hash_indexes", &self.hash_indexes)
            .finish()
    }
}

fn default_time_cost() -> u32 {
    1
}

fn default_memory_cost() -> u32 {
    8
}

fn default_parallelism() -> u32 {
    1
}

fn default_hash_length() -> usize {
    64
}

impl Default for AnonymizationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            salt: String::new(),
            time_cost: default_time_cost(),
            memory_cost: default_memory_cost(),
            parallelism: default_parallelism(),
            hash_length: default_hash_length(),
            hash_indexes: String::new(),
        }
    }
}

/// 🔢 Parse `"1,2,3,10"` into indexes. Empty input, empty tokens and non-integers all fail.
pub fn parse_hash_indexes(raw: &str) -> Result<Vec<i64>, ConfigurationError> {
    raw.split(',')
        .map(|token| token.trim().parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ConfigurationError::HashIndexes(raw.to_string()))
}

/// 🧂 The configured pseudonymizer. Read-only after construction, share it behind an `Arc`.
#[derive(Clone)]
pub struct Anonymizer {
    config: AnonymizationConfig,
    indexes: Vec<i64>,
}

impl std::fmt::Debug for Anonymizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Anonymizer")
            .field("config", &self.config)
            .field("indexes", &self.indexes)
            .finish()
    }
}

impl Anonymizer {
    /// 🏗️ Validate the settings and build the anonymizer. Fails fast on a bad index list.
    pub fn new(config: &AnonymizationConfig) -> Result<Self, ConfigurationError> {
        let indexes = if config.enabled {
            parse_hash_indexes(&config.hash_indexes)?
        } else {
            Vec::new()
        };
        Ok(Self {
            config: config.clone(),
            indexes,
        })
    }

    /// 🚫 An anonymizer that passes identifiers through untouched.
    pub fn disabled() -> Self {
        Self {
            config: AnonymizationConfig::default(),
            indexes: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// 🎭 Identifier in, token out.
    pub fn pseudonymize(&self, user_id: Option<&Value>) -> Result<String, ConversionError> {
        let Some(user_id) = user_id.filter(|value| is_truthy(value)) else {
            return Ok(ANONYMOUS_ACTOR.to_string());
        };
        let plain = match user_id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if !self.config.enabled {
            return Ok(plain);
        }

        let encoded = STANDARD.encode(self.hash(plain.as_bytes())?);
        let chars: Vec<char> = encoded.chars().collect();
        self.indexes
            .iter()
            .map(|&index| pick(&chars, index))
            .collect()
    }

    /// 🔐 Raw Argon2id digest of `secret`.
    fn hash(&self, secret: &[u8]) -> Result<Vec<u8>, ConversionError> {
        let params = Params::new(
            self.config.memory_cost,
            self.config.time_cost,
            self.config.parallelism,
            Some(self.config.hash_length),
        )
        .map_err(|err| ConversionError::Hashing(err.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut digest = vec![0u8; self.config.hash_length];
        argon2
            .hash_password_into(secret, self.config.salt.as_bytes(), &mut digest)
            .map_err(|err| ConversionError::Hashing(err.to_string()))?;
        Ok(digest)
    }
}

/// 🎯 Character at `index`, negatives count from the end.
fn pick(chars: &[char], index: i64) -> Result<char, ConversionError> {
    let len = chars.len();
    let position = if index < 0 {
        (len as i64).checked_add(index)
    } else {
        Some(index)
    };
    position
        .filter(|p| *p >= 0)
        .and_then(|p| chars.get(p as usize).copied())
        .ok_or(ConversionError::HashIndex { index, len })
}

/// 🤔 The "is there really an id here" test.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn enabled(hash_indexes: &str) -> AnonymizationConfig {
        AnonymizationConfig {
            enabled: true,
            salt: "a pinch of salt, to taste".to_string(),
            hash_indexes: hash_indexes.to_string(),
            ..AnonymizationConfig::default()
        }
    }

    #[test]
    fn the_one_where_bad_index_lists_never_make_it_to_production() {
        for bad in ["", "ABC", "1,2,3,A,B,C", "1,2,3,", ",1", "1,,2"] {
            assert_eq!(
                Anonymizer::new(&enabled(bad)).err(),
                Some(ConfigurationError::HashIndexes(bad.to_string())),
                "`{bad}` should have been rejected"
            );
        }
        assert!(Anonymizer::new(&enabled("1,2,3,10")).is_ok());
    }

    #[test]
    fn the_one_where_the_error_message_says_what_it_wants() {
        let message = parse_hash_indexes("1,2,A").unwrap_err().to_string();
        assert!(message.contains("comma separated sequence of integers"));
    }

    #[test]
    fn the_one_where_a_disabled_anonymizer_ignores_the_index_list() -> anyhow::Result<()> {
        let config = AnonymizationConfig {
            hash_indexes: "not even close".into(),
            ..AnonymizationConfig::default()
        };
        let anonymizer = Anonymizer::new(&config)?;
        assert_eq!(anonymizer.pseudonymize(Some(&json!(42)))?, "42");
        assert_eq!(anonymizer.pseudonymize(Some(&json!("jdoe")))?, "jdoe");
        Ok(())
    }

    #[test]
    fn the_one_where_nobody_becomes_student() -> anyhow::Result<()> {
        for anonymizer in [Anonymizer::disabled(), Anonymizer::new(&enabled("0,1,2"))?] {
            for nobody in [None, Some(json!(null)), Some(json!("")), Some(json!(0))] {
                assert_eq!(anonymizer.pseudonymize(nobody.as_ref())?, ANONYMOUS_ACTOR);
            }
        }
        Ok(())
    }

    #[test]
    fn the_one_where_the_same_id_always_gets_the_same_mask() -> anyhow::Result<()> {
        let anonymizer = Anonymizer::new(&enabled("1,2,3,10,-1,-1"))?;
        let first = anonymizer.pseudonymize(Some(&json!(42)))?;
        let again = anonymizer.pseudonymize(Some(&json!(42)))?;
        let other = anonymizer.pseudonymize(Some(&json!(43)))?;
        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(first.chars().count(), 6);
        // -- 64 raw bytes encode to 88 chars ending in "==", and -1 picks the last one
        assert!(first.ends_with("=="));
        Ok(())
    }

    #[test]
    fn the_one_where_picking_follows_the_list_not_the_hash() -> anyhow::Result<()> {
        let forwards = Anonymizer::new(&enabled("0,1,2,3"))?.pseudonymize(Some(&json!(7)))?;
        let backwards = Anonymizer::new(&enabled("3,2,1,0"))?.pseudonymize(Some(&json!(7)))?;
        assert_eq!(forwards.chars().rev().collect::<String>(), backwards);
        Ok(())
    }

    #[test]
    fn the_one_where_hashing_failures_are_loud() -> anyhow::Result<()> {
        let short_salt = AnonymizationConfig {
            salt: "tiny".into(),
            ..enabled("1,2")
        };
        assert!(matches!(
            Anonymizer::new(&short_salt)?.pseudonymize(Some(&json!(1))),
            Err(ConversionError::Hashing(_))
        ));

        let no_time = AnonymizationConfig {
            time_cost: 0,
            ..enabled("1,2")
        };
        assert!(matches!(
            Anonymizer::new(&no_time)?.pseudonymize(Some(&json!(1))),
            Err(ConversionError::Hashing(_))
        ));

        let too_far = Anonymizer::new(&enabled("1000"))?;
        assert!(matches!(
            too_far.pseudonymize(Some(&json!(1))),
            Err(ConversionError::HashIndex { index: 1000, .. })
        ));
        Ok(())
    }
}

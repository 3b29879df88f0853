//! 🧱 The statement skeleton every edX event shares: actor, context, timestamp, version.
//!
//! 🧠 Knowledge graph:
//! - `statement(..)` assembles the root rule table; each concrete converter only brings
//!   its own `verb`, `object` and extra context extensions.
//! - `context` is a `Mount` on the source `context` sub-document, validated by
//!   `BaseContextSchema`. Its rules only see that slice.
//! - Root-level fields that belong in `context.extensions` (agent, host, ip...) are fixed
//!   `GoTo` routes on the root table. Routes run after the table entries, so a route can
//!   override a value written by the mounted context (browser events do this for `path`).

use std::sync::Arc;

use serde_json::{Value, json};

use super::constants::*;
use crate::anonymize::Anonymizer;
use crate::converters::{ConverterSpec, GetFromField, GoTo, Mount, RuleTable};
use crate::errors::{ConfigurationError, ConversionError};
use crate::paths::FieldPath;
use crate::schemas::BaseContextSchema;

/// 🌍 What every xAPI rule table needs to know about the outside world.
/// Built once from configuration, cloned into every transform that needs it.
#[derive(Debug, Clone)]
pub struct XapiContext {
    platform_url: String,
    anonymizer: Arc<Anonymizer>,
}

impl XapiContext {
    pub fn new(
        platform_url: impl Into<String>,
        anonymizer: Arc<Anonymizer>,
    ) -> Result<Self, ConfigurationError> {
        let platform_url = platform_url.into();
        if platform_url.trim().is_empty() {
            return Err(ConfigurationError::PlatformUrl);
        }
        Ok(Self {
            platform_url,
            anonymizer,
        })
    }

    pub fn platform_url(&self) -> &str {
        &self.platform_url
    }

    pub fn anonymizer(&self) -> &Arc<Anonymizer> {
        &self.anonymizer
    }
}

/// 🗣️ `{"id": .., "display": {"en": ..}}`
pub fn verb(id: &str, display: &str) -> RuleTable {
    RuleTable::new()
        .literal("id", id)
        .literal("display", json!({ EN: display }))
}

/// 🎯 An `Activity` object whose id comes from `id`.
pub fn activity(id: GetFromField, activity_type: &str, name: &str) -> RuleTable {
    RuleTable::new()
        .field("id", id)
        .table(
            "definition",
            RuleTable::new()
                .literal("type", activity_type)
                .literal("name", json!({ EN: name })),
        )
        .literal("objectType", "Activity")
}

/// 📦 A field whose source is the JSON object serialized inside the `event` string.
/// Unparseable payloads are a conversion error, a missing key just omits the field.
pub fn payload_field(key: &'static str) -> GetFromField {
    GetFromField::new("event").with(move |raw| {
        let Some(raw) = raw else {
            return Ok(None);
        };
        let payload = match raw {
            Value::String(text) => serde_json::from_str::<Value>(&text)
                .map_err(|err| ConversionError::field("event", err.to_string()))?,
            other => other,
        };
        Ok(payload.get(key).filter(|v| !v.is_null()).cloned())
    })
}

/// 🧭 The mounted `context` converter: platform plus the course-level extensions.
pub fn context_spec(xapi: &XapiContext) -> ConverterSpec {
    let platform = xapi.platform_url().to_string();
    ConverterSpec::new(
        "edx_base_context",
        BaseContextSchema,
        RuleTable::new()
            .generator("platform", move || Value::String(platform.clone()))
            .table(
                "extensions",
                RuleTable::new()
                    .field(XAPI_EXTENSION_COURSE_ID, GetFromField::new("course_id"))
                    .field(
                        XAPI_EXTENSION_COURSE_USER_TAGS,
                        GetFromField::new("course_user_tags").with(|tags| {
                            Ok(Some(match tags {
                                Some(Value::Object(tags)) if !tags.is_empty() => {
                                    Value::Object(tags)
                                }
                                _ => json!({}),
                            }))
                        }),
                    )
                    .field(XAPI_EXTENSION_ORG_ID, GetFromField::new("org_id"))
                    .field(XAPI_EXTENSION_PATH, GetFromField::new("path")),
            ),
    )
}

/// 🧍 `actor`: an `Agent` account named by the pseudonymized `context.user_id`.
fn actor(xapi: &XapiContext) -> RuleTable {
    let anonymizer = Arc::clone(xapi.anonymizer());
    let home_page = xapi.platform_url().to_string();
    RuleTable::new()
        .table(
            "account",
            RuleTable::new()
                .field(
                    "name",
                    GetFromField::new("context>user_id").with(move |user_id| {
                        anonymizer
                            .pseudonymize(user_id.as_ref())
                            .map(|name| Some(Value::String(name)))
                    }),
                )
                .generator("homePage", move || Value::String(home_page.clone())),
        )
        .literal("objectType", "Agent")
}

/// 📍 Route a root-level event field into `context.extensions`.
pub fn extension(iri: &str, source: GetFromField) -> GoTo {
    GoTo::fixed(FieldPath::keys(["context", "extensions", iri]), source)
}

/// 🏗️ The full statement table. `extensions` are extra root-level routes into
/// `context.extensions`, applied after the shared ones.
pub fn statement(
    xapi: &XapiContext,
    verb: RuleTable,
    object: RuleTable,
    extensions: Vec<GoTo>,
) -> RuleTable {
    let mut table = RuleTable::new()
        .literal("version", VERSION)
        .table("actor", actor(xapi))
        .table("verb", verb)
        .table("object", object)
        .mount("context", Mount::new("context", context_spec(xapi)))
        .field("timestamp", GetFromField::new("time"))
        .goto(extension(XAPI_EXTENSION_ACCEPT_LANGUAGE, GetFromField::new("accept_language")))
        .goto(extension(XAPI_EXTENSION_AGENT, GetFromField::new("agent")))
        .goto(extension(XAPI_EXTENSION_HOST, GetFromField::new("host")))
        .goto(extension(XAPI_EXTENSION_IP, GetFromField::new("ip")))
        .goto(extension(XAPI_EXTENSION_REFERER, GetFromField::new("referer")));
    for route in extensions {
        table = table.goto(route);
    }
    table
}

//! 🌐 Browser events: XHR posts to `/event` from the learner's browser.
//!
//! 🧠 Knowledge graph:
//! - `context.path` is always `/event`; the real URL lives in `page`.
//! - `event` is usually a JSON object serialized into a string. Per-name rules parse it.
//! - Rules here cover the names the xAPI tables convert: `page_close`, the `seq_*` family
//!   and the `textbook.pdf.*` family. Other names in the list only get the shared rules.

use serde_json::{Map, Value};

use super::base::{check_base_event, course_key, is_url};
use crate::validation::{Checks, Diagnostic, Schema};

/// 📋 Every `event_type` a browser event may carry.
pub const BROWSER_EVENT_TYPES: [&str; 18] = [
    "book",
    "page_close",
    "problem_check",
    "problem_graded",
    "problem_reset",
    "problem_save",
    "problem_show",
    "seq_goto",
    "seq_next",
    "seq_prev",
    "textbook.pdf.display.scaled",
    "textbook.pdf.outline.toggled",
    "textbook.pdf.page.navigated",
    "textbook.pdf.page.scrolled",
    "textbook.pdf.thumbnail.navigated",
    "textbook.pdf.thumbnails.toggled",
    "textbook.pdf.zoom.buttons.changed",
    "textbook.pdf.zoom.menu.changed",
];

/// 📚 Names allowed when `event_type` is `book`.
pub const BROWSER_BOOK_NAMES: [&str; 6] = [
    "textbook.pdf.page.loaded",
    "textbook.pdf.page.navigatednext",
    "textbook.pdf.search.executed",
    "textbook.pdf.search.highlight.toggled",
    "textbook.pdf.search.navigatednext",
    "textbook.pdf.searchcasesensitivity.toggled",
];

/// 🌐 A common edX browser event.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserEventSchema;

impl Schema for BrowserEventSchema {
    fn name(&self) -> &str {
        "edx_browser_event"
    }

    fn validate(&self, event: &Value) -> Result<(), Diagnostic> {
        let mut checks = Checks::new(event);
        check_base_event(&mut checks);

        checks.require_equal(
            "event_source",
            &Value::from("browser"),
            "The event event_source field is not \"browser\"",
        );

        let event_type = checks.require_str("event_type");
        if let Some(event_type) = event_type {
            if !BROWSER_EVENT_TYPES.contains(&event_type) {
                checks.problem(
                    "event_type",
                    "The event name field value is not one of the valid values",
                );
            }
        }

        let name = checks.require_str("name");
        match (event_type, name) {
            (Some("book"), Some(name)) if !BROWSER_BOOK_NAMES.contains(&name) => {
                checks.problem("name", "the name field is not one of the allowed values");
            }
            (Some(event_type), Some(name)) if event_type != "book" && event_type != name => {
                checks.problem(
                    "name",
                    "the name field should be equal to the event_type when event_type is not `book`",
                );
            }
            _ => {}
        }

        match checks.get("context>path").and_then(Value::as_str) {
            Some("/event") => {}
            other => checks.problem(
                "context>path",
                format!("Path should be `/event`, not `{}`", other.unwrap_or_default()),
            ),
        }

        if let Some(page) = checks.require_str("page") {
            if !is_url(page, true) {
                checks.problem("page", "Not a valid URL.");
            }
        }

        if let Some(session) = checks.require_str("session") {
            if !session.is_empty() && session.chars().count() != 32 {
                checks.problem("session", "Session should be empty or 32 chars long (md5 key)");
            }
        }

        let payload = checks.require("event");
        let course_id = checks
            .get("context>course_id")
            .and_then(Value::as_str)
            .unwrap_or_default();
        // -- `book` payloads have their own shapes and no rules here
        if let (Some(event_type), Some(payload)) = (event_type, payload) {
            match event_type {
                "page_close" => {
                    if payload.as_str() != Some("{}") {
                        checks.problem("event", "Event should be empty when name is `page_close`");
                    }
                }
                "seq_goto" | "seq_next" | "seq_prev" => {
                    check_sequence(&mut checks, event_type, payload, course_key(course_id))
                }
                name if name.starts_with("textbook.pdf.") => {
                    check_textbook(&mut checks, name, payload, course_key(course_id))
                }
                _ => {}
            }
        }

        checks.finish()
    }
}

/// 📦 Parse a payload that should be a JSON object serialized into a string.
fn parse_payload(checks: &mut Checks<'_>, payload: &Value) -> Option<Map<String, Value>> {
    match payload.as_str().map(serde_json::from_str::<Value>) {
        Some(Ok(Value::Object(map))) => Some(map),
        _ => {
            checks.problem("event", "Event should contain a parsable JSON string");
            None
        }
    }
}

/// 🪜 `{"new": int, "old": int, "id": "block-v1:...+type@sequential+block@<32 hex>"}`.
fn check_sequence(checks: &mut Checks<'_>, name: &str, payload: &Value, course_key: &str) {
    let Some(event) = parse_payload(checks, payload) else {
        return;
    };
    let (Some(new), Some(old), Some(id)) = (
        event.get("new").and_then(Value::as_i64),
        event.get("old").and_then(Value::as_i64),
        event.get("id").and_then(Value::as_str),
    ) else {
        return checks.problem(
            "event",
            "Event should hold integer `new` and `old` fields and a string `id`",
        );
    };

    let expected = format!("block-v1:{course_key}+type@sequential+block@");
    let id_prefix = id.len().checked_sub(32).and_then(|end| id.get(..end));
    if id_prefix != Some(expected.as_str()) {
        checks.problem("event", format!("the event.id value should start with {expected}"));
    }

    let diff = match name {
        "seq_next" => 1,
        "seq_prev" => -1,
        _ => return,
    };
    if old.checked_add(diff) != Some(new) {
        checks.problem(
            "event",
            format!("Event new ({new}) should be equal to old ({old}) + diff ({diff})"),
        );
    }
}

/// 📖 Textbook viewer events point at a PDF asset of the same course.
fn check_textbook(checks: &mut Checks<'_>, name: &str, payload: &Value, course_key: &str) {
    let Some(event) = parse_payload(checks, payload) else {
        return;
    };

    if event.get("name").and_then(Value::as_str) != Some(name) {
        checks.problem("event", "Event name should be equal to the browser event name");
    }

    match event.get("chapter").and_then(Value::as_str) {
        Some(chapter) => {
            let chapter_begin = format!("/asset-v1:{course_key}+type@asset+block/");
            if !is_url(chapter, true) || !chapter.starts_with(&chapter_begin) {
                checks.problem(
                    "event",
                    format!("Event chapter should begin with {chapter_begin}"),
                );
            }
            if !chapter.ends_with(".pdf") {
                checks.problem("event", "Event chapter should end with the .pdf extension");
            }
        }
        None => checks.problem("event", "Event should contain a `chapter` string"),
    }

    if name != "textbook.pdf.display.scaled" {
        match event.get("page").and_then(Value::as_i64) {
            Some(page) if page > 0 => {}
            _ => checks.problem("event", "Event page should a positive integer"),
        }
    }

    let extra = match name {
        "textbook.pdf.thumbnail.navigated" => Some("thumbnail_title"),
        "textbook.pdf.zoom.buttons.changed" | "textbook.pdf.page.scrolled" => Some("direction"),
        "textbook.pdf.zoom.menu.changed" | "textbook.pdf.display.scaled" => Some("amount"),
        _ => None,
    };
    if let Some(key) = extra {
        if event.get(key).is_none_or(Value::is_null) {
            checks.problem("event", format!("{key} key is required for event"));
        }
    }
}

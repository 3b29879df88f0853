//! 🖥️ Server events: one per HTTP request the platform served.

use serde_json::Value;

use super::base::{check_base_event, is_url};
use crate::validation::{Checks, Diagnostic, Schema};

/// 🖥️ A common edX server event. Its `event_type` is the requested path.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerEventSchema;

impl Schema for ServerEventSchema {
    fn name(&self) -> &str {
        "edx_server_event"
    }

    fn validate(&self, event: &Value) -> Result<(), Diagnostic> {
        let mut checks = Checks::new(event);
        check_base_event(&mut checks);

        checks.require_equal(
            "event_source",
            &Value::from("server"),
            "The event event_source field is not \"server\"",
        );
        checks.require_equal("page", &Value::Null, "The event page field is not None");

        if let Some(event_type) = checks.require_str("event_type") {
            if !is_url(event_type, true) {
                checks.problem("event_type", "Not a valid URL.");
            }
            let path = checks.get("context>path").and_then(Value::as_str);
            if path != Some(event_type) {
                checks.problem("event_type", "event_type should be equal to context.path");
            }
        }

        if let Some(raw) = checks.require_str("event") {
            check_request(&mut checks, raw);
        }
        checks.finish()
    }
}

/// 📨 The `event` field is a JSON string holding exactly the `GET` and `POST` parameter objects.
/// It gets truncated at 500 characters upstream, so "unparseable" is a common sight.
fn check_request(checks: &mut Checks<'_>, raw: &str) {
    let Ok(Value::Object(request)) = serde_json::from_str::<Value>(raw) else {
        return checks.problem("event", "Server event should contain a JSON string");
    };
    if request.len() != 2 {
        return checks.problem("event", "Server event field should exactly have two keys");
    }
    match (request.get("GET"), request.get("POST")) {
        (Some(Value::Object(_)), Some(Value::Object(_))) => {}
        (Some(_), Some(_)) => checks.problem(
            "event",
            "Server event GET and POST values should be serialized objects",
        ),
        _ => checks.problem("event", "Server event should contain GET and POST keys"),
    }
}

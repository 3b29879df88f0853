//! 🧱 Shared edX rules: the context sub-document and the fields every event carries.

use std::net::Ipv4Addr;

use chrono::{DateTime, NaiveDateTime};
use serde_json::Value;
use url::{Host, Url};

use crate::validation::{Checks, Diagnostic, Schema};

/// 🌐 Schemes an absolute URL may use.
const URL_SCHEMES: [&str; 4] = ["http", "https", "ftp", "ftps"];

/// 🔗 URL check: absolute web URL with a real host or, when allowed, a path rooted at `/`.
///
/// A host needs a top-level domain unless it is `localhost` or an IP address.
pub(crate) fn is_url(value: &str, relative: bool) -> bool {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return false;
    }
    if relative && value.starts_with('/') {
        return true;
    }
    let Ok(url) = Url::parse(value) else {
        return false;
    };
    if !URL_SCHEMES.contains(&url.scheme()) {
        return false;
    }
    match url.host() {
        Some(Host::Domain(domain)) => {
            domain == "localhost"
                || domain
                    .rsplit_once('.')
                    .is_some_and(|(name, tld)| !name.is_empty() && !tld.is_empty())
        }
        Some(Host::Ipv4(_) | Host::Ipv6(_)) => true,
        None => false,
    }
}

/// ⏰ ISO-8601, with or without an offset.
pub(crate) fn is_iso_datetime(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
}

/// 🔑 `course-v1:org+course+session` → `org+course+session`.
pub(crate) fn course_key(course_id: &str) -> &str {
    course_id.strip_prefix("course-v1:").unwrap_or(course_id)
}

/// 🧱 Rules for the event fields shared by server and browser events.
/// `event_source`, `event_type`, `page` and `event` are left to the concrete schema.
pub(crate) fn check_base_event(checks: &mut Checks<'_>) {
    if let Some(username) = checks.require_str("username") {
        let len = username.chars().count();
        if len == 1 || len > 30 {
            checks.problem(
                "username",
                "username should be empty or between 2 and 30 chars long",
            );
        }
    }

    if let Some(ip) = checks.require_str("ip") {
        if !ip.is_empty() && ip.parse::<Ipv4Addr>().is_err() {
            checks.problem("ip", "Invalid IPv4 Address");
        }
    }

    for field in ["agent", "host", "accept_language"] {
        checks.require_str(field);
    }

    if let Some(referer) = checks.require_str("referer") {
        if !referer.is_empty() && !is_url(referer, true) {
            checks.problem("referer", "Not a valid URL.");
        }
    }

    if let Some(time) = checks.require_str("time") {
        if !is_iso_datetime(time) {
            checks.problem("time", "Not a valid datetime.");
        }
    }

    match checks.require("context") {
        Some(Value::Object(_)) | None => {}
        Some(_) => checks.problem("context", "Invalid input type."),
    }
}

/// 🧭 The `context` every edX event carries: who, which course, which URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseContextSchema;

impl Schema for BaseContextSchema {
    fn name(&self) -> &str {
        "edx_base_context"
    }

    fn validate(&self, context: &Value) -> Result<(), Diagnostic> {
        let mut checks = Checks::new(context);
        if !context.is_object() {
            checks.problem("", "Invalid input type.");
            return checks.finish();
        }

        match checks.get("course_user_tags") {
            None | Some(Value::Null) => {}
            Some(Value::Object(tags)) => {
                if !tags.values().all(Value::is_string) {
                    checks.problem("course_user_tags", "Tag values should be strings.");
                }
            }
            Some(_) => checks.problem("course_user_tags", "Not a valid mapping type."),
        }

        match checks.require("user_id") {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) if s.is_empty() => {}
            Some(Value::Number(n)) if n.is_i64() || n.is_u64() => {}
            Some(_) => checks.problem(
                "user_id",
                "user_id should be None or empty string or an Integer",
            ),
        }

        let org_id = checks.require_str("org_id");
        let course_id = checks.require_str("course_id");
        if let (Some(org_id), Some(course_id)) = (org_id, course_id) {
            check_course_id(&mut checks, org_id, course_id);
        }

        let path = checks.require_str("path");
        if let Some(path) = path {
            if !is_url(path, true) {
                checks.problem("path", "Not a valid URL.");
            }
        }

        if let Some(module) = checks.get("module") {
            let usage_key = module.get("usage_key").and_then(Value::as_str);
            let display_name = module.get("display_name").and_then(Value::as_str);
            match (usage_key, display_name) {
                (Some(usage_key), Some(_)) => {
                    if let (Some(path), Some(course_id)) = (path, course_id) {
                        let expected = format!("/courses/{course_id}/xblock/{usage_key}/handler/");
                        if !path.starts_with(&expected) {
                            checks.problem("path", format!("path should start with: {expected}"));
                        }
                    }
                }
                _ => checks.problem(
                    "module",
                    "module should contain usage_key and display_name strings",
                ),
            }
        }

        checks.finish()
    }
}

/// 🏫 `course-v1:{org_id}+{course}+{session}`, or both empty.
fn check_course_id(checks: &mut Checks<'_>, org_id: &str, course_id: &str) {
    match (org_id.is_empty(), course_id.is_empty()) {
        (true, true) => return,
        (true, false) => {
            return checks.problem("course_id", "course_id should be empty if org_id is empty");
        }
        (false, true) => {
            return checks.problem("org_id", "org_id should be empty if course_id is empty");
        }
        (false, false) => {}
    }
    if !course_id.starts_with("course-v1:") {
        return checks.problem("course_id", "course_id should starts with 'course-v1'");
    }
    let parts: Vec<&str> = course_key(course_id).split('+').collect();
    let [organization, course, session] = parts.as_slice() else {
        return checks.problem(
            "course_id",
            "course_id should contain an organization ID, a course name and session separated by a +",
        );
    };
    if *organization != org_id {
        checks.problem(
            "course_id",
            "organization ID in the course ID does not match the event organization ID",
        );
    }
    if course.is_empty() || session.is_empty() {
        checks.problem("course_id", "course and session should not be empty");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> Value {
        json!({
            "course_user_tags": {},
            "user_id": 42,
            "org_id": "org",
            "course_id": "course-v1:org+c+s",
            "path": "/courses/course-v1:org+c+s/info"
        })
    }

    #[test]
    fn the_one_where_a_good_context_walks_right_in() {
        assert_eq!(BaseContextSchema.validate(&context()), Ok(()));
        let mut anonymous = context();
        anonymous["user_id"] = json!("");
        assert_eq!(BaseContextSchema.validate(&anonymous), Ok(()));
        anonymous["user_id"] = json!(null);
        assert_eq!(BaseContextSchema.validate(&anonymous), Ok(()));
    }

    #[test]
    fn the_one_where_the_course_id_has_to_match_the_org() {
        let mut wrong_org = context();
        wrong_org["org_id"] = json!("other");
        let diagnostic = BaseContextSchema.validate(&wrong_org).unwrap_err();
        assert_eq!(diagnostic.problems[0].field, "course_id");

        let mut too_few_parts = context();
        too_few_parts["course_id"] = json!("course-v1:org+c");
        assert!(BaseContextSchema.validate(&too_few_parts).is_err());

        let mut both_empty = context();
        both_empty["org_id"] = json!("");
        both_empty["course_id"] = json!("");
        assert_eq!(BaseContextSchema.validate(&both_empty), Ok(()));
    }

    #[test]
    fn the_one_where_user_id_cannot_be_a_name() {
        let mut named = context();
        named["user_id"] = json!("jdoe");
        assert!(BaseContextSchema.validate(&named).is_err());
    }

    #[test]
    fn the_one_where_the_module_must_agree_with_the_path() {
        let mut with_module = context();
        with_module["module"] = json!({"usage_key": "block-v1:org+c+s+type@problem+block@abc", "display_name": "Q1"});
        assert!(BaseContextSchema.validate(&with_module).is_err());
        with_module["path"] = json!(
            "/courses/course-v1:org+c+s/xblock/block-v1:org+c+s+type@problem+block@abc/handler/xmodule_handler/problem_check"
        );
        assert_eq!(BaseContextSchema.validate(&with_module), Ok(()));
    }

    #[test]
    fn the_one_where_urls_and_dates_get_sniffed() {
        assert!(is_url("/jsonpath", true));
        assert!(!is_url("/jsonpath", false));
        assert!(is_url("https://www.example.com/x", false));
        assert!(!is_url("not a url", true));
        assert!(!is_url("javascript://x", false));
        assert!(!is_url("https://", false));
        assert!(!is_url("https://intranet/x", false));
        assert!(!is_url("https://a b.com", false));
        assert!(is_url("http://localhost:8000/x", false));
        assert!(is_url("https://127.0.0.1/", false));
        assert!(is_url("ftp://files.example.com/a.pdf", false));
        assert!(is_iso_datetime("2021-01-01T00:00:00+00:00"));
        assert!(is_iso_datetime("2021-01-01T00:00:00.123456"));
        assert!(!is_iso_datetime("yesterday-ish"));
    }

    #[test]
    fn the_one_where_base_event_fields_are_all_checked_at_once() {
        let event = json!({"username": "x", "ip": "300.1.1.1", "context": []});
        let mut checks = Checks::new(&event);
        check_base_event(&mut checks);
        let diagnostic = checks.finish().unwrap_err();
        let fields: Vec<&str> = diagnostic.problems.iter().map(|p| p.field.as_str()).collect();
        assert_eq!(
            fields,
            ["username", "ip", "agent", "host", "accept_language", "referer", "time", "context"]
        );
    }
}

//! 🖥️ Server event → "viewed page" statement.
//!
//! Example: *John viewed https://lms.example.com/courses/ web page.*

use serde_json::Value;

use super::base::{XapiContext, activity, extension, statement, verb};
use super::constants::*;
use crate::converters::{ConverterSpec, GetFromField};
use crate::schemas::ServerEventSchema;

/// 🏗️ The spec for every common server event.
pub fn server_event_spec(xapi: &XapiContext) -> ConverterSpec {
    let platform = xapi.platform_url().to_string();
    let page_id = GetFromField::new("event_type").with(move |event_type| {
        Ok(event_type
            .as_ref()
            .and_then(Value::as_str)
            .map(|path| Value::String(format!("{platform}{path}"))))
    });

    ConverterSpec::new(
        "server_event_to_xapi",
        ServerEventSchema,
        statement(
            xapi,
            verb(XAPI_VERB_VIEWED, VIEWED),
            activity(page_id, XAPI_ACTIVITY_PAGE, PAGE),
            vec![extension(XAPI_EXTENSION_REQUEST, GetFromField::new("event"))],
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymize::Anonymizer;
    use crate::converters::Converter;
    use serde_json::json;
    use std::sync::Arc;

    fn server_event() -> Value {
        json!({
            "username": "jdoe",
            "ip": "127.0.0.1",
            "agent": "Mozilla/5.0",
            "host": "lms.example.com",
            "referer": "",
            "accept_language": "en-US,en;q=0.9",
            "event": "{\"POST\": {}, \"GET\": {}}",
            "event_source": "server",
            "event_type": "/jsonpath",
            "context": {
                "path": "/jsonpath",
                "course_id": "course-v1:org+c+s",
                "org_id": "org",
                "user_id": 42
            },
            "time": "2021-01-01T00:00:00+00:00",
            "page": null
        })
    }

    #[test]
    fn the_one_where_a_server_event_becomes_a_viewed_statement() -> anyhow::Result<()> {
        let xapi = XapiContext::new("https://lms.example.com", Arc::new(Anonymizer::disabled()))?;
        let mut converter = Converter::new(&server_event_spec(&xapi));
        let statement = converter
            .convert_value(&server_event())?
            .expect("a valid server event converts");

        assert_eq!(
            statement,
            json!({
                "version": "1.0.3",
                "actor": {
                    "account": {"name": "42", "homePage": "https://lms.example.com"},
                    "objectType": "Agent"
                },
                "verb": {"id": XAPI_VERB_VIEWED, "display": {"en": "viewed"}},
                "object": {
                    "id": "https://lms.example.com/jsonpath",
                    "definition": {"type": XAPI_ACTIVITY_PAGE, "name": {"en": "page"}},
                    "objectType": "Activity"
                },
                "context": {
                    "platform": "https://lms.example.com",
                    "extensions": {
                        XAPI_EXTENSION_ACCEPT_LANGUAGE: "en-US,en;q=0.9",
                        XAPI_EXTENSION_AGENT: "Mozilla/5.0",
                        XAPI_EXTENSION_COURSE_ID: "course-v1:org+c+s",
                        XAPI_EXTENSION_COURSE_USER_TAGS: {},
                        XAPI_EXTENSION_HOST: "lms.example.com",
                        XAPI_EXTENSION_IP: "127.0.0.1",
                        XAPI_EXTENSION_ORG_ID: "org",
                        XAPI_EXTENSION_PATH: "/jsonpath",
                        XAPI_EXTENSION_REFERER: "",
                        XAPI_EXTENSION_REQUEST: "{\"POST\": {}, \"GET\": {}}"
                    }
                },
                "timestamp": "2021-01-01T00:00:00+00:00"
            })
        );
        Ok(())
    }

    #[test]
    fn the_one_where_an_anonymous_visitor_is_a_student() -> anyhow::Result<()> {
        let xapi = XapiContext::new("https://lms.example.com", Arc::new(Anonymizer::disabled()))?;
        let mut converter = Converter::new(&server_event_spec(&xapi));
        let mut event = server_event();
        event["context"]["user_id"] = json!("");
        let statement = converter.convert_value(&event)?.expect("still valid");
        assert_eq!(statement["actor"]["account"]["name"], json!("student"));
        Ok(())
    }

    #[test]
    fn the_one_where_an_invalid_server_event_converts_to_nothing() -> anyhow::Result<()> {
        let xapi = XapiContext::new("https://lms.example.com", Arc::new(Anonymizer::disabled()))?;
        let mut converter = Converter::new(&server_event_spec(&xapi));
        let mut event = server_event();
        event["context"]["course_id"] = json!("course-v1:other+c+s");
        assert_eq!(converter.convert(&event)?, None);
        Ok(())
    }
}

//! 🌐 Browser events → xAPI statements.
//!
//! 🧠 Knowledge graph:
//! - `page_close` → *terminated* a page, object id = `page`.
//! - `seq_goto` / `seq_next` / `seq_prev` → *initialized* a module, object id = payload `id`,
//!   with starting (`old`) and ending (`new`) positions.
//! - `textbook.pdf.*` → *interacted* with a book, object id = payload `chapter`, position = payload
//!   `page`, plus one sub-event specific extension for a few of them.
//! - Every browser statement reports `page` as the path extension (context.path is always
//!   `/event`, which tells nobody anything) and carries the session.

use super::base::{XapiContext, activity, extension, payload_field, statement, verb};
use super::constants::*;
use crate::converters::{ConverterSpec, GetFromField, GoTo, Rule, RuleTable};
use crate::schemas::BrowserEventSchema;

/// 📚 The textbook sub-events this crate converts, with their extra object extension.
const TEXTBOOK_EVENTS: [(&str, Option<(&str, &str)>); 8] = [
    ("textbook.pdf.display.scaled", Some((XAPI_EXTENSION_ZOOM_AMOUNT, "amount"))),
    ("textbook.pdf.outline.toggled", None),
    ("textbook.pdf.page.navigated", None),
    ("textbook.pdf.page.scrolled", Some((XAPI_EXTENSION_DIRECTION, "direction"))),
    (
        "textbook.pdf.thumbnail.navigated",
        Some((XAPI_EXTENSION_THUMBNAIL_TITLE, "thumbnail_title")),
    ),
    ("textbook.pdf.thumbnails.toggled", None),
    ("textbook.pdf.zoom.buttons.changed", Some((XAPI_EXTENSION_DIRECTION, "direction"))),
    ("textbook.pdf.zoom.menu.changed", Some((XAPI_EXTENSION_ZOOM_AMOUNT, "amount"))),
];

/// 🧭 The extensions every browser statement gets on top of the shared ones.
fn browser_extensions(mut extra: Vec<GoTo>) -> Vec<GoTo> {
    let mut routes = vec![
        extension(XAPI_EXTENSION_PATH, GetFromField::new("page")),
        extension(XAPI_EXTENSION_SESSION, GetFromField::new("session")),
    ];
    routes.append(&mut extra);
    routes
}

/// 🚪 `page_close`: the learner left a page.
pub fn page_close_spec(xapi: &XapiContext) -> ConverterSpec {
    ConverterSpec::new(
        "page_close_browser_event_to_xapi",
        BrowserEventSchema,
        statement(
            xapi,
            verb(XAPI_VERB_TERMINATED, TERMINATED),
            activity(GetFromField::new("page"), XAPI_ACTIVITY_PAGE, PAGE),
            browser_extensions(Vec::new()),
        ),
    )
}

/// 🪜 `seq_goto`, `seq_next`, `seq_prev`: moving around inside a sequential.
pub fn sequence_spec(xapi: &XapiContext, name: &str) -> ConverterSpec {
    let mut object = activity(payload_field("id"), XAPI_ACTIVITY_MODULE, MODULE);
    collection_type(&mut object);

    ConverterSpec::new(
        format!("{name}_browser_event_to_xapi"),
        BrowserEventSchema,
        statement(
            xapi,
            verb(XAPI_VERB_INITIALIZED, INITIALIZED),
            object,
            browser_extensions(vec![
                extension(XAPI_EXTENSION_ENDING_POSITION, payload_field("new")),
                extension(XAPI_EXTENSION_STARTING_POSITION, payload_field("old")),
            ]),
        ),
    )
}

/// 📖 `textbook.pdf.*`: poking at the PDF viewer. `extra` names one more object
/// extension and the payload key it is read from.
pub fn textbook_spec(
    xapi: &XapiContext,
    name: &str,
    extra: Option<(&str, &'static str)>,
) -> ConverterSpec {
    let mut object = activity(payload_field("chapter"), XAPI_ACTIVITY_BOOK, BOOK);
    collection_type(&mut object);
    if let Some((iri, key)) = extra {
        if let Some(extensions) = object
            .table_mut("definition")
            .and_then(|definition| definition.table_mut("extensions"))
        {
            extensions.insert(iri, Rule::Field(payload_field(key)));
        }
    }

    ConverterSpec::new(
        format!("{name}_browser_event_to_xapi"),
        BrowserEventSchema,
        statement(
            xapi,
            verb(XAPI_VERB_INTERACTED, INTERACTED),
            object,
            browser_extensions(vec![extension(
                XAPI_EXTENSION_POSITION,
                payload_field("page"),
            )]),
        ),
    )
}

/// 🏷️ Add `definition.extensions.collection-type = event_type` to an activity table.
fn collection_type(object: &mut RuleTable) {
    if let Some(definition) = object.table_mut("definition") {
        definition.insert(
            "extensions",
            Rule::Table(
                RuleTable::new()
                    .field(XAPI_EXTENSION_COLLECTION_TYPE, GetFromField::new("event_type")),
            ),
        );
    }
}

/// 🗂️ Every browser spec, keyed by the `event_type` it handles.
pub fn browser_specs(xapi: &XapiContext) -> Vec<(&'static str, ConverterSpec)> {
    let mut specs = vec![("page_close", page_close_spec(xapi))];
    for name in ["seq_goto", "seq_next", "seq_prev"] {
        specs.push((name, sequence_spec(xapi, name)));
    }
    for (name, extra) in TEXTBOOK_EVENTS {
        specs.push((name, textbook_spec(xapi, name, extra)));
    }
    specs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymize::Anonymizer;
    use crate::converters::Converter;
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn xapi() -> XapiContext {
        XapiContext::new("https://lms.example.com", Arc::new(Anonymizer::disabled()))
            .expect("platform url is set")
    }

    fn browser_event(name: &str, payload: &str) -> Value {
        json!({
            "username": "jdoe",
            "ip": "10.0.0.1",
            "agent": "Mozilla/5.0",
            "host": "lms.example.com",
            "referer": "",
            "accept_language": "en",
            "event": payload,
            "event_source": "browser",
            "event_type": name,
            "name": name,
            "context": {
                "path": "/event",
                "course_id": "course-v1:org+c+s",
                "org_id": "org",
                "user_id": 9
            },
            "time": "2021-01-01T00:00:00+00:00",
            "page": "https://lms.example.com/courses/course-v1:org+c+s/courseware/",
            "session": ""
        })
    }

    #[test]
    fn the_one_where_closing_a_page_terminates_it() -> anyhow::Result<()> {
        let mut converter = Converter::new(&page_close_spec(&xapi()));
        let statement = converter
            .convert_value(&browser_event("page_close", "{}"))?
            .expect("valid page_close");
        assert_eq!(statement["verb"]["id"], json!(XAPI_VERB_TERMINATED));
        assert_eq!(
            statement["object"]["id"],
            json!("https://lms.example.com/courses/course-v1:org+c+s/courseware/")
        );
        // -- the page wins over the useless `/event`
        assert_eq!(
            statement["context"]["extensions"][XAPI_EXTENSION_PATH],
            statement["object"]["id"]
        );
        assert_eq!(statement["context"]["extensions"][XAPI_EXTENSION_SESSION], json!(""));
        Ok(())
    }

    #[test]
    fn the_one_where_seq_next_initializes_a_module() -> anyhow::Result<()> {
        let id = "block-v1:org+c+s+type@sequential+block@0123456789abcdef0123456789abcdef";
        let payload = json!({"old": 1, "new": 2, "id": id}).to_string();
        let mut converter = Converter::new(&sequence_spec(&xapi(), "seq_next"));
        let statement = converter
            .convert_value(&browser_event("seq_next", &payload))?
            .expect("valid seq_next");
        assert_eq!(statement["object"]["id"], json!(id));
        assert_eq!(
            statement["object"]["definition"]["extensions"][XAPI_EXTENSION_COLLECTION_TYPE],
            json!("seq_next")
        );
        let extensions = &statement["context"]["extensions"];
        assert_eq!(extensions[XAPI_EXTENSION_STARTING_POSITION], json!(1));
        assert_eq!(extensions[XAPI_EXTENSION_ENDING_POSITION], json!(2));
        Ok(())
    }

    #[test]
    fn the_one_where_zooming_the_pdf_reports_the_amount() -> anyhow::Result<()> {
        let name = "textbook.pdf.zoom.menu.changed";
        let payload = json!({
            "name": name,
            "page": 4,
            "amount": "1.25",
            "chapter": "/asset-v1:org+c+s+type@asset+block/notes.pdf"
        })
        .to_string();
        let mut converter = Converter::new(&textbook_spec(
            &xapi(),
            name,
            Some((XAPI_EXTENSION_ZOOM_AMOUNT, "amount")),
        ));
        let statement = converter
            .convert_value(&browser_event(name, &payload))?
            .expect("valid textbook event");
        assert_eq!(statement["verb"]["id"], json!(XAPI_VERB_INTERACTED));
        assert_eq!(
            statement["object"]["id"],
            json!("/asset-v1:org+c+s+type@asset+block/notes.pdf")
        );
        assert_eq!(
            statement["object"]["definition"]["extensions"][XAPI_EXTENSION_ZOOM_AMOUNT],
            json!("1.25")
        );
        assert_eq!(statement["context"]["extensions"][XAPI_EXTENSION_POSITION], json!(4));
        Ok(())
    }

    #[test]
    fn the_one_where_every_textbook_event_has_a_spec() {
        let specs = browser_specs(&xapi());
        assert_eq!(specs.len(), 12);
        assert!(specs.iter().any(|(name, _)| *name == "textbook.pdf.thumbnail.navigated"));
    }
}

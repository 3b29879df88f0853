//! 🚦 The ConverterSelector: one line in, at most one statement out.
//!
//! 🎬 *[a line arrives. is it JSON? is it an event? does anybody know how to convert it?]*
//!
//! 🧠 Knowledge graph:
//! - Built once from `XapiConfig`. A bad hash index list or an empty platform URL fails HERE,
//!   before the first line is read. There is no half-configured selector.
//! - Routes are `(event_source, predicate, Converter)`. The server route wants
//!   `event_type == context.path`, browser routes want one exact `event_type`.
//! - Exactly one matching route converts the event. Zero or two is "no match".
//! - Skips (not JSON, not an object, unknown source, no match, invalid event) log one `info!`
//!   plus a `debug!` with the details, and the stream goes on.
//! - A `ConversionError` is NOT a skip. It goes back to whoever pulls the next statement.
//!
//! 🔒 `&mut self` because every `Converter` owns a buffer. One selector per task.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, trace};

use crate::anonymize::{AnonymizationConfig, Anonymizer};
use crate::converters::{Converter, ConverterSpec};
use crate::errors::{ConfigurationError, ConversionError};
use crate::xapi::{XapiContext, browser_specs, server_event_spec};

/// 🎓 Everything the xAPI converters need from the outside world.
#[derive(Debug, Clone, Deserialize)]
pub struct XapiConfig {
    /// 🌍 Base URL of the LMS. Actor home pages and server page ids are built from it.
    pub platform_url: String,
    #[serde(default)]
    pub anonymization: AnonymizationConfig,
}

type Predicate = Box<dyn Fn(&Value) -> bool + Send + Sync>;

/// 🛤️ One entry of the routing table.
struct Route {
    event_source: &'static str,
    matches: Predicate,
    converter: Converter,
}

/// 🚦 Parses lines, picks the converter, hands back serialized statements.
pub struct ConverterSelector {
    routes: Vec<Route>,
}

impl std::fmt::Debug for ConverterSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.routes.iter().map(|r| r.converter.name()).collect();
        f.debug_struct("ConverterSelector")
            .field("routes", &names)
            .finish()
    }
}

/// 🖥️ Server events are routed when the requested URL is the event type.
fn is_server_page_view(event: &Value) -> bool {
    let event_type = event.get("event_type").and_then(Value::as_str);
    let context_path = event
        .get("context")
        .filter(|context| context.is_object())
        .and_then(|context| context.get("path"))
        .and_then(Value::as_str);
    match (event_type, context_path) {
        (Some(event_type), Some(path)) => !event_type.is_empty() && event_type == path,
        _ => false,
    }
}

impl ConverterSelector {
    /// 🏗️ Validate the configuration and build one converter per route.
    pub fn new(config: &XapiConfig) -> Result<Self, ConfigurationError> {
        let anonymizer = Arc::new(Anonymizer::new(&config.anonymization)?);
        let xapi = XapiContext::new(config.platform_url.clone(), anonymizer)?;

        let mut selector = Self { routes: Vec::new() };
        selector.route("server", Box::new(is_server_page_view), &server_event_spec(&xapi));
        for (event_type, spec) in browser_specs(&xapi) {
            selector.route(
                "browser",
                Box::new(move |event: &Value| {
                    event.get("event_type").and_then(Value::as_str) == Some(event_type)
                }),
                &spec,
            );
        }
        debug!("🚦 selector ready with {} routes", selector.routes.len());
        Ok(selector)
    }

    fn route(&mut self, event_source: &'static str, matches: Predicate, spec: &ConverterSpec) {
        self.routes.push(Route {
            event_source,
            matches,
            converter: Converter::new(spec),
        });
    }

    /// 🎯 Index of the one route that should convert `event`, or `None` after logging why not.
    fn select(&self, event: &Value) -> Option<usize> {
        if !event.is_object() {
            info!("🙈 Skipping an event that is not a JSON object");
            debug!("🔍 Event: {}", event);
            return None;
        }

        let Some(source) = event.get("event_source").and_then(Value::as_str) else {
            info!("🙈 Skipping an event without an event_source");
            debug!("🔍 Event: {}", event);
            return None;
        };

        if !self.routes.iter().any(|route| route.event_source == source) {
            info!("🙈 Skipping an event with unknown event_source `{}`", source);
            debug!("🔍 Event: {}", event);
            return None;
        }

        let mut candidates = self
            .routes
            .iter()
            .enumerate()
            .filter(|(_, route)| route.event_source == source && (route.matches)(event))
            .map(|(index, _)| index);
        match (candidates.next(), candidates.next()) {
            (Some(index), None) => Some(index),
            (None, _) => {
                info!("🙈 No converter matches this `{}` event", source);
                debug!("🔍 Event: {}", event);
                None
            }
            (Some(_), Some(_)) => {
                info!("🙈 More than one converter matches this `{}` event", source);
                debug!("🔍 Event: {}", event);
                None
            }
        }
    }

    /// 🔄 Convert one raw line. `Ok(None)` means the line was skipped.
    pub fn convert_line(&mut self, line: &str) -> Result<Option<String>, ConversionError> {
        if line.trim().is_empty() {
            trace!("blank line, nothing to see");
            return Ok(None);
        }

        let event: Value = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(err) => {
                info!("🙈 Skipping a line that is not valid JSON");
                debug!("🔍 Error: {} For line: {}", err, line);
                return Ok(None);
            }
        };

        match self.select(&event) {
            Some(index) => self.routes[index].converter.convert(&event),
            None => Ok(None),
        }
    }

    /// 🌊 Lazily convert a sequence of lines. Skipped lines leave no trace in the output,
    /// so the output can be shorter than the input.
    pub fn convert<I>(&mut self, lines: I) -> Statements<'_, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Statements {
            selector: self,
            lines: lines.into_iter(),
        }
    }
}

/// 🌊 The lazy statement stream returned by [`ConverterSelector::convert`].
/// Single pass: it consumes the input iterator as it goes.
#[derive(Debug)]
pub struct Statements<'a, I> {
    selector: &'a mut ConverterSelector,
    lines: I,
}

impl<I> Iterator for Statements<'_, I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = Result<String, ConversionError>;

    fn next(&mut self) -> Option<Self::Item> {
        for line in self.lines.by_ref() {
            match self.selector.convert_line(line.as_ref()) {
                Ok(Some(statement)) => return Some(Ok(statement)),
                Ok(None) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xapi::constants::XAPI_EXTENSION_COURSE_ID;
    use serde_json::json;
    use std::io;
    use std::sync::Mutex;

    fn config() -> XapiConfig {
        XapiConfig {
            platform_url: "https://lms.example.com".to_string(),
            anonymization: AnonymizationConfig::default(),
        }
    }

    fn server_line() -> String {
        json!({
            "username": "jdoe",
            "ip": "127.0.0.1",
            "agent": "Mozilla/5.0",
            "host": "lms.example.com",
            "referer": "",
            "accept_language": "en",
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
        .to_string()
    }

    /// 📝 Collects formatted log output so tests can count lines.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0
                .lock()
                .map_err(|_| io::Error::other("poisoned"))?
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn the_one_where_junk_lines_are_skipped_and_logged() -> anyhow::Result<()> {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .finish();

        let mut selector = ConverterSelector::new(&config())?;
        let lines = [
            r#"{"event_source":"browser"}"#,
            "not json",
            r#"{"event_source":"server"}"#,
        ];
        let statements: Vec<_> = tracing::subscriber::with_default(subscriber, || {
            selector.convert(lines).collect::<Result<Vec<_>, _>>()
        })?;

        assert!(statements.is_empty());
        let bytes = captured
            .0
            .lock()
            .map_err(|_| anyhow::anyhow!("poisoned"))?
            .clone();
        let output = String::from_utf8(bytes)?;
        assert_eq!(output.lines().filter(|line| line.contains("INFO")).count(), 3);
        Ok(())
    }

    #[test]
    fn the_one_where_a_server_event_finds_its_converter() -> anyhow::Result<()> {
        let mut selector = ConverterSelector::new(&config())?;
        let statements: Vec<String> = selector
            .convert([server_line()])
            .collect::<Result<_, _>>()?;
        assert_eq!(statements.len(), 1);

        let statement: Value = serde_json::from_str(&statements[0])?;
        assert_eq!(statement["actor"]["account"]["name"], json!("42"));
        assert_eq!(
            statement["context"]["extensions"][XAPI_EXTENSION_COURSE_ID],
            json!("course-v1:org+c+s")
        );
        Ok(())
    }

    #[test]
    fn the_one_where_server_routing_wants_the_path_to_match() -> anyhow::Result<()> {
        let mut selector = ConverterSelector::new(&config())?;
        let mut event: Value = serde_json::from_str(&server_line())?;
        event["context"]["path"] = json!("/somewhere/else");
        assert_eq!(selector.convert_line(&event.to_string())?, None);
        assert_eq!(selector.convert_line("   ")?, None);
        assert_eq!(selector.convert_line("[1, 2]")?, None);
        Ok(())
    }

    #[test]
    fn the_one_where_bad_hash_indexes_stop_the_show() {
        let with_indexes = |indexes: &str| XapiConfig {
            anonymization: AnonymizationConfig {
                enabled: true,
                salt: "a-long-enough-salt".to_string(),
                hash_indexes: indexes.to_string(),
                ..AnonymizationConfig::default()
            },
            ..config()
        };

        for bad in ["1,2,A", ""] {
            assert!(matches!(
                ConverterSelector::new(&with_indexes(bad)),
                Err(ConfigurationError::HashIndexes(_))
            ));
        }
        assert!(ConverterSelector::new(&with_indexes("1,2,3,10")).is_ok());
    }

    #[test]
    fn the_one_where_an_empty_platform_url_is_refused() {
        let config = XapiConfig {
            platform_url: String::new(),
            ..config()
        };
        assert!(matches!(
            ConverterSelector::new(&config),
            Err(ConfigurationError::PlatformUrl)
        ));
    }

    #[test]
    fn the_one_where_a_hashing_error_surfaces_mid_stream_and_the_stream_goes_on()
    -> anyhow::Result<()> {
        let config = XapiConfig {
            anonymization: AnonymizationConfig {
                enabled: true,
                // -- argon2 wants at least 8 bytes of salt
                salt: "salt".to_string(),
                hash_indexes: "1,2".to_string(),
                ..AnonymizationConfig::default()
            },
            ..config()
        };
        let mut selector = ConverterSelector::new(&config)?;

        let mut anonymous: Value = serde_json::from_str(&server_line())?;
        anonymous["context"]["user_id"] = json!("");
        let lines = [server_line(), "junk".to_string(), anonymous.to_string()];

        let results: Vec<Result<String, ConversionError>> = selector.convert(&lines).collect();
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Err(ConversionError::Hashing(_))));
        let statement: Value = match &results[1] {
            Ok(statement) => serde_json::from_str(statement)?,
            Err(err) => anyhow::bail!("the anonymous line should convert: {err}"),
        };
        assert_eq!(statement["actor"]["account"]["name"], json!("student"));
        Ok(())
    }

    #[test]
    fn the_one_where_anonymized_actors_are_stable_and_not_plaintext() -> anyhow::Result<()> {
        let config = XapiConfig {
            anonymization: AnonymizationConfig {
                enabled: true,
                salt: "a-long-enough-salt".to_string(),
                hash_indexes: "1,2,3,10".to_string(),
                ..AnonymizationConfig::default()
            },
            ..config()
        };
        let mut selector = ConverterSelector::new(&config)?;
        let first: Value = serde_json::from_str(
            &selector.convert_line(&server_line())?.expect("converted"),
        )?;
        let second: Value = serde_json::from_str(
            &selector.convert_line(&server_line())?.expect("converted"),
        )?;
        let name = &first["actor"]["account"]["name"];
        assert_eq!(name, &second["actor"]["account"]["name"]);
        assert_ne!(name, &json!("42"));
        assert_eq!(name.as_str().map(str::len), Some(4));
        Ok(())
    }
}

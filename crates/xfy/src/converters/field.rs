//! 🧲 Field extractors: point at a spot in the source event, pull a value out, maybe bend it.
//!
//! 🧠 Knowledge graph:
//! - `GetFromField` = source path + optional transform + optional named links.
//! - The transform ALWAYS runs, even when the path resolved to nothing. That is how
//!   `user_id` absent turns into `"student"` instead of disappearing.
//! - A transform returning `Ok(None)` means "omit this key from the output". Not null. Gone.
//! - `GoTo` pairs an extractor with a destination. Fixed destinations are known up front,
//!   routed ones are computed per event from the raw value and the links.
//! - JSON `null` in the source counts as absent. Tracking logs use null and missing interchangeably
//!   and we refuse to have an opinion about which one they meant.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::errors::ConversionError;
use crate::paths::{self, FieldPath};

/// 🔗 The resolved values of an extractor's named auxiliary paths.
/// Links that resolved to nothing are simply not here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Links {
    values: BTreeMap<String, Value>,
}

impl Links {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

type Transform =
    Arc<dyn Fn(Option<Value>, &Links) -> Result<Option<Value>, ConversionError> + Send + Sync>;

type Router = Arc<dyn Fn(Option<&Value>, &Links) -> FieldPath + Send + Sync>;

/// 🧲 Resolves one output value from a source event.
#[derive(Clone)]
pub struct GetFromField {
    path: FieldPath,
    links: Vec<(String, FieldPath)>,
    transform: Option<Transform>,
}

impl fmt::Debug for GetFromField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // -- closures do not do Debug, so we report whether there is one and move on
        f.debug_struct("GetFromField")
            .field("path", &self.path.to_string())
            .field("links", &self.links)
            .field("has_transform", &self.transform.is_some())
            .finish()
    }
}

impl GetFromField {
    /// 📋 Plain copy of whatever lives at `path`.
    pub fn new(path: impl Into<FieldPath>) -> Self {
        Self {
            path: path.into(),
            links: Vec::new(),
            transform: None,
        }
    }

    /// 🔧 Attach a unary transform. Replaces any transform already attached.
    pub fn with<F>(mut self, transform: F) -> Self
    where
        F: Fn(Option<Value>) -> Result<Option<Value>, ConversionError> + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(move |value, _links: &Links| transform(value)));
        self
    }

    /// 🔗 Register a named auxiliary path, resolved alongside the primary one.
    pub fn link(mut self, name: impl Into<String>, path: impl Into<FieldPath>) -> Self {
        self.links.push((name.into(), path.into()));
        self
    }

    /// 🔧 Attach a transform that also gets to see the linked values.
    pub fn with_links<F>(mut self, transform: F) -> Self
    where
        F: Fn(Option<Value>, &Links) -> Result<Option<Value>, ConversionError>
            + Send
            + Sync
            + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// 🔍 The raw value at the primary path, with `null` folded into absent.
    pub(crate) fn raw<'a>(&self, event: &'a Value) -> Option<&'a Value> {
        present(paths::get(event, &self.path))
    }

    /// 🔗 Resolve every link against the event.
    pub(crate) fn links(&self, event: &Value) -> Links {
        let values = self
            .links
            .iter()
            .filter_map(|(name, path)| {
                present(paths::get(event, path)).map(|value| (name.clone(), value.clone()))
            })
            .collect();
        Links { values }
    }

    /// 🎯 Compute the final value for this field. `Ok(None)` means the key is omitted.
    pub fn resolve(&self, event: &Value) -> Result<Option<Value>, ConversionError> {
        let value = self.raw(event).cloned();
        match &self.transform {
            None => Ok(value),
            Some(transform) => transform(value, &self.links(event)),
        }
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// 🧭 Where a `GoTo` writes its value.
#[derive(Clone)]
pub(crate) enum Destination {
    Fixed(FieldPath),
    Routed(Router),
}

/// 🧭 An extractor that also knows where its value lands in the output.
#[derive(Clone)]
pub struct GoTo {
    extractor: GetFromField,
    destination: Destination,
}

impl fmt::Debug for GoTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let destination = match &self.destination {
            Destination::Fixed(path) => path.to_string(),
            Destination::Routed(_) => "<routed>".to_string(),
        };
        f.debug_struct("GoTo")
            .field("extractor", &self.extractor)
            .field("destination", &destination)
            .finish()
    }
}

impl GoTo {
    /// 📌 Always write to `destination`. An empty destination means the rule contributes nothing.
    pub fn fixed(destination: FieldPath, extractor: GetFromField) -> Self {
        Self {
            extractor,
            destination: Destination::Fixed(destination),
        }
    }

    /// 🔀 Let `router` pick the destination per event from the raw field value and the links.
    /// Returning `FieldPath::empty()` skips the field for that event.
    pub fn routed<F>(extractor: GetFromField, router: F) -> Self
    where
        F: Fn(Option<&Value>, &Links) -> FieldPath + Send + Sync + 'static,
    {
        Self {
            extractor,
            destination: Destination::Routed(Arc::new(router)),
        }
    }

    pub fn extractor(&self) -> &GetFromField {
        &self.extractor
    }

    pub(crate) fn destination(&self) -> &Destination {
        &self.destination
    }

    /// 🧭 Compute where this rule writes for `event`.
    pub fn destination_for(&self, event: &Value) -> FieldPath {
        match &self.destination {
            Destination::Fixed(path) => path.clone(),
            Destination::Routed(router) => {
                router(self.extractor.raw(event), &self.extractor.links(event))
            }
        }
    }
}

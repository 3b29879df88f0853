//! ⚙️ The Converter: one rule table, one output buffer, one flat list of rules to run per event.
//!
//! 🎬 *[an event arrives. it has been validated. it has been narrowed. it is ready.]*
//!
//! 🧠 Knowledge graph:
//! - `Converter::new` walks the spec's rule table depth first, ONCE:
//!   literals and generator results are seeded into the buffer, field rules land in `flat`.
//! - A `Mount` extends two paths at once: the output prefix (where the child writes) and the
//!   source scope (what part of the event the child gets to see). Sibling mounts never see
//!   each other's sub-documents, they only ever get their own narrowed slice.
//! - `convert_value` validates (root schema plus every mounted schema on its slice), then runs
//!   `flat` in declaration order: `Some` sets, `None` deletes.
//! - Routed rules put back whatever the template had at their previous destination before
//!   the next event runs. The output for an event never depends on the events before it.
//! - `&mut self` everywhere: the buffer is mutated in place, so one instance per task.
//!   The borrow checker enforces what the docs used to merely request.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, trace};

use super::field::{Destination, GetFromField, GoTo};
use super::rules::{ConverterSpec, Rule, RuleTable};
use crate::errors::ConversionError;
use crate::paths::{self, FieldPath};
use crate::validation::{Diagnostic, Schema};

/// 📍 Where a flattened rule writes.
#[derive(Debug)]
enum Placement {
    /// Known at construction time.
    At(FieldPath),
    /// Computed per event, relative to `prefix`. `last` remembers the previous write
    /// so it can be reset to the template before the next event.
    Routed {
        prefix: FieldPath,
        route: GoTo,
        last: Option<FieldPath>,
    },
}

/// 📄 One entry of the flat conversion index.
#[derive(Debug)]
struct FlatRule {
    /// 🔭 source sub-path the extractor resolves against
    scope: FieldPath,
    extractor: GetFromField,
    placement: Placement,
}

/// ⚙️ A live converter instance built from a [`ConverterSpec`].
pub struct Converter {
    name: String,
    schema: Arc<dyn Schema>,
    mounted_schemas: Vec<(FieldPath, Arc<dyn Schema>)>,
    /// 🌱 the buffer as seeded at construction, literals and generator results only
    seed: Value,
    buffer: Value,
    flat: Vec<FlatRule>,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("name", &self.name)
            .field("schema", &self.schema.name())
            .field("rules", &self.flat.len())
            .finish()
    }
}

impl Converter {
    /// 🏗️ Build an instance: seed the buffer, flatten the rules, run the generators.
    pub fn new(spec: &ConverterSpec) -> Self {
        let mut converter = Self {
            name: spec.name().to_string(),
            schema: Arc::clone(spec.schema()),
            mounted_schemas: Vec::new(),
            seed: Value::Null,
            buffer: Value::Null,
            flat: Vec::new(),
        };
        converter.seed = converter.flatten(spec.table(), &FieldPath::empty(), &FieldPath::empty());
        converter.buffer = converter.seed.clone();
        debug!(
            "⚙️ converter `{}` ready with {} field rules and {} mounted schemas",
            converter.name,
            converter.flat.len(),
            converter.mounted_schemas.len()
        );
        converter
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 🌲 Depth-first walk of one table. Returns the seeded output node for this level.
    fn flatten(&mut self, table: &RuleTable, prefix: &FieldPath, scope: &FieldPath) -> Value {
        let mut node = Map::new();
        for (key, rule) in table.entries() {
            let destination = prefix.child(key.as_str());
            match rule {
                Rule::Literal(value) => {
                    node.insert(key.clone(), value.clone());
                }
                Rule::Generator(generator) => {
                    node.insert(key.clone(), generator());
                }
                Rule::Field(extractor) => self.flat.push(FlatRule {
                    scope: scope.clone(),
                    extractor: extractor.clone(),
                    placement: Placement::At(destination),
                }),
                Rule::Table(child) => {
                    let child_node = self.flatten(child, &destination, scope);
                    node.insert(key.clone(), child_node);
                }
                Rule::Mount(mount) => {
                    let child_scope = scope.join(mount.source());
                    self.mounted_schemas
                        .push((child_scope.clone(), Arc::clone(mount.spec().schema())));
                    let child_node = self.flatten(mount.spec().table(), &destination, &child_scope);
                    node.insert(key.clone(), child_node);
                }
            }
        }

        for route in table.routes() {
            let placement = match route.destination() {
                Destination::Fixed(relative) if relative.is_empty() => continue,
                Destination::Fixed(relative) => Placement::At(prefix.join(relative)),
                Destination::Routed(_) => Placement::Routed {
                    prefix: prefix.clone(),
                    route: route.clone(),
                    last: None,
                },
            };
            self.flat.push(FlatRule {
                scope: scope.clone(),
                extractor: route.extractor().clone(),
                placement,
            });
        }
        Value::Object(node)
    }

    /// 🛂 Run the root schema on the event and every mounted schema on its slice.
    fn validate(&self, event: &Value) -> Result<(), Diagnostic> {
        let mut diagnostic = match self.schema.validate(event) {
            Ok(()) => Diagnostic::default(),
            Err(diagnostic) => diagnostic,
        };
        for (scope, schema) in &self.mounted_schemas {
            let slice = paths::get(event, scope).unwrap_or(&Value::Null);
            if let Err(nested) = schema.validate(slice) {
                diagnostic.absorb(scope, nested);
            }
        }
        diagnostic.into_result()
    }

    /// 🔄 Convert one event into the assembled output document.
    ///
    /// `Ok(None)` when validation fails: no partial output, ever.
    /// `Err(..)` when a transform could not produce a value.
    pub fn convert_value(&mut self, event: &Value) -> Result<Option<Value>, ConversionError> {
        if let Err(diagnostic) = self.validate(event) {
            info!("🚫 Invalid event! `{}` rejected it", self.name);
            debug!("🔍 Error: {} For event: {}", diagnostic, event);
            return Ok(None);
        }

        // -- every stale route is reset before any rule writes, so a reset never clobbers
        // -- a value this event already produced
        for rule in self.flat.iter_mut() {
            if let Placement::Routed { last, .. } = &mut rule.placement {
                if let Some(stale) = last.take() {
                    restore_seed(&mut self.buffer, &self.seed, &stale)?;
                }
            }
        }

        for rule in self.flat.iter_mut() {
            let slice = paths::get(event, &rule.scope).unwrap_or(&Value::Null);
            let destination = match &mut rule.placement {
                Placement::At(destination) => destination.clone(),
                Placement::Routed {
                    prefix,
                    route,
                    last,
                } => {
                    let relative = route.destination_for(slice);
                    if relative.is_empty() {
                        trace!("🧭 route for `{}` chose nowhere", rule.extractor.path());
                        continue;
                    }
                    let destination = prefix.join(&relative);
                    *last = Some(destination.clone());
                    destination
                }
            };

            match rule.extractor.resolve(slice)? {
                Some(value) => paths::set(&mut self.buffer, &destination, value)?,
                None => {
                    paths::delete(&mut self.buffer, &destination);
                }
            }
        }
        Ok(Some(self.buffer.clone()))
    }

    /// 📦 Convert one event and serialize the result.
    pub fn convert(&mut self, event: &Value) -> Result<Option<String>, ConversionError> {
        match self.convert_value(event)? {
            Some(document) => Ok(Some(serde_json::to_string(&document)?)),
            None => Ok(None),
        }
    }
}

/// 🌱 Make `path` in `buffer` look the way it did in the seeded template.
///
/// The outermost step of `path` the template never had is removed as a whole, so containers a
/// route created on the way to its destination go away with it.
fn restore_seed(buffer: &mut Value, seed: &Value, path: &FieldPath) -> Result<(), ConversionError> {
    for len in 1..=path.len() {
        let step = path.prefix(len);
        if paths::get(seed, &step).is_none() {
            paths::delete(buffer, &step);
            return Ok(());
        }
    }
    if let Some(seeded) = paths::get(seed, path) {
        paths::set(buffer, path, seeded.clone())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::Mount;
    use crate::validation::{AcceptAll, Checks};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 🧪 Schema that insists on a string at `x`.
    struct NeedsX;

    impl Schema for NeedsX {
        fn name(&self) -> &str {
            "needs_x"
        }

        fn validate(&self, event: &Value) -> Result<(), Diagnostic> {
            let mut checks = Checks::new(event);
            checks.require_str("x");
            checks.finish()
        }
    }

    #[test]
    fn the_one_where_literals_and_fields_make_a_document() -> anyhow::Result<()> {
        let spec = ConverterSpec::new(
            "simple",
            AcceptAll,
            RuleTable::new()
                .literal("version", "1.0.3")
                .table(
                    "object",
                    RuleTable::new()
                        .field("id", GetFromField::new("event_type"))
                        .literal("objectType", "Activity"),
                ),
        );
        let mut converter = Converter::new(&spec);
        let out = converter.convert_value(&json!({"event_type": "/home"}))?;
        assert_eq!(
            out,
            Some(json!({"version": "1.0.3", "object": {"id": "/home", "objectType": "Activity"}}))
        );
        Ok(())
    }

    #[test]
    fn the_one_where_none_means_gone_not_null() -> anyhow::Result<()> {
        let spec = ConverterSpec::new(
            "optional",
            AcceptAll,
            RuleTable::new().table("ctx", RuleTable::new().field("ip", GetFromField::new("ip"))),
        );
        let mut converter = Converter::new(&spec);

        let first = converter.convert_value(&json!({"ip": "1.2.3.4"}))?;
        assert_eq!(first, Some(json!({"ctx": {"ip": "1.2.3.4"}})));

        // -- the previous event's ip must not haunt this one
        let second = converter.convert_value(&json!({"ip": null}))?;
        assert_eq!(second, Some(json!({"ctx": {}})));
        Ok(())
    }

    #[test]
    fn the_one_where_generators_run_exactly_once_per_instance() -> anyhow::Result<()> {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let spec = ConverterSpec::new(
            "generated",
            AcceptAll,
            RuleTable::new().generator("stamp", move || {
                json!(counter.fetch_add(1, Ordering::SeqCst))
            }),
        );

        let mut converter = Converter::new(&spec);
        for _ in 0..3 {
            assert_eq!(converter.convert_value(&json!({}))?, Some(json!({"stamp": 0})));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // -- a second instance gets its own run
        let mut another = Converter::new(&spec);
        assert_eq!(another.convert_value(&json!({}))?, Some(json!({"stamp": 1})));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[test]
    fn the_one_where_a_rejected_event_yields_nothing() -> anyhow::Result<()> {
        let spec = ConverterSpec::new(
            "strict",
            NeedsX,
            RuleTable::new().field("x", GetFromField::new("x")),
        );
        let mut converter = Converter::new(&spec);
        assert_eq!(converter.convert(&json!({"y": 1}))?, None);
        assert_eq!(
            converter.convert(&json!({"x": "ok"}))?,
            Some(r#"{"x":"ok"}"#.to_string())
        );
        Ok(())
    }

    #[test]
    fn the_one_where_siblings_never_read_each_others_mail() -> anyhow::Result<()> {
        let module = ConverterSpec::new(
            "module",
            AcceptAll,
            RuleTable::new().field("value", GetFromField::new("module>x")),
        );
        let spec = ConverterSpec::new(
            "siblings",
            AcceptAll,
            RuleTable::new()
                .mount("left", Mount::new("a", module.clone()))
                .mount("right", Mount::new("b", module)),
        );
        let mut converter = Converter::new(&spec);
        let event = json!({"a": {"module": {"x": "from a"}}, "b": {"module": {"x": "from b"}}});
        assert_eq!(
            converter.convert_value(&event)?,
            Some(json!({"left": {"value": "from a"}, "right": {"value": "from b"}}))
        );

        // -- with `a` gone, `left` must stay empty rather than peek at `b`
        let event = json!({"b": {"module": {"x": "from b"}}});
        assert_eq!(
            converter.convert_value(&event)?,
            Some(json!({"left": {}, "right": {"value": "from b"}}))
        );
        Ok(())
    }

    #[test]
    fn the_one_where_a_mounted_schema_can_veto_the_whole_event() -> anyhow::Result<()> {
        let child = ConverterSpec::new("child", NeedsX, RuleTable::new());
        let spec = ConverterSpec::new(
            "parent",
            AcceptAll,
            RuleTable::new().mount("child", Mount::new("inner", child)),
        );
        let mut converter = Converter::new(&spec);
        assert_eq!(converter.convert_value(&json!({"inner": {"x": 1}}))?, None);
        assert!(converter.convert_value(&json!({"inner": {"x": "s"}}))?.is_some());
        Ok(())
    }

    #[test]
    fn the_one_where_routes_land_relative_to_their_mount() -> anyhow::Result<()> {
        let child = ConverterSpec::new(
            "child",
            AcceptAll,
            RuleTable::new()
                .goto(GoTo::fixed(
                    FieldPath::parse("fixed"),
                    GetFromField::new("v"),
                ))
                .goto(GoTo::routed(GetFromField::new("side"), |side, _| {
                    match side.and_then(Value::as_str) {
                        Some("l") => FieldPath::parse("left"),
                        Some("r") => FieldPath::parse("right"),
                        _ => FieldPath::empty(),
                    }
                })),
        );
        let spec = ConverterSpec::new(
            "parent",
            AcceptAll,
            RuleTable::new().mount("out", Mount::new("in", child)),
        );
        let mut converter = Converter::new(&spec);

        let first = converter.convert_value(&json!({"in": {"v": 1, "side": "l"}}))?;
        assert_eq!(first, Some(json!({"out": {"fixed": 1, "left": "l"}})));

        // -- the route moved: the old `left` must not linger
        let second = converter.convert_value(&json!({"in": {"v": 2, "side": "r"}}))?;
        assert_eq!(second, Some(json!({"out": {"fixed": 2, "right": "r"}})));

        // -- empty destination contributes nothing at all
        let third = converter.convert_value(&json!({"in": {"v": 3}}))?;
        assert_eq!(third, Some(json!({"out": {"fixed": 3}})));
        Ok(())
    }

    #[test]
    fn the_one_where_history_does_not_leak_into_the_output() -> anyhow::Result<()> {
        let spec = ConverterSpec::new(
            "overwriter",
            AcceptAll,
            RuleTable::new()
                .literal("slot", "default")
                .goto(GoTo::routed(GetFromField::new("v"), |v, _| match v {
                    Some(_) => FieldPath::parse("slot"),
                    None => FieldPath::empty(),
                }))
                .goto(GoTo::routed(GetFromField::new("w"), |w, _| match w {
                    Some(_) => FieldPath::parse("deep>er"),
                    None => FieldPath::empty(),
                })),
        );
        let quiet = json!({});

        let fresh = Converter::new(&spec).convert_value(&quiet)?;
        assert_eq!(fresh, Some(json!({"slot": "default"})));

        let mut used = Converter::new(&spec);
        let loud = used.convert_value(&json!({"v": "x", "w": 1}))?;
        assert_eq!(loud, Some(json!({"slot": "x", "deep": {"er": 1}})));
        assert_eq!(used.convert_value(&quiet)?, fresh);
        Ok(())
    }

    #[test]
    fn the_one_where_a_transform_error_reaches_the_caller() {
        let spec = ConverterSpec::new(
            "explosive",
            AcceptAll,
            RuleTable::new().field(
                "boom",
                GetFromField::new("x").with(|_| Err(ConversionError::field("x", "kaboom"))),
            ),
        );
        let mut converter = Converter::new(&spec);
        assert!(matches!(
            converter.convert(&json!({"x": 1})),
            Err(ConversionError::Field { .. })
        ));
    }
}

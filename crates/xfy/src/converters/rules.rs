//! 📜 Rule tables: the shape of the output document, with instructions where the values go.
//!
//! 🧠 Knowledge graph:
//! - A `RuleTable` is an ordered list of `(key, Rule)` pairs plus a list of `GoTo` routes.
//!   It mirrors the output document: every `Table` entry becomes a nested object.
//! - `Rule::Literal` is copied as-is, `Rule::Generator` runs ONCE when a `Converter` is built,
//!   `Rule::Field` runs per event, `Rule::Mount` delegates a sub-document to a child spec.
//! - `ConverterSpec` is the immutable template. Declared once, cloned freely, never mutated by
//!   a conversion. Instances get their own buffer in `Converter::new`.
//!
//! Ancient proverb: "He who mutates the template, debugs the neighbour's output." 🦆

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::field::{GetFromField, GoTo};
use crate::paths::FieldPath;
use crate::validation::Schema;

/// ⚙️ A zero-argument value factory, invoked once per converter instance.
pub type Generator = Arc<dyn Fn() -> Value + Send + Sync>;

/// 🧩 One leaf (or branch) of a rule table.
#[derive(Clone)]
pub enum Rule {
    Literal(Value),
    Generator(Generator),
    Field(GetFromField),
    Table(RuleTable),
    Mount(Mount),
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Rule::Generator(_) => f.write_str("Generator(..)"),
            Rule::Field(field) => f.debug_tuple("Field").field(field).finish(),
            Rule::Table(table) => f.debug_tuple("Table").field(table).finish(),
            Rule::Mount(mount) => f.debug_tuple("Mount").field(mount).finish(),
        }
    }
}

/// 📜 An ordered table of output keys and the rules that fill them.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    entries: Vec<(String, Rule)>,
    routes: Vec<GoTo>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// ✍️ Put `rule` under `key`. An existing entry with the same key is replaced in place,
    /// keeping its position.
    pub fn rule(mut self, key: impl Into<String>, rule: Rule) -> Self {
        self.insert(key, rule);
        self
    }

    /// ✍️ The `&mut` flavour of [`RuleTable::rule`].
    pub fn insert(&mut self, key: impl Into<String>, rule: Rule) {
        let key = key.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = rule,
            None => self.entries.push((key, rule)),
        }
    }

    pub fn literal(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.rule(key, Rule::Literal(value.into()))
    }

    pub fn generator<F>(self, key: impl Into<String>, generator: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.rule(key, Rule::Generator(Arc::new(generator)))
    }

    pub fn field(self, key: impl Into<String>, extractor: GetFromField) -> Self {
        self.rule(key, Rule::Field(extractor))
    }

    pub fn table(self, key: impl Into<String>, table: RuleTable) -> Self {
        self.rule(key, Rule::Table(table))
    }

    pub fn mount(self, key: impl Into<String>, mount: Mount) -> Self {
        self.rule(key, Rule::Mount(mount))
    }

    /// 🧭 Add a route. Its destination is relative to wherever this table ends up mounted.
    pub fn goto(mut self, route: GoTo) -> Self {
        self.routes.push(route);
        self
    }

    pub fn entries(&self) -> &[(String, Rule)] {
        &self.entries
    }

    pub fn routes(&self) -> &[GoTo] {
        &self.routes
    }

    /// 🔍 Reach into a nested `Table` entry to amend it, e.g. to add one more extension.
    pub fn table_mut(&mut self, key: &str) -> Option<&mut RuleTable> {
        self.entries
            .iter_mut()
            .find_map(|(existing, rule)| match rule {
                Rule::Table(table) if existing == key => Some(table),
                _ => None,
            })
    }
}

/// 🪆 A child spec mounted under an output key, reading from a sub-path of the source event.
#[derive(Debug, Clone)]
pub struct Mount {
    source: FieldPath,
    spec: ConverterSpec,
}

impl Mount {
    pub fn new(source: impl Into<FieldPath>, spec: ConverterSpec) -> Self {
        Self {
            source: source.into(),
            spec,
        }
    }

    pub fn source(&self) -> &FieldPath {
        &self.source
    }

    pub fn spec(&self) -> &ConverterSpec {
        &self.spec
    }
}

/// 📐 The statically declared template of a converter: a name, a schema, a rule table.
#[derive(Clone)]
pub struct ConverterSpec {
    name: String,
    schema: Arc<dyn Schema>,
    table: RuleTable,
}

impl fmt::Debug for ConverterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterSpec")
            .field("name", &self.name)
            .field("schema", &self.schema.name())
            .field("table", &self.table)
            .finish()
    }
}

impl ConverterSpec {
    pub fn new(name: impl Into<String>, schema: impl Schema + 'static, table: RuleTable) -> Self {
        Self {
            name: name.into(),
            schema: Arc::new(schema),
            table,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Arc<dyn Schema> {
        &self.schema
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }
}

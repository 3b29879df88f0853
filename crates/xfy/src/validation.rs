//! 🛂 The validation gate: an event shows its papers before anyone converts it.
//!
//! 🧠 Knowledge graph:
//! - `Schema` is the seam. The converter only calls `validate`, it never knows the rules.
//! - A failed validation is a `Diagnostic`, a value listing every `Problem` found. It is not
//!   an exception; the converter logs it and returns `None`.
//! - `Checks` is the little accumulator the edX schemas use to collect problems without
//!   bailing on the first one. All of them, at once, like a thorough tax auditor.

use std::fmt;

use serde_json::Value;

use crate::paths::{self, FieldPath};

/// 🛂 Something that can say yes or no (with reasons) to an event.
pub trait Schema: Send + Sync {
    fn name(&self) -> &str;
    fn validate(&self, event: &Value) -> Result<(), Diagnostic>;
}

/// ✅ The bouncer who lets everyone in.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl Schema for AcceptAll {
    fn name(&self) -> &str {
        "accept_all"
    }

    fn validate(&self, _event: &Value) -> Result<(), Diagnostic> {
        Ok(())
    }
}

/// 📝 One complaint about one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub field: String,
    pub message: String,
}

/// 📋 Everything wrong with an event, in the order it was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostic {
    pub problems: Vec<Problem>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, problem) in self.problems.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", problem.field, problem.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

impl Diagnostic {
    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    /// 🪆 Fold another diagnostic in, prefixing its field names with `scope`.
    pub fn absorb(&mut self, scope: &FieldPath, other: Diagnostic) {
        self.problems.extend(other.problems.into_iter().map(|problem| {
            let field = match (scope.is_empty(), problem.field.is_empty()) {
                (true, _) => problem.field,
                (false, true) => scope.to_string(),
                (false, false) => format!("{scope}>{}", problem.field),
            };
            Problem {
                field,
                message: problem.message,
            }
        }));
    }

    pub fn into_result(self) -> Result<(), Diagnostic> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// 🧮 Problem accumulator bound to one document.
#[derive(Debug)]
pub struct Checks<'a> {
    doc: &'a Value,
    diagnostic: Diagnostic,
}

impl<'a> Checks<'a> {
    pub fn new(doc: &'a Value) -> Self {
        Self {
            doc,
            diagnostic: Diagnostic::default(),
        }
    }

    pub fn doc(&self) -> &'a Value {
        self.doc
    }

    /// 🔍 The value at `field`, or `None` if missing.
    pub fn get(&self, field: &str) -> Option<&'a Value> {
        paths::get(self.doc, &FieldPath::parse(field))
    }

    pub fn problem(&mut self, field: &str, message: impl Into<String>) {
        self.diagnostic.problems.push(Problem {
            field: field.to_string(),
            message: message.into(),
        });
    }

    /// 📌 The field must exist (null allowed).
    pub fn require(&mut self, field: &str) -> Option<&'a Value> {
        let value = self.get(field);
        if value.is_none() {
            self.problem(field, "Missing data for required field.");
        }
        value
    }

    /// 📌 The field must exist and be a string.
    pub fn require_str(&mut self, field: &str) -> Option<&'a str> {
        match self.require(field)? {
            Value::String(s) => Some(s.as_str()),
            _ => {
                self.problem(field, "Not a valid string.");
                None
            }
        }
    }

    /// 📌 The field, if present, must be a string.
    pub fn optional_str(&mut self, field: &str) -> Option<&'a str> {
        match self.get(field)? {
            Value::String(s) => Some(s.as_str()),
            _ => {
                self.problem(field, "Not a valid string.");
                None
            }
        }
    }

    /// 🤝 The field must be exactly `expected`.
    pub fn require_equal(&mut self, field: &str, expected: &Value, message: &str) {
        if let Some(value) = self.require(field) {
            if value != expected {
                self.problem(field, message);
            }
        }
    }

    pub fn absorb(&mut self, scope: &FieldPath, other: Diagnostic) {
        self.diagnostic.absorb(scope, other);
    }

    pub fn finish(self) -> Result<(), Diagnostic> {
        self.diagnostic.into_result()
    }
}

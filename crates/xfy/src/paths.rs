//! 🛤️ Path utilities: get, set and delete a value somewhere deep inside a JSON document.
//!
//! 🧠 Knowledge graph:
//! - A `FieldPath` is a list of `Segment`s. `Key` walks into objects, `Index` walks into arrays.
//! - `FieldPath::parse("context>course_id")` is the source-path notation used by the rule tables.
//!   The `>` separator exists because extension IRIs are full of dots and slashes.
//! - `get` never fails. Missing key, wrong-typed intermediate, out of range index: all `None`.
//! - `set` builds whatever it needs on the way down and refuses only the empty path.
//! - `delete` is a no-op when there is nothing to delete. Idempotent, like closing a closed door.
//!
//! 🦆 The duck walks the path. The duck does not ask where it leads.

use std::fmt;

use serde_json::{Map, Value};

use crate::errors::PathError;

/// 🧩 One step of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl Segment {
    /// 🔑 The object key spelling of this segment. An index applied to an object
    /// addresses the key with the same decimal spelling.
    fn as_key(&self) -> String {
        match self {
            Segment::Key(key) => key.clone(),
            Segment::Index(index) => index.to_string(),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => f.write_str(key),
            Segment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// 🛤️ An ordered sequence of segments. Length zero means "no destination, skip this field".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    /// 🕳️ The empty path. Nowhere. A perfectly valid answer for a router that wants to skip.
    pub fn empty() -> Self {
        Self::default()
    }

    /// 🔪 Split a source path on `>`. All-digit segments become array indexes.
    /// An empty string parses to the empty path.
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::empty();
        }
        let segments = raw
            .split('>')
            .map(|piece| {
                if !piece.is_empty() && piece.bytes().all(|b| b.is_ascii_digit()) {
                    // -- a 40-digit "index" is a key wearing a fake mustache
                    piece
                        .parse::<usize>()
                        .map(Segment::Index)
                        .unwrap_or_else(|_| Segment::Key(piece.to_string()))
                } else {
                    Segment::Key(piece.to_string())
                }
            })
            .collect();
        Self { segments }
    }

    /// 🏷️ Build a path out of literal keys. No parsing, no index guessing.
    /// This is the one to use when a key is an IRI like `https://www.edx.org/extension/ip`.
    pub fn keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: keys.into_iter().map(|k| Segment::Key(k.into())).collect(),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// 🧬 A new path with one more key on the end.
    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Key(key.into()));
        Self { segments }
    }

    /// ✂️ The first `len` segments. Longer than the path: the whole path.
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            segments: self.segments[..len.min(self.segments.len())].to_vec(),
        }
    }

    /// 🧬 A new path made of `self` followed by `other`.
    pub fn join(&self, other: &FieldPath) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + other.segments.len());
        segments.extend_from_slice(&self.segments);
        segments.extend_from_slice(&other.segments);
        Self { segments }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(">")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl From<&str> for FieldPath {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

/// 🔍 Fetch the value at `path`, or `None` if any step of the walk comes up empty.
/// The empty path returns the document itself.
pub fn get<'a>(doc: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.segments() {
        current = match (current, segment) {
            (Value::Object(map), segment) => map.get(segment.as_key().as_str())?,
            (Value::Array(items), Segment::Index(index)) => items.get(*index)?,
            // -- a key into an array, or anything into a scalar: the road ends here
            _ => return None,
        };
    }
    Some(current)
}

/// ✍️ Write `value` at `path`, creating `{}` for every missing intermediate key.
///
/// Intermediates that are not containers get replaced by a fresh object so the write
/// always lands. Index segments into arrays pad the array with `null` when the index
/// is past the end.
pub fn set(doc: &mut Value, path: &FieldPath, value: Value) -> Result<(), PathError> {
    let (last, parents) = path.segments().split_last().ok_or(PathError::Empty)?;
    let mut current = doc;
    for segment in parents {
        current = step_or_create(current, segment);
    }
    match (current, last) {
        (Value::Array(items), Segment::Index(index)) => {
            if items.len() <= *index {
                items.resize(*index + 1, Value::Null);
            }
            items[*index] = value;
        }
        (Value::Object(map), segment) => {
            map.insert(segment.as_key(), value);
        }
        (slot, segment) => {
            let mut map = Map::new();
            map.insert(segment.as_key(), value);
            *slot = Value::Object(map);
        }
    }
    Ok(())
}

/// 🚶 One step down for `set`, conjuring an empty object when the way is blocked.
fn step_or_create<'a>(current: &'a mut Value, segment: &Segment) -> &'a mut Value {
    let walks_into_array = matches!((&*current, segment), (Value::Array(_), Segment::Index(_)));
    if !walks_into_array && !current.is_object() {
        *current = Value::Object(Map::new());
    }

    let slot = match (current, segment) {
        (Value::Array(items), Segment::Index(index)) => {
            if items.len() <= *index {
                items.resize(*index + 1, Value::Null);
            }
            &mut items[*index]
        }
        (Value::Object(map), segment) => map
            .entry(segment.as_key())
            .or_insert_with(|| Value::Object(Map::new())),
        // -- every other shape became an object two lines up
        (other, _) => other,
    };
    if !slot.is_object() && !slot.is_array() {
        *slot = Value::Object(Map::new());
    }
    slot
}

/// 🗑️ Remove the value at `path` and hand it back. Absent path, empty path: no-op, `None`.
pub fn delete(doc: &mut Value, path: &FieldPath) -> Option<Value> {
    let (last, parents) = path.segments().split_last()?;
    let mut current = doc;
    for segment in parents {
        current = match (current, segment) {
            (Value::Object(map), segment) => map.get_mut(segment.as_key().as_str())?,
            (Value::Array(items), Segment::Index(index)) => items.get_mut(*index)?,
            _ => return None,
        };
    }
    match (current, last) {
        (Value::Object(map), segment) => map.remove(segment.as_key().as_str()),
        // -- arrays keep their shape: removing an element would shift every sibling index
        (Value::Array(items), Segment::Index(index)) => items
            .get_mut(*index)
            .map(|slot| std::mem::replace(slot, Value::Null)),
        _ => None,
    }
}

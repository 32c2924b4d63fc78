//! Persistent snapshot tree
//!
//! [`Node`] is a JSON-shaped value whose containers are `im` persistent
//! collections. Cloning a node is cheap, and a write through
//! [`Node::set_in`] copies only the spine between the root and the written
//! location; every other subtree is shared with the previous snapshot.

use crate::collection::{CollectionEditor, CollectionError};
use crate::path::{FieldPath, PathSegment};
use im::{OrdMap, Vector};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value as JsonValue};

/// Immutable tree value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Node {
    /// Absent or JSON `null`
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Number
    Number(Number),
    /// String
    String(String),
    /// Ordered collection
    List(Vector<Node>),
    /// Keyed record
    Map(OrdMap<String, Node>),
}

/// How writes treat missing or short containers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fill {
    /// Lists only change length through collection operations
    Strict,
    /// Lists are padded with empty maps up to the written index
    Padded,
}

impl Node {
    /// Empty map
    #[inline]
    #[must_use]
    pub fn empty_map() -> Self {
        Self::Map(OrdMap::new())
    }

    /// Empty list
    #[inline]
    #[must_use]
    pub fn empty_list() -> Self {
        Self::List(Vector::new())
    }

    /// Map from key/value pairs
    #[must_use]
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Node)>) -> Self {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// List from values
    #[must_use]
    pub fn list(entries: impl IntoIterator<Item = Node>) -> Self {
        Self::List(entries.into_iter().collect())
    }

    /// Short name of the variant, for diagnostics
    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// True for anything that is not a list or map
    #[inline]
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Self::List(_) | Self::Map(_))
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer value; numeric strings are accepted since inputs report text
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_list(&self) -> Option<&Vector<Node>> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_map(&self) -> Option<&OrdMap<String, Node>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Text shown in an input bound to this value
    #[must_use]
    pub fn display_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::String(s) => s.clone(),
            other => other.to_json().to_string(),
        }
    }

    /// Child of a map by key
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Child of a list by index
    #[inline]
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&Node> {
        self.as_list().and_then(|list| list.get(index))
    }

    /// Descendant at `path`
    #[must_use]
    pub fn get_in(&self, path: &FieldPath) -> Option<&Node> {
        path.iter().try_fold(self, |node, segment| match segment {
            PathSegment::Key(key) => node.get(key),
            PathSegment::Index(index) => node.at(*index),
        })
    }

    /// Check whether two nodes share storage
    ///
    /// Containers compare by identity of their persistent root; scalars
    /// compare by value. `im` keeps very small lists inline, so list
    /// identity is only reliable for lists that have been shared by clone
    /// through a map.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Map(a), Self::Map(b)) => a.ptr_eq(b),
            (Self::List(a), Self::List(b)) => a.ptr_eq(b),
            (a, b) if a.is_scalar() && b.is_scalar() => a == b,
            _ => false,
        }
    }

    /// New tree with `value` written at `path`
    ///
    /// Missing map keys are created. A missing container on the way is
    /// created as a map (next segment is a key) or an empty list (next
    /// segment is an index, which then fails the range check). Writing at
    /// an index at or past the end of a list is an error: lists grow only
    /// through [`CollectionEditor`].
    ///
    /// # Errors
    /// - [`SnapshotError::Collection`] for an out-of-range index
    /// - [`SnapshotError::TypeMismatch`] when a segment meets a scalar
    pub fn set_in(&self, path: &FieldPath, value: Node) -> Result<Node, SnapshotError> {
        self.write(path, 0, value, Fill::Strict)
    }

    /// Like [`Node::set_in`] but pads short lists with empty maps
    ///
    /// Used for sparse trees such as error maps, where an entry may be
    /// written for list position 3 while positions 0..3 have nothing.
    ///
    /// # Errors
    /// Returns [`SnapshotError::TypeMismatch`] when a segment meets a scalar
    pub fn set_in_padded(&self, path: &FieldPath, value: Node) -> Result<Node, SnapshotError> {
        self.write(path, 0, value, Fill::Padded)
    }

    fn write(
        &self,
        path: &FieldPath,
        depth: usize,
        value: Node,
        fill: Fill,
    ) -> Result<Node, SnapshotError> {
        let Some(segment) = path.segments().get(depth) else {
            return Ok(value);
        };

        match (segment, self) {
            (PathSegment::Key(key), Self::Map(map)) => {
                let child = map.get(key).cloned().unwrap_or_default();
                let child = child.write(path, depth + 1, value, fill)?;
                Ok(Self::Map(map.update(key.clone(), child)))
            }
            (PathSegment::Key(_), Self::Null) => Self::empty_map().write(path, depth, value, fill),
            (PathSegment::Index(index), Self::List(list)) => {
                let list = match fill {
                    Fill::Padded if *index >= list.len() => {
                        CollectionEditor::aligned_to(list, index + 1, Self::empty_map)
                    }
                    _ => list.clone(),
                };
                let child = list.get(*index).cloned().unwrap_or_default();
                let child = child.write(path, depth + 1, value, fill)?;
                CollectionEditor::replace_at(&list, *index, child)
                    .map(Self::List)
                    .map_err(|source| SnapshotError::Collection {
                        path: path.prefix(depth),
                        source,
                    })
            }
            (PathSegment::Index(_), Self::Null) => {
                Self::empty_list().write(path, depth, value, fill)
            }
            (PathSegment::Key(_), other) => Err(SnapshotError::TypeMismatch {
                path: path.prefix(depth),
                expected: "map",
                found: other.type_name(),
            }),
            (PathSegment::Index(_), other) => Err(SnapshotError::TypeMismatch {
                path: path.prefix(depth),
                expected: "list",
                found: other.type_name(),
            }),
        }
    }

    /// New tree with the value at `path` removed
    ///
    /// Removing from a list shifts later entries down. A path that does
    /// not exist leaves the tree unchanged.
    ///
    /// # Errors
    /// Returns [`SnapshotError::TypeMismatch`] when a segment meets a scalar
    pub fn remove_in(&self, path: &FieldPath) -> Result<Node, SnapshotError> {
        self.remove_at_depth(path, 0)
    }

    fn remove_at_depth(&self, path: &FieldPath, depth: usize) -> Result<Node, SnapshotError> {
        let segments = path.segments();
        let Some(segment) = segments.get(depth) else {
            return Ok(Self::Null);
        };
        let is_last = depth + 1 == segments.len();

        match (segment, self) {
            (PathSegment::Key(key), Self::Map(map)) => match map.get(key) {
                None => Ok(self.clone()),
                Some(_) if is_last => Ok(Self::Map(map.without(key))),
                Some(child) => {
                    let child = child.remove_at_depth(path, depth + 1)?;
                    Ok(Self::Map(map.update(key.clone(), child)))
                }
            },
            (PathSegment::Index(index), Self::List(list)) => match list.get(*index) {
                None => Ok(self.clone()),
                Some(_) if is_last => CollectionEditor::remove_at(list, *index)
                    .map(Self::List)
                    .map_err(|source| SnapshotError::Collection {
                        path: path.prefix(depth),
                        source,
                    }),
                Some(child) => {
                    let child = child.remove_at_depth(path, depth + 1)?;
                    Ok(Self::List(list.update(*index, child)))
                }
            },
            (_, Self::Null) => Ok(Self::Null),
            (PathSegment::Key(_), other) => Err(SnapshotError::TypeMismatch {
                path: path.prefix(depth),
                expected: "map",
                found: other.type_name(),
            }),
            (PathSegment::Index(_), other) => Err(SnapshotError::TypeMismatch {
                path: path.prefix(depth),
                expected: "list",
                found: other.type_name(),
            }),
        }
    }

    /// Convert to a `serde_json` value
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        JsonValue::from(self)
    }
}

impl From<JsonValue> for Node {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(b),
            JsonValue::Number(n) => Self::Number(n),
            JsonValue::String(s) => Self::String(s),
            JsonValue::Array(items) => Self::List(items.into_iter().map(Node::from).collect()),
            JsonValue::Object(entries) => {
                Self::Map(entries.into_iter().map(|(k, v)| (k, Node::from(v))).collect())
            }
        }
    }
}

impl From<&Node> for JsonValue {
    fn from(node: &Node) -> Self {
        match node {
            Node::Null => JsonValue::Null,
            Node::Bool(b) => JsonValue::Bool(*b),
            Node::Number(n) => JsonValue::Number(n.clone()),
            Node::String(s) => JsonValue::String(s.clone()),
            Node::List(items) => JsonValue::Array(items.iter().map(JsonValue::from).collect()),
            Node::Map(entries) => JsonValue::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), JsonValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Node {
    fn from(n: i64) -> Self {
        Self::Number(Number::from(n))
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::List(items) => serializer.collect_seq(items.iter()),
            Self::Map(entries) => serializer.collect_map(entries.iter()),
        }
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        JsonValue::deserialize(deserializer).map(Node::from)
    }
}

/// Errors from traversing or writing a snapshot
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    /// A path segment met a value of the wrong shape
    #[error("expected {expected} at '{path}', found {found}")]
    TypeMismatch {
        path: FieldPath,
        expected: &'static str,
        found: &'static str,
    },

    /// Collection operation rejected an index
    #[error("at '{path}': {source}")]
    Collection {
        path: FieldPath,
        #[source]
        source: CollectionError,
    },

    /// Target of an edit does not exist
    #[error("target not found: {0}")]
    TargetNotFound(FieldPath),
}

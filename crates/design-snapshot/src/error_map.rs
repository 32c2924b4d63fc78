//! Validation error trees
//!
//! An [`ErrorMap`] mirrors the nesting of the data it describes. Leaves are
//! lists of messages; containers hold the errors of nested fields, with
//! list positions aligned to the data's list positions.

use crate::node::{Node, SnapshotError};
use crate::path::FieldPath;
use im::Vector;
use serde::{Deserialize, Serialize};

/// Key holding messages that belong to no single field
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Tree of validation messages shaped like the data it describes
///
/// Absence of an entry at a path means "no error" for that path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Node", into = "Node")]
pub struct ErrorMap(Node);

impl ErrorMap {
    /// Map with no errors
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Node::empty_map())
    }

    /// Build from a server payload
    ///
    /// A bare string leaf is normalized to a one-message list.
    #[must_use]
    pub fn from_node(node: Node) -> Self {
        match normalize(node) {
            Node::Null => Self::new(),
            root => Self(root),
        }
    }

    /// Single message under [`NON_FIELD_ERRORS`]
    #[must_use]
    pub fn non_field(message: impl Into<String>) -> Self {
        Self(Node::map([(
            NON_FIELD_ERRORS,
            Node::list([Node::String(message.into())]),
        )]))
    }

    /// Root of the tree
    #[inline]
    #[must_use]
    pub fn as_node(&self) -> &Node {
        &self.0
    }

    /// Subtree at `path`
    #[inline]
    #[must_use]
    pub fn get(&self, path: &FieldPath) -> Option<&Node> {
        self.0.get_in(path)
    }

    /// Messages for the field bound to `path`
    ///
    /// Only a list of strings (or a bare string) counts as messages; a
    /// container at `path` holds errors of nested fields, not of `path`.
    #[must_use]
    pub fn messages_at(&self, path: &FieldPath) -> Option<Vec<String>> {
        messages_of(self.get(path)?)
    }

    /// True if no message exists anywhere in the tree
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !has_messages(&self.0)
    }

    /// Paths of every message leaf, in tree order
    #[must_use]
    pub fn message_paths(&self) -> Vec<FieldPath> {
        let mut paths = Vec::new();
        collect_message_paths(&self.0, &FieldPath::root(), &mut paths);
        paths
    }

    /// New map with `messages` at `path`
    ///
    /// Missing containers are created and short lists padded with empty
    /// maps, since error trees are sparse.
    ///
    /// # Errors
    /// Returns [`SnapshotError::TypeMismatch`] if `path` crosses a message leaf
    pub fn with_messages(
        &self,
        path: &FieldPath,
        messages: impl IntoIterator<Item = String>,
    ) -> Result<Self, SnapshotError> {
        let leaf = Node::list(messages.into_iter().map(Node::String));
        self.with_subtree(path, leaf)
    }

    /// New map with an arbitrary subtree at `path`
    ///
    /// # Errors
    /// Returns [`SnapshotError::TypeMismatch`] if `path` crosses a message leaf
    pub fn with_subtree(&self, path: &FieldPath, subtree: Node) -> Result<Self, SnapshotError> {
        self.0.set_in_padded(path, normalize(subtree)).map(Self)
    }

    /// New map without anything at `path`
    ///
    /// # Errors
    /// Returns [`SnapshotError::TypeMismatch`] if `path` crosses a message leaf
    pub fn without(&self, path: &FieldPath) -> Result<Self, SnapshotError> {
        match self.0.remove_in(path)? {
            Node::Null => Ok(Self::new()),
            root => Ok(Self(root)),
        }
    }

    /// Per-entry errors of the collection at `path`
    ///
    /// Messages attached to the collection itself are not per-entry and
    /// yield an empty list.
    #[must_use]
    pub fn entries_at(&self, path: &FieldPath) -> Vector<Node> {
        match self.get(path) {
            Some(node @ Node::List(list)) if messages_of(node).is_none() => list.clone(),
            _ => Vector::new(),
        }
    }
}

impl Default for ErrorMap {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Node> for ErrorMap {
    fn from(node: Node) -> Self {
        Self::from_node(node)
    }
}

impl From<ErrorMap> for Node {
    fn from(errors: ErrorMap) -> Self {
        errors.0
    }
}

fn normalize(node: Node) -> Node {
    match node {
        Node::String(message) => Node::list([Node::String(message)]),
        Node::List(items) => Node::List(
            items
                .into_iter()
                .map(|item| match item {
                    // message lists keep their strings
                    Node::String(_) => item,
                    other => normalize(other),
                })
                .collect(),
        ),
        Node::Map(entries) => Node::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key, normalize(value)))
                .collect(),
        ),
        scalar => scalar,
    }
}

fn messages_of(node: &Node) -> Option<Vec<String>> {
    match node {
        Node::String(message) => Some(vec![message.clone()]),
        Node::List(items) if !items.is_empty() => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => None,
    }
}

fn has_messages(node: &Node) -> bool {
    if messages_of(node).is_some() {
        return true;
    }
    match node {
        Node::List(items) => items.iter().any(has_messages),
        Node::Map(entries) => entries.values().any(has_messages),
        _ => false,
    }
}

fn collect_message_paths(node: &Node, at: &FieldPath, out: &mut Vec<FieldPath>) {
    if messages_of(node).is_some() {
        out.push(at.clone());
        return;
    }
    match node {
        Node::List(items) => {
            for (index, item) in items.iter().enumerate() {
                collect_message_paths(item, &at.index(index), out);
            }
        }
        Node::Map(entries) => {
            for (key, value) in entries {
                collect_message_paths(value, &at.child(key.clone()), out);
            }
        }
        _ => {}
    }
}

//! Path-addressed edits
//!
//! Provides [`FieldEdit`], the value a field or collection control reports
//! when the operator changes something. An edit is data: it targets a path
//! and is applied to a snapshot to produce the next snapshot.

use crate::collection::{CollectionEditor, CollectionError};
use crate::node::{Node, SnapshotError};
use crate::path::FieldPath;
use im::Vector;
use std::fmt::{self, Display, Formatter};

/// Operation carried by a [`FieldEdit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOperation {
    /// Replace the value at the target path
    Set(Node),

    /// Add an entry at the end of the collection at the target path
    ///
    /// A missing collection is treated as empty.
    Append(Node),

    /// Remove the entry at an index of the collection at the target path
    Remove(usize),

    /// Replace the entry at an index of the collection at the target path
    Replace(usize, Node),
}

impl EditOperation {
    /// Check if the operation changes a collection's length
    #[inline]
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Append(_) | Self::Remove(_))
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Set(_) => "set",
            Self::Append(_) => "append",
            Self::Remove(_) => "remove",
            Self::Replace(..) => "replace",
        }
    }
}

/// A change reported against one path of a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEdit {
    /// Target path within the snapshot
    target: FieldPath,

    /// The operation
    operation: EditOperation,
}

impl FieldEdit {
    /// Create new edit
    #[inline]
    #[must_use]
    pub fn new(target: FieldPath, operation: EditOperation) -> Self {
        Self { target, operation }
    }

    /// Set `value` at `target`
    #[inline]
    #[must_use]
    pub fn set(target: FieldPath, value: impl Into<Node>) -> Self {
        Self::new(target, EditOperation::Set(value.into()))
    }

    /// Append `entry` to the collection at `target`
    #[inline]
    #[must_use]
    pub fn append(target: FieldPath, entry: Node) -> Self {
        Self::new(target, EditOperation::Append(entry))
    }

    /// Remove entry `index` of the collection at `target`
    #[inline]
    #[must_use]
    pub fn remove(target: FieldPath, index: usize) -> Self {
        Self::new(target, EditOperation::Remove(index))
    }

    /// Replace entry `index` of the collection at `target`
    #[inline]
    #[must_use]
    pub fn replace(target: FieldPath, index: usize, entry: Node) -> Self {
        Self::new(target, EditOperation::Replace(index, entry))
    }

    /// Target path
    #[inline]
    #[must_use]
    pub fn target(&self) -> &FieldPath {
        &self.target
    }

    /// Operation
    #[inline]
    #[must_use]
    pub fn operation(&self) -> &EditOperation {
        &self.operation
    }

    /// Snapshot with this edit applied
    ///
    /// Collection operations go through [`CollectionEditor`]; the resulting
    /// collection is then written back at the target path.
    ///
    /// # Errors
    /// - [`SnapshotError::TargetNotFound`] if a remove/replace target is missing
    /// - [`SnapshotError::TypeMismatch`] if the target is not a list
    /// - [`SnapshotError::Collection`] for an out-of-range index
    pub fn apply(&self, root: &Node) -> Result<Node, SnapshotError> {
        let list = || -> Result<Vector<Node>, SnapshotError> {
            match root.get_in(&self.target) {
                Some(Node::List(list)) => Ok(list.clone()),
                None | Some(Node::Null) if matches!(self.operation, EditOperation::Append(_)) => {
                    Ok(Vector::new())
                }
                None | Some(Node::Null) => Err(SnapshotError::TargetNotFound(self.target.clone())),
                Some(other) => Err(SnapshotError::TypeMismatch {
                    path: self.target.clone(),
                    expected: "list",
                    found: other.type_name(),
                }),
            }
        };
        let at_target = |source: CollectionError| SnapshotError::Collection {
            path: self.target.clone(),
            source,
        };

        let next = match &self.operation {
            EditOperation::Set(value) => return root.set_in(&self.target, value.clone()),
            EditOperation::Append(entry) => CollectionEditor::append(&list()?, entry.clone()),
            EditOperation::Remove(index) => {
                CollectionEditor::remove_at(&list()?, *index).map_err(at_target)?
            }
            EditOperation::Replace(index, entry) => {
                CollectionEditor::replace_at(&list()?, *index, entry.clone()).map_err(at_target)?
            }
        };
        root.set_in(&self.target, Node::List(next))
    }
}

impl Display for FieldEdit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.operation {
            EditOperation::Remove(index) | EditOperation::Replace(index, _) => {
                write!(f, "{} {}[{}]", self.operation.name(), self.target, index)
            }
            _ => write!(f, "{} {}", self.operation.name(), self.target),
        }
    }
}

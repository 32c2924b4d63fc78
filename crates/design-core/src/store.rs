//! Design state store
//!
//! Owns the design snapshot and its parallel error snapshot. Every mutation
//! replaces a snapshot with a new one that shares all untouched structure
//! and bumps the revision counter.

use crate::binding::DesignView;
use crate::error::StoreError;
use crate::schema::{BranchSchemaResolver, SchemaTag};
use crate::types::{keys, Branch, DesignKind, PreferenceEntry};
use design_snapshot::{CollectionEditor, EditOperation, ErrorMap, FieldEdit, FieldPath, Node, SnapshotError};
use im::Vector;
use tracing::debug;

/// Sum of branch ratios
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatioTotal {
    /// Sum of every integer ratio
    pub total: i64,
    /// Branches whose ratio is not an integer
    pub unparsed: usize,
}

impl RatioTotal {
    /// Ratios are expected to add up to 100; reported, never enforced
    #[inline]
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.unparsed == 0 && self.total == 100
    }
}

/// Owner of the design and error snapshots
#[derive(Debug, Clone)]
pub struct DesignStateStore {
    data: Node,
    errors: ErrorMap,
    loaded: bool,
    revision: u64,
}

impl DesignStateStore {
    /// Empty store, not loaded
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Node::empty_map(),
            errors: ErrorMap::new(),
            loaded: false,
            revision: 0,
        }
    }

    /// Reset to the empty, not-loaded state ahead of a load
    pub fn begin_load(&mut self) {
        self.data = Node::empty_map();
        self.errors = ErrorMap::new();
        self.loaded = false;
        self.bump();
    }

    /// Replace the snapshot wholesale with a loaded record
    pub fn finish_load(&mut self, record: Node) {
        self.data = record;
        self.errors = ErrorMap::new();
        self.loaded = true;
        self.bump();
    }

    #[inline]
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Current design snapshot
    #[inline]
    #[must_use]
    pub fn data(&self) -> &Node {
        &self.data
    }

    /// Current error snapshot
    #[inline]
    #[must_use]
    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    /// Mutation counter
    #[inline]
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Discriminator of the live record
    #[must_use]
    pub fn kind(&self) -> DesignKind {
        DesignKind::of_record(&self.data)
    }

    /// Schemas for the live record
    #[must_use]
    pub fn schema(&self) -> SchemaTag {
        BranchSchemaResolver::resolve_record(&self.data)
    }

    /// Rendered form for the current snapshots
    #[must_use]
    pub fn view(&self) -> DesignView {
        DesignView::render(&self.data, &self.errors)
    }

    /// Value at `path`
    #[inline]
    #[must_use]
    pub fn get(&self, path: &FieldPath) -> Option<&Node> {
        self.data.get_in(path)
    }

    /// The discriminator and the record root are written only by a load
    fn check_writable(path: &FieldPath) -> Result<(), StoreError> {
        match path.first() {
            None => Err(StoreError::ReadOnly(path.clone())),
            Some(first) if first.as_key() == Some(keys::KIND) => Err(StoreError::ReadOnly(path.clone())),
            Some(_) => Ok(()),
        }
    }

    /// Write `value` at `path`
    ///
    /// # Errors
    /// - [`StoreError::ReadOnly`] for the root path or anything under `kind`
    /// - [`StoreError::Snapshot`] if `path` crosses a scalar or indexes at or
    ///   past the end of a collection
    pub fn set_field(&mut self, path: &FieldPath, value: impl Into<Node>) -> Result<(), StoreError> {
        Self::check_writable(path)?;
        self.data = self.data.set_in(path, value.into())?;
        self.bump();
        debug!(%path, revision = self.revision, "field set");
        Ok(())
    }

    /// Write an error subtree at `path`, creating missing containers
    ///
    /// A bare string is stored as a one-message list.
    ///
    /// # Errors
    /// Returns [`StoreError::Snapshot`] if `path` crosses a message leaf
    pub fn set_error(&mut self, path: &FieldPath, value: impl Into<Node>) -> Result<(), StoreError> {
        self.errors = self.errors.with_subtree(path, value.into())?;
        self.bump();
        debug!(%path, revision = self.revision, "error set");
        Ok(())
    }

    /// Replace the whole error tree
    pub fn replace_errors(&mut self, errors: ErrorMap) {
        self.errors = errors;
        self.bump();
    }

    pub fn clear_errors(&mut self) {
        self.replace_errors(ErrorMap::new());
    }

    /// Apply an edit reported by a view
    ///
    /// # Errors
    /// Returns [`StoreError`] if the edit does not fit the snapshot
    pub fn apply(&mut self, edit: &FieldEdit) -> Result<(), StoreError> {
        let target = edit.target();
        match edit.operation() {
            EditOperation::Set(value) => self.set_field(target, value.clone()),
            EditOperation::Append(entry) => self.append_entry(target, entry.clone()).map(drop),
            EditOperation::Remove(index) => self.remove_entry(target, *index),
            EditOperation::Replace(index, entry) => self.replace_entry(target, *index, entry.clone()),
        }
    }

    fn collection(&self, path: &FieldPath) -> Result<Vector<Node>, StoreError> {
        match self.data.get_in(path) {
            Some(Node::List(list)) => Ok(list.clone()),
            None | Some(Node::Null) => Ok(Vector::new()),
            Some(_) => Err(StoreError::NotACollection(path.clone())),
        }
    }

    /// Append `entry` to the collection at `path`; returns its index
    ///
    /// # Errors
    /// Returns [`StoreError::NotACollection`] if `path` holds a non-list value
    pub fn append_entry(&mut self, path: &FieldPath, entry: Node) -> Result<usize, StoreError> {
        Self::check_writable(path)?;
        let list = self.collection(path)?;
        let index = list.len();
        self.set_field(path, Node::List(CollectionEditor::append(&list, entry)))?;
        Ok(index)
    }

    /// Remove entry `index` of the collection at `path`
    ///
    /// The error entries of the collection are removed at the same index,
    /// so later entries keep pointing at their own data. Messages attached
    /// to the collection itself are dropped.
    ///
    /// # Errors
    /// Returns [`StoreError::Snapshot`] if `index` is out of range
    pub fn remove_entry(&mut self, path: &FieldPath, index: usize) -> Result<(), StoreError> {
        Self::check_writable(path)?;
        let list = self.collection(path)?;
        let had_errors = self.errors.get(path).is_some();
        let (data, errors) = CollectionEditor::remove_aligned(
            &list,
            &self.errors.entries_at(path),
            index,
            Node::empty_map,
        )
        .map_err(|source| SnapshotError::Collection {
            path: path.clone(),
            source,
        })?;

        let next_data = self.data.set_in(path, Node::List(data))?;
        let next_errors = if had_errors {
            self.errors.with_subtree(path, Node::List(errors))?
        } else {
            self.errors.clone()
        };
        self.data = next_data;
        self.errors = next_errors;
        self.bump();
        debug!(%path, index, revision = self.revision, "entry removed");
        Ok(())
    }

    /// Replace entry `index` of the collection at `path`
    ///
    /// # Errors
    /// Returns [`StoreError::Snapshot`] if `index` is out of range
    pub fn replace_entry(&mut self, path: &FieldPath, index: usize, entry: Node) -> Result<(), StoreError> {
        Self::check_writable(path)?;
        let list = self.collection(path)?;
        let next = CollectionEditor::replace_at(&list, index, entry).map_err(|source| {
            SnapshotError::Collection {
                path: path.clone(),
                source,
            }
        })?;
        self.set_field(path, Node::List(next))
    }

    /// Append a default branch; returns its index
    ///
    /// The new branch is the control only if it is the first one.
    ///
    /// # Errors
    /// Returns [`StoreError::NotACollection`] if `branches` is not a list
    pub fn add_branch(&mut self) -> Result<usize, StoreError> {
        let path = FieldPath::key(keys::BRANCHES);
        let schema = self.schema();
        let entry = Branch::default_for(
            &self.collection(&path)?,
            schema.branch.has_inline_value(),
            schema.branch.has_preferences(),
        );
        self.append_entry(&path, entry)
    }

    /// Remove branch `index` and its errors
    ///
    /// # Errors
    /// Returns [`StoreError::Snapshot`] if `index` is out of range
    pub fn remove_branch(&mut self, index: usize) -> Result<(), StoreError> {
        self.remove_entry(&FieldPath::key(keys::BRANCHES), index)
    }

    fn preferences_path(&self, branch: usize) -> Result<FieldPath, StoreError> {
        if !self.schema().branch.has_preferences() {
            return Err(StoreError::NoPreferenceCollection(self.kind().to_string()));
        }
        let branch_path = FieldPath::key(keys::BRANCHES).index(branch);
        if self.data.get_in(&branch_path).is_none() {
            return Err(SnapshotError::TargetNotFound(branch_path).into());
        }
        Ok(branch_path.child(keys::PREFERENCES))
    }

    /// Append an empty preference entry to branch `branch`; returns its index
    ///
    /// # Errors
    /// - [`StoreError::NoPreferenceCollection`] if the design kind has none
    /// - [`StoreError::Snapshot`] if the branch does not exist
    pub fn add_preference(&mut self, branch: usize) -> Result<usize, StoreError> {
        let path = self.preferences_path(branch)?;
        self.append_entry(&path, PreferenceEntry::empty().to_node())
    }

    /// Remove preference `index` of branch `branch` and its errors
    ///
    /// # Errors
    /// - [`StoreError::NoPreferenceCollection`] if the design kind has none
    /// - [`StoreError::Snapshot`] if either index is out of range
    pub fn remove_preference(&mut self, branch: usize, index: usize) -> Result<(), StoreError> {
        let path = self.preferences_path(branch)?;
        self.remove_entry(&path, index)
    }

    /// Typed read of every branch
    #[must_use]
    pub fn branches(&self) -> Vec<Branch> {
        self.data
            .get(keys::BRANCHES)
            .and_then(Node::as_list)
            .map(|list| list.iter().map(Branch::from_node).collect())
            .unwrap_or_default()
    }

    /// Sum of branch ratios
    ///
    /// Saturates at the `i64` bounds.
    #[must_use]
    pub fn ratio_total(&self) -> RatioTotal {
        self.branches()
            .iter()
            .fold(RatioTotal { total: 0, unparsed: 0 }, |acc, branch| match branch.ratio {
                Some(ratio) => RatioTotal {
                    total: acc.total.saturating_add(ratio),
                    ..acc
                },
                None => RatioTotal {
                    unparsed: acc.unparsed + 1,
                    ..acc
                },
            })
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}

impl Default for DesignStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn path(s: &str) -> FieldPath {
        s.parse().unwrap()
    }

    fn loaded(record: serde_json::Value) -> DesignStateStore {
        let mut store = DesignStateStore::new();
        store.finish_load(Node::from(record));
        store
    }

    fn three_branches() -> DesignStateStore {
        loaded(json!({
            "kind": "multi-pref",
            "branches": [
                {"name": "a", "ratio": 30, "is_control": true, "preferences": []},
                {"name": "b", "ratio": 30, "is_control": false, "preferences": []},
                {"name": "c", "ratio": 40, "is_control": false, "preferences": []}
            ]
        }))
    }

    #[test]
    fn starts_empty_and_unloaded() {
        let store = DesignStateStore::new();
        assert!(!store.is_loaded());
        assert_eq!(store.data(), &Node::empty_map());
        assert!(store.errors().is_empty());
        assert!(!store.kind().is_known());
    }

    #[test]
    fn set_field_shares_siblings() {
        let mut store = three_branches();
        let before = store.data().clone();
        store.set_field(&path("branches[1].name"), "renamed").unwrap();

        let after = store.data();
        assert!(before.get_in(&path("branches[0]")).unwrap().ptr_eq(after.get_in(&path("branches[0]")).unwrap()));
        assert!(before.get_in(&path("branches[2]")).unwrap().ptr_eq(after.get_in(&path("branches[2]")).unwrap()));
        assert_eq!(store.get(&path("branches[1].name")), Some(&Node::from("renamed")));
    }

    #[test]
    fn set_field_past_end_is_rejected() {
        let mut store = three_branches();
        let revision = store.revision();
        let result = store.set_field(&path("branches[3].name"), "x");
        assert!(matches!(result, Err(StoreError::Snapshot(_))));
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn set_error_pads_sparse_tree() {
        let mut store = three_branches();
        store.set_error(&path("branches[2].name"), "Too long.").unwrap();
        assert_eq!(
            store.errors().as_node().to_json(),
            json!({"branches": [{}, {}, {"name": ["Too long."]}]})
        );
        store.clear_errors();
        assert!(store.errors().is_empty());
    }

    #[test]
    fn remove_branch_keeps_errors_aligned() {
        let mut store = three_branches();
        store.set_error(&path("branches[2].name"), "Bad c").unwrap();
        store.remove_branch(1).unwrap();

        assert_eq!(store.branches().len(), 2);
        assert_eq!(store.get(&path("branches[1].name")), Some(&Node::from("c")));
        assert_eq!(
            store.errors().messages_at(&path("branches[1].name")),
            Some(vec!["Bad c".to_string()])
        );
        assert_eq!(store.errors().entries_at(&FieldPath::key("branches")).len(), 2);
    }

    #[test]
    fn remove_without_errors_leaves_error_tree() {
        let mut store = three_branches();
        store.remove_branch(0).unwrap();
        assert_eq!(store.errors(), &ErrorMap::new());
        // control flag is not reassigned
        assert!(store.branches().iter().all(|b| !b.is_control));
    }

    #[test]
    fn add_branch_marks_only_first_as_control() {
        let mut store = loaded(json!({"kind": "pref", "branches": []}));
        assert_eq!(store.add_branch().unwrap(), 0);
        assert_eq!(store.add_branch().unwrap(), 1);
        let branches = store.branches();
        assert!(branches[0].is_control);
        assert!(!branches[1].is_control);
        assert_eq!(store.get(&path("branches[1].value")), Some(&Node::from("")));
    }

    #[test]
    fn add_and_remove_preference() {
        let mut store = three_branches();
        assert_eq!(store.add_preference(1).unwrap(), 0);
        assert_eq!(store.add_preference(1).unwrap(), 1);
        store.set_field(&path("branches[1].preferences[1].pref_name"), "second").unwrap();
        store.remove_preference(1, 0).unwrap();

        let prefs = &store.branches()[1].preferences;
        assert_eq!(prefs.len(), 1);
        assert_eq!(prefs[0].pref_name, "second");
    }

    #[test]
    fn add_preference_needs_multi_pref() {
        let mut store = loaded(json!({"kind": "addon", "branches": [{"name": "a"}]}));
        assert!(matches!(
            store.add_preference(0),
            Err(StoreError::NoPreferenceCollection(kind)) if kind == "addon"
        ));
    }

    #[test]
    fn add_preference_missing_branch() {
        let mut store = three_branches();
        assert!(matches!(store.add_preference(7), Err(StoreError::Snapshot(_))));
    }

    #[test]
    fn apply_dispatches_edits() {
        let mut store = three_branches();
        store.apply(&FieldEdit::set(path("branches[0].ratio"), "35")).unwrap();
        store
            .apply(&FieldEdit::append(path("branches[0].preferences"), PreferenceEntry::empty().to_node()))
            .unwrap();
        store.apply(&FieldEdit::remove(FieldPath::key("branches"), 2)).unwrap();
        assert_eq!(store.branches().len(), 2);
        assert_eq!(store.branches()[0].ratio, Some(35));
        assert_eq!(store.branches()[0].preferences.len(), 1);
    }

    #[test]
    fn collection_ops_on_scalar() {
        let mut store = three_branches();
        let result = store.append_entry(&path("branches[0].name"), Node::Null);
        assert!(matches!(result, Err(StoreError::NotACollection(_))));
    }

    #[test]
    fn kind_and_root_are_read_only() {
        let mut store = three_branches();
        let before = store.data().clone();
        let revision = store.revision();

        let kind = FieldPath::key("kind");
        assert!(matches!(store.set_field(&kind, "addon"), Err(StoreError::ReadOnly(_))));
        assert!(matches!(
            store.set_field(&FieldPath::root(), Node::from(json!({"branches": []}))),
            Err(StoreError::ReadOnly(_))
        ));
        assert!(matches!(store.append_entry(&kind, Node::Null), Err(StoreError::ReadOnly(_))));
        assert!(matches!(store.remove_entry(&FieldPath::root(), 0), Err(StoreError::ReadOnly(_))));
        assert!(matches!(store.replace_entry(&kind, 0, Node::Null), Err(StoreError::ReadOnly(_))));
        assert!(matches!(
            store.apply(&FieldEdit::set(kind, Node::from("addon"))),
            Err(StoreError::ReadOnly(_))
        ));

        assert_eq!(store.data(), &before);
        assert_eq!(store.revision(), revision);
        assert_eq!(store.kind().as_str(), "multi-pref");
    }

    #[test]
    fn ratio_total_saturates() {
        let store = loaded(json!({
            "kind": "generic",
            "branches": [
                {"name": "a", "ratio": "9223372036854775807", "is_control": true},
                {"name": "b", "ratio": "1", "is_control": false}
            ]
        }));
        let total = store.ratio_total();
        assert_eq!(total, RatioTotal { total: i64::MAX, unparsed: 0 });
        assert!(!total.is_balanced());
    }

    #[test]
    fn ratio_total_reports_soft_invariant() {
        let mut store = three_branches();
        assert_eq!(store.ratio_total(), RatioTotal { total: 100, unparsed: 0 });
        assert!(store.ratio_total().is_balanced());

        store.set_field(&path("branches[0].ratio"), "abc").unwrap();
        let total = store.ratio_total();
        assert_eq!(total, RatioTotal { total: 70, unparsed: 1 });
        assert!(!total.is_balanced());
    }

    #[test]
    fn every_mutation_bumps_revision() {
        let mut store = three_branches();
        let start = store.revision();
        store.set_field(&path("branches[0].name"), "x").unwrap();
        store.set_error(&path("branches[0].name"), "bad").unwrap();
        store.add_preference(0).unwrap();
        store.remove_branch(2).unwrap();
        store.clear_errors();
        assert_eq!(store.revision(), start + 5);
    }
}

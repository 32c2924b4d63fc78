//! Field bindings and rendered views
//!
//! A render walks the live snapshot top-down: the schema is resolved from
//! the record's discriminator, each field in the schema becomes a
//! [`FieldBinding`] carrying its value and its own error messages, and
//! branch and preference collections become nested views. Edits flow back
//! up as [`FieldEdit`] values.

use crate::schema::{BranchSchema, BranchSchemaResolver, FieldSpec, SchemaTag, Widget};
use crate::types::keys;
use design_snapshot::{ErrorMap, FieldEdit, FieldPath, Node, NON_FIELD_ERRORS};

/// One scalar editable value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
    path: FieldPath,
    label: String,
    widget: Widget,
    value: Node,
    error: Option<Vec<String>>,
    /// UI-only; never part of the snapshot
    help_showing: bool,
}

impl FieldBinding {
    fn bind(parent: &FieldPath, spec: &FieldSpec, data: &Node, errors: &ErrorMap) -> Self {
        let path = parent.child(spec.key.as_ref());
        Self {
            label: spec.label.to_string(),
            widget: spec.widget,
            value: data.get_in(&path).cloned().unwrap_or_default(),
            error: errors.messages_at(&path),
            help_showing: false,
            path,
        }
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    #[must_use]
    pub fn widget(&self) -> Widget {
        self.widget
    }

    /// Bound value; `Null` if the record does not carry the field
    #[inline]
    #[must_use]
    pub fn value(&self) -> &Node {
        &self.value
    }

    /// Value as shown in an input
    #[must_use]
    pub fn text(&self) -> String {
        self.value.display_text()
    }

    /// Messages for exactly this field's path
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&[String]> {
        self.error.as_deref()
    }

    /// Invalid-field indicator
    #[inline]
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        self.error.is_some()
    }

    #[inline]
    #[must_use]
    pub fn help_showing(&self) -> bool {
        self.help_showing
    }

    pub fn toggle_help(&mut self) {
        self.help_showing = !self.help_showing;
    }

    /// Edit reporting a new value for this field
    #[must_use]
    pub fn change(&self, value: impl Into<Node>) -> FieldEdit {
        FieldEdit::set(self.path.clone(), value)
    }
}

/// Rendering capability for field bindings
///
/// Renders one labeled input and reports a changed value, if any.
pub trait FieldWidgets {
    fn field(&mut self, binding: &FieldBinding) -> Option<Node>;
}

/// One preference entry of a branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceView {
    pub index: usize,
    pub fields: Vec<FieldBinding>,
}

/// Preference collection of one branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceEditor {
    /// Path of the collection
    pub path: FieldPath,
    pub entries: Vec<PreferenceView>,
    /// Messages attached to the collection rather than to an entry
    pub errors: Option<Vec<String>>,
}

impl PreferenceEditor {
    fn render(path: FieldPath, data: &Node, errors: &ErrorMap) -> Self {
        let len = data.get_in(&path).and_then(Node::as_list).map_or(0, |l| l.len());
        let entries = (0..len)
            .map(|index| {
                let entry = path.index(index);
                PreferenceView {
                    index,
                    fields: BranchSchema::preference_fields()
                        .iter()
                        .map(|spec| FieldBinding::bind(&entry, spec, data, errors))
                        .collect(),
                }
            })
            .collect();
        Self {
            errors: errors.messages_at(&path),
            path,
            entries,
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One branch of the design
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchView {
    pub index: usize,
    pub is_control: bool,
    pub fields: Vec<FieldBinding>,
    /// Present only for schemas with preference collections
    pub preferences: Option<PreferenceEditor>,
}

impl BranchView {
    fn bindings(&self) -> impl Iterator<Item = &FieldBinding> {
        self.fields.iter().chain(
            self.preferences
                .iter()
                .flat_map(|prefs| prefs.entries.iter().flat_map(|e| e.fields.iter())),
        )
    }
}

/// Whole rendered form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignView {
    pub schema: SchemaTag,
    pub fields: Vec<FieldBinding>,
    pub branches: Vec<BranchView>,
    /// Messages attached to the branch collection
    pub branch_errors: Option<Vec<String>>,
    /// Messages attached to no field
    pub non_field_errors: Option<Vec<String>>,
}

impl DesignView {
    /// Render the current snapshots
    #[must_use]
    pub fn render(data: &Node, errors: &ErrorMap) -> Self {
        let schema = BranchSchemaResolver::resolve_record(data);
        let root = FieldPath::root();
        let branches_path = FieldPath::key(keys::BRANCHES);
        let branch_fields = schema.branch.fields();

        let fields = schema
            .design
            .fields(data)
            .iter()
            .map(|spec| FieldBinding::bind(&root, spec, data, errors))
            .collect();

        let count = data.get_in(&branches_path).and_then(Node::as_list).map_or(0, |l| l.len());
        let branches = (0..count)
            .map(|index| {
                let path = branches_path.index(index);
                BranchView {
                    index,
                    is_control: data
                        .get_in(&path.child(keys::IS_CONTROL))
                        .and_then(Node::as_bool)
                        .unwrap_or(false),
                    fields: branch_fields
                        .iter()
                        .map(|spec| FieldBinding::bind(&path, spec, data, errors))
                        .collect(),
                    preferences: schema
                        .branch
                        .has_preferences()
                        .then(|| PreferenceEditor::render(path.child(keys::PREFERENCES), data, errors)),
                }
            })
            .collect();

        Self {
            schema,
            fields,
            branches,
            branch_errors: errors.messages_at(&branches_path),
            non_field_errors: errors.messages_at(&FieldPath::key(NON_FIELD_ERRORS)),
        }
    }

    /// Every binding, in render order
    pub fn bindings(&self) -> impl Iterator<Item = &FieldBinding> {
        self.fields
            .iter()
            .chain(self.branches.iter().flat_map(BranchView::bindings))
    }

    /// First rendered field showing an error
    #[must_use]
    pub fn first_invalid(&self) -> Option<&FieldBinding> {
        self.bindings().find(|binding| binding.is_invalid())
    }

    /// Binding for a path, if rendered
    #[must_use]
    pub fn binding(&self, path: &FieldPath) -> Option<&FieldBinding> {
        self.bindings().find(|binding| binding.path() == path)
    }

    /// Drive every binding through `widgets` and collect reported changes
    pub fn render_with<W: FieldWidgets + ?Sized>(&self, widgets: &mut W) -> Vec<FieldEdit> {
        self.bindings()
            .filter_map(|binding| {
                let value = widgets.field(binding)?;
                (value != *binding.value()).then(|| binding.change(value))
            })
            .collect()
    }
}

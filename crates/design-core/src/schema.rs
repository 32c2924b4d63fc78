//! Schema dispatch
//!
//! Maps a design discriminator to the field sets rendered for the record's
//! top level and for each branch. Resolution is a pure function of the
//! discriminator and is redone on every render.

use crate::types::{keys, DesignKind, PrefBranch, PrefType};
use design_snapshot::Node;
use std::borrow::Cow;

/// Input control for one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Widget {
    /// Single-line text
    Text,
    /// Multi-line text
    TextArea,
    /// One of a fixed set of values
    Select(&'static [&'static str]),
}

/// One editable field: wire key, label and control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: Cow<'static, str>,
    pub label: Cow<'static, str>,
    pub widget: Widget,
}

impl FieldSpec {
    const fn new(key: &'static str, label: &'static str, widget: Widget) -> Self {
        Self {
            key: Cow::Borrowed(key),
            label: Cow::Borrowed(label),
            widget,
        }
    }

    /// Plain text field labeled by its own key
    #[must_use]
    pub fn raw(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            label: Cow::Owned(key.clone()),
            key: Cow::Owned(key),
            widget: Widget::Text,
        }
    }
}

const PREF_KEY: FieldSpec = FieldSpec::new("pref_key", "Pref Name", Widget::Text);
const PREF_TYPE: FieldSpec = FieldSpec::new(keys::PREF_TYPE, "Pref Type", Widget::Select(PrefType::OPTIONS));
const PREF_BRANCH: FieldSpec =
    FieldSpec::new(keys::PREF_BRANCH, "Pref Branch", Widget::Select(PrefBranch::OPTIONS));
const ADDON_EXPERIMENT: FieldSpec =
    FieldSpec::new("addon_experiment_id", "Active Experiment Name", Widget::Text);
const ADDON_RELEASE_URL: FieldSpec =
    FieldSpec::new("addon_release_url", "Signed Release URL", Widget::Text);
const DESIGN_TEXT: FieldSpec = FieldSpec::new("design", "Design", Widget::TextArea);

const RATIO: FieldSpec = FieldSpec::new(keys::RATIO, "Branch Size", Widget::Text);
const NAME: FieldSpec = FieldSpec::new(keys::NAME, "Name", Widget::Text);
const DESCRIPTION: FieldSpec = FieldSpec::new(keys::DESCRIPTION, "Description", Widget::TextArea);
const PREF_VALUE_INLINE: FieldSpec = FieldSpec::new(keys::VALUE, "Pref Value", Widget::Text);

static PREFERENCE_FIELDS: [FieldSpec; 4] = [
    FieldSpec::new(keys::PREF_NAME, "Pref Name", Widget::Text),
    PREF_TYPE,
    PREF_BRANCH,
    FieldSpec::new(keys::PREF_VALUE, "Pref Value", Widget::Text),
];

/// Field set of the record's top level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DesignSchema {
    SinglePreference,
    MultiPreference,
    Addon,
    BranchedAddon,
    Generic,
    /// Raw editor over whatever scalar keys the record carries
    Fallback,
}

impl DesignSchema {
    /// Top-level fields, in render order
    ///
    /// Only [`DesignSchema::Fallback`] reads `record`: it lists every scalar
    /// top-level key except the discriminator.
    #[must_use]
    pub fn fields(self, record: &Node) -> Vec<FieldSpec> {
        match self {
            Self::SinglePreference => vec![PREF_KEY, PREF_TYPE, PREF_BRANCH],
            Self::MultiPreference => Vec::new(),
            Self::Addon => vec![ADDON_EXPERIMENT, ADDON_RELEASE_URL],
            Self::BranchedAddon => vec![ADDON_EXPERIMENT],
            Self::Generic => vec![DESIGN_TEXT],
            Self::Fallback => record
                .as_map()
                .map(|map| {
                    map.iter()
                        .filter(|(key, value)| key.as_str() != keys::KIND && value.is_scalar())
                        .map(|(key, _)| FieldSpec::raw(key.clone()))
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// Field set of each branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchSchema {
    /// Branch carries its preference value inline
    SinglePreference,
    /// Branch owns a preference collection
    MultiPreference,
    /// Name, description and size only
    FreeForm,
}

impl BranchSchema {
    /// Scalar branch fields, in render order
    #[must_use]
    pub fn fields(self) -> Vec<FieldSpec> {
        match self {
            Self::SinglePreference => vec![RATIO, NAME, DESCRIPTION, PREF_VALUE_INLINE],
            Self::MultiPreference | Self::FreeForm => vec![RATIO, NAME, DESCRIPTION],
        }
    }

    #[inline]
    #[must_use]
    pub fn has_inline_value(self) -> bool {
        matches!(self, Self::SinglePreference)
    }

    #[inline]
    #[must_use]
    pub fn has_preferences(self) -> bool {
        matches!(self, Self::MultiPreference)
    }

    /// Fields of one preference entry
    #[must_use]
    pub fn preference_fields() -> &'static [FieldSpec] {
        &PREFERENCE_FIELDS
    }
}

/// Resolved schemas for one design
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemaTag {
    pub design: DesignSchema,
    pub branch: BranchSchema,
}

/// Discriminator to schema dispatch
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchSchemaResolver;

impl BranchSchemaResolver {
    /// Schemas for a discriminator
    ///
    /// Total: unrecognized values get the fallback schema.
    #[must_use]
    pub fn resolve(kind: &DesignKind) -> SchemaTag {
        let (design, branch) = match kind {
            DesignKind::Pref => (DesignSchema::SinglePreference, BranchSchema::SinglePreference),
            DesignKind::MultiPref => (DesignSchema::MultiPreference, BranchSchema::MultiPreference),
            DesignKind::Addon => (DesignSchema::Addon, BranchSchema::FreeForm),
            DesignKind::BranchedAddon => (DesignSchema::BranchedAddon, BranchSchema::FreeForm),
            DesignKind::Generic => (DesignSchema::Generic, BranchSchema::FreeForm),
            DesignKind::Unknown(_) => (DesignSchema::Fallback, BranchSchema::FreeForm),
        };
        SchemaTag { design, branch }
    }

    /// Schemas for a loaded record
    #[inline]
    #[must_use]
    pub fn resolve_record(record: &Node) -> SchemaTag {
        Self::resolve(&DesignKind::of_record(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys_of(fields: &[FieldSpec]) -> Vec<&str> {
        fields.iter().map(|f| f.key.as_ref()).collect()
    }

    #[test]
    fn resolve_known_kinds() {
        let tag = BranchSchemaResolver::resolve(&DesignKind::MultiPref);
        assert_eq!(tag.design, DesignSchema::MultiPreference);
        assert_eq!(tag.branch, BranchSchema::MultiPreference);

        let tag = BranchSchemaResolver::resolve(&DesignKind::Pref);
        assert_eq!(tag.branch, BranchSchema::SinglePreference);

        for kind in [DesignKind::Addon, DesignKind::BranchedAddon, DesignKind::Generic] {
            assert_eq!(BranchSchemaResolver::resolve(&kind).branch, BranchSchema::FreeForm);
        }
    }

    #[test]
    fn unknown_kind_falls_back() {
        let tag = BranchSchemaResolver::resolve(&DesignKind::parse("rollout"));
        assert_eq!(tag.design, DesignSchema::Fallback);
        assert_eq!(tag.branch, BranchSchema::FreeForm);
    }

    #[test]
    fn single_preference_fields() {
        let fields = DesignSchema::SinglePreference.fields(&Node::Null);
        assert_eq!(keys_of(&fields), vec!["pref_key", "pref_type", "pref_branch"]);
        assert_eq!(fields[0].label, "Pref Name");
        assert_eq!(fields[1].widget, Widget::Select(PrefType::OPTIONS));
        assert_eq!(
            keys_of(&BranchSchema::SinglePreference.fields()),
            vec!["ratio", "name", "description", "value"]
        );
    }

    #[test]
    fn addon_fields() {
        let fields = DesignSchema::Addon.fields(&Node::Null);
        assert_eq!(keys_of(&fields), vec!["addon_experiment_id", "addon_release_url"]);
        assert_eq!(fields[1].label, "Signed Release URL");
        assert_eq!(keys_of(&DesignSchema::BranchedAddon.fields(&Node::Null)), vec!["addon_experiment_id"]);
        assert_eq!(DesignSchema::Generic.fields(&Node::Null)[0].widget, Widget::TextArea);
    }

    #[test]
    fn fallback_lists_scalar_keys() {
        let record = Node::from(json!({
            "kind": "rollout",
            "audience": "beta",
            "percent": 10,
            "branches": [],
            "extra": {"nested": true}
        }));
        let fields = DesignSchema::Fallback.fields(&record);
        assert_eq!(keys_of(&fields), vec!["audience", "percent"]);
        assert_eq!(fields[0].label, "audience");
    }

    #[test]
    fn preference_entry_fields() {
        assert_eq!(
            keys_of(BranchSchema::preference_fields()),
            vec!["pref_name", "pref_type", "pref_branch", "pref_value"]
        );
        assert!(BranchSchema::MultiPreference.has_preferences());
        assert!(!BranchSchema::FreeForm.has_inline_value());
    }
}

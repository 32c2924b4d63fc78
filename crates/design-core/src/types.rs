//! Core types for Design Core
//!
//! Defines the fundamental types of an experiment design:
//! - The design discriminator ([`DesignKind`])
//! - Resource addressing ([`Endpoint`]) and post-save [`Destination`]s
//! - Typed views of branches and preference entries

use crate::config::FormConfig;
use crate::error::ConfigError;
use design_snapshot::Node;
use im::Vector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wire keys of a design record
pub mod keys {
    /// Discriminator
    pub const KIND: &str = "kind";
    /// Branch collection
    pub const BRANCHES: &str = "branches";
    pub const NAME: &str = "name";
    pub const DESCRIPTION: &str = "description";
    pub const RATIO: &str = "ratio";
    pub const IS_CONTROL: &str = "is_control";
    /// Inlined single-preference value of a branch
    pub const VALUE: &str = "value";
    /// Preference collection of a branch
    pub const PREFERENCES: &str = "preferences";
    pub const PREF_NAME: &str = "pref_name";
    pub const PREF_TYPE: &str = "pref_type";
    pub const PREF_BRANCH: &str = "pref_branch";
    pub const PREF_VALUE: &str = "pref_value";
}

/// Design discriminator
///
/// Closed set of known design kinds plus an explicit [`DesignKind::Unknown`]
/// arm, so an unrecognized value degrades instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DesignKind {
    /// One preference, value per branch
    Pref,
    /// Several preferences per branch
    MultiPref,
    /// Add-on experiment
    Addon,
    /// Add-on experiment with per-branch add-ons
    BranchedAddon,
    /// Free-form design text
    Generic,
    /// Anything else, kept verbatim
    Unknown(String),
}

impl DesignKind {
    /// Read the discriminator of a loaded record
    #[must_use]
    pub fn of_record(record: &Node) -> Self {
        record
            .get(keys::KIND)
            .and_then(Node::as_str)
            .map(Self::parse)
            .unwrap_or_else(|| Self::Unknown(String::new()))
    }

    /// Parse a discriminator value (infallible)
    ///
    /// Accepts the backend's short values and the descriptive aliases.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "pref" | "single-preference" => Self::Pref,
            "multi-pref" | "multi-preference" => Self::MultiPref,
            "addon" => Self::Addon,
            "branched-addon" => Self::BranchedAddon,
            "generic" | "freeform" => Self::Generic,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Canonical wire value
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pref => "pref",
            Self::MultiPref => "multi-pref",
            Self::Addon => "addon",
            Self::BranchedAddon => "branched-addon",
            Self::Generic => "generic",
            Self::Unknown(value) => value,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for DesignKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_slug(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Address of one experiment's design resource
///
/// Resource path: `experiments/{slug}/design-{kind}/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    slug: String,
    kind: String,
}

impl Endpoint {
    /// Create endpoint for an experiment slug and design kind segment
    ///
    /// # Errors
    /// Returns error if either part is empty or not `[A-Za-z0-9_-]+`
    pub fn new(slug: impl Into<String>, kind: impl Into<String>) -> Result<Self, ConfigError> {
        let slug = slug.into();
        let kind = kind.into();
        if !is_slug(&slug) {
            return Err(ConfigError::InvalidSlug(slug));
        }
        if !is_slug(&kind) {
            return Err(ConfigError::InvalidKind(kind));
        }
        Ok(Self { slug, kind })
    }

    /// Experiment identifier
    #[inline]
    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Design kind segment
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Path relative to the API root
    #[must_use]
    pub fn resource_path(&self) -> String {
        format!("experiments/{}/design-{}/", self.slug, self.kind)
    }

    /// Absolute API URL under `config.api_root`
    #[must_use]
    pub fn url(&self, config: &FormConfig) -> String {
        format!("{}{}", config.api_root, self.resource_path())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.resource_path())
    }
}

/// Where to go after a successful save
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Destination {
    /// "Save Draft": back to the experiment overview
    Overview,
    /// "Save Draft and Continue": the next editing step
    NextStep,
}

impl Destination {
    /// Page URL for an experiment
    #[must_use]
    pub fn url(self, slug: &str, config: &FormConfig) -> String {
        match self {
            Self::Overview => format!("{}experiments/{slug}/", config.site_root),
            Self::NextStep => format!(
                "{}experiments/{slug}/{}/",
                config.site_root, config.next_step_segment
            ),
        }
    }
}

/// Type of a Firefox preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrefType {
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "integer")]
    Integer,
    #[serde(rename = "string")]
    String,
    #[serde(rename = "json string")]
    JsonString,
}

impl PrefType {
    pub const ALL: [PrefType; 4] = [Self::Boolean, Self::Integer, Self::String, Self::JsonString];

    /// Select option values, in display order
    pub const OPTIONS: &'static [&'static str] = &["boolean", "integer", "string", "json string"];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::String => "string",
            Self::JsonString => "json string",
        }
    }
}

impl FromStr for PrefType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown pref type: {s}"))
    }
}

/// Preference branch a value is written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefBranch {
    Default,
    User,
}

impl PrefBranch {
    pub const OPTIONS: &'static [&'static str] = &["default", "user"];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::User => "user",
        }
    }
}

impl FromStr for PrefBranch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "user" => Ok(Self::User),
            other => Err(format!("unknown pref branch: {other}")),
        }
    }
}

fn text(node: &Node, key: &str) -> String {
    node.get(key).map(Node::display_text).unwrap_or_default()
}

/// One preference tuple nested inside a branch
///
/// A thin record: the engine only creates it (as a default entry) and reads
/// it; edits go through the owning collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceEntry {
    pub pref_name: String,
    pub pref_type: String,
    pub pref_branch: String,
    /// Must parse as JSON of `pref_type`; checked by the remote
    pub pref_value: String,
}

impl PreferenceEntry {
    /// Entry with every field empty
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Typed read of a snapshot entry; missing fields read as empty
    #[must_use]
    pub fn from_node(node: &Node) -> Self {
        Self {
            pref_name: text(node, keys::PREF_NAME),
            pref_type: text(node, keys::PREF_TYPE),
            pref_branch: text(node, keys::PREF_BRANCH),
            pref_value: text(node, keys::PREF_VALUE),
        }
    }

    /// Snapshot representation
    #[must_use]
    pub fn to_node(&self) -> Node {
        Node::map([
            (keys::PREF_NAME, Node::from(self.pref_name.as_str())),
            (keys::PREF_TYPE, Node::from(self.pref_type.as_str())),
            (keys::PREF_BRANCH, Node::from(self.pref_branch.as_str())),
            (keys::PREF_VALUE, Node::from(self.pref_value.as_str())),
        ])
    }

    /// Declared type, if it is one of the known values
    #[inline]
    #[must_use]
    pub fn pref_type(&self) -> Option<PrefType> {
        self.pref_type.parse().ok()
    }

    /// Declared branch, if it is one of the known values
    #[inline]
    #[must_use]
    pub fn pref_branch(&self) -> Option<PrefBranch> {
        self.pref_branch.parse().ok()
    }
}

/// Typed read of one branch entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub name: String,
    pub description: String,
    /// Share of the population; `None` if not an integer
    pub ratio: Option<i64>,
    pub is_control: bool,
    pub preferences: Vec<PreferenceEntry>,
}

impl Branch {
    /// Typed read of a snapshot entry
    #[must_use]
    pub fn from_node(node: &Node) -> Self {
        Self {
            name: text(node, keys::NAME),
            description: text(node, keys::DESCRIPTION),
            ratio: node.get(keys::RATIO).and_then(Node::as_i64),
            is_control: node
                .get(keys::IS_CONTROL)
                .and_then(Node::as_bool)
                .unwrap_or(false),
            preferences: node
                .get(keys::PREFERENCES)
                .and_then(Node::as_list)
                .map(|prefs| prefs.iter().map(PreferenceEntry::from_node).collect())
                .unwrap_or_default(),
        }
    }

    /// New empty branch entry for a collection
    ///
    /// Control status is derived from the collection only here, at
    /// creation: the first branch ever added to an empty collection is the
    /// control. Later edits and removals never reassign it.
    #[must_use]
    pub fn default_for(collection: &Vector<Node>, with_value: bool, with_preferences: bool) -> Node {
        let mut entries = vec![
            (keys::NAME, Node::from("")),
            (keys::DESCRIPTION, Node::from("")),
            (keys::RATIO, Node::from("")),
            (keys::IS_CONTROL, Node::from(collection.is_empty())),
        ];
        if with_value {
            entries.push((keys::VALUE, Node::from("")));
        }
        if with_preferences {
            entries.push((keys::PREFERENCES, Node::empty_list()));
        }
        Node::map(entries)
    }
}

//! Design Snapshot
//!
//! Immutable, structurally shared state trees with path-addressed edits.
//!
//! # Core Concepts
//!
//! - [`Node`]: JSON-shaped persistent tree built on `im` collections
//! - [`FieldPath`]: key/index path addressing one location in a tree
//! - [`CollectionEditor`]: pure add/remove/replace-at-index over lists
//! - [`ErrorMap`]: validation messages shaped like the data they describe
//! - [`FieldEdit`]: a change reported against one path
//!
//! # Example
//!
//! ```rust,ignore
//! use design_snapshot::{FieldEdit, FieldPath, Node};
//!
//! let design = Node::from(serde_json::json!({"branches": [{"name": "control"}]}));
//! let path: FieldPath = "branches[0].name".parse()?;
//! let next = FieldEdit::set(path, "baseline").apply(&design)?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod collection;
mod edit;
mod error_map;
mod node;
mod path;

pub use collection::{CollectionEditor, CollectionError};
pub use edit::{EditOperation, FieldEdit};
pub use error_map::{ErrorMap, NON_FIELD_ERRORS};
pub use node::{Node, SnapshotError};
pub use path::{FieldPath, PathError, PathSegment};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn edit_then_error_lookup() {
        let design = Node::from(json!({
            "branches": [{"name": "control"}, {"name": "treatment"}]
        }));
        let name: FieldPath = "branches[1].name".parse().unwrap();

        let next = FieldEdit::set(name.clone(), "").apply(&design).unwrap();
        let errors = ErrorMap::new()
            .with_messages(&name, ["This field may not be blank.".to_string()])
            .unwrap();

        assert_eq!(next.get_in(&name), Some(&Node::from("")));
        assert!(errors.messages_at(&name).is_some());
        assert!(errors.messages_at(&"branches[0].name".parse().unwrap()).is_none());
    }
}

//! Design Core - experiment design form engine
//!
//! Keeps an experiment design editable while it round-trips to a remote
//! store:
//! - Resolves which fields apply from the record's discriminator
//! - Renders field bindings that carry their own validation messages
//! - Applies edits as new, structurally shared snapshots
//! - Saves a snapshot on submit and maps server errors back onto fields
//!
//! # Example
//!
//! ```rust,ignore
//! use design_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example(remote: Arc<dyn DesignRemote>, nav: Arc<dyn Navigator>) -> Result<(), SyncError> {
//! let endpoint = Endpoint::new("my-experiment", "multi-pref")?;
//! let controller = SyncController::new(endpoint, FormConfig::new(), Collaborators::new(remote, nav));
//!
//! controller.mount().await?;
//! let branch = controller.add_branch()?;
//! controller.add_preference(branch)?;
//! controller.submit(Destination::NextStep).await;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod binding;
pub mod config;
pub mod error;
pub mod remote;
pub mod schema;
pub mod store;
pub mod sync;
pub mod types;

pub use binding::{
    BranchView, DesignView, FieldBinding, FieldWidgets, PreferenceEditor, PreferenceView,
};
pub use config::FormConfig;
pub use error::{ConfigError, RemoteError, StoreError, SyncError};
pub use remote::{DesignRemote, Navigator, NoopViewport, Viewport};
pub use schema::{BranchSchema, BranchSchemaResolver, DesignSchema, FieldSpec, SchemaTag, Widget};
pub use store::{DesignStateStore, RatioTotal};
pub use sync::{
    allowed_transitions, validate_transition, Collaborators, SubmitOutcome, SyncController,
    SyncState,
};
pub use types::{keys, Branch, DesignKind, Destination, Endpoint, PrefBranch, PrefType, PreferenceEntry};

pub use design_snapshot::{ErrorMap, FieldEdit, FieldPath, Node};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a design form
    pub use crate::{
        Collaborators, DesignRemote, DesignView, Destination, Endpoint, ErrorMap, FieldEdit,
        FieldPath, FormConfig, Navigator, Node, RemoteError, SubmitOutcome, SyncController,
        SyncError, SyncState, Viewport,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Collaborator interfaces
//!
//! The controller talks to the outside world only through these traits:
//! the remote design resource, page navigation, and the viewport.

use crate::error::RemoteError;
use crate::types::Endpoint;
use async_trait::async_trait;
use design_snapshot::{FieldPath, Node};

/// Remote design resource
#[async_trait]
pub trait DesignRemote: Send + Sync {
    /// Fetch the design record
    async fn load(&self, endpoint: &Endpoint) -> Result<Node, RemoteError>;

    /// Persist the full design record
    ///
    /// A rejection with field-level messages is reported as
    /// [`RemoteError::Validation`], shaped like the record.
    async fn save(&self, endpoint: &Endpoint, record: Node) -> Result<(), RemoteError>;
}

/// Page navigation
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}

/// Best-effort scrolling to a rendered field
pub trait Viewport: Send + Sync {
    fn scroll_to(&self, path: &FieldPath);
}

/// Viewport that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopViewport;

impl Viewport for NoopViewport {
    fn scroll_to(&self, _path: &FieldPath) {}
}

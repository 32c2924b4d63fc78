//! Directory-backed design store
//!
//! Layout under the root:
//!
//! ```text
//! experiments/<slug>/design-<kind>.json         record
//! experiments/<slug>/design-<kind>.errors.json  optional scripted rejection
//! ```
//!
//! When the errors file exists, every save is rejected with its contents as
//! the validation payload and the record is left untouched.

use async_trait::async_trait;
use design_core::{DesignRemote, Endpoint, RemoteError};
use design_snapshot::{ErrorMap, Node};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Design store over a directory tree
#[derive(Debug, Clone)]
pub struct FileRemote {
    root: PathBuf,
}

impl FileRemote {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn dir(&self, endpoint: &Endpoint) -> PathBuf {
        self.root.join("experiments").join(endpoint.slug())
    }

    /// File holding the record
    pub fn record_path(&self, endpoint: &Endpoint) -> PathBuf {
        self.dir(endpoint).join(format!("design-{}.json", endpoint.kind()))
    }

    /// File holding a scripted rejection
    pub fn errors_path(&self, endpoint: &Endpoint) -> PathBuf {
        self.dir(endpoint).join(format!("design-{}.errors.json", endpoint.kind()))
    }
}

async fn read_json(path: &Path) -> Result<Option<serde_json::Value>, RemoteError> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(RemoteError::Transport(format!("{}: {err}", path.display()))),
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|err| RemoteError::Malformed(format!("{}: {err}", path.display())))
}

#[async_trait]
impl DesignRemote for FileRemote {
    async fn load(&self, endpoint: &Endpoint) -> Result<Node, RemoteError> {
        let path = self.record_path(endpoint);
        debug!(path = %path.display(), "reading design");
        read_json(&path)
            .await?
            .map(Node::from)
            .ok_or_else(|| RemoteError::NotFound(endpoint.to_string()))
    }

    async fn save(&self, endpoint: &Endpoint, record: Node) -> Result<(), RemoteError> {
        if let Some(errors) = read_json(&self.errors_path(endpoint)).await? {
            return Err(RemoteError::Validation(ErrorMap::from_node(Node::from(errors))));
        }

        let path = self.record_path(endpoint);
        let body = serde_json::to_string_pretty(&record)
            .map_err(|err| RemoteError::Malformed(err.to_string()))?;
        let transport = |err: std::io::Error| RemoteError::Transport(format!("{}: {err}", path.display()));
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(transport)?;
        }
        tokio::fs::write(&path, body).await.map_err(transport)?;
        debug!(path = %path.display(), "design written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn endpoint() -> Endpoint {
        Endpoint::new("exp-1", "pref").unwrap()
    }

    async fn write(path: &Path, value: &serde_json::Value) {
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(path, value.to_string()).await.unwrap();
    }

    #[tokio::test]
    async fn layout() {
        let remote = FileRemote::new("/data");
        assert_eq!(
            remote.record_path(&endpoint()),
            PathBuf::from("/data/experiments/exp-1/design-pref.json")
        );
        assert_eq!(
            remote.errors_path(&endpoint()),
            PathBuf::from("/data/experiments/exp-1/design-pref.errors.json")
        );
    }

    #[tokio::test]
    async fn load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let remote = FileRemote::new(dir.path());
        assert!(matches!(remote.load(&endpoint()).await, Err(RemoteError::NotFound(_))));
    }

    #[tokio::test]
    async fn load_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let remote = FileRemote::new(dir.path());
        let path = remote.record_path(&endpoint());
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, "{not json").await.unwrap();
        assert!(matches!(remote.load(&endpoint()).await, Err(RemoteError::Malformed(_))));
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let remote = FileRemote::new(dir.path());
        let record = Node::from(json!({"kind": "pref", "branches": []}));

        remote.save(&endpoint(), record.clone()).await.unwrap();
        assert_eq!(remote.load(&endpoint()).await.unwrap(), record);
    }

    #[tokio::test]
    async fn errors_file_rejects_save() {
        let dir = tempfile::tempdir().unwrap();
        let remote = FileRemote::new(dir.path());
        let original = json!({"kind": "pref", "pref_key": "", "branches": []});
        write(&remote.record_path(&endpoint()), &original).await;
        write(&remote.errors_path(&endpoint()), &json!({"pref_key": "This field is required."})).await;

        let result = remote
            .save(&endpoint(), Node::from(json!({"kind": "pref", "pref_key": "x"})))
            .await;
        let Err(RemoteError::Validation(errors)) = result else {
            panic!("expected validation error, got {result:?}");
        };
        assert_eq!(
            errors.messages_at(&"pref_key".parse().unwrap()),
            Some(vec!["This field is required.".to_string()])
        );
        assert_eq!(remote.load(&endpoint()).await.unwrap(), Node::from(original));
    }
}

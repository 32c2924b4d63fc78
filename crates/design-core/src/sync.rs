//! Load/save synchronization
//!
//! [`SyncController`] drives one design form through
//! `Loading -> Ready -> (Saving -> Ready)*`. It loads the record on mount,
//! routes edits into the [`DesignStateStore`], saves a snapshot on submit,
//! and maps the outcome back onto the store before navigating away or
//! pointing the operator at the first invalid field.

use crate::binding::DesignView;
use crate::config::FormConfig;
use crate::error::{RemoteError, StoreError, SyncError};
use crate::remote::{DesignRemote, Navigator, NoopViewport, Viewport};
use crate::store::DesignStateStore;
use crate::types::{Destination, Endpoint};
use design_snapshot::{ErrorMap, FieldEdit, FieldPath, Node};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Controller lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncState {
    /// Waiting for the record; terminal if the load fails
    Loading,
    /// Editable, submit enabled
    Ready,
    /// Save in flight; edits still apply, submit is disabled
    Saving,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// States reachable from `from`
#[must_use]
pub fn allowed_transitions(from: SyncState) -> Vec<SyncState> {
    use SyncState::*;
    match from {
        Loading => vec![Ready],
        Ready => vec![Saving],
        Saving => vec![Ready],
    }
}

/// Validate a state transition
///
/// Panics instead of returning an error with the `strict-debug` feature.
///
/// # Errors
/// Returns [`SyncError::IllegalTransition`] if `to` is not reachable from `from`
pub fn validate_transition(from: SyncState, to: SyncState) -> Result<(), SyncError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        #[cfg(feature = "strict-debug")]
        panic!("Illegal sync transition attempted: {from:?} -> {to:?}");

        Err(SyncError::IllegalTransition { from, to })
    }
}

/// Result of one submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Saved; navigated to `url`
    Saved { url: String },
    /// Rejected with field-level messages
    Rejected { first_invalid: Option<FieldPath> },
    /// Save failed without a structured payload
    Failed { message: String },
    /// Not Ready or a save was already in flight; nothing happened
    Ignored,
    /// Controller was torn down while saving; outcome discarded
    Abandoned,
}

/// External collaborators of a controller
#[derive(Clone)]
pub struct Collaborators {
    pub remote: Arc<dyn DesignRemote>,
    pub navigator: Arc<dyn Navigator>,
    pub viewport: Arc<dyn Viewport>,
}

impl Collaborators {
    /// Collaborators with a viewport that does not scroll
    #[must_use]
    pub fn new(remote: Arc<dyn DesignRemote>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            remote,
            navigator,
            viewport: Arc::new(NoopViewport),
        }
    }

    /// With viewport
    #[must_use]
    pub fn with_viewport(mut self, viewport: Arc<dyn Viewport>) -> Self {
        self.viewport = viewport;
        self
    }
}

#[derive(Debug)]
struct Inner {
    state: SyncState,
    store: DesignStateStore,
    mounted: bool,
    torn_down: bool,
    submit_enabled: bool,
    load_error: Option<RemoteError>,
}

impl Inner {
    fn transition(&mut self, to: SyncState) -> Result<(), SyncError> {
        validate_transition(self.state, to)?;
        debug!(from = %self.state, to = %to, "sync transition");
        self.state = to;
        Ok(())
    }
}

struct Shared {
    endpoint: Endpoint,
    config: FormConfig,
    collaborators: Collaborators,
    inner: Mutex<Inner>,
    revision: watch::Sender<u64>,
}

impl Shared {
    fn notify(&self, revision: u64) {
        self.revision.send_replace(revision);
    }
}

/// Re-enables submission when a save settles or its future is dropped
struct SavingGuard {
    shared: Arc<Shared>,
}

impl Drop for SavingGuard {
    fn drop(&mut self) {
        let mut inner = self.shared.inner.lock();
        inner.submit_enabled = true;
        if inner.state == SyncState::Saving {
            inner.state = SyncState::Ready;
        }
    }
}

/// Handle to one design form's synchronization state
///
/// Cloning is cheap; every clone drives the same form.
#[derive(Clone)]
pub struct SyncController {
    shared: Arc<Shared>,
}

impl SyncController {
    /// Create controller for one design resource
    #[must_use]
    pub fn new(endpoint: Endpoint, config: FormConfig, collaborators: Collaborators) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                endpoint,
                config,
                collaborators,
                inner: Mutex::new(Inner {
                    state: SyncState::Loading,
                    store: DesignStateStore::new(),
                    mounted: false,
                    torn_down: false,
                    submit_enabled: false,
                    load_error: None,
                }),
                revision,
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.shared.endpoint
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &FormConfig {
        &self.shared.config
    }

    /// Load the record and enter Ready
    ///
    /// There is no retry: on failure the controller stays in Loading and
    /// keeps the error (see [`SyncController::load_error`]).
    ///
    /// # Errors
    /// - [`SyncError::AlreadyMounted`] on a second call
    /// - [`SyncError::TornDown`] if torn down before or during the load
    /// - [`SyncError::Load`] if the remote load fails
    pub async fn mount(&self) -> Result<(), SyncError> {
        let revision = {
            let mut inner = self.shared.inner.lock();
            if inner.torn_down {
                return Err(SyncError::TornDown);
            }
            if inner.mounted {
                return Err(SyncError::AlreadyMounted);
            }
            inner.mounted = true;
            inner.store.begin_load();
            inner.store.revision()
        };
        self.shared.notify(revision);

        let slug = self.shared.endpoint.slug();
        let url = self.shared.endpoint.url(&self.shared.config);
        info!(slug, %url, "loading design");
        let result = self.shared.collaborators.remote.load(&self.shared.endpoint).await;

        let mut inner = self.shared.inner.lock();
        if inner.torn_down {
            debug!(slug, "load settled after teardown");
            return Err(SyncError::TornDown);
        }
        match result {
            Ok(record) => {
                inner.store.finish_load(record);
                inner.transition(SyncState::Ready)?;
                inner.submit_enabled = true;
                let revision = inner.store.revision();
                info!(slug, kind = %inner.store.kind(), "design loaded");
                drop(inner);
                self.shared.notify(revision);
                Ok(())
            }
            Err(err) => {
                error!(slug, error = %err, "design load failed");
                inner.load_error = Some(err.clone());
                Err(SyncError::Load(err))
            }
        }
    }

    fn edit<R>(
        &self,
        f: impl FnOnce(&mut DesignStateStore) -> Result<R, StoreError>,
    ) -> Result<R, SyncError> {
        let mut inner = self.shared.inner.lock();
        if inner.torn_down {
            return Err(SyncError::TornDown);
        }
        if inner.state == SyncState::Loading {
            return Err(SyncError::NotReady(inner.state));
        }
        let out = f(&mut inner.store)?;
        let revision = inner.store.revision();
        drop(inner);
        self.shared.notify(revision);
        Ok(out)
    }

    /// Write a field value
    ///
    /// # Errors
    /// Returns [`SyncError`] before load, after teardown, or for a bad path
    pub fn set_field(&self, path: &FieldPath, value: impl Into<Node>) -> Result<(), SyncError> {
        self.edit(|store| store.set_field(path, value))
    }

    /// Write an error subtree
    ///
    /// # Errors
    /// Returns [`SyncError`] before load, after teardown, or for a bad path
    pub fn set_error(&self, path: &FieldPath, value: impl Into<Node>) -> Result<(), SyncError> {
        self.edit(|store| store.set_error(path, value))
    }

    /// Apply an edit reported by a rendered view
    ///
    /// # Errors
    /// Returns [`SyncError`] before load, after teardown, or if the edit does
    /// not fit the snapshot
    pub fn apply(&self, edit: &FieldEdit) -> Result<(), SyncError> {
        self.edit(|store| store.apply(edit))
    }

    /// Append a default branch; returns its index
    ///
    /// # Errors
    /// Returns [`SyncError`] before load or after teardown
    pub fn add_branch(&self) -> Result<usize, SyncError> {
        self.edit(DesignStateStore::add_branch)
    }

    /// Remove a branch and its errors
    ///
    /// # Errors
    /// Returns [`SyncError`] before load, after teardown, or for a bad index
    pub fn remove_branch(&self, index: usize) -> Result<(), SyncError> {
        self.edit(|store| store.remove_branch(index))
    }

    /// Append an empty preference to a branch; returns its index
    ///
    /// # Errors
    /// Returns [`SyncError`] before load, after teardown, for a bad branch,
    /// or for a design kind without preference collections
    pub fn add_preference(&self, branch: usize) -> Result<usize, SyncError> {
        self.edit(|store| store.add_preference(branch))
    }

    /// Remove a preference of a branch and its errors
    ///
    /// # Errors
    /// Returns [`SyncError`] before load, after teardown, or for a bad index
    pub fn remove_preference(&self, branch: usize, index: usize) -> Result<(), SyncError> {
        self.edit(|store| store.remove_preference(branch, index))
    }

    /// Save the current snapshot, then navigate or surface errors
    ///
    /// The payload is the snapshot at the moment Saving is entered; edits
    /// made while the save is in flight stay local. A submit while not
    /// Ready is a no-op.
    pub async fn submit(&self, destination: Destination) -> SubmitOutcome {
        let slug = self.shared.endpoint.slug();
        let payload = {
            let mut inner = self.shared.inner.lock();
            if inner.torn_down || inner.state != SyncState::Ready || !inner.submit_enabled {
                warn!(slug, state = %inner.state, "submit ignored");
                return SubmitOutcome::Ignored;
            }
            if inner.transition(SyncState::Saving).is_err() {
                return SubmitOutcome::Ignored;
            }
            inner.submit_enabled = false;
            inner.store.data().clone()
        };
        let _guard = SavingGuard {
            shared: Arc::clone(&self.shared),
        };

        info!(slug, url = %self.shared.endpoint.url(&self.shared.config), ?destination, "saving design");
        let result = self
            .shared
            .collaborators
            .remote
            .save(&self.shared.endpoint, payload)
            .await;

        let mut inner = self.shared.inner.lock();
        if inner.torn_down {
            debug!(slug, "save settled after teardown");
            return SubmitOutcome::Abandoned;
        }

        match result {
            Ok(()) => {
                inner.store.clear_errors();
                let _ = inner.transition(SyncState::Ready);
                inner.submit_enabled = true;
                let revision = inner.store.revision();
                drop(inner);

                let url = destination.url(slug, &self.shared.config);
                info!(slug, %url, "design saved");
                self.shared.notify(revision);
                self.shared.collaborators.navigator.navigate(&url);
                SubmitOutcome::Saved { url }
            }
            Err(err) => {
                let outcome_message = (!err.is_validation()).then(|| err.to_string());
                match &outcome_message {
                    None => warn!(slug, error = %err, "design rejected"),
                    Some(message) => error!(slug, error = %message, "design save failed"),
                }
                inner.store.replace_errors(err.into_error_map());
                let _ = inner.transition(SyncState::Ready);
                inner.submit_enabled = true;
                let revision = inner.store.revision();
                let first_invalid = inner.store.view().first_invalid().map(|b| b.path().clone());
                drop(inner);

                self.shared.notify(revision);
                if let Some(path) = &first_invalid {
                    self.shared.collaborators.viewport.scroll_to(path);
                }
                match outcome_message {
                    None => SubmitOutcome::Rejected { first_invalid },
                    Some(message) => SubmitOutcome::Failed { message },
                }
            }
        }
    }

    /// Leave the form without saving; returns the overview URL
    ///
    /// # Errors
    /// Returns [`SyncError::TornDown`] after teardown
    pub fn cancel(&self) -> Result<String, SyncError> {
        if self.shared.inner.lock().torn_down {
            return Err(SyncError::TornDown);
        }
        let url = Destination::Overview.url(self.shared.endpoint.slug(), &self.shared.config);
        info!(slug = self.shared.endpoint.slug(), %url, "edit cancelled");
        self.shared.collaborators.navigator.navigate(&url);
        Ok(url)
    }

    /// Unmount: later continuations leave the store and collaborators alone
    pub fn teardown(&self) {
        self.shared.inner.lock().torn_down = true;
        debug!(slug = self.shared.endpoint.slug(), "controller torn down");
    }

    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.shared.inner.lock().torn_down
    }

    #[must_use]
    pub fn state(&self) -> SyncState {
        self.shared.inner.lock().state
    }

    /// Whether the submit triggers are enabled
    #[must_use]
    pub fn submit_enabled(&self) -> bool {
        self.shared.inner.lock().submit_enabled
    }

    /// Current design snapshot
    #[must_use]
    pub fn data(&self) -> Node {
        self.shared.inner.lock().store.data().clone()
    }

    /// Current error snapshot
    #[must_use]
    pub fn errors(&self) -> ErrorMap {
        self.shared.inner.lock().store.errors().clone()
    }

    /// Rendered form for the current snapshots
    #[must_use]
    pub fn view(&self) -> DesignView {
        self.shared.inner.lock().store.view()
    }

    /// Copy of the store
    #[must_use]
    pub fn store(&self) -> DesignStateStore {
        self.shared.inner.lock().store.clone()
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.shared.inner.lock().store.revision()
    }

    /// Re-render signal: yields the store revision after every change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    /// Error of a failed load
    #[must_use]
    pub fn load_error(&self) -> Option<RemoteError> {
        self.shared.inner.lock().load_error.clone()
    }
}

impl fmt::Debug for SyncController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("SyncController")
            .field("endpoint", &self.shared.endpoint)
            .field("state", &inner.state)
            .field("submit_enabled", &inner.submit_enabled)
            .field("revision", &inner.store.revision())
            .finish()
    }
}

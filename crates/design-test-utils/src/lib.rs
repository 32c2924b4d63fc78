//! Testing utilities for the design form workspace
//!
//! Shared fixtures and scripted collaborators.

#![allow(missing_docs)]

use async_trait::async_trait;
use design_core::{
    Collaborators, DesignRemote, Endpoint, FormConfig, Navigator, RemoteError, SyncController,
    Viewport,
};
use design_snapshot::{ErrorMap, FieldPath, Node};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};

pub fn pref_design() -> Node {
    Node::from(json!({
        "kind": "pref",
        "pref_key": "browser.example.enabled",
        "pref_type": "boolean",
        "pref_branch": "default",
        "branches": [
            {"name": "control", "description": "Off", "ratio": 50, "is_control": true, "value": "false"},
            {"name": "treatment", "description": "On", "ratio": 50, "is_control": false, "value": "true"}
        ]
    }))
}

pub fn multi_pref_design() -> Node {
    Node::from(json!({
        "kind": "multi-pref",
        "branches": [
            {"name": "control", "description": "", "ratio": 50, "is_control": true, "preferences": [
                {"pref_name": "browser.a", "pref_type": "integer", "pref_branch": "default", "pref_value": "1"}
            ]},
            {"name": "treatment", "description": "", "ratio": 50, "is_control": false, "preferences": [
                {"pref_name": "browser.a", "pref_type": "integer", "pref_branch": "default", "pref_value": "2"}
            ]}
        ]
    }))
}

/// Multi-preference design with one branch and no preferences
pub fn empty_multi_pref_design() -> Node {
    Node::from(json!({
        "kind": "multi-pref",
        "branches": [
            {"name": "control", "description": "", "ratio": 100, "is_control": true, "preferences": []}
        ]
    }))
}

pub fn addon_design() -> Node {
    Node::from(json!({
        "kind": "addon",
        "addon_experiment_id": "addon-study",
        "addon_release_url": "https://example.org/addon.xpi",
        "branches": [
            {"name": "control", "description": "", "ratio": 50, "is_control": true},
            {"name": "treatment", "description": "", "ratio": 50, "is_control": false}
        ]
    }))
}

pub fn generic_design() -> Node {
    Node::from(json!({
        "kind": "generic",
        "design": "Free-form description",
        "branches": [
            {"name": "control", "description": "", "ratio": 100, "is_control": true}
        ]
    }))
}

/// Server rejection of the second branch's name and first preference value
pub fn branch_validation_errors() -> ErrorMap {
    ErrorMap::from_node(Node::from(json!({
        "branches": [
            {},
            {"name": ["Branch names must be unique."], "preferences": [{"pref_value": ["Invalid JSON."]}]}
        ]
    })))
}

pub fn test_endpoint(kind: &str) -> Endpoint {
    Endpoint::new("test-experiment", kind).unwrap()
}

/// Remote with a fixed load result and a queue of save results
///
/// Saves default to success once the queue is empty. Loads and saves can be
/// gated so a test observes the in-flight state.
pub struct ScriptedRemote {
    load_result: Result<Node, RemoteError>,
    save_results: Mutex<VecDeque<Result<(), RemoteError>>>,
    saved: Mutex<Vec<Node>>,
    loads: Mutex<usize>,
    load_gate: Option<Semaphore>,
    save_gate: Option<Semaphore>,
    save_started: Notify,
}

impl ScriptedRemote {
    pub fn new(record: Node) -> Self {
        Self::with_load_result(Ok(record))
    }

    pub fn failing_load(error: RemoteError) -> Self {
        Self::with_load_result(Err(error))
    }

    fn with_load_result(load_result: Result<Node, RemoteError>) -> Self {
        Self {
            load_result,
            save_results: Mutex::new(VecDeque::new()),
            saved: Mutex::new(Vec::new()),
            loads: Mutex::new(0),
            load_gate: None,
            save_gate: None,
            save_started: Notify::new(),
        }
    }

    /// Queue the result of the next save
    pub fn with_save_result(self, result: Result<(), RemoteError>) -> Self {
        self.save_results.lock().push_back(result);
        self
    }

    /// Saves block until [`ScriptedRemote::release_save`]
    pub fn gate_saves(mut self) -> Self {
        self.save_gate = Some(Semaphore::new(0));
        self
    }

    /// Loads block until [`ScriptedRemote::release_load`]
    pub fn gate_loads(mut self) -> Self {
        self.load_gate = Some(Semaphore::new(0));
        self
    }

    pub fn release_save(&self) {
        if let Some(gate) = &self.save_gate {
            gate.add_permits(1);
        }
    }

    pub fn release_load(&self) {
        if let Some(gate) = &self.load_gate {
            gate.add_permits(1);
        }
    }

    /// Wait until a save has been received
    pub async fn wait_for_save(&self) {
        self.save_started.notified().await;
    }

    /// Every payload received by `save`, in order
    pub fn saved_payloads(&self) -> Vec<Node> {
        self.saved.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saved.lock().len()
    }

    pub fn load_count(&self) -> usize {
        *self.loads.lock()
    }
}

async fn pass(gate: Option<&Semaphore>) {
    if let Some(gate) = gate {
        gate.acquire().await.unwrap().forget();
    }
}

#[async_trait]
impl DesignRemote for ScriptedRemote {
    async fn load(&self, _endpoint: &Endpoint) -> Result<Node, RemoteError> {
        *self.loads.lock() += 1;
        pass(self.load_gate.as_ref()).await;
        self.load_result.clone()
    }

    async fn save(&self, _endpoint: &Endpoint, record: Node) -> Result<(), RemoteError> {
        self.saved.lock().push(record);
        self.save_started.notify_one();
        pass(self.save_gate.as_ref()).await;
        let result = self.save_results.lock().pop_front();
        result.unwrap_or(Ok(()))
    }
}

/// Navigator that records every URL
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    urls: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str) {
        self.urls.lock().push(url.to_string());
    }
}

/// Viewport that records every scroll target
#[derive(Debug, Default)]
pub struct RecordingViewport {
    targets: Mutex<Vec<FieldPath>>,
}

impl RecordingViewport {
    pub fn targets(&self) -> Vec<FieldPath> {
        self.targets.lock().clone()
    }
}

impl Viewport for RecordingViewport {
    fn scroll_to(&self, path: &FieldPath) {
        self.targets.lock().push(path.clone());
    }
}

/// Controller over a scripted remote with recording collaborators
pub struct Harness {
    pub controller: SyncController,
    pub remote: Arc<ScriptedRemote>,
    pub navigator: Arc<RecordingNavigator>,
    pub viewport: Arc<RecordingViewport>,
}

pub fn harness(kind: &str, remote: ScriptedRemote) -> Harness {
    let remote = Arc::new(remote);
    let navigator = Arc::new(RecordingNavigator::default());
    let viewport = Arc::new(RecordingViewport::default());
    let collaborators = Collaborators::new(remote.clone(), navigator.clone())
        .with_viewport(viewport.clone());
    Harness {
        controller: SyncController::new(test_endpoint(kind), FormConfig::new(), collaborators),
        remote,
        navigator,
        viewport,
    }
}

/// Harness already mounted on `record`
pub async fn mounted(kind: &str, record: Node) -> Harness {
    let harness = harness(kind, ScriptedRemote::new(record));
    harness.controller.mount().await.unwrap();
    harness
}

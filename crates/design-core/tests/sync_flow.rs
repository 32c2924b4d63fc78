use design_core::prelude::*;
use design_core::{BranchSchema, DesignSchema, StoreError};
use design_test_utils::{
    branch_validation_errors, empty_multi_pref_design, harness, mounted, multi_pref_design,
    pref_design, test_endpoint, ScriptedRemote,
};
use mockall::mock;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn path(s: &str) -> FieldPath {
    s.parse().unwrap()
}

const OVERVIEW: &str = "/experiments/test-experiment/";
const NEXT_STEP: &str = "/experiments/test-experiment/edit-objectives/";

mock! {
    Nav {}
    impl Navigator for Nav {
        fn navigate(&self, url: &str);
    }
}

#[tokio::test]
async fn mount_loads_record() {
    let h = harness("pref", ScriptedRemote::new(pref_design()));
    assert_eq!(h.controller.state(), SyncState::Loading);
    assert!(!h.controller.submit_enabled());

    h.controller.mount().await.unwrap();
    assert_eq!(h.controller.state(), SyncState::Ready);
    assert!(h.controller.submit_enabled());
    assert_eq!(h.controller.data(), pref_design());
    assert!(h.controller.errors().is_empty());
    assert_eq!(h.remote.load_count(), 1);
}

#[tokio::test]
async fn second_mount_is_rejected() {
    let h = mounted("pref", pref_design()).await;
    assert!(matches!(h.controller.mount().await, Err(SyncError::AlreadyMounted)));
    assert_eq!(h.remote.load_count(), 1);
}

#[tokio::test]
async fn kind_is_fixed_after_load() {
    let h = mounted("pref", pref_design()).await;
    let revision = h.controller.revision();

    assert!(matches!(
        h.controller.set_field(&FieldPath::key("kind"), "addon"),
        Err(SyncError::Store(StoreError::ReadOnly(_)))
    ));
    assert!(matches!(
        h.controller.set_field(&FieldPath::root(), Node::from(serde_json::json!({"branches": []}))),
        Err(SyncError::Store(StoreError::ReadOnly(_)))
    ));
    assert!(matches!(
        h.controller.apply(&FieldEdit::set(FieldPath::key("kind"), "generic")),
        Err(SyncError::Store(StoreError::ReadOnly(_)))
    ));

    assert_eq!(h.controller.data(), pref_design());
    assert_eq!(h.controller.view().schema.design, DesignSchema::SinglePreference);
    assert_eq!(h.controller.revision(), revision);
}

#[tokio::test]
async fn failed_load_stays_loading() {
    let h = harness("pref", ScriptedRemote::failing_load(RemoteError::NotFound("test-experiment".into())));
    assert!(matches!(h.controller.mount().await, Err(SyncError::Load(RemoteError::NotFound(_)))));

    assert_eq!(h.controller.state(), SyncState::Loading);
    assert!(matches!(h.controller.load_error(), Some(RemoteError::NotFound(_))));
    assert!(matches!(
        h.controller.set_field(&path("pref_key"), "x"),
        Err(SyncError::NotReady(SyncState::Loading))
    ));
    assert_eq!(h.controller.submit(Destination::Overview).await, SubmitOutcome::Ignored);
    assert_eq!(h.remote.save_count(), 0);
}

#[tokio::test]
async fn save_payload_is_snapshot_at_submit() {
    let h = harness("multi-pref", ScriptedRemote::new(multi_pref_design()).gate_saves());
    h.controller.mount().await.unwrap();

    let controller = h.controller.clone();
    let save = tokio::spawn(async move { controller.submit(Destination::Overview).await });
    h.remote.wait_for_save().await;

    assert_eq!(h.controller.state(), SyncState::Saving);
    assert!(!h.controller.submit_enabled());

    // edits while saving are visible but not sent
    h.controller.set_field(&path("branches[0].name"), "edited during save").unwrap();
    assert_eq!(
        h.controller.data().get_in(&path("branches[0].name")),
        Some(&Node::from("edited during save"))
    );

    h.remote.release_save();
    let outcome = save.await.unwrap();
    assert_eq!(outcome, SubmitOutcome::Saved { url: OVERVIEW.to_string() });
    assert_eq!(h.remote.saved_payloads(), vec![multi_pref_design()]);
    assert_eq!(
        h.controller.data().get_in(&path("branches[0].name")),
        Some(&Node::from("edited during save"))
    );
    assert_eq!(h.navigator.urls(), vec![OVERVIEW.to_string()]);
}

#[tokio::test]
async fn second_submit_while_saving_is_ignored() {
    let h = harness("pref", ScriptedRemote::new(pref_design()).gate_saves());
    h.controller.mount().await.unwrap();

    let controller = h.controller.clone();
    let first = tokio::spawn(async move { controller.submit(Destination::NextStep).await });
    h.remote.wait_for_save().await;

    assert_eq!(h.controller.submit(Destination::NextStep).await, SubmitOutcome::Ignored);
    assert_eq!(h.remote.save_count(), 1);

    h.remote.release_save();
    assert_eq!(first.await.unwrap(), SubmitOutcome::Saved { url: NEXT_STEP.to_string() });
    assert_eq!(h.remote.save_count(), 1);
    assert_eq!(h.navigator.urls().len(), 1);
}

#[tokio::test]
async fn validation_failure_maps_errors_onto_fields() {
    let remote = ScriptedRemote::new(multi_pref_design())
        .with_save_result(Err(RemoteError::Validation(branch_validation_errors())));
    let h = harness("multi-pref", remote);
    h.controller.mount().await.unwrap();
    let before = h.controller.data();

    let outcome = h.controller.submit(Destination::NextStep).await;
    assert_eq!(
        outcome,
        SubmitOutcome::Rejected { first_invalid: Some(path("branches[1].name")) }
    );

    assert_eq!(h.controller.data(), before);
    assert_eq!(h.controller.errors(), branch_validation_errors());
    assert_eq!(h.controller.state(), SyncState::Ready);
    assert!(h.controller.submit_enabled());
    assert!(h.navigator.urls().is_empty());
    assert_eq!(h.viewport.targets(), vec![path("branches[1].name")]);

    let view = h.controller.view();
    let pref_value = view
        .binding(&path("branches[1].preferences[0].pref_value"))
        .unwrap();
    assert_eq!(pref_value.error(), Some(&["Invalid JSON.".to_string()][..]));
    assert!(!view.binding(&path("branches[0].name")).unwrap().is_invalid());
}

#[tokio::test]
async fn success_after_failure_clears_errors_and_navigates_once() {
    let remote = ScriptedRemote::new(multi_pref_design())
        .with_save_result(Err(RemoteError::Validation(branch_validation_errors())));
    let h = harness("multi-pref", remote);
    h.controller.mount().await.unwrap();

    h.controller.submit(Destination::NextStep).await;
    h.controller.set_field(&path("branches[1].name"), "unique").unwrap();
    let outcome = h.controller.submit(Destination::NextStep).await;

    assert_eq!(outcome, SubmitOutcome::Saved { url: NEXT_STEP.to_string() });
    assert!(h.controller.errors().is_empty());
    assert_eq!(h.navigator.urls(), vec![NEXT_STEP.to_string()]);
    assert_eq!(h.remote.save_count(), 2);
}

#[tokio::test]
async fn navigates_exactly_once_on_success() {
    let mut nav = MockNav::new();
    nav.expect_navigate()
        .withf(|url| url == NEXT_STEP)
        .times(1)
        .return_const(());

    let remote = Arc::new(ScriptedRemote::new(pref_design()));
    let controller = SyncController::new(
        test_endpoint("pref"),
        FormConfig::new(),
        Collaborators::new(remote.clone(), Arc::new(nav)),
    );
    controller.mount().await.unwrap();
    controller.submit(Destination::NextStep).await;
    assert_eq!(remote.save_count(), 1);
}

#[tokio::test]
async fn transport_failure_becomes_non_field_error() {
    let remote = ScriptedRemote::new(pref_design())
        .with_save_result(Err(RemoteError::Transport("connection reset".into())));
    let h = harness("pref", remote);
    h.controller.mount().await.unwrap();

    let outcome = h.controller.submit(Destination::Overview).await;
    assert_eq!(
        outcome,
        SubmitOutcome::Failed { message: "transport error: connection reset".to_string() }
    );
    let view = h.controller.view();
    assert_eq!(
        view.non_field_errors,
        Some(vec!["transport error: connection reset".to_string()])
    );
    assert!(view.first_invalid().is_none());
    assert!(h.viewport.targets().is_empty());
    assert!(h.navigator.urls().is_empty());
    assert_eq!(h.controller.data(), pref_design());
}

#[tokio::test]
async fn multi_pref_editor_starts_empty_and_appends_default_entry() {
    let h = mounted("multi-pref", empty_multi_pref_design()).await;

    let view = h.controller.view();
    assert_eq!(view.schema.design, DesignSchema::MultiPreference);
    assert_eq!(view.schema.branch, BranchSchema::MultiPreference);
    let editor = view.branches[0].preferences.as_ref().unwrap();
    assert!(editor.is_empty());

    assert_eq!(h.controller.add_preference(0).unwrap(), 0);

    let view = h.controller.view();
    let editor = view.branches[0].preferences.as_ref().unwrap();
    assert_eq!(editor.len(), 1);
    let texts: Vec<String> = editor.entries[0].fields.iter().map(|f| f.text()).collect();
    assert_eq!(texts, vec!["", "", "", ""]);
    let labels: Vec<&str> = editor.entries[0].fields.iter().map(|f| f.label()).collect();
    assert_eq!(labels, vec!["Pref Name", "Pref Type", "Pref Branch", "Pref Value"]);
}

#[tokio::test]
async fn removing_branch_keeps_errors_aligned() {
    let remote = ScriptedRemote::new(multi_pref_design())
        .with_save_result(Err(RemoteError::Validation(branch_validation_errors())));
    let h = harness("multi-pref", remote);
    h.controller.mount().await.unwrap();
    h.controller.submit(Destination::Overview).await;

    h.controller.remove_branch(0).unwrap();
    let view = h.controller.view();
    assert_eq!(view.branches.len(), 1);
    assert_eq!(
        view.first_invalid().map(|b| b.path().clone()),
        Some(path("branches[0].name"))
    );
    assert_eq!(view.branches[0].fields[1].text(), "treatment");
}

#[tokio::test]
async fn view_edits_flow_back_through_apply() {
    let h = mounted("pref", pref_design()).await;
    let view = h.controller.view();
    let edit = view.binding(&path("pref_key")).unwrap().change("browser.other");

    h.controller.apply(&edit).unwrap();
    assert_eq!(
        h.controller.data().get_in(&path("pref_key")),
        Some(&Node::from("browser.other"))
    );
}

#[tokio::test]
async fn edits_signal_rerender() {
    let h = mounted("pref", pref_design()).await;
    let mut revisions = h.controller.subscribe();
    revisions.borrow_and_update();

    h.controller.add_branch().unwrap();
    assert!(revisions.has_changed().unwrap());
    assert_eq!(*revisions.borrow_and_update(), h.controller.revision());
}

#[tokio::test]
async fn teardown_during_save_discards_outcome() {
    let remote = ScriptedRemote::new(pref_design())
        .gate_saves()
        .with_save_result(Err(RemoteError::Validation(branch_validation_errors())));
    let h = harness("pref", remote);
    h.controller.mount().await.unwrap();

    let controller = h.controller.clone();
    let save = tokio::spawn(async move { controller.submit(Destination::Overview).await });
    h.remote.wait_for_save().await;

    h.controller.teardown();
    h.remote.release_save();

    assert_eq!(save.await.unwrap(), SubmitOutcome::Abandoned);
    assert!(h.controller.errors().is_empty());
    assert!(h.navigator.urls().is_empty());
    assert!(h.viewport.targets().is_empty());
    assert!(matches!(h.controller.add_branch(), Err(SyncError::TornDown)));
}

#[tokio::test]
async fn teardown_during_load_leaves_store_empty() {
    let h = harness("pref", ScriptedRemote::new(pref_design()).gate_loads());
    let controller = h.controller.clone();
    let mount = tokio::spawn(async move { controller.mount().await });
    tokio::task::yield_now().await;

    h.controller.teardown();
    h.remote.release_load();

    assert!(matches!(mount.await.unwrap(), Err(SyncError::TornDown)));
    assert_eq!(h.controller.state(), SyncState::Loading);
    assert_eq!(h.controller.data(), Node::empty_map());
}

#[tokio::test]
async fn dropped_save_reenables_submission() {
    let h = harness("pref", ScriptedRemote::new(pref_design()).gate_saves());
    h.controller.mount().await.unwrap();

    let controller = h.controller.clone();
    let save = tokio::spawn(async move { controller.submit(Destination::Overview).await });
    h.remote.wait_for_save().await;
    assert!(!h.controller.submit_enabled());

    save.abort();
    assert!(save.await.unwrap_err().is_cancelled());
    assert!(h.controller.submit_enabled());
    assert_eq!(h.controller.state(), SyncState::Ready);
}

#[tokio::test]
async fn cancel_navigates_without_saving() {
    let h = mounted("pref", pref_design()).await;
    assert_eq!(h.controller.cancel().unwrap(), OVERVIEW);
    assert_eq!(h.navigator.urls(), vec![OVERVIEW.to_string()]);
    assert_eq!(h.remote.save_count(), 0);
}

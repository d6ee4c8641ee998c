use httpmock::prelude::*;
use outreach_engine::adapters::{ApiClient, HttpDraftStore, InMemoryDraftStore};
use outreach_engine::core::draft::{recover, DraftSnapshot, DraftState, ProspectOrigin};
use outreach_engine::core::sequence::{FollowUpField, SequenceEditor, SequenceFields, SequencePolicy};
use outreach_engine::domain::model::ChannelType;
use outreach_engine::domain::ports::DraftStore;
use outreach_engine::DraftManager;
use serde_json::json;
use std::time::Duration;

fn snapshot(fields: SequenceFields, prospects: &[&str]) -> DraftSnapshot {
    DraftSnapshot {
        name: "Q3 founders".to_string(),
        campaign_type: ChannelType::Messenger,
        sequence: fields,
        prospect_ids: prospects.iter().map(|p| p.to_string()).collect(),
        current_step: 3,
    }
}

#[tokio::test(start_paused = true)]
async fn test_autosave_then_recover_then_discard() {
    let store = InMemoryDraftStore::default();
    let manager = DraftManager::new(store.clone(), "ws-1").with_debounce(Duration::from_millis(500));

    let mut editor = SequenceEditor::new(SequenceFields::with_lead("Hi {first_name}"), SequencePolicy::default());
    editor.add_step();
    editor.set_text(1, "Just bumping this");

    manager.edit(snapshot(editor.fields().clone(), &["p1", "p2"]));
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(store.save_count(), 0);
    manager.flush().await;

    assert_eq!(store.save_count(), 1);
    assert_eq!(manager.state().await, DraftState::Saved);
    let draft_id = manager.draft_id().await.unwrap();

    // A new session picks the draft back up.
    let stored = store.load("ws-1", &draft_id).await.unwrap().unwrap();
    let session = recover(stored, None);
    assert_eq!(session.prospect_ids, vec!["p1", "p2"]);
    assert_eq!(session.prospect_origin, ProspectOrigin::Draft);
    assert_eq!(session.current_step, 3);
    let selection = session.selection.unwrap();
    assert!(selection.is_explicit());
    assert_eq!(selection.current(), ChannelType::Messenger);

    let resumed = DraftManager::resume(store.clone(), "ws-1", session.draft_id.clone());
    let mut editor = SequenceEditor::new(session.sequence, SequencePolicy::default());
    assert_eq!(editor.len(), 2);
    editor.remove_step(0);
    assert_eq!(editor.fields().lead, "Just bumping this");

    let id = resumed
        .force_save(snapshot(editor.into_fields(), &["p1"]))
        .await
        .unwrap();
    assert_eq!(id, draft_id);
    assert_eq!(store.live_drafts("ws-1").await, 1);

    resumed.discard().await.unwrap();
    assert_eq!(store.live_drafts("ws-1").await, 0);
    assert!(store.load("ws-1", &draft_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_remote_draft_with_legacy_prospects() {
    let server = MockServer::start();
    let load_mock = server.mock(|when, then| {
        when.method(GET).path("/workspaces/ws-1/drafts/d-7");
        then.status(200).json_body(json!({
            "id": "d-7",
            "workspace_id": "ws-1",
            "name": "Spring push",
            "sequence": {
                "lead": "Hello",
                "follow_ups": [{ "text": "Ping", "delay": "3-5 days" }]
            },
            "legacyProspectIds": ["p9", "p10"],
            "saved_at": "2026-10-01T08:30:00Z"
        }));
    });
    let missing_mock = server.mock(|when, then| {
        when.method(GET).path("/workspaces/ws-1/drafts/gone");
        then.status(404);
    });

    let store = HttpDraftStore::new(ApiClient::new(server.base_url(), Some("secret".to_string()), 5));

    let stored = store.load("ws-1", "d-7").await.unwrap().unwrap();
    load_mock.assert();
    assert!(store.load("ws-1", "gone").await.unwrap().is_none());
    missing_mock.assert();

    let session = recover(stored, Some(Vec::new()));
    assert_eq!(session.prospect_ids, vec!["p9", "p10"]);
    assert_eq!(session.prospect_origin, ProspectOrigin::Legacy);
    // No stored type: the builder falls back to its own default.
    assert!(session.selection.is_none());
    assert_eq!(
        session.sequence.follow_ups,
        vec![FollowUpField::new("Ping", "3-5 days")]
    );
}

#[tokio::test]
async fn test_remote_save_reuses_returned_id() {
    let server = MockServer::start();
    let create_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/workspaces/ws-1/drafts")
            .json_body_partial(r#"{ "name": "Q3 founders", "prospect_ids": ["p1"] }"#);
        then.status(200).json_body(json!({ "id": "d-1" }));
    });

    let store = HttpDraftStore::new(ApiClient::new(server.base_url(), None, 5));
    let manager = DraftManager::new(store, "ws-1");

    let first = manager
        .force_save(snapshot(SequenceFields::with_lead("Hi"), &["p1"]))
        .await
        .unwrap();
    let second = manager
        .force_save(snapshot(SequenceFields::with_lead("Hi again"), &["p1"]))
        .await
        .unwrap();

    assert_eq!(first, "d-1");
    assert_eq!(second, "d-1");
    create_mock.assert_hits(2);
}

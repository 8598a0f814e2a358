//! PR-mode mutation branches, browse-time overlay, and the self-cancelling
//! mutation cleanup that deletes a branch (and closes its PR) once its
//! status converges back to main's.

use std::sync::Arc;

use wasteland_core::board::BrowseFilter;
use wasteland_core::client::{BrowseView, WastelandClient};
use wasteland_core::lifecycle::WorkflowMode;
use wasteland_core::model::WantedStatus;

use crate::fake_db::FakeDb;
use crate::fake_provider::FakeProvider;

fn seed_open_item(db: &FakeDb, id: &str, posted_by: &str) {
    db.seed_wanted(&[
        ("id", id),
        ("title", "Fix the thing"),
        ("description", "it is broken"),
        ("project", "core"),
        ("type", "bug"),
        ("priority", "1"),
        ("tags", "[]"),
        ("posted_by", posted_by),
        ("claimed_by", ""),
        ("status", "open"),
        ("effort_level", "medium"),
        ("sandbox_required", "0"),
        ("created_at", "2026-01-01T00:00:00Z"),
        ("updated_at", "2026-01-01T00:00:00Z"),
    ]);
}

#[tokio::test]
async fn pr_mode_claim_runs_on_a_branch_and_overlays_onto_browse_and_detail() {
    let db = Arc::new(FakeDb::new());
    seed_open_item(&db, "w-abc", "bob");
    let provider = Arc::new(FakeProvider::new());
    let alice = WastelandClient::new(db, provider, WorkflowMode::Pr, "alice", false);

    let result = alice.claim("w-abc").await.unwrap();
    assert_eq!(result.branch, "wl/alice/w-abc");
    assert!(!result.branch_equals_main);

    let open_view = alice
        .browse(BrowseFilter { status: Some(WantedStatus::Open), ..Default::default() }, BrowseView::Mine)
        .await
        .unwrap();
    assert!(open_view.items.iter().all(|i| i.id != "w-abc"));

    let claimed_view = alice
        .browse(BrowseFilter { status: Some(WantedStatus::Claimed), ..Default::default() }, BrowseView::Mine)
        .await
        .unwrap();
    assert!(claimed_view.items.iter().any(|i| i.id == "w-abc"));

    let detail = alice.detail("w-abc").await.unwrap();
    let item = detail.item.unwrap();
    assert_eq!(item.status, WantedStatus::Claimed);
    assert_eq!(detail.main_status, "open");
    assert_eq!(detail.branch, "wl/alice/w-abc");
    assert_eq!(detail.delta.as_deref(), Some("claim"));
}

#[tokio::test]
async fn claim_then_unclaim_converges_to_main_and_deletes_the_branch() {
    let db = Arc::new(FakeDb::new());
    seed_open_item(&db, "w-abc", "bob");
    let provider = Arc::new(FakeProvider::new());
    let alice = WastelandClient::new(db, provider, WorkflowMode::Pr, "alice", false);

    alice.claim("w-abc").await.unwrap();
    let result = alice.unclaim("w-abc").await.unwrap();
    assert!(result.branch_equals_main);

    let detail = alice.detail("w-abc").await.unwrap();
    assert_eq!(detail.branch, "");
    assert_eq!(detail.main_status, "");
    assert_eq!(detail.item.unwrap().status, WantedStatus::Open);
}

#[tokio::test]
async fn self_cancelling_mutation_closes_any_open_pr() {
    let db = Arc::new(FakeDb::new());
    seed_open_item(&db, "w-abc", "bob");
    let provider = Arc::new(FakeProvider::new());
    let alice = WastelandClient::new(db, provider.clone(), WorkflowMode::Pr, "alice", false);

    alice.claim("w-abc").await.unwrap();
    alice.submit_pr("wl/alice/w-abc").await.unwrap();
    assert_eq!(provider.open_prs().len(), 1);

    alice.unclaim("w-abc").await.unwrap();
    assert!(provider.open_prs().is_empty());
}

//! Wild-west mode lifecycle scenarios: claim, the done+accept flow, and
//! nothing-to-commit semantics on a predicate-guarded write that matches no
//! rows.

use std::sync::Arc;

use wasteland_core::client::WastelandClient;
use wasteland_core::lifecycle::WorkflowMode;
use wasteland_core::model::{Severity, WantedStatus};
use wasteland_core::WastelandError;

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

fn client(db: Arc<FakeDb>, rig: &str) -> WastelandClient {
    WastelandClient::new(db, Arc::new(FakeProvider::new()), WorkflowMode::WildWest, rig, false)
}

#[tokio::test]
async fn claiming_an_open_item_assigns_the_claimer_and_flips_status() {
    let db = Arc::new(FakeDb::new());
    seed_open_item(&db, "w-abc", "bob");
    let alice = client(db, "alice");

    let result = alice.claim("w-abc").await.unwrap();
    let item = result.detail.item.unwrap();
    assert_eq!(item.status, WantedStatus::Claimed);
    assert_eq!(item.claimed_by, "alice");
}

#[tokio::test]
async fn claiming_an_already_claimed_item_reports_nothing_to_commit() {
    let db = Arc::new(FakeDb::new());
    seed_open_item(&db, "w-abc", "bob");
    let alice = client(db, "alice");

    alice.claim("w-abc").await.unwrap();
    let err = alice.claim("w-abc").await.unwrap_err();
    assert!(matches!(err, WastelandError::NothingToCommit(_)));
}

#[tokio::test]
async fn done_then_accept_completes_the_item_and_stamps_the_claimer() {
    let db = Arc::new(FakeDb::new());
    seed_open_item(&db, "w-abc", "bob");
    let alice = client(db.clone(), "alice");
    let bob = client(db, "bob");

    alice.claim("w-abc").await.unwrap();
    let done = alice.done("w-abc", "https://evidence").await.unwrap();
    let item = done.detail.item.as_ref().unwrap();
    assert_eq!(item.status, WantedStatus::InReview);
    let completion = done.detail.completion.as_ref().unwrap();
    assert_eq!(completion.completed_by, "alice");

    let accepted = bob
        .accept("w-abc", 4, 3, Severity::Branch, &["go".to_string()], Some("nice"))
        .await
        .unwrap();
    let item = accepted.detail.item.as_ref().unwrap();
    assert_eq!(item.status, WantedStatus::Completed);
    let stamp = accepted.detail.stamp.as_ref().unwrap();
    assert_eq!(stamp.author, "bob");
    let completion = accepted.detail.completion.as_ref().unwrap();
    assert!(completion.stamp_id.is_some());
}

#[tokio::test]
async fn accepting_ones_own_claimed_work_is_permission_denied() {
    let db = Arc::new(FakeDb::new());
    seed_open_item(&db, "w-abc", "bob");
    let alice = client(db, "alice");

    alice.claim("w-abc").await.unwrap();
    alice.done("w-abc", "https://evidence").await.unwrap();

    let err = alice
        .accept("w-abc", 5, 5, Severity::Leaf, &[], None)
        .await
        .unwrap_err();
    assert!(matches!(err, WastelandError::Precondition(_)));
}

#[tokio::test]
async fn claiming_an_item_that_is_already_claimed_by_someone_else_is_a_nothing_to_commit() {
    let db = Arc::new(FakeDb::new());
    db.seed_wanted(&[
        ("id", "w-def"),
        ("title", "Already spoken for"),
        ("description", ""),
        ("project", "core"),
        ("type", "feature"),
        ("priority", "2"),
        ("tags", "[]"),
        ("posted_by", "bob"),
        ("claimed_by", "carol"),
        ("status", "claimed"),
        ("effort_level", "medium"),
        ("sandbox_required", "0"),
        ("created_at", "2026-01-01T00:00:00Z"),
        ("updated_at", "2026-01-01T00:00:00Z"),
    ]);
    let alice = client(db, "alice");

    let err = alice.claim("w-def").await.unwrap_err();
    assert!(matches!(err, WastelandError::NothingToCommit(_)));
}

//! Integration tests for FeedSession
//!
//! Drives a session against the in-memory store and auth provider the way
//! the UI shell does: writes land in the store, pushes are applied, and the
//! republished view is checked.

use std::sync::Arc;
use std::time::Duration;

use agorei_core::{
    AgoreiError, AuthError, DraftError, ManualClock, MemoryAuth, MemoryStore, NewPost, PostId,
    Privacy, Viewer,
};
use agorei_feed::{FeedConfig, FeedSession, FeedState, FeedStatus, FeedView, ToggleOutcome};
use serde_json::{Value, json};
use tokio_test::assert_ok;

fn alice() -> Viewer {
    Viewer::new("uid-a", "a@example.com")
}

fn bob() -> Viewer {
    Viewer::new("uid-b", "b@example.com")
}

fn post_doc(owner: &str, privacy: &str, seconds: i64) -> Value {
    json!({
        "title": format!("post at {seconds}"),
        "category": "general",
        "description": "body",
        "privacy": privacy,
        "createdAt": {"seconds": seconds, "nanoseconds": 0},
        "userId": owner,
        "userEmail": format!("{owner}@example.com"),
    })
}

fn new_session() -> (Arc<MemoryStore>, FeedSession) {
    let store = Arc::new(MemoryStore::new());
    let session = FeedSession::new(store.clone(), FeedConfig::default());
    (store, session)
}

fn signed_in_as(viewer: Viewer) -> (Arc<MemoryStore>, FeedSession) {
    let (store, mut session) = new_session();
    assert_ok!(session.set_viewer(Some(viewer)));
    session.process_pending();
    (store, session)
}

fn feed_ids(view: &FeedView) -> Vec<String> {
    view.feed
        .posts()
        .iter()
        .map(|post| post.id.as_str().to_string())
        .collect()
}

fn owned_ids(view: &FeedView) -> Vec<String> {
    view.owned
        .iter()
        .map(|entry| entry.post.id.as_str().to_string())
        .collect()
}

#[test]
fn test_feed_hides_other_users_private_posts() {
    let (store, mut session) = signed_in_as(alice());
    store.put_document("posts", "a-private", post_doc("uid-a", "private", 30));
    store.put_document("posts", "b-private", post_doc("uid-b", "private", 20));
    store.put_document("posts", "b-public", post_doc("uid-b", "public", 10));
    session.process_pending();

    let view = session.view();
    assert_eq!(feed_ids(&view), vec!["a-private", "b-public"]);
    for post in view.feed.posts() {
        assert!(post.privacy == Privacy::Public || post.is_owned_by(&alice().id));
    }
}

#[test]
fn test_feed_is_newest_first() {
    let (store, mut session) = signed_in_as(alice());
    store.put_document("posts", "old", post_doc("uid-b", "public", 1));
    store.put_document("posts", "new", post_doc("uid-b", "public", 3));
    store.put_document("posts", "mid", post_doc("uid-a", "public", 2));
    session.process_pending();

    assert_eq!(feed_ids(&session.view()), vec!["new", "mid", "old"]);
}

#[test]
fn test_each_push_replaces_the_raw_set() {
    let (store, mut session) = signed_in_as(alice());
    store.put_document("posts", "p1", post_doc("uid-b", "public", 1));
    store.put_document("posts", "p2", post_doc("uid-b", "public", 2));
    session.process_pending();
    assert_eq!(feed_ids(&session.view()).len(), 2);

    assert!(store.remove_document("posts", "p1"));
    session.process_pending();
    assert_eq!(feed_ids(&session.view()), vec!["p2"]);
}

#[test]
fn test_selection_is_bounded_at_four() {
    let (store, mut session) = signed_in_as(alice());
    for n in 1..=5 {
        store.put_document("posts", &format!("a{n}"), post_doc("uid-a", "public", n));
    }
    session.process_pending();

    for n in 1..=4 {
        assert_eq!(
            session.toggle(&PostId::new(format!("a{n}"))),
            ToggleOutcome::Selected
        );
    }
    let fifth = PostId::new("a5");
    assert_eq!(session.toggle(&fifth), ToggleOutcome::Unavailable);

    let view = session.view();
    assert!(view.selection_full);
    assert_eq!(view.ranked_ids(), vec!["a1", "a2", "a3", "a4"]);
    let entry = view
        .owned
        .iter()
        .find(|entry| entry.post.id == fifth)
        .unwrap();
    assert!(!entry.selected);
    assert!(!entry.available);
}

#[test]
fn test_rank_follows_pick_order() {
    let (store, mut session) = signed_in_as(alice());
    store.put_document("posts", "x", post_doc("uid-a", "public", 1));
    store.put_document("posts", "y", post_doc("uid-a", "public", 2));
    session.process_pending();

    let x = PostId::new("x");
    let y = PostId::new("y");
    session.toggle(&y);
    session.toggle(&x);
    session.toggle(&y);
    session.toggle(&y);

    let view = session.view();
    assert_eq!(view.ranked_ids(), vec!["x", "y"]);
    assert_eq!(view.ranked[0].rank(), 1);
    assert!(view.ranked[2].is_empty());
}

#[test]
fn test_deleted_pick_is_reconciled_before_publish() {
    let (store, mut session) = signed_in_as(alice());
    store.put_document("posts", "x", post_doc("uid-a", "public", 1));
    store.put_document("posts", "y", post_doc("uid-a", "public", 2));
    session.process_pending();
    session.toggle(&PostId::new("x"));
    session.toggle(&PostId::new("y"));

    let mut views = session.watch();
    store.remove_document("posts", "x");
    session.process_pending();

    let view = views.borrow_and_update().clone();
    assert_eq!(view.ranked_ids(), vec!["y"]);
    assert_eq!(view.ranked[0].rank(), 1);
    assert!(view.ranked[1].is_empty());
    assert_eq!(session.selection().ids(), &[PostId::new("y")]);
}

#[test]
fn test_identity_change_clears_selection_and_resubscribes() {
    let (store, mut session) = signed_in_as(alice());
    store.put_document("posts", "a1", post_doc("uid-a", "private", 2));
    store.put_document("posts", "b1", post_doc("uid-b", "private", 1));
    session.process_pending();
    session.toggle(&PostId::new("a1"));
    assert_eq!(session.view().ranked_ids(), vec!["a1"]);

    assert_ok!(session.set_viewer(Some(bob())));
    assert_eq!(store.listener_count(), 2);
    session.process_pending();

    let view = session.view();
    assert!(view.ranked_ids().is_empty());
    assert!(session.selection().is_empty());
    assert_eq!(feed_ids(&view), vec!["b1"]);
    assert_eq!(owned_ids(&view), vec!["b1"]);
}

#[test]
fn test_sign_out_leaves_nothing_visible() {
    let (store, mut session) = signed_in_as(alice());
    store.put_document("posts", "p", post_doc("uid-b", "public", 1));
    session.process_pending();
    assert_eq!(feed_ids(&session.view()).len(), 1);

    assert_ok!(session.set_viewer(None));
    assert_eq!(store.listener_count(), 0);

    let view = session.view();
    assert_eq!(view.feed, FeedState::SignedOut);
    assert!(view.owned.is_empty());
    assert!(view.viewer.is_none());
}

#[test]
fn test_no_push_means_loading() {
    let (store, mut session) = new_session();
    store.hold_pushes();
    assert_ok!(session.set_viewer(Some(alice())));
    assert_eq!(session.process_pending(), 0);

    let view = session.view();
    assert!(view.feed.is_loading());
    assert_eq!(view.owned_status, FeedStatus::Loading);
    assert!(view.owned.is_empty());

    store.release_pushes();
    session.process_pending();
    assert_eq!(session.view().feed, FeedState::Ready { posts: Vec::new() });
}

#[test]
fn test_failure_is_reported_then_recovered() {
    let (store, mut session) = signed_in_as(alice());
    store.put_document("posts", "p", post_doc("uid-a", "public", 1));
    session.process_pending();
    session.toggle(&PostId::new("p"));

    store.fail_listeners("permission denied");
    session.process_pending();
    match session.view().feed {
        FeedState::Unavailable { reason } => assert!(reason.contains("permission denied")),
        other => panic!("unexpected feed state: {:?}", other),
    }

    assert_ok!(session.resubscribe());
    assert_eq!(store.listener_count(), 2);
    session.process_pending();

    let view = session.view();
    assert_eq!(feed_ids(&view), vec!["p"]);
    assert_eq!(view.ranked_ids(), vec!["p"]);
}

#[test]
fn test_rejected_subscribe_is_reported() {
    let (store, mut session) = new_session();
    store.set_offline(true);
    assert!(session.set_viewer(Some(alice())).is_err());

    match session.view().feed {
        FeedState::Unavailable { reason } => assert!(reason.contains("offline")),
        other => panic!("unexpected feed state: {:?}", other),
    }
    assert!(matches!(session.view().owned_status, FeedStatus::Failed(_)));

    store.set_offline(false);
    assert_ok!(session.resubscribe());
    session.process_pending();
    assert_eq!(session.view().feed, FeedState::Ready { posts: Vec::new() });
}

#[test]
fn test_shutdown_unsubscribes_once() {
    let (store, mut session) = signed_in_as(alice());
    session.shutdown();
    session.shutdown();
    assert_eq!(store.listener_count(), 0);

    store.put_document("posts", "late", post_doc("uid-a", "public", 1));
    assert_eq!(session.process_pending(), 0);
    assert_eq!(session.view().feed, FeedState::SignedOut);
}

#[tokio::test]
async fn test_create_post_arrives_through_push() {
    let (store, mut session) = signed_in_as(alice());
    let clock = ManualClock::new(1_700_000_000);

    let draft = NewPost::new("Hello", "intro", "first post").with_privacy(Privacy::Private);
    let id = session.create_post(draft, &clock).await.unwrap();
    assert_eq!(store.document_count("posts"), 1);

    session.process_pending();
    let view = session.view();
    assert_eq!(feed_ids(&view), vec![id.as_str().to_string()]);
    assert_eq!(owned_ids(&view), vec![id.as_str().to_string()]);
    let post = &view.feed.posts()[0];
    assert_eq!(post.owner_label, "a@example.com");
    assert_eq!(post.created_at.as_ref().map(|ts| ts.seconds), Some(1_700_000_000));
}

#[tokio::test]
async fn test_create_post_rejects_bad_input() {
    let (store, mut session) = new_session();
    let clock = ManualClock::new(0);
    let draft = NewPost::new("t", "c", "d");
    assert!(matches!(
        session.create_post(draft, &clock).await,
        Err(AgoreiError::Auth(AuthError::NotAuthenticated))
    ));

    assert_ok!(session.set_viewer(Some(alice())));
    let draft = NewPost::new("t", "  ", "d");
    assert!(matches!(
        session.create_post(draft, &clock).await,
        Err(AgoreiError::Draft(DraftError::MissingField("category")))
    ));
    assert_eq!(store.document_count("posts"), 0);
}

#[tokio::test]
async fn test_next_update_waits_for_push() {
    let (store, mut session) = signed_in_as(alice());
    let writer = store.clone();
    let handle = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        writer.put_document("posts", "p", post_doc("uid-b", "public", 1));
    });

    let applied = session.next_update().await;
    assert!(applied >= 1);
    handle.await.unwrap();
    session.process_pending();
    assert_eq!(feed_ids(&session.view()), vec!["p"]);
}

#[tokio::test]
async fn test_run_follows_auth_and_stops_on_shutdown() {
    let store = Arc::new(MemoryStore::new());
    store.put_document("posts", "b-private", post_doc("uid-b", "private", 1));
    let auth = Arc::new(MemoryAuth::new());
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let mut session = FeedSession::new(store.clone(), FeedConfig::default());
    let mut views = session.watch();
    let driver_auth = auth.clone();
    let driver = tokio::spawn(async move {
        session.run(driver_auth.as_ref(), shutdown_rx).await;
        session
    });

    auth.sign_in(bob());
    let view = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            views.changed().await.unwrap();
            let view = views.borrow_and_update().clone();
            if !view.feed.posts().is_empty() {
                break view;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(feed_ids(&view), vec!["b-private"]);

    shutdown_tx.send(true).unwrap();
    let session = driver.await.unwrap();
    assert!(session.viewer().is_none());
    assert_eq!(store.listener_count(), 0);
}

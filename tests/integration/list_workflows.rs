//! Integration tests for the task workflows.
//!
//! Drives `ListManager` end to end over `MemoryKv`: add, send, list,
//! accept, complete, remove, pop, bump and edit, checking both users' lists
//! and task records after each step.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::similar_names)]

use std::collections::HashSet;
use std::sync::Arc;

use tasklink::{ErrorKind, ListManager, MemoryKv, StaticDirectory};
use tasklink_proto::reference::ListKind;
use tasklink_proto::task::TaskId;

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

type Manager = ListManager<MemoryKv, StaticDirectory>;

fn make_manager() -> (Arc<MemoryKv>, Manager) {
    let kv = Arc::new(MemoryKv::new());
    let directory = StaticDirectory::new()
        .with_user("u1", "alice")
        .with_user("u2", "bob")
        .with_user("u3", "carol");
    let manager = ListManager::new(Arc::clone(&kv), directory);
    (kv, manager)
}

async fn messages(manager: &Manager, user_id: &str, kind: ListKind) -> Vec<String> {
    manager
        .get_list(user_id, kind)
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.task.message)
        .collect()
}

async fn list_ids(manager: &Manager, user_id: &str, kind: ListKind) -> Vec<TaskId> {
    manager
        .references()
        .get_list(user_id, kind)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.task_id)
        .collect()
}

// ---------------------------------------------------------------------------
// Add / list
// ---------------------------------------------------------------------------

#[tokio::test]
async fn added_task_is_listed_as_owned() {
    let (_kv, manager) = make_manager();
    let task = manager.add_task("u1", "buy milk", "", None).await.unwrap();

    let owned = manager.get_list("u1", ListKind::Owned).await.unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].task.id, task.id);
    assert_eq!(owned[0].task.message, "buy milk");
    assert_eq!(owned[0].foreign_user, None);
    assert_eq!(owned[0].foreign_list, None);
}

#[tokio::test]
async fn owned_list_keeps_insertion_order() {
    let (_kv, manager) = make_manager();
    for message in ["one", "two", "three"] {
        manager.add_task("u1", message, "", None).await.unwrap();
    }
    assert_eq!(
        messages(&manager, "u1", ListKind::Owned).await,
        ["one", "two", "three"]
    );
}

#[tokio::test]
async fn anchor_is_kept_on_both_copies() {
    let (_kv, manager) = make_manager();
    let sent = manager
        .send_task("u1", "u2", "review PR", "", Some("post-9"))
        .await
        .unwrap();

    let mine = manager.items().get(&sent.sender_task_id).await.unwrap();
    let theirs = manager.items().get(&sent.receiver_task_id).await.unwrap();
    assert_eq!(mine.origin_post_id.as_deref(), Some("post-9"));
    assert_eq!(theirs.origin_post_id.as_deref(), Some("post-9"));
}

#[tokio::test]
async fn list_skips_entries_whose_task_is_gone() {
    let (_kv, manager) = make_manager();
    let gone = manager.add_task("u1", "gone", "", None).await.unwrap();
    manager.add_task("u1", "kept", "", None).await.unwrap();
    manager.items().delete(&gone.id).await.unwrap();

    assert_eq!(messages(&manager, "u1", ListKind::Owned).await, ["kept"]);
    assert_eq!(list_ids(&manager, "u1", ListKind::Owned).await.len(), 2);
}

#[tokio::test]
async fn counts_cover_all_lists() {
    let (_kv, manager) = make_manager();
    manager.add_task("u1", "a", "", None).await.unwrap();
    manager.add_task("u1", "b", "", None).await.unwrap();
    manager.send_task("u1", "u2", "c", "", None).await.unwrap();
    manager.send_task("u2", "u1", "d", "", None).await.unwrap();

    let counts = manager.count_lists("u1").await.unwrap();
    assert_eq!(counts.get(ListKind::Owned), 2);
    assert_eq!(counts.get(ListKind::Sent), 1);
    assert_eq!(counts.get(ListKind::Received), 1);
    assert_eq!(counts.total(), 4);
}

// ---------------------------------------------------------------------------
// Send / accept
// ---------------------------------------------------------------------------

#[tokio::test]
async fn send_creates_a_linked_pair() {
    let (_kv, manager) = make_manager();
    let sent = manager
        .send_task("u1", "u2", "review PR", "", None)
        .await
        .unwrap();
    assert_ne!(sent.sender_task_id, sent.receiver_task_id);

    let located = manager
        .references()
        .get_reference_and_list_kind("u2", &sent.receiver_task_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(located.kind, ListKind::Received);
    assert_eq!(located.reference.foreign_user_id(), Some("u1"));

    let outbox = manager.get_list("u1", ListKind::Sent).await.unwrap();
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].foreign_user.as_deref(), Some("bob"));
    assert_eq!(outbox[0].foreign_list, Some(ListKind::Received));
    assert_eq!(outbox[0].foreign_position, Some(0));

    let inbox = manager.get_list("u2", ListKind::Received).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].task.message, "review PR");
    assert_eq!(inbox[0].foreign_user.as_deref(), Some("alice"));
    assert_eq!(inbox[0].foreign_list, Some(ListKind::Sent));
}

#[tokio::test]
async fn accept_moves_received_into_owned() {
    let (_kv, manager) = make_manager();
    let sent = manager.send_task("u1", "u2", "review PR", "", None).await.unwrap();

    let accepted = manager
        .accept_task("u2", &sent.receiver_task_id)
        .await
        .unwrap();
    assert_eq!(accepted.message, "review PR");
    assert_eq!(accepted.foreign_user_id.as_deref(), Some("u1"));

    let located = manager
        .references()
        .get_reference_and_list_kind("u2", &sent.receiver_task_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(located.kind, ListKind::Owned);
    assert_eq!(located.reference.foreign_user_id(), Some("u1"));
    assert!(list_ids(&manager, "u2", ListKind::Received).await.is_empty());

    // The sender now sees their copy as accepted.
    let outbox = manager.get_list("u1", ListKind::Sent).await.unwrap();
    assert_eq!(outbox[0].foreign_list, Some(ListKind::Owned));
}

#[tokio::test]
async fn accept_requires_a_received_entry() {
    let (_kv, manager) = make_manager();
    let task = manager.add_task("u2", "mine", "", None).await.unwrap();

    let err = manager.accept_task("u2", &task.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = manager
        .accept_task("u2", &TaskId::from("missing"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ---------------------------------------------------------------------------
// Complete / remove / pop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn complete_deletes_both_copies() {
    let (kv, manager) = make_manager();
    let sent = manager.send_task("u1", "u2", "review PR", "", None).await.unwrap();
    manager
        .accept_task("u2", &sent.receiver_task_id)
        .await
        .unwrap();

    let done = manager
        .complete_task("u2", &sent.receiver_task_id)
        .await
        .unwrap();
    assert_eq!(done.list, ListKind::Owned);
    assert_eq!(done.foreign_user_id.as_deref(), Some("u1"));
    assert_eq!(done.task.unwrap().message, "review PR");

    assert!(list_ids(&manager, "u1", ListKind::Sent).await.is_empty());
    assert!(list_ids(&manager, "u2", ListKind::Owned).await.is_empty());
    for id in [&sent.sender_task_id, &sent.receiver_task_id] {
        let err = manager.items().get(id).await.unwrap_err();
        assert!(matches!(err, tasklink::StoreError::NotFound(_)));
    }
    assert_eq!(kv.count_with_prefix("item_"), 0);
}

#[tokio::test]
async fn complete_local_task_reports_no_counterpart() {
    let (_kv, manager) = make_manager();
    let task = manager.add_task("u1", "buy milk", "", None).await.unwrap();

    let done = manager.complete_task("u1", &task.id).await.unwrap();
    assert_eq!(done.foreign_user_id, None);
    assert_eq!(done.task, Some(task));
}

#[tokio::test]
async fn complete_unknown_task_is_not_found() {
    let (_kv, manager) = make_manager();
    let err = manager
        .complete_task("u1", &TaskId::from("missing"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn complete_survives_a_missing_counterpart() {
    let (_kv, manager) = make_manager();
    let sent = manager.send_task("u1", "u2", "review PR", "", None).await.unwrap();
    manager
        .references()
        .remove_reference("u2", ListKind::Received, &sent.receiver_task_id)
        .await
        .unwrap();

    let done = manager
        .complete_task("u1", &sent.sender_task_id)
        .await
        .unwrap();
    assert_eq!(done.foreign_user_id.as_deref(), Some("u2"));
    assert!(list_ids(&manager, "u1", ListKind::Sent).await.is_empty());
}

#[tokio::test]
async fn decline_removes_the_senders_copy() {
    let (_kv, manager) = make_manager();
    let sent = manager.send_task("u1", "u2", "review PR", "", None).await.unwrap();

    let removed = manager
        .remove_task("u2", &sent.receiver_task_id)
        .await
        .unwrap();
    assert!(removed.is_decline());
    assert_eq!(removed.foreign_user_id.as_deref(), Some("u1"));
    assert!(list_ids(&manager, "u1", ListKind::Sent).await.is_empty());
    assert!(list_ids(&manager, "u2", ListKind::Received).await.is_empty());
}

#[tokio::test]
async fn pop_takes_the_front_of_owned() {
    let (_kv, manager) = make_manager();
    manager.add_task("u1", "first", "", None).await.unwrap();
    manager.add_task("u1", "second", "", None).await.unwrap();

    let popped = manager.pop_task("u1").await.unwrap();
    assert_eq!(popped.task.unwrap().message, "first");
    assert_eq!(popped.list, ListKind::Owned);
    assert_eq!(messages(&manager, "u1", ListKind::Owned).await, ["second"]);
}

#[tokio::test]
async fn pop_of_accepted_task_clears_the_sender() {
    let (_kv, manager) = make_manager();
    let sent = manager.send_task("u1", "u2", "review PR", "", None).await.unwrap();
    manager
        .accept_task("u2", &sent.receiver_task_id)
        .await
        .unwrap();

    let popped = manager.pop_task("u2").await.unwrap();
    assert_eq!(popped.foreign_user_id.as_deref(), Some("u1"));
    assert!(list_ids(&manager, "u1", ListKind::Sent).await.is_empty());
}

#[tokio::test]
async fn pop_on_empty_list_changes_nothing() {
    let (kv, manager) = make_manager();
    manager.send_task("u2", "u1", "incoming", "", None).await.unwrap();
    let before = kv.len();

    let err = manager.pop_task("u1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(kv.len(), before);
    assert_eq!(list_ids(&manager, "u1", ListKind::Received).await.len(), 1);
}

// ---------------------------------------------------------------------------
// Bump / edit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bump_moves_receivers_entry_to_front() {
    let (_kv, manager) = make_manager();
    manager.send_task("u3", "u2", "older", "", None).await.unwrap();
    manager.send_task("u3", "u2", "old", "", None).await.unwrap();
    let sent = manager.send_task("u1", "u2", "review PR", "", None).await.unwrap();

    let bumped = manager.bump_task("u1", &sent.sender_task_id).await.unwrap();
    assert_eq!(bumped.message.as_deref(), Some("review PR"));
    assert_eq!(bumped.foreign_user_id, "u2");
    assert_eq!(bumped.foreign_task_id, sent.receiver_task_id);

    assert_eq!(
        messages(&manager, "u2", ListKind::Received).await,
        ["review PR", "older", "old"]
    );
    let outbox = manager.get_list("u1", ListKind::Sent).await.unwrap();
    assert_eq!(outbox[0].foreign_position, Some(0));
}

#[tokio::test]
async fn only_the_sender_can_bump() {
    let (_kv, manager) = make_manager();
    let sent = manager.send_task("u1", "u2", "review PR", "", None).await.unwrap();

    let err = manager
        .bump_task("u2", &sent.receiver_task_id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn edit_updates_both_copies() {
    let (_kv, manager) = make_manager();
    let sent = manager
        .send_task("u1", "u2", "review PR", "soon", None)
        .await
        .unwrap();

    let edited = manager
        .edit_task("u2", &sent.receiver_task_id, "review PR #42", "today")
        .await
        .unwrap();
    assert_eq!(edited.previous_message, "review PR");
    assert_eq!(edited.list, ListKind::Received);
    assert_eq!(edited.foreign_user_id.as_deref(), Some("u1"));

    for id in [&sent.sender_task_id, &sent.receiver_task_id] {
        let task = manager.items().get(id).await.unwrap();
        assert_eq!(task.message, "review PR #42");
        assert_eq!(task.description, "today");
    }
}

#[tokio::test]
async fn edit_of_local_task() {
    let (_kv, manager) = make_manager();
    let task = manager.add_task("u1", "buy milk", "", None).await.unwrap();

    let edited = manager.edit_task("u1", &task.id, "buy oat milk", "").await.unwrap();
    assert_eq!(edited.foreign_user_id, None);
    assert_eq!(edited.list, ListKind::Owned);
    assert_eq!(messages(&manager, "u1", ListKind::Owned).await, ["buy oat milk"]);
}

// ---------------------------------------------------------------------------
// Invariants
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lists_never_hold_duplicate_ids() {
    let (_kv, manager) = make_manager();
    let task = manager.add_task("u1", "a", "", None).await.unwrap();
    manager.send_task("u1", "u2", "b", "", None).await.unwrap();

    let err = manager
        .references()
        .add_reference(
            "u1",
            ListKind::Owned,
            tasklink_proto::reference::Reference::local(task.id.clone()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, tasklink::StoreError::DuplicateEntry(_)));

    for user_id in ["u1", "u2"] {
        for kind in ListKind::SEARCH_ORDER {
            let ids = list_ids(&manager, user_id, kind).await;
            let unique: HashSet<_> = ids.iter().collect();
            assert_eq!(unique.len(), ids.len());
        }
    }
}

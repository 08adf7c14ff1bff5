//! Property-based tests for the storage codec.
//!
//! Uses proptest to verify:
//! 1. Random bytes never cause a panic in `decode_list` or `decode_task`.
//! 2. Any list of references survives encode → decode in the current shape.
//! 3. Any legacy id array decodes to link-free references in order.
//! 4. Any task survives encode → decode.

use proptest::prelude::*;
use tasklink_proto::codec::{self, ListShape};
use tasklink_proto::reference::Reference;
use tasklink_proto::task::{Task, TaskId, Timestamp};

// --- Strategies ---

/// Non-empty ids; an empty foreign id means "no link" on disk.
fn arb_id() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,26}"
}

fn arb_task_id() -> impl Strategy<Value = TaskId> {
    arb_id().prop_map(TaskId::from)
}

fn arb_reference() -> impl Strategy<Value = Reference> {
    (arb_task_id(), proptest::option::of((arb_id(), arb_task_id()))).prop_map(
        |(task_id, link)| match link {
            Some((user_id, foreign_task_id)) => Reference::linked(task_id, &user_id, foreign_task_id),
            None => Reference::local(task_id),
        },
    )
}

fn arb_task() -> impl Strategy<Value = Task> {
    (
        arb_task_id(),
        ".{0,64}",
        ".{0,128}",
        any::<u64>(),
        proptest::option::of(arb_id()),
    )
        .prop_map(|(id, message, description, created_at, origin_post_id)| Task {
            id,
            message,
            description,
            created_at: Timestamp::from_millis(created_at),
            origin_post_id,
        })
}

// --- Properties ---

proptest! {
    #[test]
    fn decode_list_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = codec::decode_list(&bytes);
    }

    #[test]
    fn decode_task_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = codec::decode_task(&bytes);
    }

    #[test]
    fn reference_lists_survive_the_codec(references in prop::collection::vec(arb_reference(), 0..32)) {
        let bytes = codec::encode_list(&references).unwrap();
        let decoded = codec::decode_list(&bytes).unwrap();
        prop_assert_eq!(decoded.shape, ListShape::Current);
        prop_assert_eq!(decoded.references, references);
    }

    #[test]
    fn legacy_lists_upgrade_to_local_references(ids in prop::collection::vec(arb_id(), 1..32)) {
        let bytes = serde_json::to_vec(&ids).unwrap();
        let decoded = codec::decode_list(&bytes).unwrap();

        prop_assert_eq!(decoded.shape, ListShape::Legacy);
        prop_assert_eq!(decoded.references.len(), ids.len());
        for (reference, id) in decoded.references.iter().zip(&ids) {
            prop_assert_eq!(reference.task_id.as_str(), id.as_str());
            prop_assert!(reference.link.is_none());
        }
    }

    #[test]
    fn tasks_survive_the_codec(task in arb_task()) {
        let bytes = codec::encode_task(&task).unwrap();
        prop_assert_eq!(codec::decode_task(&bytes).unwrap(), task);
    }
}

//! End-to-end queue scenarios over the on-disk spool

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use vigil_queue::{Message, MessageType, MultiTypeQueue, QueueConfig};
use vigil_storage::{RedbMessageStore, SpoolConfig};

async fn open_queue(dir: &TempDir, capacity: usize) -> Arc<MultiTypeQueue> {
    let store = Arc::new(RedbMessageStore::open(SpoolConfig::with_base_dir(dir.path())).unwrap());
    Arc::new(
        MultiTypeQueue::open(store, QueueConfig::default().with_capacity(capacity))
            .await
            .unwrap(),
    )
}

#[tokio::test]
async fn single_push_then_peek() {
    let dir = TempDir::new().unwrap();
    let queue = open_queue(&dir, 10).await;

    let msg = Message::new(MessageType::Stateless, json!({"data": "for STATELESS_0"}));
    assert_eq!(queue.push(&msg, false).await.unwrap(), 1);

    let peeked = queue.get_next(MessageType::Stateless, None).await.unwrap();
    assert_eq!(peeked.kind, MessageType::Stateless);
    assert_eq!(peeked.payload["data"], json!({"data": "for STATELESS_0"}));
    assert!(!queue.is_empty(MessageType::Stateless).await);

    // Peeking an untouched type yields the sentinel, not an error
    let sentinel = queue.get_next(MessageType::Stateful, None).await.unwrap();
    assert_eq!(sentinel.kind, MessageType::Stateful);
    assert!(sentinel.is_sentinel());
}

#[tokio::test]
async fn capacity_rejects_and_pop_frees_space() {
    let dir = TempDir::new().unwrap();
    let queue = open_queue(&dir, 2).await;

    for i in 1..=2 {
        let msg = Message::new(MessageType::Command, json!({"data": format!("for COMMAND{i}")}));
        assert_eq!(queue.push(&msg, false).await.unwrap(), 1);
    }

    // Third push meets a full shard; blocking gives up after its budget
    let third = Message::new(MessageType::Command, json!({"data": "for COMMAND3"}));
    assert_eq!(queue.push(&third, true).await.unwrap(), 0);

    assert_eq!(queue.stored_items(MessageType::Command, None).await.unwrap(), 2);
    assert!(queue.is_full(MessageType::Command).await);
    assert!(queue.is_empty(MessageType::Stateless).await);

    assert!(queue.pop(MessageType::Command).await.unwrap());
    assert_eq!(queue.stored_items(MessageType::Command, None).await.unwrap(), 1);
    assert!(!queue.is_full(MessageType::Command).await);
}

#[tokio::test]
async fn array_payload_fans_out_in_order() {
    let dir = TempDir::new().unwrap();
    let queue = open_queue(&dir, 10).await;

    let multi = Message::new(
        MessageType::Stateless,
        json!(["content 1", "content 2", "content 3"]),
    );
    assert_eq!(queue.push(&multi, false).await.unwrap(), 3);

    for expected in ["content 1", "content 2", "content 3"] {
        let next = queue.get_next(MessageType::Stateless, None).await.unwrap();
        assert_eq!(next.payload["data"], expected);
        assert!(queue.pop(MessageType::Stateless).await.unwrap());
    }
    assert_eq!(queue.stored_items(MessageType::Stateless, None).await.unwrap(), 0);
}

#[tokio::test]
async fn fan_out_is_atomic_against_capacity() {
    let dir = TempDir::new().unwrap();
    let queue = open_queue(&dir, 3).await;

    queue
        .push(&Message::new(MessageType::Stateless, json!({"data": "x"})), false)
        .await
        .unwrap();

    // Three elements, two free slots: the whole batch must be rejected
    let multi = Message::new(MessageType::Stateless, json!(["a", "b", "c"]));
    assert_eq!(queue.push(&multi, false).await.unwrap(), 0);
    assert_eq!(queue.stored_items(MessageType::Stateless, None).await.unwrap(), 1);

    // With enough room the same batch lands whole
    queue.pop(MessageType::Stateless).await.unwrap();
    assert_eq!(queue.push(&multi, false).await.unwrap(), 3);
    assert!(queue.is_full(MessageType::Stateless).await);
}

#[tokio::test]
async fn module_filter_reads_without_reordering() {
    let dir = TempDir::new().unwrap();
    let queue = open_queue(&dir, 10).await;

    for i in 1..=5 {
        let msg = Message::with_module(
            MessageType::Stateless,
            json!([format!("content-{i}")]),
            format!("module-{i}"),
        );
        assert_eq!(queue.push(&msg, false).await.unwrap(), 1);
    }

    let all = queue.get_next_n(MessageType::Stateless, 10, None).await.unwrap();
    assert_eq!(all.len(), 5);
    for (i, msg) in all.iter().enumerate() {
        assert_eq!(msg.payload["data"], format!("content-{}", i + 1));
        assert_eq!(msg.payload["module"], format!("module-{}", i + 1));
    }

    let filtered = queue
        .get_next_n(MessageType::Stateless, 10, Some("module-1"))
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].payload["data"], "content-1");

    // Filtered counts partition the total
    assert_eq!(
        queue
            .stored_items(MessageType::Stateless, Some("module-1"))
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        queue
            .stored_items(MessageType::Stateless, Some("nosuchmodule"))
            .await
            .unwrap(),
        0
    );
    assert_eq!(queue.stored_items(MessageType::Stateless, None).await.unwrap(), 5);
}

#[tokio::test]
async fn awaitable_push_resumes_when_space_appears() {
    let dir = TempDir::new().unwrap();
    let queue = open_queue(&dir, 2).await;

    for i in 1..=2 {
        let msg = Message::new(MessageType::Stateful, json!({"data": format!("for STATEFUL{i}")}));
        assert_eq!(queue.push(&msg, false).await.unwrap(), 1);
    }
    assert!(queue.is_full(MessageType::Stateful).await);

    let pusher = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move {
            let msg = Message::new(MessageType::Stateful, json!(["content-1"]));
            queue.push_awaitable(&msg).await
        })
    };

    // Give the awaiter time to suspend, then free one slot
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!pusher.is_finished());
    assert_eq!(queue.pop_n(MessageType::Stateful, 1).await.unwrap(), 1);

    let pushed = pusher.await.unwrap().unwrap();
    assert_eq!(pushed, 1);
    assert!(queue.is_full(MessageType::Stateful).await);
}

#[tokio::test]
async fn awaitable_get_resumes_when_rows_arrive() {
    let dir = TempDir::new().unwrap();
    let queue = open_queue(&dir, 10).await;

    let getter = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.get_next_n_awaitable(MessageType::Stateless, 2).await })
    };

    tokio::time::sleep(Duration::from_millis(200)).await;
    let multi = Message::new(
        MessageType::Stateless,
        json!(["content-1", "content-2", "content-3"]),
    );
    assert_eq!(queue.push(&multi, false).await.unwrap(), 3);

    let combined = getter.await.unwrap().unwrap();
    assert_eq!(combined.payload[0]["data"], "content-1");
    assert_eq!(combined.payload[1]["data"], "content-2");
}

#[tokio::test]
async fn fifo_order_holds_across_restart() {
    let dir = TempDir::new().unwrap();

    {
        let queue = open_queue(&dir, 10).await;
        for i in 1..=10 {
            let msg = Message::new(
                MessageType::Stateful,
                json!({"data": format!("for STATEFUL{i}")}),
            );
            assert_eq!(queue.push(&msg, false).await.unwrap(), 1);
        }
        queue.close();
    }

    let queue = open_queue(&dir, 10).await;
    let recovered = queue.get_next_n(MessageType::Stateful, 10, None).await.unwrap();
    assert_eq!(recovered.len(), 10);
    for (i, msg) in recovered.iter().enumerate() {
        assert_eq!(msg.payload["data"], format!("for STATEFUL{}", i + 1));
    }

    // Draining one at a time sees the same order
    for i in 1..=10 {
        let next = queue.get_next(MessageType::Stateful, None).await.unwrap();
        assert_eq!(next.payload["data"], format!("for STATEFUL{i}"));
        assert!(queue.pop(MessageType::Stateful).await.unwrap());
    }
    assert!(queue.is_empty(MessageType::Stateful).await);
}

#[tokio::test]
async fn counts_track_pushes_minus_pops() {
    let dir = TempDir::new().unwrap();
    let queue = open_queue(&dir, 100).await;

    let mut pushed = 0;
    for i in 0..10 {
        pushed += queue
            .push(&Message::new(MessageType::Command, json!({"n": i})), false)
            .await
            .unwrap();
    }
    let popped = queue.pop_n(MessageType::Command, 4).await.unwrap();

    assert_eq!(
        queue.stored_items(MessageType::Command, None).await.unwrap(),
        pushed - popped
    );
}

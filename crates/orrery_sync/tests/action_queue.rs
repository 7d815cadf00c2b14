//! Action queue behaviour against scripted targets.

use orrery_bucket::{Bucket, InMemoryBucket};
use orrery_core::Value;
use orrery_sync::{ActionQueue, ProcessOutcome, QueueConfig, QueueEvent, SyncError};
use orrery_testkit::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn manual(name: &str) -> QueueConfig {
    QueueConfig::new(name).with_auto_process(false)
}

#[tokio::test]
async fn failed_action_halts_queue_until_skipped() {
    init_tracing();
    let target = Arc::new(ScriptedTarget::new());
    target.fail_on("transmit");
    let queue = ActionQueue::new(target.clone(), manual("remote"));
    let mut events = queue.subscribe();

    let first = queue.push("connect", "uplink", Value::Null).await.unwrap();
    let second = queue.push("transmit", "telemetry", Value::Null).await.unwrap();
    let third = queue.push("disconnect", Value::Null, Value::Null).await.unwrap();

    let outcome = queue.process().await;
    assert!(matches!(outcome, ProcessOutcome::Halted(ref e) if e.retryable));

    let head = queue.current().unwrap();
    assert_eq!(head.id, second.id);
    assert!(queue.error().is_some());
    assert_eq!(queue.actions()[1].id, third.id);
    assert!(!queue.actions()[1].is_started());
    assert_eq!(target.methods(), vec!["connect", "transmit"]);

    let drained = events.drain();
    assert!(matches!(&drained[0], QueueEvent::Action(a) if a.id == first.id));
    assert!(matches!(&drained[1], QueueEvent::Fail { action, .. } if action.id == second.id));

    queue.skip().await.unwrap();
    assert_eq!(queue.process().await, ProcessOutcome::Settled);
    assert_eq!(target.methods(), vec!["connect", "transmit", "disconnect"]);
    assert!(queue.is_empty());
    assert!(queue.error().is_none());
}

#[tokio::test]
async fn retry_after_heal_completes() {
    let target = Arc::new(ScriptedTarget::new());
    target.fail_on("transmit");
    let queue = ActionQueue::new(target.clone(), manual("remote"));

    queue.push("transmit", Value::Null, Value::Null).await.unwrap();
    assert!(!queue.process().await.is_settled());

    target.heal("transmit");
    queue.retry().await.unwrap();
    assert_eq!(queue.process().await, ProcessOutcome::Settled);
    assert_eq!(target.methods(), vec!["transmit", "transmit"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_process_calls_run_each_action_once() {
    let target = Arc::new(ScriptedTarget::with_delay(Duration::from_millis(10)));
    let queue = ActionQueue::new(target.clone(), manual("remote"));
    for method in ["a", "b", "c"] {
        queue.push(method, Value::Null, Value::Null).await.unwrap();
    }

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let queue = queue.clone();
            tokio::spawn(async move { queue.process().await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap(), ProcessOutcome::Settled);
    }

    assert_eq!(target.methods(), vec!["a", "b", "c"]);
    assert_eq!(target.max_concurrency(), 1);
}

#[tokio::test]
async fn auto_process_drains_pushed_actions() {
    let target = Arc::new(ScriptedTarget::new());
    let queue = ActionQueue::new(target.clone(), QueueConfig::new("remote"));
    let mut events = queue.subscribe();

    queue.push("connect", Value::Null, Value::Null).await.unwrap();

    loop {
        match events.recv().await {
            Some(QueueEvent::Complete) => break,
            Some(_) => continue,
            None => panic!("queue dropped its feed"),
        }
    }
    assert!(queue.is_empty());
    assert_eq!(target.methods(), vec!["connect"]);
}

#[tokio::test]
async fn reopened_queue_resumes_where_it_stopped() {
    let bucket: Arc<dyn Bucket> = Arc::new(InMemoryBucket::new());
    let target = Arc::new(ScriptedTarget::new());
    target.fail_on("transmit");

    let queue = ActionQueue::open(target.clone(), Arc::clone(&bucket), manual("remote"))
        .await
        .unwrap();
    queue.push("connect", Value::Null, Value::Null).await.unwrap();
    queue.push("transmit", Value::Null, Value::Null).await.unwrap();
    queue.push("disconnect", Value::Null, Value::Null).await.unwrap();
    assert!(!queue.process().await.is_settled());
    drop(queue);

    target.heal("transmit");
    let reopened = ActionQueue::open(target.clone(), bucket, manual("remote"))
        .await
        .unwrap();
    assert_eq!(reopened.len(), 2);
    assert_eq!(reopened.process().await, ProcessOutcome::Settled);
    assert_eq!(
        target.methods(),
        vec!["connect", "transmit", "transmit", "disconnect"]
    );
}

#[tokio::test]
async fn persistence_failure_rejects_push() {
    let bucket = Arc::new(FailingBucket::new());
    let queue = ActionQueue::open(Arc::new(ScriptedTarget::new()), bucket.clone(), manual("remote"))
        .await
        .unwrap();

    bucket.fail_writes(true);
    let result = queue.push("connect", Value::Null, Value::Null).await;
    assert!(matches!(result, Err(SyncError::Bucket(_))));
    assert!(queue.is_empty());
}

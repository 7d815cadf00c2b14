//! Log coordination across memory sources.

use orrery_core::{Operation, Record, Transform, TransformId};
use orrery_sync::{Coordinator, MemorySource, Source};
use orrery_testkit::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn add_planet(id: &str, planet_id: &str) -> Transform {
    Transform::with_id(
        id,
        vec![Operation::add_record(
            Record::new(planet(planet_id)).with_attribute("name", planet_id),
        )],
    )
}

fn as_source(source: &Arc<MemorySource>) -> Arc<dyn Source> {
    source.clone()
}

async fn entries(source: &MemorySource) -> Vec<TransformId> {
    source.transform_log().entries().await.unwrap()
}

/// Waits until `check` holds, failing the test after a second.
async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let waited = tokio::time::timeout(Duration::from_secs(1), async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not reached in time");
}

#[tokio::test]
async fn review_prunes_only_what_every_source_has_seen() {
    init_tracing();
    let a = memory_source("a");
    let b = memory_source("b");
    let c = memory_source("c");

    for t in [add_planet("t1", "earth"), add_planet("t2", "mars"), add_planet("t3", "venus")] {
        a.transform(t).await.unwrap();
    }
    for t in [add_planet("t1", "earth"), add_planet("t2", "mars")] {
        b.transform(t).await.unwrap();
    }
    c.transform(add_planet("t1", "earth")).await.unwrap();

    let coordinator =
        Coordinator::with_sources([as_source(&a), as_source(&b), as_source(&c)]).unwrap();
    coordinator.review().await.unwrap();

    assert_eq!(entries(&a).await, vec![TransformId::from("t2"), TransformId::from("t3")]);
    assert_eq!(entries(&b).await, vec![TransformId::from("t2")]);
    assert!(entries(&c).await.is_empty());
    assert!(c.retained_inverses().is_empty());
    assert_eq!(a.retained_inverses(), vec![TransformId::from("t2"), TransformId::from("t3")]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn active_coordinator_prunes_as_sources_transform() {
    let a = memory_source("a");
    let b = memory_source("b");
    let coordinator = Coordinator::with_sources([as_source(&a), as_source(&b)]).unwrap();
    coordinator.activate().await.unwrap();
    assert_eq!(coordinator.review_count(), 1);

    a.transform(add_planet("t1", "earth")).await.unwrap();
    b.transform(add_planet("t1", "earth")).await.unwrap();

    eventually(|| {
        let (a, b) = (Arc::clone(&a), Arc::clone(&b));
        async move { entries(&a).await.is_empty() && entries(&b).await.is_empty() }
    })
    .await;
    assert!(coordinator.review_count() >= 2);

    let reviews = coordinator.review_count();
    a.transform(add_planet("t2", "mars")).await.unwrap();
    eventually(|| {
        let coordinator = coordinator.clone();
        async move { coordinator.review_count() > reviews }
    })
    .await;
    assert_eq!(entries(&a).await, vec![TransformId::from("t2")]);

    coordinator.deactivate();
    let reviews = coordinator.review_count();
    b.transform(add_planet("t2", "mars")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(coordinator.review_count(), reviews);
    assert_eq!(entries(&b).await, vec![TransformId::from("t2")]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_reviews_coalesce() {
    let a = memory_source("a");
    let b = memory_source("b");
    for source in [&a, &b] {
        source.transform(add_planet("t1", "earth")).await.unwrap();
    }
    let coordinator = Coordinator::with_sources([as_source(&a), as_source(&b)]).unwrap();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.review().await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Every coalesced request is served by a pass that had not yet finished.
    eventually(|| {
        let coordinator = coordinator.clone();
        async move { coordinator.review_count() >= 1 }
    })
    .await;
    assert!(coordinator.review_count() <= 10);
    assert!(entries(&a).await.is_empty());
    assert!(entries(&b).await.is_empty());
}

#[tokio::test]
async fn removed_source_is_no_longer_reviewed() {
    let a = memory_source("a");
    let b = memory_source("b");
    for source in [&a, &b] {
        source.transform(add_planet("t1", "earth")).await.unwrap();
    }
    let coordinator = Coordinator::with_sources([as_source(&a), as_source(&b)]).unwrap();

    let removed = coordinator.remove_source("b").unwrap();
    assert_eq!(removed.name(), "b");
    coordinator.review().await.unwrap();

    assert_eq!(entries(&a).await, vec![TransformId::from("t1")]);
    assert!(coordinator.source("b").is_none());
}

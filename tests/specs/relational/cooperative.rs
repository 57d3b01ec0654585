//! Cooperative relationship specs
//!
//! A tag is only granted while every tag it cooperates with is free.

use crate::prelude::*;
use tokio::task::JoinSet;

fn pair() -> MultiLockConfig {
    MultiLockConfig::new()
        .with_tag("a", ms(1000), TagRelationships::cooperative(["b"]))
        .with_tag("b", ms(1000), TagRelationships::cooperative(["a"]))
}

#[tokio::test]
async fn cooperative_pair_scenario() {
    let (lock, store, _clock) = relational(pair());

    let a = lock.acquire(&resource(), "a").await.unwrap();
    let err = lock.acquire(&resource(), "b").await.unwrap_err();
    similar_asserts::assert_eq!(err.kind(), ErrorKind::CooperativeLock);
    similar_asserts::assert_eq!(err.to_string(), "CooperativeLock: tag \"b\" is blocked by a live cooperative holder");
    similar_asserts::assert_eq!(holders(&store, "b"), 0);

    lock.release(&resource(), &a).await.unwrap();
    let b = lock.acquire(&resource(), "b").await.unwrap();
    similar_asserts::assert_eq!(b.tag, "b");
    similar_asserts::assert_eq!(holders(&store, "b"), 1);
}

#[tokio::test]
async fn tags_without_relationships_always_succeed() {
    let config = pair().with_tag("free", ms(1000), TagRelationships::default());
    let (lock, store, _clock) = relational(config);

    lock.acquire(&resource(), "a").await.unwrap();
    for _ in 0..3 {
        lock.acquire(&resource(), "free").await.unwrap();
    }
    // a tag never named in the graph behaves the same way
    lock.acquire(&resource(), "adhoc").await.unwrap();

    similar_asserts::assert_eq!(holders(&store, "free"), 3);
    similar_asserts::assert_eq!(holders(&store, "adhoc"), 1);
}

#[tokio::test]
async fn same_tag_holders_coexist() {
    let (lock, store, _clock) = relational(pair());

    let first = lock.acquire(&resource(), "a").await.unwrap();
    let second = lock.acquire(&resource(), "a").await.unwrap();
    assert_ne!(first.id, second.id);
    similar_asserts::assert_eq!(holders(&store, "a"), 2);
}

#[tokio::test]
async fn dependent_tag_waits_for_every_independent_holder() {
    let workers: Vec<String> = (0..6).map(|i| format!("worker{i}")).collect();
    let mut config = MultiLockConfig::new().with_tag(
        "maintenance",
        ms(1000),
        TagRelationships::cooperative(workers.iter().cloned()),
    );
    for worker in &workers {
        config = config.with_tag(worker.clone(), ms(60_000), TagRelationships::default());
    }
    let (lock, store, _clock) = relational(config);

    let mut grants = JoinSet::new();
    for worker in workers.clone() {
        let lock = lock.clone();
        grants.spawn(async move { lock.acquire(&resource(), &worker).await });
    }
    let mut handles = Vec::new();
    while let Some(joined) = grants.join_next().await {
        handles.push(joined.unwrap().unwrap());
    }
    similar_asserts::assert_eq!(handles.len(), workers.len());
    for worker in &workers {
        similar_asserts::assert_eq!(holders(&store, worker), 1);
    }

    while let Some(handle) = handles.pop() {
        let err = lock.acquire(&resource(), "maintenance").await.unwrap_err();
        similar_asserts::assert_eq!(err.kind(), ErrorKind::CooperativeLock);
        lock.release(&resource(), &handle).await.unwrap();
    }
    lock.acquire(&resource(), "maintenance").await.unwrap();
}

#[tokio::test]
async fn missing_resource_is_not_a_conflict() {
    let (lock, _store, _clock) = relational(pair());
    let err = lock.acquire(&missing_resource(), "a").await.unwrap_err();
    similar_asserts::assert_eq!(err.kind(), ErrorKind::ResourceNotFound);
}

#[tokio::test]
async fn per_call_graph_replaces_the_configured_one() {
    let (lock, _store, _clock) = relational(pair());
    lock.acquire(&resource(), "a").await.unwrap();

    let independent = LockOverrides::new().with_relationships(RelationshipGraph::new());
    let b = lock.acquire_with(&resource(), "b", &independent).await.unwrap();

    // a is now blocked by b under the configured graph
    similar_asserts::assert_eq!(
        lock.acquire(&resource(), "a").await.unwrap_err().kind(),
        ErrorKind::CooperativeLock
    );
    lock.release(&resource(), &b).await.unwrap();
}

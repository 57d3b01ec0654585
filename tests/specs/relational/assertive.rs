//! Assertive relationship specs
//!
//! An assertive grant is recorded immediately and reported pending until
//! the tags it defers to are free as of the grant time.

use crate::prelude::*;

fn b_over_a() -> MultiLockConfig {
    MultiLockConfig::new()
        .with_tag("a", ms(1000), TagRelationships::default())
        .with_tag("b", ms(1000), TagRelationships::assertive(["a"]))
}

fn pending_handle(err: LockError) -> LockHandle {
    match err {
        LockError::AssertiveLock { handle } => handle,
        other => panic!("Expected AssertiveLock, got {:?}", other),
    }
}

#[tokio::test]
async fn pending_grant_is_persisted_and_reverifies_once_free() {
    let (lock, store, _clock) = relational(b_over_a());

    let a = lock.acquire(&resource(), "a").await.unwrap();
    let pending = pending_handle(lock.acquire(&resource(), "b").await.unwrap_err());
    similar_asserts::assert_eq!(pending.tag, "b");

    let recorded = holders_of(&store.documents("lock")[0], "b");
    similar_asserts::assert_eq!(recorded.len(), 1);
    similar_asserts::assert_eq!(recorded[0].id, pending.id);
    similar_asserts::assert_eq!(recorded[0].timestamp, pending.timestamp);

    let still = lock.reverify(&resource(), &pending).await.unwrap_err();
    similar_asserts::assert_eq!(still.kind(), ErrorKind::AssertiveLock);
    similar_asserts::assert_eq!(still.granted_handle(), Some(&pending));

    lock.release(&resource(), &a).await.unwrap();
    let granted = lock.reverify(&resource(), &pending).await.unwrap();
    similar_asserts::assert_eq!(granted, pending);
    // reverify never writes a second record
    similar_asserts::assert_eq!(holders(&store, "b"), 1);
}

#[tokio::test]
async fn assertive_holder_does_not_block_its_dependency() {
    let (lock, _store, _clock) = relational(b_over_a());

    lock.acquire(&resource(), "b").await.unwrap();
    lock.acquire(&resource(), "a").await.unwrap();
}

#[tokio::test]
async fn pending_grant_can_be_released() {
    let (lock, store, _clock) = relational(b_over_a());

    lock.acquire(&resource(), "a").await.unwrap();
    let pending = pending_handle(lock.acquire(&resource(), "b").await.unwrap_err());

    lock.release(&resource(), &pending).await.unwrap();
    similar_asserts::assert_eq!(holders(&store, "b"), 0);
    similar_asserts::assert_eq!(holders(&store, "a"), 1);
}

#[tokio::test]
async fn mixed_relationships_check_both_sides() {
    let config = MultiLockConfig::new()
        .with_tag("read", ms(1000), TagRelationships::default())
        .with_tag("compact", ms(1000), TagRelationships::default())
        .with_tag(
            "write",
            ms(1000),
            TagRelationships::cooperative(["compact"]).with_assertive(["read"]),
        );
    let (lock, store, _clock) = relational(config);

    let compact = lock.acquire(&resource(), "compact").await.unwrap();
    let err = lock.acquire(&resource(), "write").await.unwrap_err();
    similar_asserts::assert_eq!(err.kind(), ErrorKind::CooperativeLock);
    similar_asserts::assert_eq!(holders(&store, "write"), 0);

    lock.release(&resource(), &compact).await.unwrap();
    let read = lock.acquire(&resource(), "read").await.unwrap();
    let pending = pending_handle(lock.acquire(&resource(), "write").await.unwrap_err());
    similar_asserts::assert_eq!(holders(&store, "write"), 1);

    lock.release(&resource(), &read).await.unwrap();
    similar_asserts::assert_eq!(lock.reverify(&resource(), &pending).await.unwrap(), pending);
}

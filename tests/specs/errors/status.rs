//! Error kind specs
//!
//! Every failure carries a machine-readable kind that maps to a transport
//! status.

use crate::prelude::*;

#[tokio::test]
async fn contention_maps_to_conflict() {
    let config = MultiLockConfig::new()
        .with_tag("a", ms(1000), TagRelationships::cooperative(["b"]))
        .with_tag("b", ms(1000), TagRelationships::assertive(["a"]));
    let (lock, _store, _clock) = relational(config);

    let a = lock.acquire(&resource(), "a").await.unwrap();
    let pending = lock.acquire(&resource(), "b").await.unwrap_err();
    similar_asserts::assert_eq!(pending.kind(), ErrorKind::AssertiveLock);
    similar_asserts::assert_eq!(http_status(pending.kind()), 409);

    let handle = pending.granted_handle().cloned().unwrap();
    let blocked = lock.acquire(&resource(), "a").await.unwrap_err();
    similar_asserts::assert_eq!(blocked.kind(), ErrorKind::CooperativeLock);
    similar_asserts::assert_eq!(http_status(blocked.kind()), 409);

    lock.release(&resource(), &a).await.unwrap();
    let gone = lock.release(&resource(), &a).await.unwrap_err();
    similar_asserts::assert_eq!(http_status(gone.kind()), 409);
    lock.release(&resource(), &handle).await.unwrap();
}

#[tokio::test]
async fn missing_resource_maps_to_not_found() {
    let (lock, _store, _clock) = exclusive(WriteLockConfig::new());
    let err = lock.acquire(&missing_resource()).await.unwrap_err();
    similar_asserts::assert_eq!(err.to_string(), "ResourceNotFound");
    similar_asserts::assert_eq!(http_status(err.kind()), 404);
}

#[tokio::test]
async fn store_outage_maps_to_server_error() {
    let store = FakeStore::new();
    store.insert_one("lock", json!({ "_id": 1 }));
    store.fail_updates(1);
    let lock = WriteLock::new(store, WriteLockConfig::new());

    let err = lock.acquire(&resource()).await.unwrap_err();
    assert!(matches!(err, LockError::Db { granted: None, .. }));
    assert!(err.to_string().starts_with("DbError: "));
    similar_asserts::assert_eq!(http_status(err.kind()), 500);
}

#[tokio::test]
async fn malformed_tag_maps_to_bad_request() {
    let (lock, _store, _clock) = relational(MultiLockConfig::new());
    let err = lock.acquire(&resource(), "lock.$where").await.unwrap_err();
    similar_asserts::assert_eq!(err.kind(), ErrorKind::InvalidTag);
    similar_asserts::assert_eq!(http_status(err.kind()), 400);
}

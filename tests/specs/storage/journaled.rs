//! Journaled store specs
//!
//! Lock state written through the journal survives a restart.

use crate::prelude::*;

fn pair() -> MultiLockConfig {
    MultiLockConfig::new()
        .with_tag("a", ms(60_000), TagRelationships::cooperative(["b"]))
        .with_tag("b", ms(60_000), TagRelationships::cooperative(["a"]))
}

#[tokio::test]
async fn cooperative_scenario_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("locks.journal");

    let a = {
        let store = JournaledStore::open(&path).unwrap();
        store.insert_one("lock", json!({ "_id": 1 })).await.unwrap();
        let lock = MultiLock::new(TracedStore::new(store), pair()).unwrap();
        lock.acquire(&resource(), "a").await.unwrap()
    };

    let lock = MultiLock::new(TracedStore::new(JournaledStore::open(&path).unwrap()), pair()).unwrap();
    similar_asserts::assert_eq!(
        lock.acquire(&resource(), "b").await.unwrap_err().kind(),
        ErrorKind::CooperativeLock
    );
    lock.release(&resource(), &a).await.unwrap();
    lock.acquire(&resource(), "b").await.unwrap();

    let docs = lock.store().inner().documents("lock").await;
    assert!(holders_of(&docs[0], "a").is_empty());
    similar_asserts::assert_eq!(holders_of(&docs[0], "b").len(), 1);
}

#[tokio::test]
async fn write_lock_fence_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("locks.journal");
    let config = WriteLockConfig::new().with_lock_timeout(ms(60_000));

    let token = {
        let store = JournaledStore::open(&path).unwrap();
        store.insert_one("lock", json!({ "_id": 1 })).await.unwrap();
        WriteLock::new(store, config.clone())
            .acquire(&resource())
            .await
            .unwrap()
    };

    let lock = WriteLock::new(JournaledStore::open(&path).unwrap(), config);
    similar_asserts::assert_eq!(
        lock.acquire(&resource()).await.unwrap_err().kind(),
        ErrorKind::LockAlreadyTaken
    );
    lock.release(&resource(), Some(token)).await.unwrap();
    lock.acquire(&resource()).await.unwrap();
}

//! Shared fixtures for coordinator specs

pub use serde_json::json;
pub use std::time::Duration;
pub use taglock_adapters::{http_status, FakeStore, TracedStore};
pub use taglock_core::{
    holders_of, Clock, ErrorKind, FakeClock, LockError, LockHandle, LockOverrides, MemoryStore,
    MultiLock, MultiLockConfig, Predicate, RelationshipGraph, SequentialIdGen, TagRelationships,
    WriteLock, WriteLockConfig, WriteLockState,
};
pub use taglock_storage::JournaledStore;

pub type Relational = MultiLock<MemoryStore, FakeClock, SequentialIdGen>;
pub type Exclusive = WriteLock<MemoryStore, FakeClock>;

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Filter selecting the seeded resource
pub fn resource() -> Predicate {
    Predicate::eq("_id", 1)
}

/// Filter selecting nothing
pub fn missing_resource() -> Predicate {
    Predicate::eq("_id", 404)
}

/// Store holding a single lockable resource `{_id: 1}`
pub fn seeded() -> MemoryStore {
    let store = MemoryStore::new();
    store.insert_one("lock", json!({ "_id": 1 }));
    store
}

/// Relational coordinator on a fresh store with a controllable clock
pub fn relational(config: MultiLockConfig) -> (Relational, MemoryStore, FakeClock) {
    let store = seeded();
    let clock = FakeClock::new();
    let lock = MultiLock::new(store.clone(), config)
        .unwrap()
        .with_clock(clock.clone())
        .with_id_gen(SequentialIdGen::new("holder"));
    (lock, store, clock)
}

/// Write lock coordinator on a fresh store with a controllable clock
pub fn exclusive(config: WriteLockConfig) -> (Exclusive, MemoryStore, FakeClock) {
    let store = seeded();
    let clock = FakeClock::new();
    let lock = WriteLock::new(store.clone(), config).with_clock(clock.clone());
    (lock, store, clock)
}

/// Holder records currently stored for `tag` on the seeded resource
pub fn holders(store: &MemoryStore, tag: &str) -> usize {
    holders_of(&store.documents("lock")[0], tag).len()
}

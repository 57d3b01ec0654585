//! Staleness specs
//!
//! A holder older than its tag's timeout stops blocking dependents without
//! being released.

use crate::prelude::*;

fn config() -> MultiLockConfig {
    MultiLockConfig::new()
        .with_tag("fast", ms(100), TagRelationships::default())
        .with_tag("slow", ms(1000), TagRelationships::default())
        .with_tag("dependent", ms(1000), TagRelationships::cooperative(["fast", "slow"]))
        .with_tag("pending", ms(1000), TagRelationships::assertive(["slow"]))
}

#[tokio::test]
async fn dependent_succeeds_exactly_at_the_timeout() {
    let (lock, store, clock) = relational(config());
    let t0 = clock.now_millis();

    lock.acquire(&resource(), "slow").await.unwrap();
    similar_asserts::assert_eq!(
        lock.acquire(&resource(), "dependent").await.unwrap_err().kind(),
        ErrorKind::CooperativeLock
    );

    clock.set(t0 + 999);
    similar_asserts::assert_eq!(
        lock.acquire(&resource(), "dependent").await.unwrap_err().kind(),
        ErrorKind::CooperativeLock
    );

    clock.set(t0 + 1000);
    lock.acquire(&resource(), "dependent").await.unwrap();
    // the stale record is ignored, not removed
    similar_asserts::assert_eq!(holders(&store, "slow"), 1);
}

#[tokio::test]
async fn each_related_tag_uses_its_own_timeout() {
    let (lock, _store, clock) = relational(config());
    let t0 = clock.now_millis();

    lock.acquire(&resource(), "fast").await.unwrap();
    clock.set(t0 + 100);
    lock.acquire(&resource(), "dependent").await.unwrap();

    lock.acquire(&resource(), "slow").await.unwrap();
    clock.set(t0 + 1099);
    similar_asserts::assert_eq!(
        lock.acquire(&resource(), "dependent").await.unwrap_err().kind(),
        ErrorKind::CooperativeLock
    );
    clock.set(t0 + 1100);
    lock.acquire(&resource(), "dependent").await.unwrap();
}

#[tokio::test]
async fn one_live_holder_keeps_the_tag_busy() {
    let (lock, _store, clock) = relational(config());
    let t0 = clock.now_millis();

    lock.acquire(&resource(), "slow").await.unwrap();
    clock.set(t0 + 800);
    lock.acquire(&resource(), "slow").await.unwrap();

    clock.set(t0 + 1200);
    similar_asserts::assert_eq!(
        lock.acquire(&resource(), "dependent").await.unwrap_err().kind(),
        ErrorKind::CooperativeLock
    );
    clock.set(t0 + 1800);
    lock.acquire(&resource(), "dependent").await.unwrap();
}

#[tokio::test]
async fn reverify_judges_staleness_at_grant_time() {
    let (lock, _store, clock) = relational(config());
    let t0 = clock.now_millis();

    lock.acquire(&resource(), "slow").await.unwrap();
    clock.set(t0 + 500);
    let pending = lock
        .acquire(&resource(), "pending")
        .await
        .unwrap_err()
        .granted_handle()
        .cloned()
        .unwrap();
    similar_asserts::assert_eq!(pending.timestamp, t0 + 500);

    // wall-clock time passing does not change the verdict for this grant
    clock.set(t0 + 10_000);
    similar_asserts::assert_eq!(
        lock.reverify(&resource(), &pending).await.unwrap_err().kind(),
        ErrorKind::AssertiveLock
    );

    // a fresh grant made after the holder went stale passes straight away
    lock.acquire(&resource(), "pending").await.unwrap();
}

//! Retention tests: the table must never keep a record alive on its own.
//!
//! Run with: `cargo test --test retention_test`

mod common;

use common::{interner, raise};
use std::sync::Arc;

#[test]
fn test_canonical_released_when_dropped() {
    let interner = interner();
    let canonical = interner.intern(raise("app.Gone", Some("bye"), "app.Main", None));
    let weak = Arc::downgrade(&canonical);
    assert_eq!(interner.table().len(), 1);

    drop(canonical);
    assert!(weak.upgrade().is_none());
    assert_eq!(interner.table().len(), 0);
}

#[test]
fn test_table_stays_bounded_under_churn() {
    let interner = interner();
    for round in 0..10_000 {
        // a handful of distinct messages, none retained by the caller
        let message = format!("transient {}", round % 4);
        let record = interner.intern(raise("app.Churn", Some(&message), "app.Loop", None));
        drop(record);
        assert!(interner.table().slot_count() <= 4);
    }
    assert_eq!(interner.table().len(), 0);
    assert!(interner.purge() <= 4);
    assert_eq!(interner.table().slot_count(), 0);
}

#[test]
fn test_new_canonical_after_release() {
    let interner = interner();
    let first = interner.intern(raise("app.Again", Some("again"), "app.Main", None));
    drop(first);

    let second = raise("app.Again", Some("again"), "app.Main", None);
    let canonical = interner.intern(second.clone());
    assert!(Arc::ptr_eq(&canonical, &second));
    assert_eq!(interner.stats().misses, 2);
}

#[test]
fn test_cause_kept_alive_by_wrapper_only() {
    let interner = interner();
    let cause = raise("io.Error", Some("reset"), "io.Socket", None);
    let weak_cause = Arc::downgrade(&cause);
    let wrapper = interner.intern(raise("app.Failed", Some("request"), "app.Handler", Some(cause)));

    assert!(weak_cause.upgrade().is_some());
    drop(wrapper);
    assert!(weak_cause.upgrade().is_none());
}

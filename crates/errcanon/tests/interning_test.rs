//! Behavioural tests for `Interner::intern`.
//!
//! Run with: `cargo test --test interning_test`

mod common;

use common::{interner, layout, raise, stack};
use errcanon::{ClassId, CompactValue, Config, Interner, StackFrame, compare_arrays};

use std::sync::Arc;

// ============================================================================
// Canonicalization
// ============================================================================

#[test]
fn test_intern_is_idempotent() {
    let interner = interner();
    let first = interner.intern(raise("app.Closed", Some("closed"), "app.Pool", None));
    let again = interner.intern(first.clone());
    assert!(Arc::ptr_eq(&first, &again));
    assert!(Arc::ptr_eq(&interner.intern(again.clone()), &first));
}

#[test]
fn test_first_submission_is_canonical() {
    let interner = interner();
    let record = raise("app.Closed", Some("closed"), "app.Pool", None);
    let canonical = interner.intern(record.clone());
    assert!(Arc::ptr_eq(&record, &canonical));
}

#[test]
fn test_equivalent_records_share_canonical() {
    let interner = interner();
    let a = interner.intern(raise("app.Closed", Some("closed"), "app.Pool", None));
    let b = interner.intern(raise("app.Closed", Some("closed"), "app.Pool", None));
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(interner.table().len(), 1);
}

#[test]
fn test_equivalent_records_without_message() {
    let interner = interner();
    let a = interner.intern(raise("app.Closed", None, "app.Pool", None));
    let b = interner.intern(raise("app.Closed", None, "app.Pool", None));
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn test_message_text_separates() {
    let interner = interner();
    let a = interner.intern(raise("app.Closed", Some("closed"), "app.Pool", None));
    let b = interner.intern(raise("app.Closed", Some("closed!"), "app.Pool", None));
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(interner.table().len(), 2);
}

#[test]
fn test_missing_message_separates() {
    let interner = interner();
    let a = interner.intern(raise("app.Closed", Some("closed"), "app.Pool", None));
    let b = interner.intern(raise("app.Closed", None, "app.Pool", None));
    assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn test_class_separates() {
    let interner = interner();
    let a = interner.intern(raise("app.Closed", Some("closed"), "app.Pool", None));
    let b = interner.intern(raise("app.Reset", Some("closed"), "app.Pool", None));
    assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn test_call_site_separates() {
    let interner = interner();
    let a = interner.intern(raise("app.Closed", None, "app.Pool", None));
    let b = interner.intern(raise("app.Closed", None, "app.Client", None));
    assert!(!Arc::ptr_eq(&a, &b));
    assert_ne!(interner.strategy().hash(&a), interner.strategy().hash(&b));

    // same informative frame, different position data: same hash, unequal
    let c = layout()
        .record(ClassId::named("app.Closed"))
        .compact(stack("app.Pool", 99))
        .build();
    let c = interner.intern(c);
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(interner.strategy().hash(&a), interner.strategy().hash(&c));
}

#[test]
fn test_short_compact_stack_interns_once() {
    let interner = interner();
    let short = || {
        CompactValue::objects([
            CompactValue::objects([
                CompactValue::Class(ClassId::named("short.Ctor")),
                CompactValue::Class(ClassId::named("short.Fill")),
                CompactValue::Class(ClassId::named("short.Main")),
            ]),
            CompactValue::ints(&[1, 2, 3]),
            CompactValue::Null,
            CompactValue::Null,
            CompactValue::Null,
        ])
    };
    let raise_with = |prefix: &str| {
        let frames = (0..7).map(|i| StackFrame::new(&format!("{prefix}.C{i}"), "run")).collect();
        layout().record(ClassId::named("app.Short")).compact(short()).frames(frames).build()
    };

    let a = interner.intern(raise_with("x"));
    let b = interner.intern(raise_with("y"));
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(interner.table().len(), 1);

    let lazy = layout().record(ClassId::named("app.Short")).compact(short()).build();
    assert!(Arc::ptr_eq(&interner.intern(lazy.clone()), &a));
    assert!(!lazy.has_materialized_trace());
}

// ============================================================================
// Cause chains
// ============================================================================

#[test]
fn test_cause_chain_sensitivity() {
    let interner = interner();
    let io = raise("io.Error", Some("broken pipe"), "io.Socket", None);
    let tls = raise("tls.Error", Some("bad record"), "tls.Stream", None);

    let a = interner.intern(raise("app.Failed", Some("request"), "app.Handler", Some(io)));
    let b = interner.intern(raise("app.Failed", Some("request"), "app.Handler", Some(tls)));
    let c = interner.intern(raise("app.Failed", Some("request"), "app.Handler", None));
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
    assert!(!Arc::ptr_eq(&b, &c));
}

#[test]
fn test_equal_cause_chains_share_canonical() {
    let interner = interner();
    let chain = || {
        let root = raise("io.Error", Some("broken pipe"), "io.Socket", None);
        let mid = raise("tls.Error", None, "tls.Stream", Some(root));
        raise("app.Failed", Some("request"), "app.Handler", Some(mid))
    };
    let a = interner.intern(chain());
    let b = interner.intern(chain());
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn test_shared_cause_not_copied() {
    let interner = interner();
    let cause = raise("io.Error", Some("broken pipe"), "io.Socket", None);
    let a = interner.intern(raise("app.Failed", None, "app.Handler", Some(cause.clone())));
    assert!(Arc::ptr_eq(a.cause().unwrap(), &cause));
}

// ============================================================================
// Degradation
// ============================================================================

#[test]
fn test_unavailable_compact_returns_input() {
    let interner = interner();
    let bare = layout()
        .record(ClassId::named("app.Bare"))
        .message("no stack")
        .frames(vec![StackFrame::new("app.Main", "run")])
        .build();
    let out = interner.intern(bare.clone());
    assert!(Arc::ptr_eq(&out, &bare));
    assert!(interner.table().is_empty());
    assert_eq!(interner.table().slot_count(), 0);
}

#[test]
fn test_wrong_shape_compact_returns_input() {
    let interner = interner();
    let four = CompactValue::objects([
        CompactValue::Null,
        CompactValue::Null,
        CompactValue::Null,
        CompactValue::Null,
    ]);
    let legacy = layout().record(ClassId::named("app.Legacy")).compact(four).build();
    let out = interner.intern(legacy.clone());
    assert!(Arc::ptr_eq(&out, &legacy));
    assert_eq!(interner.table().slot_count(), 0);
}

#[test]
fn test_disabled_by_properties() {
    let config = Config::from_properties("disposer.debug=off").unwrap();
    let interner = Interner::from_config(&layout(), &config).unwrap();

    let a = raise("app.Closed", Some("closed"), "app.Pool", None);
    let b = raise("app.Closed", Some("closed"), "app.Pool", None);
    assert!(Arc::ptr_eq(&interner.intern(a.clone()), &a));
    assert!(Arc::ptr_eq(&interner.intern(b.clone()), &b));
    assert!(interner.table().is_empty());
}

#[test]
fn test_interning_does_not_materialize_traces() {
    let interner = interner();
    let a = interner.intern(raise("app.Closed", None, "app.Pool", None));
    let b = raise("app.Closed", None, "app.Pool", None);
    let _ = interner.intern(b.clone());
    assert!(!a.has_materialized_trace());
    assert!(!b.has_materialized_trace());
}

// ============================================================================
// Structural array equality
// ============================================================================

#[test]
fn test_deep_structural_equality() {
    let x = CompactValue::Class(ClassId::named("X"));
    let y = CompactValue::Class(ClassId::named("Y"));
    let build = |positions: &[i32]| {
        CompactValue::objects([
            CompactValue::objects([CompactValue::text("A")]),
            CompactValue::ints(positions),
            x.clone(),
            y.clone(),
            CompactValue::objects([
                CompactValue::Class(ClassId::named("C1")),
                CompactValue::Class(ClassId::named("C2")),
            ]),
        ])
    };

    assert!(compare_arrays(&build(&[1, 2, 3]), &build(&[1, 2, 3])));
    assert!(!compare_arrays(&build(&[1, 2, 3]), &build(&[1, 2, 4])));
}

// Common test utilities for integration tests
//
// Builders for records with a hand-made compact stack, so tests control
// exactly which call site and position data each record carries.

#![allow(dead_code)]

use errcanon::{ClassId, CompactValue, Config, ErrorRecord, HostLayout, Interner, LayoutFamily};
use std::sync::Arc;

/// Frames per hand-made stack; index 5 is the informative one.
pub const DEPTH: usize = 8;

/// Layout used by every helper.
pub fn layout() -> HostLayout {
    HostLayout::for_family(LayoutFamily::Standard)
}

/// A fresh interner validated against `layout()`.
pub fn interner() -> Interner {
    Interner::from_config(&layout(), &Config::default()).expect("standard layout must validate")
}

/// A five-element compact stack whose informative frame belongs to `site`
/// and whose position array ends with `line`.
pub fn stack(site: &str, line: i32) -> CompactValue {
    let frames = (0..DEPTH).map(|i| {
        let name = if i == 5 { site.to_string() } else { format!("runtime.Frame{i}") };
        CompactValue::Class(ClassId::named(&name))
    });
    CompactValue::objects([
        CompactValue::objects(frames),
        CompactValue::ints(&[1, 2, line]),
        CompactValue::objects([CompactValue::text("A")]),
        CompactValue::shorts(&[4, 5]),
        CompactValue::Null,
    ])
}

/// A record of `class` raised at `site`, optionally with a message and cause.
pub fn raise(
    class: &str,
    message: Option<&str>,
    site: &str,
    cause: Option<Arc<ErrorRecord>>,
) -> Arc<ErrorRecord> {
    let mut builder = layout().record(ClassId::named(class)).compact(stack(site, 3));
    if let Some(message) = message {
        builder = builder.message(message);
    }
    if let Some(cause) = cause {
        builder = builder.cause(cause);
    }
    builder.build()
}

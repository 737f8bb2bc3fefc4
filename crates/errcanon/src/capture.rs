//! Records built from live call stacks.
//!
//! Capturing keeps the backtrace unresolved. The compact chunk holds one
//! origin class per frame (the frame's function start address) and the raw
//! instruction pointers; symbol names, files and lines are only looked up if
//! someone asks for `ErrorRecord::stack_trace`.

use crate::class::ClassId;
use crate::compact::CompactValue;
use crate::frame::StackFrame;
use crate::layout::HostLayout;
use crate::record::ErrorRecord;
use backtrace::Backtrace;
use std::sync::Arc;

const UNKNOWN_CLASS: &str = "<unknown>";

impl ErrorRecord {
    /// Captures the current call stack into a record of `class` in the
    /// native layout.
    ///
    /// # Example
    ///
    /// ```
    /// use errcanon::{ClassId, ErrorRecord};
    ///
    /// let record = ErrorRecord::capture(ClassId::named("app.Timeout"), Some("slow peer"), None);
    /// assert_eq!(record.message(), Some("slow peer"));
    /// assert!(!record.has_materialized_trace());
    /// ```
    #[must_use]
    pub fn capture(
        class: ClassId,
        message: Option<&str>,
        cause: Option<Arc<ErrorRecord>>,
    ) -> Arc<ErrorRecord> {
        let trace = Backtrace::new_unresolved();
        let mut builder = HostLayout::native()
            .record(class)
            .compact(compact_from(&trace));
        if let Some(message) = message {
            builder = builder.message(message);
        }
        if let Some(cause) = cause {
            builder = builder.cause(cause);
        }
        builder.captured(trace).build()
    }
}

/// Encodes an unresolved backtrace as a five-element compact chunk:
/// `[origins, instruction pointers, [depth], Null, Null]`.
pub(crate) fn compact_from(trace: &Backtrace) -> CompactValue {
    let frames = trace.frames();
    let origins = frames
        .iter()
        .map(|frame| CompactValue::Class(ClassId::at_address(frame.symbol_address() as usize)));
    let ips: Vec<u64> = frames.iter().map(|frame| frame.ip() as usize as u64).collect();
    let depth = i32::try_from(frames.len()).unwrap_or(i32::MAX);

    CompactValue::objects([
        CompactValue::objects(origins),
        CompactValue::words(&ips),
        CompactValue::ints(&[depth]),
        CompactValue::Null,
        CompactValue::Null,
    ])
}

/// Resolves symbols and converts each frame into a `StackFrame`.
pub(crate) fn resolve_frames(trace: &Backtrace) -> Arc<[StackFrame]> {
    let mut resolved = trace.clone();
    resolved.resolve();

    resolved
        .frames()
        .iter()
        .flat_map(|frame| {
            let symbols = frame.symbols();
            if symbols.is_empty() {
                let ip = frame.ip() as usize;
                return vec![StackFrame::new(UNKNOWN_CLASS, &format!("{ip:#x}"))];
            }
            symbols
                .iter()
                .map(|symbol| {
                    let name = symbol
                        .name()
                        .map_or_else(|| UNKNOWN_CLASS.to_string(), |n| format!("{n:#}"));
                    let (class, method) = split_path(&name);
                    StackFrame {
                        class_name: class.into(),
                        method_name: method.into(),
                        file: symbol
                            .filename()
                            .map(|path| Arc::from(&*path.to_string_lossy())),
                        line: symbol.lineno(),
                    }
                })
                .collect()
        })
        .collect()
}

/// Splits `a::b::c` into `("a::b", "c")`.
fn split_path(name: &str) -> (&str, &str) {
    match name.rsplit_once("::") {
        Some((class, method)) => (class, method),
        None => (UNKNOWN_CLASS, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compact::compare_arrays;
    use crate::layout::COMPACT_LEN;

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("app::net::connect"), ("app::net", "connect"));
        assert_eq!(split_path("main"), (UNKNOWN_CLASS, "main"));
    }

    #[test]
    fn test_compact_shape() {
        let trace = Backtrace::new_unresolved();
        let compact = compact_from(&trace);
        let parts = compact.as_objects().unwrap();
        assert_eq!(parts.len(), COMPACT_LEN);

        let origins = parts[0].as_objects().unwrap();
        assert_eq!(origins.len(), trace.frames().len());
        assert!(origins.iter().all(|o| o.as_class().is_some()));
        assert!(matches!(&parts[1], CompactValue::Words(ips) if ips.len() == origins.len()));
    }

    #[test]
    fn test_origins_keyed_by_symbol_address() {
        let trace = Backtrace::new_unresolved();
        let compact = compact_from(&trace);
        let origins = compact.as_objects().unwrap()[0].as_objects().unwrap();
        for (origin, frame) in origins.iter().zip(trace.frames()) {
            let expected = ClassId::at_address(frame.symbol_address() as usize);
            assert_eq!(origin.as_class(), Some(expected));
        }

        // a second encoding of the same trace reuses the registered classes
        let again = compact_from(&trace);
        assert!(compare_arrays(&compact, &again));
    }

    #[test]
    fn test_capture_defers_resolution() {
        let record = ErrorRecord::capture(ClassId::named("test.Captured"), None, None);
        assert!(!record.has_materialized_trace());

        let frames = record.stack_trace().len();
        assert!(record.has_materialized_trace());
        assert_eq!(record.stack_trace().len(), frames);
    }
}

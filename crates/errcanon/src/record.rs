//! Error records as laid out by a host runtime.
//!
//! A record is immutable once built and is always shared through an `Arc`.
//! Its message and compact stack live in word-aligned slots of the record
//! body, at the offsets chosen by the `HostLayout` that built it. The cause
//! is a shared reference: many records may point at the same cause, and
//! interning never copies it.

use crate::class::ClassId;
use crate::compact::CompactValue;
use crate::frame::StackFrame;
use crate::layout::{HostLayout, WORD};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Content of one body slot.
#[derive(Debug, Clone)]
pub enum Field {
    /// Unset slot.
    Empty,
    /// String reference.
    Text(Arc<str>),
    /// Compact stack data.
    Value(CompactValue),
}

impl Field {
    /// Returns the compact value stored in this slot, if any.
    #[must_use]
    pub fn as_value(&self) -> Option<&CompactValue> {
        match self {
            Field::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the string stored in this slot, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<&Arc<str>> {
        match self {
            Field::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Where the public frame sequence comes from.
pub(crate) enum FrameSource {
    /// Frames were supplied at build time, or there are none.
    Given,
    /// Frames are resolved from a live capture on first request.
    #[cfg(feature = "capture")]
    Captured(backtrace::Backtrace),
}

/// A captured error.
pub struct ErrorRecord {
    class: ClassId,
    message_slot: usize,
    body: Box<[Field]>,
    cause: Option<Arc<ErrorRecord>>,
    frames: OnceLock<Arc<[StackFrame]>>,
    source: FrameSource,
}

impl ErrorRecord {
    /// The concrete class of this error.
    #[must_use]
    pub fn class(&self) -> ClassId {
        self.class
    }

    /// The detail message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.body
            .get(self.message_slot)
            .and_then(Field::as_text)
            .map(|text| &**text)
    }

    /// The underlying error, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&Arc<ErrorRecord>> {
        self.cause.as_ref()
    }

    /// Reads the slot at byte `offset` of the record body.
    ///
    /// Returns `None` for offsets that are not word aligned or lie outside
    /// the body.
    #[must_use]
    pub fn read_field(&self, offset: u32) -> Option<&Field> {
        if offset % WORD != 0 {
            return None;
        }
        self.body.get((offset / WORD) as usize)
    }

    /// The public stack trace.
    ///
    /// For captured records the frames are resolved on the first call and
    /// then kept for the life of the record.
    pub fn stack_trace(&self) -> &[StackFrame] {
        self.frames.get_or_init(|| match &self.source {
            FrameSource::Given => Arc::from(Vec::<StackFrame>::new()),
            #[cfg(feature = "capture")]
            FrameSource::Captured(trace) => crate::capture::resolve_frames(trace),
        })
    }

    /// Returns `true` once the public stack trace has been materialized.
    #[must_use]
    pub fn has_materialized_trace(&self) -> bool {
        self.frames.get().is_some()
    }

    /// Iterates over this record followed by its causes.
    pub fn chain(&self) -> impl Iterator<Item = &ErrorRecord> {
        std::iter::successors(Some(self), |record| record.cause().map(AsRef::as_ref))
    }
}

impl fmt::Debug for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorRecord")
            .field("class", &self.class.name())
            .field("message", &self.message())
            .field("cause", &self.cause)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(message) => write!(f, "{}: {message}", self.class),
            None => write!(f, "{}", self.class),
        }
    }
}

/// Builder for `ErrorRecord`, obtained from `HostLayout::record`.
///
/// # Example
///
/// ```
/// use errcanon::{ClassId, HostLayout, LayoutFamily, StackFrame};
///
/// let layout = HostLayout::for_family(LayoutFamily::Standard);
/// let cause = layout.record(ClassId::named("io.Error")).build();
/// let record = layout
///     .record(ClassId::named("app.Failed"))
///     .message("wrapped")
///     .cause(cause.clone())
///     .frames(vec![StackFrame::new("a.B", "run")])
///     .build();
///
/// assert_eq!(record.message(), Some("wrapped"));
/// assert!(std::sync::Arc::ptr_eq(record.cause().unwrap(), &cause));
/// assert_eq!(record.stack_trace().len(), 1);
/// ```
pub struct RecordBuilder {
    class: ClassId,
    message_slot: usize,
    stack_slot: usize,
    body: Vec<Field>,
    cause: Option<Arc<ErrorRecord>>,
    frames: Option<Arc<[StackFrame]>>,
    source: FrameSource,
}

impl RecordBuilder {
    pub(crate) fn new(layout: &HostLayout, class: ClassId) -> Self {
        RecordBuilder {
            class,
            message_slot: (layout.message_offset() / WORD) as usize,
            stack_slot: (layout.stack_offset() / WORD) as usize,
            body: vec![Field::Empty; layout.body_words()],
            cause: None,
            frames: None,
            source: FrameSource::Given,
        }
    }

    /// Sets the detail message.
    #[must_use]
    pub fn message(mut self, message: &str) -> Self {
        self.body[self.message_slot] = Field::Text(message.into());
        self
    }

    /// Sets the cause.
    #[must_use]
    pub fn cause(mut self, cause: Arc<ErrorRecord>) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Stores a compact stack representation in the hidden slot.
    #[must_use]
    pub fn compact(mut self, compact: CompactValue) -> Self {
        self.body[self.stack_slot] = Field::Value(compact);
        self
    }

    /// Sets the public stack trace eagerly.
    #[must_use]
    pub fn frames(mut self, frames: Vec<StackFrame>) -> Self {
        self.frames = Some(frames.into());
        self
    }

    #[cfg(feature = "capture")]
    pub(crate) fn captured(mut self, trace: backtrace::Backtrace) -> Self {
        self.source = FrameSource::Captured(trace);
        self
    }

    /// Finishes the record.
    #[must_use]
    pub fn build(self) -> Arc<ErrorRecord> {
        let frames = OnceLock::new();
        if let Some(given) = self.frames {
            let _ = frames.set(given);
        }
        Arc::new(ErrorRecord {
            class: self.class,
            message_slot: self.message_slot,
            body: self.body.into_boxed_slice(),
            cause: self.cause,
            frames,
            source: self.source,
        })
    }
}

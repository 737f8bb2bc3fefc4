//! Host object layouts.
//!
//! A host runtime stores an error record as a block of word-aligned slots.
//! The compact stack lives in a hidden slot that is not listed among the
//! declared fields; its position is only known relative to the message
//! field, and that relation differs between layout families.
//!
//! | family       | message offset | stack offset |
//! |--------------|----------------|--------------|
//! | `Compressed` | 12             | 8            |
//! | `Standard`   | 16             | 12           |
//! | `Wide`       | 24             | 16           |

use crate::class::ClassId;
use crate::compact::CompactValue;
use crate::record::{ErrorRecord, RecordBuilder};
use std::sync::{Arc, OnceLock};

/// Slot granularity in bytes.
pub const WORD: u32 = 4;

/// Expected name of the message field.
pub const MESSAGE_FIELD: &str = "detail_message";

/// Position of the message field among the declared fields.
pub const MESSAGE_FIELD_INDEX: usize = 1;

/// Element count of a compact stack chunk in every supported runtime.
pub const COMPACT_LEN: usize = 5;

const PROBE_CLASS: &str = "errcanon.LayoutProbe";

/// Known layout families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutFamily {
    /// 32-bit or compressed references with a 12-byte header.
    Compressed,
    /// Compressed references with a 16-byte header.
    Standard,
    /// Full-width references.
    Wide,
}

impl LayoutFamily {
    /// All known families.
    pub const ALL: [LayoutFamily; 3] = [
        LayoutFamily::Compressed,
        LayoutFamily::Standard,
        LayoutFamily::Wide,
    ];

    /// Byte offset of the message field.
    #[must_use]
    pub const fn message_offset(self) -> u32 {
        match self {
            LayoutFamily::Compressed => 12,
            LayoutFamily::Standard => 16,
            LayoutFamily::Wide => 24,
        }
    }

    /// Byte offset of the hidden compact stack slot.
    #[must_use]
    pub const fn stack_offset(self) -> u32 {
        match self {
            LayoutFamily::Compressed => 8,
            LayoutFamily::Standard => 12,
            LayoutFamily::Wide => 16,
        }
    }

    const fn reference_size(self) -> u32 {
        self.message_offset() - self.stack_offset()
    }

    /// Identifies the family from an observed message offset.
    #[must_use]
    pub fn from_message_offset(offset: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.message_offset() == offset)
    }

    /// Maps an observed message offset to the stack offset of its family.
    #[must_use]
    pub fn stack_offset_for(message_offset: u32) -> Option<u32> {
        Self::from_message_offset(message_offset).map(Self::stack_offset)
    }

    /// The family this process lays its own records out with.
    #[must_use]
    pub const fn native() -> Self {
        if cfg!(target_pointer_width = "64") {
            LayoutFamily::Standard
        } else {
            LayoutFamily::Compressed
        }
    }
}

/// Name and byte offset of a declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name.
    pub name: String,
    /// Byte offset inside the record body.
    pub offset: u32,
}

impl FieldDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub fn new(name: &str, offset: u32) -> Self {
        FieldDescriptor {
            name: name.to_string(),
            offset,
        }
    }
}

/// Introspection surface of a host runtime.
///
/// This is the only place the rest of the crate learns about the host's
/// object layout.
pub trait LayoutProbe {
    /// Fields visible to introspection, in declaration order.
    fn declared_fields(&self) -> &[FieldDescriptor];

    /// A freshly built record, used to check the derived stack slot.
    fn sample(&self) -> Arc<ErrorRecord>;
}

/// A concrete host layout that can build records.
#[derive(Debug)]
pub struct HostLayout {
    family: Option<LayoutFamily>,
    declared: Vec<FieldDescriptor>,
    message_offset: u32,
    stack_offset: u32,
    compact_len: usize,
}

static NATIVE: OnceLock<Arc<HostLayout>> = OnceLock::new();

impl HostLayout {
    /// The layout of a known family.
    #[must_use]
    pub fn for_family(family: LayoutFamily) -> Self {
        let message = family.message_offset();
        let reference = family.reference_size();
        HostLayout {
            family: Some(family),
            declared: vec![
                FieldDescriptor::new("stack_trace", message + reference),
                FieldDescriptor::new(MESSAGE_FIELD, message),
                FieldDescriptor::new("cause", message + 2 * reference),
            ],
            message_offset: message,
            stack_offset: family.stack_offset(),
            compact_len: COMPACT_LEN,
        }
    }

    /// An arbitrary layout, possibly one no family describes.
    ///
    /// Records built from it store their message at `message_offset` and
    /// their compact stack at `stack_offset`, whatever `declared` claims.
    #[must_use]
    pub fn custom(declared: Vec<FieldDescriptor>, message_offset: u32, stack_offset: u32) -> Self {
        HostLayout {
            family: None,
            declared,
            message_offset,
            stack_offset,
            compact_len: COMPACT_LEN,
        }
    }

    /// Sets the element count of the compact chunks this runtime produces.
    #[must_use]
    pub fn with_compact_len(mut self, len: usize) -> Self {
        self.compact_len = len;
        self
    }

    /// The process-wide native layout.
    #[must_use]
    pub fn native() -> Arc<HostLayout> {
        NATIVE
            .get_or_init(|| Arc::new(HostLayout::for_family(LayoutFamily::native())))
            .clone()
    }

    /// The family this layout was built from, if any.
    #[must_use]
    pub fn family(&self) -> Option<LayoutFamily> {
        self.family
    }

    /// Byte offset records store their message at.
    #[must_use]
    pub fn message_offset(&self) -> u32 {
        self.message_offset
    }

    /// Byte offset records store their compact stack at.
    #[must_use]
    pub fn stack_offset(&self) -> u32 {
        self.stack_offset
    }

    /// Number of slots in a record body.
    pub(crate) fn body_words(&self) -> usize {
        let last = self
            .declared
            .iter()
            .map(|f| f.offset)
            .chain([self.message_offset, self.stack_offset])
            .max()
            .unwrap_or(0);
        (last / WORD) as usize + 1
    }

    /// Starts a record of `class` in this layout.
    #[must_use]
    pub fn record(&self, class: ClassId) -> RecordBuilder {
        RecordBuilder::new(self, class)
    }

    /// A placeholder compact chunk with this runtime's element count.
    #[must_use]
    pub fn placeholder_compact(&self) -> CompactValue {
        let frames = CompactValue::objects(
            (0..=COMPACT_LEN).map(|_| CompactValue::Class(ClassId::named(PROBE_CLASS))),
        );
        let mut parts = vec![frames];
        parts.resize(self.compact_len.max(1), CompactValue::Null);
        CompactValue::objects(parts)
    }
}

impl LayoutProbe for HostLayout {
    fn declared_fields(&self) -> &[FieldDescriptor] {
        &self.declared
    }

    fn sample(&self) -> Arc<ErrorRecord> {
        self.record(ClassId::named(PROBE_CLASS))
            .compact(self.placeholder_compact())
            .build()
    }
}

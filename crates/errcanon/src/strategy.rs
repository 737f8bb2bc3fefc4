//! Structural hashing and equality of error records.
//!
//! Two records are equivalent when they share class, message, cause chain
//! and captured stack. Hashing is deliberately shallow: the message when
//! there is one, otherwise the class of the first informative frame.

use crate::accessor::StackAccessor;
use crate::class::fx_hash_str;
use crate::compact::{CompactValue, compare_arrays, first_object_array};
use crate::record::ErrorRecord;

/// Index of the first frame past the error-construction machinery.
pub const INFORMATIVE_FRAME: usize = 5;

/// Longest cause chain that is compared before giving up.
pub const MAX_CAUSE_DEPTH: usize = 1024;

/// Hash and equality over error records.
#[derive(Debug, Clone, Copy)]
pub struct StructuralStrategy {
    accessor: StackAccessor,
}

impl StructuralStrategy {
    /// Creates a strategy reading compact stacks through `accessor`.
    #[must_use]
    pub const fn new(accessor: StackAccessor) -> Self {
        StructuralStrategy { accessor }
    }

    /// Hashes `record`.
    ///
    /// Equivalent records always hash alike: the message is part of
    /// equality, and so is every frame of the stack. A record with a compact
    /// stack is hashed from that stack or its class alone; its public trace
    /// is never materialized here.
    #[must_use]
    pub fn hash(&self, record: &ErrorRecord) -> u64 {
        if let Some(message) = record.message() {
            return fx_hash_str(message);
        }

        if let Some(compact) = self.accessor.compact(record) {
            return first_object_array(compact)
                .and_then(|frames| frames.get(INFORMATIVE_FRAME))
                .and_then(CompactValue::as_class)
                .unwrap_or_else(|| record.class())
                .name_hash();
        }

        match record.stack_trace().get(INFORMATIVE_FRAME) {
            Some(frame) => fx_hash_str(&frame.class_name),
            None => record.class().name_hash(),
        }
    }

    /// Structural equality of `a` and `b`, including their cause chains.
    ///
    /// Chains deeper than `MAX_CAUSE_DEPTH` are reported unequal.
    #[must_use]
    pub fn equals(&self, a: &ErrorRecord, b: &ErrorRecord) -> bool {
        let (mut a, mut b) = (a, b);
        for _ in 0..MAX_CAUSE_DEPTH {
            if std::ptr::eq(a, b) {
                return true;
            }
            if !self.same_frame_data(a, b) {
                return false;
            }
            match (a.cause(), b.cause()) {
                (None, None) => return true,
                (Some(next_a), Some(next_b)) => {
                    a = next_a;
                    b = next_b;
                }
                _ => return false,
            }
        }
        false
    }

    /// Compares one link of two chains, ignoring causes.
    fn same_frame_data(&self, a: &ErrorRecord, b: &ErrorRecord) -> bool {
        if a.class() != b.class() || a.message() != b.message() {
            return false;
        }
        match (self.accessor.compact(a), self.accessor.compact(b)) {
            (Some(x), Some(y)) => {
                std::ptr::eq(x, y)
                    || (x.len() == y.len() && x.iter().zip(y).all(|(l, r)| compare_arrays(l, r)))
            }
            _ => a.stack_trace() == b.stack_trace(),
        }
    }
}

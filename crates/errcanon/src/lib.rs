//! `errcanon`: structural interning of captured error records.
//!
//! Long-running programs that keep many errors around for diagnostics tend
//! to hold thousands of copies of the same logical error: same class, same
//! message, same cause, raised from the same call site. `errcanon` replaces
//! each newly captured record with the first equivalent one it has seen, so
//! only one copy is retained.
//!
//! - **Structural equality** over class, message, cause chain and the
//!   compact call-stack representation
//! - **Cheap hashing** from the message, or from the first informative
//!   frame when there is no message
//! - **Validated layout access**: the compact stack is read from a hidden
//!   slot whose position is probed once at startup
//! - **Weak retention**: the table never keeps a record alive on its own
//!
//! # Example
//!
//! ```rust
//! use errcanon::{ClassId, ErrorRecord, intern};
//! use std::sync::Arc;
//!
//! fn fail() -> Arc<ErrorRecord> {
//!     ErrorRecord::capture(ClassId::named("app.Refused"), Some("connection refused"), None)
//! }
//!
//! let mut kept = Vec::new();
//! for _ in 0..3 {
//!     kept.push(intern(fail()));
//! }
//! assert!(Arc::ptr_eq(&kept[0], &kept[2]));
//! ```
//!
//! # Configuration
//!
//! Setting `ERRCANON_DISPOSER_DEBUG=off` (or `disposer.debug=off` in a
//! properties text passed to `Config::from_properties`) switches compact
//! stack access off; `intern` then returns every record unchanged.

pub mod accessor;
#[cfg(feature = "capture")]
pub mod capture;
pub mod class;
pub mod compact;
pub mod config;
pub mod error;
pub mod frame;
pub mod interner;
pub mod layout;
pub mod record;
pub mod strategy;
pub mod table;

// Re-export commonly used types
pub use accessor::{AccessorState, StackAccessor};
pub use class::ClassId;
pub use compact::{CompactValue, compare_arrays, first_object_array};
pub use config::Config;
pub use error::{Error, Result};
pub use frame::StackFrame;
pub use interner::{InternStats, Interner, intern};
pub use layout::{FieldDescriptor, HostLayout, LayoutFamily, LayoutProbe};
pub use record::{ErrorRecord, Field, RecordBuilder};
pub use strategy::StructuralStrategy;
pub use table::InternTable;

//! Access to the compact stack slot of a record.
//!
//! The slot is hidden from introspection. Its offset is derived once, at
//! startup, from the offset of the message field and the known layout
//! families, then checked against a freshly built record. After that every
//! read is a single slot lookup plus a shape check.

use crate::compact::CompactValue;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::layout::{COMPACT_LEN, LayoutFamily, LayoutProbe, MESSAGE_FIELD, MESSAGE_FIELD_INDEX};
use crate::record::ErrorRecord;
use errcanon_log::{debug, error, info};

/// Outcome of the startup probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorState {
    /// The compact slot sits at `stack_offset`.
    Enabled {
        /// Byte offset of the compact slot.
        stack_offset: u32,
    },
    /// Compact access is off; every read reports unavailable.
    Disabled,
}

/// Validated reader for compact stack representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackAccessor {
    state: AccessorState,
}

impl StackAccessor {
    /// Probes `probe` and builds an accessor.
    ///
    /// With `disposer.debug` switched off nothing is probed and the
    /// accessor is disabled, whatever the layout looks like.
    ///
    /// # Errors
    ///
    /// Returns the layout mismatch if validation fails while compact access
    /// is enabled. Callers are expected to stop: the mismatch means the
    /// host runtime is not the one this build understands.
    ///
    /// # Example
    ///
    /// ```
    /// use errcanon::{Config, HostLayout, LayoutFamily, StackAccessor};
    ///
    /// let layout = HostLayout::for_family(LayoutFamily::Wide);
    /// let accessor = StackAccessor::probe(&layout, &Config::default()).unwrap();
    /// assert_eq!(accessor.stack_offset(), Some(16));
    /// ```
    pub fn probe(probe: &dyn LayoutProbe, config: &Config) -> Result<Self> {
        if !config.disposer_debug {
            debug!("compact stack access switched off by configuration");
            return Ok(Self::disabled());
        }

        match validate(probe) {
            Ok(stack_offset) => {
                info!("compact stack slot validated at offset {stack_offset}");
                Ok(StackAccessor {
                    state: AccessorState::Enabled { stack_offset },
                })
            }
            Err(err) => {
                error!("{err}");
                Err(err)
            }
        }
    }

    /// An accessor that never reports a compact representation.
    #[must_use]
    pub const fn disabled() -> Self {
        StackAccessor {
            state: AccessorState::Disabled,
        }
    }

    /// The probe outcome.
    #[must_use]
    pub fn state(&self) -> AccessorState {
        self.state
    }

    /// The validated stack offset, if enabled.
    #[must_use]
    pub fn stack_offset(&self) -> Option<u32> {
        match self.state {
            AccessorState::Enabled { stack_offset } => Some(stack_offset),
            AccessorState::Disabled => None,
        }
    }

    /// Returns the record's compact representation, or `None` if it is
    /// unavailable.
    ///
    /// A value is returned only if the slot holds an object array of
    /// exactly `COMPACT_LEN` elements. Other shapes come from runtimes that
    /// passed the coarse offset check but lay their chunks out differently.
    #[must_use]
    pub fn compact<'r>(&self, record: &'r ErrorRecord) -> Option<&'r [CompactValue]> {
        let stack_offset = self.stack_offset()?;
        let parts = record.read_field(stack_offset)?.as_value()?.as_objects()?;
        (parts.len() == COMPACT_LEN).then_some(parts)
    }
}

fn validate(probe: &dyn LayoutProbe) -> Result<u32> {
    let field = probe
        .declared_fields()
        .get(MESSAGE_FIELD_INDEX)
        .ok_or(Error::MissingMessageField)?;

    let unknown = || Error::UnknownLayout {
        field: field.name.clone(),
        offset: field.offset,
    };
    if field.name != MESSAGE_FIELD {
        return Err(unknown());
    }
    let stack_offset = LayoutFamily::stack_offset_for(field.offset).ok_or_else(unknown)?;
    debug!(
        "message field `{}` at {} maps to stack offset {stack_offset}",
        field.name, field.offset
    );

    let sample = probe.sample();
    let holds_array = sample
        .read_field(stack_offset)
        .and_then(|slot| slot.as_value())
        .and_then(CompactValue::as_objects)
        .is_some();
    if !holds_array {
        return Err(Error::StackFieldNotArray {
            offset: stack_offset,
        });
    }
    Ok(stack_offset)
}

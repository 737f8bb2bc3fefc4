//! The interning service.
//!
//! An `Interner` pairs a validated `StackAccessor` with a weak `InternTable`.
//! Submitting a record returns the canonical record of its equivalence
//! class: the submitted one if it is the first of its kind, otherwise the
//! one already stored.
//!
//! Records whose compact stack is unavailable are returned untouched and
//! never stored. Comparing them would mean materializing their public stack
//! traces, which costs more memory than interning saves.

use crate::accessor::StackAccessor;
use crate::config::Config;
use crate::error::Result;
use crate::layout::{HostLayout, LayoutProbe};
use crate::record::ErrorRecord;
use crate::strategy::StructuralStrategy;
use crate::table::{InternTable, Slot};
use errcanon_log::{debug, trace};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Counters describing what an interner has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InternStats {
    /// Submissions answered with an already stored record.
    pub hits: u64,
    /// Submissions that became canonical.
    pub misses: u64,
    /// Submissions returned untouched for lack of a compact stack.
    pub skipped: u64,
}

/// Canonicalizes error records by structural equality.
///
/// # Example
///
/// ```
/// use errcanon::{ClassId, Config, HostLayout, Interner, LayoutFamily};
/// use std::sync::Arc;
///
/// let layout = HostLayout::for_family(LayoutFamily::Standard);
/// let interner = Interner::from_config(&layout, &Config::default()).unwrap();
///
/// let make = || {
///     layout
///         .record(ClassId::named("app.Closed"))
///         .message("channel closed")
///         .compact(layout.placeholder_compact())
///         .build()
/// };
///
/// let first = interner.intern(make());
/// let second = interner.intern(make());
/// assert!(Arc::ptr_eq(&first, &second));
/// ```
pub struct Interner {
    strategy: StructuralStrategy,
    accessor: StackAccessor,
    table: InternTable,
    hits: AtomicU64,
    misses: AtomicU64,
    skipped: AtomicU64,
}

static GLOBAL: OnceLock<Interner> = OnceLock::new();

impl Interner {
    /// Creates an interner reading compact stacks through `accessor`.
    #[must_use]
    pub fn new(accessor: StackAccessor) -> Self {
        Interner {
            strategy: StructuralStrategy::new(accessor),
            accessor,
            table: InternTable::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }

    /// Probes `probe` under `config` and creates an interner.
    ///
    /// # Errors
    ///
    /// Returns the layout mismatch if validation fails while compact access
    /// is enabled.
    pub fn from_config(probe: &dyn LayoutProbe, config: &Config) -> Result<Self> {
        if let Some(level) = config.log_level {
            errcanon_log::set_level(level);
        }
        StackAccessor::probe(probe, config).map(Self::new)
    }

    /// Creates an interner for the native layout, configured from the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error for unrecognized configuration values or a layout
    /// mismatch.
    pub fn from_env() -> Result<Self> {
        let config = Config::from_env()?;
        debug!("configuration from environment: {config:?}");
        Self::from_config(HostLayout::native().as_ref(), &config)
    }

    /// The process-wide interner.
    ///
    /// Built from `Interner::from_env` on first use unless `init_global`
    /// ran earlier.
    ///
    /// # Panics
    ///
    /// Panics on first use if the environment holds an invalid value or
    /// the native layout fails validation while compact access is enabled.
    /// The message names the offending field and the `disposer.debug=off`
    /// switch.
    pub fn global() -> &'static Interner {
        GLOBAL.get_or_init(|| Self::from_env().unwrap_or_else(|err| panic!("{err}")))
    }

    /// Installs `interner` as the process-wide interner.
    ///
    /// # Errors
    ///
    /// Hands `interner` back if the global interner already exists.
    pub fn init_global(interner: Interner) -> std::result::Result<&'static Interner, Interner> {
        GLOBAL.set(interner)?;
        Ok(Self::global())
    }

    /// Returns the canonical record equivalent to `record`.
    ///
    /// Never fails: records without a usable compact stack are returned
    /// as they are.
    pub fn intern(&self, record: Arc<ErrorRecord>) -> Arc<ErrorRecord> {
        if self.accessor.compact(&record).is_none() {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            return record;
        }

        let hash = self.strategy.hash(&record);
        let same = |candidate: &ErrorRecord| self.strategy.equals(&record, candidate);

        if let Some(existing) = self.table.find(hash, same) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return existing;
        }

        match self.table.find_or_insert(hash, &record, same) {
            Slot::Existing(existing) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                existing
            }
            Slot::Inserted(canonical) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                trace!("new canonical {} (hash {hash:#x})", canonical.class());
                canonical
            }
        }
    }

    /// Number of live records stored as equivalent to `record`.
    #[must_use]
    pub fn count_equivalent(&self, record: &ErrorRecord) -> usize {
        let hash = self.strategy.hash(record);
        self.table
            .count_matching(hash, |candidate| self.strategy.equals(record, candidate))
    }

    /// Drops dead table entries; returns how many were dropped.
    pub fn purge(&self) -> usize {
        let dropped = self.table.purge();
        debug!("purged {dropped} dead entries");
        dropped
    }

    /// The accessor this interner was built with.
    #[must_use]
    pub fn accessor(&self) -> &StackAccessor {
        &self.accessor
    }

    /// The hash and equality in use.
    #[must_use]
    pub fn strategy(&self) -> &StructuralStrategy {
        &self.strategy
    }

    /// The underlying table.
    #[must_use]
    pub fn table(&self) -> &InternTable {
        &self.table
    }

    /// A snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> InternStats {
        InternStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

/// Interns `record` in the process-wide interner.
///
/// # Panics
///
/// See `Interner::global`.
pub fn intern(record: Arc<ErrorRecord>) -> Arc<ErrorRecord> {
    Interner::global().intern(record)
}

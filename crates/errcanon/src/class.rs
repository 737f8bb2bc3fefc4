//! Class identity for error records.
//!
//! Every distinct class name maps to exactly one `ClassId` for the life of
//! the process, so identity comparison is a pointer comparison and the name
//! hash is computed once.
//!
//! # Thread Safety
//!
//! The registry is split into `NUM_SHARDS` shards, each behind its own
//! `RwLock`. A lookup of an existing class takes one read lock; a new class
//! takes one write lock and re-checks before inserting.

// Allow cast truncation - SHARD_MASK is 15
#![allow(clippy::cast_possible_truncation)]

use fxhash::{FxBuildHasher, FxHasher};
use hashbrown::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{OnceLock, PoisonError, RwLock};

/// Number of registry shards (power of 2 for masking).
const NUM_SHARDS: usize = 16;

const SHARD_MASK: usize = NUM_SHARDS - 1;

/// Interned class data. Leaked on creation, never freed.
struct ClassInfo {
    name: &'static str,
    name_hash: u64,
}

type ClassShard = RwLock<HashMap<&'static str, &'static ClassInfo, FxBuildHasher>>;

struct ClassRegistry {
    shards: [ClassShard; NUM_SHARDS],
}

static REGISTRY: OnceLock<ClassRegistry> = OnceLock::new();

fn registry() -> &'static ClassRegistry {
    REGISTRY.get_or_init(|| ClassRegistry {
        shards: std::array::from_fn(|_| RwLock::new(HashMap::default())),
    })
}

type AddressShard = RwLock<HashMap<usize, ClassId, FxBuildHasher>>;

/// Code addresses already mapped to a class, so repeat lookups skip
/// formatting the name.
static ADDRESSES: OnceLock<[AddressShard; NUM_SHARDS]> = OnceLock::new();

fn addresses() -> &'static [AddressShard; NUM_SHARDS] {
    ADDRESSES.get_or_init(|| std::array::from_fn(|_| RwLock::new(HashMap::default())))
}

/// Hashes a name with `FxHash`, the hash used throughout the crate.
pub(crate) fn fx_hash_str(name: &str) -> u64 {
    let mut hasher = FxHasher::default();
    name.hash(&mut hasher);
    hasher.finish()
}

/// Identity of an error class.
///
/// # Example
///
/// ```
/// use errcanon::ClassId;
///
/// let a = ClassId::named("app.IllegalState");
/// let b = ClassId::named("app.IllegalState");
/// assert_eq!(a, b);
/// assert_eq!(a.name(), "app.IllegalState");
///
/// assert_eq!(ClassId::of::<std::io::Error>(), ClassId::of::<std::io::Error>());
/// ```
#[derive(Clone, Copy)]
pub struct ClassId(&'static ClassInfo);

impl ClassId {
    /// Returns the class registered under `name`, registering it if needed.
    #[must_use]
    pub fn named(name: &str) -> Self {
        let name_hash = fx_hash_str(name);
        let shard = &registry().shards[name_hash as usize & SHARD_MASK];

        {
            let classes = shard.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(info) = classes.get(name) {
                return ClassId(info);
            }
        }

        let mut classes = shard.write().unwrap_or_else(PoisonError::into_inner);

        // Double-check: another thread may have registered it meanwhile
        if let Some(info) = classes.get(name) {
            return ClassId(info);
        }

        let name: &'static str = Box::leak(name.to_owned().into_boxed_str());
        let info: &'static ClassInfo = Box::leak(Box::new(ClassInfo { name, name_hash }));
        classes.insert(name, info);
        ClassId(info)
    }

    /// Returns the class standing for the code at `address`, named by the
    /// address in hex.
    ///
    /// After the first call for an address this is a read-locked map lookup
    /// and allocates nothing.
    #[must_use]
    pub fn at_address(address: usize) -> Self {
        // Code addresses are aligned, drop the low bits before sharding
        let shard = &addresses()[(address >> 4) & SHARD_MASK];

        if let Some(class) = shard.read().unwrap_or_else(PoisonError::into_inner).get(&address) {
            return *class;
        }

        let class = Self::named(&format!("{address:#x}"));
        shard
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address, class);
        class
    }

    /// Returns the class for the Rust type `T`, named by its type path.
    #[must_use]
    pub fn of<T: ?Sized>() -> Self {
        Self::named(std::any::type_name::<T>())
    }

    /// Returns the class name.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.0.name
    }

    /// Returns the precomputed `FxHash` of the class name.
    #[must_use]
    pub fn name_hash(self) -> u64 {
        self.0.name_hash
    }
}

impl PartialEq for ClassId {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.0, other.0)
    }
}

impl Eq for ClassId {}

impl Hash for ClassId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.name_hash);
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClassId").field(&self.0.name).finish()
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.name)
    }
}

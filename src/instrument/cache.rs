//! Process-wide memo of class metadata
//!
//! Entries are keyed by class identity: a [`ClassIdentity`] handle the caller keeps alive for as
//! long as the class it stands for is loaded. The cache itself only holds a [`Weak`] reference to
//! the identity, which it uses to tell whether the entry can still be asked for.
//!
//! Eviction policy:
//!
//!   - lookups populate the cache on a miss ([`MetadataCache::get_or_insert_with`])
//!   - every insertion first drops all entries whose identity has no live handle left
//!   - [`MetadataCache::purge`] does the same sweep on demand
//!   - a lookup never returns an entry whose identity is dead
//!
//! Nothing depends on when exactly an entry goes away: a dropped entry just means the metadata
//! gets recomputed.

use super::metadata::ClassInfo;
use crate::jvm::BinaryName;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

/// Handle standing for one loaded class
///
/// Clones refer to the same class. Two handles created separately are different classes, even
/// with the same name (think of two class loaders defining the same name).
#[derive(Clone)]
pub struct ClassIdentity(Arc<BinaryName>);

impl ClassIdentity {
    pub fn new(name: BinaryName) -> ClassIdentity {
        ClassIdentity(Arc::new(name))
    }

    pub fn name(&self) -> &BinaryName {
        &self.0
    }

    fn key(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl fmt::Debug for ClassIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{:x}", self.0, self.key())
    }
}

struct Entry {
    /// Keeps the identity's allocation (and so the map key) from being reused
    identity: Weak<BinaryName>,
    info: Arc<ClassInfo>,
}

impl Entry {
    fn is_live(&self) -> bool {
        self.identity.strong_count() > 0
    }
}

/// Shared metadata cache
pub struct MetadataCache {
    entries: RwLock<HashMap<usize, Entry>>,
}

static GLOBAL_CACHE: OnceLock<MetadataCache> = OnceLock::new();

impl MetadataCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide cache
    pub fn global() -> &'static MetadataCache {
        GLOBAL_CACHE.get_or_init(MetadataCache::new)
    }

    /// Look up the metadata of a live class
    pub fn get(&self, identity: &ClassIdentity) -> Option<Arc<ClassInfo>> {
        let entries = self.entries.read();
        entries
            .get(&identity.key())
            .filter(|entry| entry.is_live())
            .map(|entry| entry.info.clone())
    }

    /// Record metadata for a class, replacing anything recorded before
    pub fn insert(&self, identity: &ClassIdentity, info: ClassInfo) -> Arc<ClassInfo> {
        let info = Arc::new(info);
        let mut entries = self.entries.write();
        Self::sweep(&mut entries);
        entries.insert(
            identity.key(),
            Entry {
                identity: Arc::downgrade(&identity.0),
                info: info.clone(),
            },
        );
        info
    }

    /// Look up the metadata of a class, computing and recording it on a miss
    ///
    /// `compute` runs without the lock held. If two threads miss at the same time, both compute
    /// and the first to finish wins.
    pub fn get_or_insert_with(
        &self,
        identity: &ClassIdentity,
        compute: impl FnOnce() -> ClassInfo,
    ) -> Arc<ClassInfo> {
        if let Some(info) = self.get(identity) {
            return info;
        }
        let computed = compute();

        let mut entries = self.entries.write();
        if let Some(entry) = entries.get(&identity.key()).filter(|entry| entry.is_live()) {
            return entry.info.clone();
        }
        Self::sweep(&mut entries);
        let info = Arc::new(computed);
        entries.insert(
            identity.key(),
            Entry {
                identity: Arc::downgrade(&identity.0),
                info: info.clone(),
            },
        );
        log::trace!("Cached metadata for {:?}", identity);
        info
    }

    /// Drop the entries of classes that are gone, returning how many were dropped
    pub fn purge(&self) -> usize {
        let mut entries = self.entries.write();
        Self::sweep(&mut entries)
    }

    fn sweep(entries: &mut HashMap<usize, Entry>) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live());
        before - entries.len()
    }

    /// Number of entries, including ones not yet swept
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new()
    }
}

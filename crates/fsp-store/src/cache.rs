use std::collections::{BTreeMap, HashMap};

use fsp_types::{FieldSet, ObjectId, Timestamp};
use tracing::debug;

/// A field set as held by a scope's cache.
#[derive(Clone, Debug, PartialEq)]
pub struct CachedFieldSet {
    pub fields: FieldSet,
    /// When this copy was loaded or stored.
    pub timestamp: Timestamp,
}

impl CachedFieldSet {
    pub fn new(fields: FieldSet, timestamp: Timestamp) -> Self {
        Self { fields, timestamp }
    }
}

struct Slot {
    entry: CachedFieldSet,
    last_used: u64,
}

/// Per-scope cache of field sets with strict least-recently-used eviction.
///
/// Recency is tracked with a monotonically increasing use counter: every
/// [`get`](Self::get) and [`put`](Self::put) stamps the entry with the next
/// value, and eviction removes the entry with the smallest stamp. A capacity
/// of `0` disables eviction.
pub struct ScopedCache {
    capacity: usize,
    entries: HashMap<ObjectId, Slot>,
    recency: BTreeMap<u64, ObjectId>,
    uses: u64,
}

impl ScopedCache {
    /// Create a cache holding at most `capacity` entries (`0` = unbounded).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            uses: 0,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(0)
    }

    /// Look up an entry and mark it most recently used.
    pub fn get(&mut self, id: &ObjectId) -> Option<&CachedFieldSet> {
        let next = self.next_use();
        let slot = self.entries.get_mut(id)?;
        self.recency.remove(&slot.last_used);
        self.recency.insert(next, id.clone());
        slot.last_used = next;
        Some(&slot.entry)
    }

    /// Look up an entry without changing its recency.
    pub fn peek(&self, id: &ObjectId) -> Option<&CachedFieldSet> {
        self.entries.get(id).map(|slot| &slot.entry)
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.entries.contains_key(id)
    }

    /// Insert or replace an entry, marking it most recently used.
    ///
    /// Returns the id evicted to make room, if any.
    pub fn put(&mut self, id: ObjectId, entry: CachedFieldSet) -> Option<ObjectId> {
        let next = self.next_use();
        if let Some(slot) = self.entries.get_mut(&id) {
            self.recency.remove(&slot.last_used);
            self.recency.insert(next, id);
            slot.entry = entry;
            slot.last_used = next;
            return None;
        }

        let evicted = if self.capacity > 0 && self.entries.len() >= self.capacity {
            self.evict_lru()
        } else {
            None
        };

        self.recency.insert(next, id.clone());
        self.entries.insert(
            id,
            Slot {
                entry,
                last_used: next,
            },
        );
        evicted
    }

    /// Remove one entry. Returns `true` if it was cached.
    pub fn invalidate(&mut self, id: &ObjectId) -> bool {
        match self.entries.remove(id) {
            Some(slot) => {
                self.recency.remove(&slot.last_used);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured capacity; `0` means unbounded.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Ids from least to most recently used.
    pub fn ids_by_recency(&self) -> Vec<ObjectId> {
        self.recency.values().cloned().collect()
    }

    fn evict_lru(&mut self) -> Option<ObjectId> {
        let (_, id) = self.recency.pop_first()?;
        self.entries.remove(&id);
        debug!(id = %id, capacity = self.capacity, "evicted least recently used field set");
        Some(id)
    }

    fn next_use(&mut self) -> u64 {
        self.uses += 1;
        self.uses
    }
}

impl std::fmt::Debug for ScopedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedCache")
            .field("capacity", &self.capacity)
            .field("len", &self.entries.len())
            .finish()
    }
}

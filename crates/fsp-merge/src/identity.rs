//! Surrogate identities for elements of an object graph.
//!
//! Rust values have no stable reference identity, so a record is recognised
//! across versions by the surrogate uid persisted with it. An
//! [`IdentitySnapshot`] records which uids one version of a graph contains,
//! in an arena of slots addressed by generation-checked [`Handle`]s.
//! Elements that are not records only have an identity within their own
//! collection; see [`ElementKey`].

use std::collections::HashMap;

use fsp_types::{FieldSet, FieldValue, Record};
use uuid::Uuid;

/// Identity of a sequence element.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKey {
    /// A record, by surrogate uid.
    Surrogate(Uuid),
    /// Anything else, by canonical value and by how many equal values
    /// precede it in the same collection.
    Value { canonical: String, occurrence: usize },
}

impl ElementKey {
    /// Keys for every element of one collection, in order. `resolve` gives
    /// the surrogate uid of each record.
    pub fn for_elements(items: &[FieldValue], mut resolve: impl FnMut(&Record) -> Uuid) -> Vec<Self> {
        let mut occurrences: HashMap<String, usize> = HashMap::new();
        items
            .iter()
            .map(|item| match item {
                FieldValue::Object(record) => Self::Surrogate(resolve(record)),
                other => {
                    let canonical = canonical(other);
                    let seen = occurrences.entry(canonical.clone()).or_insert(0);
                    let occurrence = *seen;
                    *seen += 1;
                    Self::Value {
                        canonical,
                        occurrence,
                    }
                }
            })
            .collect()
    }
}

fn canonical(value: &FieldValue) -> String {
    value
        .canonical_scalar()
        .unwrap_or_else(|| serde_json::to_string(value).unwrap_or_default())
}

/// Arena slot address. Only valid for the snapshot generation that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

struct Slot {
    uid: Uuid,
    fields: FieldSet,
}

/// The records present in one version of an object graph.
#[derive(Default)]
pub struct IdentitySnapshot {
    generation: u32,
    slots: Vec<Slot>,
    by_uid: HashMap<Uuid, Handle>,
}

impl IdentitySnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Walk `root` and register every record in it, however deeply nested.
    pub fn capture(root: &FieldSet) -> Self {
        let mut snapshot = Self::empty();
        snapshot.observe_fields(root);
        snapshot
    }

    /// Register a record. The first observation of a uid wins; later
    /// observations return the existing handle. Records without a uid have
    /// no identity to register.
    pub fn observe(&mut self, record: &Record) -> Option<Handle> {
        let uid = record.uid?;
        if let Some(handle) = self.by_uid.get(&uid) {
            return Some(*handle);
        }
        let handle = Handle {
            index: self.slots.len() as u32,
            generation: self.generation,
        };
        self.slots.push(Slot {
            uid,
            fields: record.fields.clone(),
        });
        self.by_uid.insert(uid, handle);
        Some(handle)
    }

    fn observe_fields(&mut self, fields: &FieldSet) {
        for (_, value) in fields {
            self.observe_value(value);
        }
    }

    fn observe_value(&mut self, value: &FieldValue) {
        match value {
            FieldValue::Object(record) => {
                self.observe(record);
                self.observe_fields(&record.fields);
            }
            FieldValue::List(items) | FieldValue::Array(items) => {
                for item in items {
                    self.observe_value(item);
                }
            }
            FieldValue::Map(entries) => {
                for item in entries.values() {
                    self.observe_value(item);
                }
            }
            _ => {}
        }
    }

    pub fn handle_of(&self, uid: &Uuid) -> Option<Handle> {
        self.by_uid.get(uid).copied()
    }

    /// Uid stored in a slot. `None` for handles from an older generation.
    pub fn uid_of(&self, handle: Handle) -> Option<Uuid> {
        self.slot(handle).map(|slot| slot.uid)
    }

    /// Fields of the record registered under `uid`, as they were captured.
    pub fn fields_of(&self, uid: &Uuid) -> Option<&FieldSet> {
        self.handle_of(uid)
            .and_then(|handle| self.slot(handle))
            .map(|slot| &slot.fields)
    }

    /// Returns `true` if this version of the graph contains the record
    /// `uid` anywhere.
    pub fn knows(&self, uid: &Uuid) -> bool {
        self.by_uid.contains_key(uid)
    }

    /// Number of registered records.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Forget everything and invalidate all outstanding handles.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.by_uid.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    fn slot(&self, handle: Handle) -> Option<&Slot> {
        if handle.generation != self.generation {
            return None;
        }
        self.slots.get(handle.index as usize)
    }
}

impl std::fmt::Debug for IdentitySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentitySnapshot")
            .field("generation", &self.generation)
            .field("records", &self.slots.len())
            .finish()
    }
}

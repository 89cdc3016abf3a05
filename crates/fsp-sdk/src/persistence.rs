use std::sync::Arc;

use fsp_diff::difference;
use fsp_merge::MergeEngine;
use fsp_store::{FieldSetStore, PersistentStore, StoreConfig, StoreError};
use fsp_types::{FieldSet, ScopeId, Timestamp};
use tracing::{debug, warn};

use crate::error::{SdkError, SdkResult};
use crate::introspect::{materialize, restore_in_place, snapshot, Introspect};
use crate::tracked::{is_modified, SlotState, Tracked};

/// Conditional writes attempted by one save before giving up on a
/// contended object.
const MAX_SAVE_ATTEMPTS: usize = 32;

/// Cloneable handle over one shared field-set store.
///
/// Create one at startup and hand clones to every request.
#[derive(Clone)]
pub struct Persistence {
    store: Arc<dyn FieldSetStore>,
}

impl Persistence {
    pub fn new(store: Arc<dyn FieldSetStore>) -> Self {
        Self { store }
    }

    /// Open a file-backed store.
    pub fn open(config: StoreConfig) -> SdkResult<Self> {
        let store = PersistentStore::open(config)?;
        Ok(Self::new(Arc::new(store)))
    }

    pub fn store(&self) -> &Arc<dyn FieldSetStore> {
        &self.store
    }

    /// Wrap `value` in a slot that has never been persisted.
    pub fn track<T: Introspect>(&self, id: impl Into<String>, scope: &ScopeId, value: T) -> Tracked<T> {
        Tracked::unloaded(id.into(), scope.clone(), value)
    }

    /// Persist `value` under `id` and return its slot.
    pub fn insert<T: Introspect>(
        &self,
        id: impl Into<String>,
        scope: &ScopeId,
        value: T,
    ) -> SdkResult<Tracked<T>> {
        let mut slot = self.track(id, scope, value);
        self.save(&mut slot)?;
        Ok(slot)
    }

    /// Load `id` as a `T`.
    ///
    /// Returns `Ok(None)` when nothing is stored, and also when the stored
    /// field set belongs to a different type.
    pub fn load<T: Introspect>(&self, id: &str, scope: &ScopeId) -> SdkResult<Option<Tracked<T>>> {
        let Some(cached) = self.store.get_field_set(id, scope)? else {
            return Ok(None);
        };
        if !cached.fields.is_type_compatible(T::TYPE_NAME) {
            warn!(
                id,
                scope = %scope,
                expected = T::TYPE_NAME,
                found = cached.fields.type_name.as_deref().unwrap_or(""),
                "type mismatch, treating as not found"
            );
            return Ok(None);
        }
        let value = materialize(&cached.fields);
        Ok(Some(Tracked::loaded(
            id.to_string(),
            scope.clone(),
            value,
            cached.fields,
            cached.timestamp,
        )))
    }

    /// Write the slot's changes.
    ///
    /// An unchanged slot is left alone. Otherwise only the changed fields
    /// are written, unless the durable copy advanced since the slot last
    /// saw it; then the local changes are merged into the durable copy
    /// first (local edits win per field). The write only lands if nobody
    /// wrote in between; otherwise the merge is redone against the newer
    /// copy. Afterwards the slot holds the durable result, remote changes
    /// included. Fails with [`SdkError::ObjectNotFound`] if the durable copy
    /// was removed since the slot loaded it.
    pub fn save<T: Introspect>(&self, slot: &mut Tracked<T>) -> SdkResult<Timestamp> {
        if slot.state == SlotState::Removed {
            return Err(SdkError::Removed(slot.id.clone()));
        }
        let mut now = snapshot(&slot.value);
        let fresh = slot.state == SlotState::Unloaded;
        if !fresh && !is_modified(&slot.original, &now) {
            slot.state = SlotState::Loaded;
            return Ok(slot.seen);
        }
        now.assign_missing_uids();

        let before = slot.state;
        slot.state = SlotState::Modified;
        match self.write(slot, &now, fresh) {
            Ok(timestamp) => Ok(timestamp),
            Err(e) => {
                slot.state = if fresh { before } else { SlotState::Modified };
                Err(e)
            }
        }
    }

    fn write<T: Introspect>(&self, slot: &mut Tracked<T>, now: &FieldSet, fresh: bool) -> SdkResult<Timestamp> {
        let mut merge = !fresh && self.store.has_changed_since(&slot.id, &slot.scope, slot.seen);
        let mut attempt = 1;
        loop {
            let result = if fresh {
                self.store.store_changed_fields(&slot.id, now, &slot.scope)
            } else if merge {
                slot.state = SlotState::Merging;
                let newest = self
                    .store
                    .get_field_set(&slot.id, &slot.scope)?
                    .ok_or_else(|| SdkError::ObjectNotFound(slot.id.clone()))?;
                let engine = MergeEngine::for_versions(&slot.original, &newest.fields);
                let merged = engine.reconcile(&slot.original, now, &newest.fields)?;
                debug!(id = %slot.id, scope = %slot.scope, seen = %slot.seen, newest = %newest.timestamp, attempt, "merged with durable copy");
                self.store
                    .store_if_unchanged(&slot.id, &merged, &slot.scope, newest.timestamp)
            } else {
                let changes = difference(&slot.original, now);
                self.store
                    .store_if_unchanged(&slot.id, &changes, &slot.scope, slot.seen)
            };
            match result {
                Ok(_) => break,
                Err(StoreError::Stale { .. }) if attempt < MAX_SAVE_ATTEMPTS => {
                    debug!(id = %slot.id, scope = %slot.scope, attempt, "durable copy moved, merging again");
                    merge = true;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        let stored = self
            .store
            .get_field_set(&slot.id, &slot.scope)?
            .ok_or_else(|| SdkError::ObjectNotFound(slot.id.clone()))?;

        restore_in_place(&mut slot.value, &stored.fields);
        slot.original = stored.fields;
        slot.seen = stored.timestamp;
        slot.state = SlotState::Loaded;
        debug!(id = %slot.id, scope = %slot.scope, timestamp = %slot.seen, "slot saved");
        Ok(slot.seen)
    }

    /// Re-read the slot if the durable copy changed since it was last seen.
    ///
    /// Unsaved local edits are discarded. Returns `true` if the slot was
    /// refreshed.
    pub fn refresh<T: Introspect>(&self, slot: &mut Tracked<T>) -> SdkResult<bool> {
        if slot.state == SlotState::Removed {
            return Err(SdkError::Removed(slot.id.clone()));
        }
        if !self.store.has_changed_since(&slot.id, &slot.scope, slot.seen) {
            return Ok(false);
        }
        let cached = self
            .store
            .get_field_set(&slot.id, &slot.scope)?
            .ok_or_else(|| SdkError::ObjectNotFound(slot.id.clone()))?;
        if cached.timestamp == slot.seen {
            return Ok(false);
        }
        if !cached.fields.is_type_compatible(T::TYPE_NAME) {
            warn!(id = %slot.id, expected = T::TYPE_NAME, "durable copy changed type, not refreshed");
            return Ok(false);
        }
        restore_in_place(&mut slot.value, &cached.fields);
        slot.original = cached.fields;
        slot.seen = cached.timestamp;
        slot.state = SlotState::Loaded;
        Ok(true)
    }

    /// Delete the slot's object everywhere. The slot becomes `Removed`.
    /// Returns `true` if a durable copy existed.
    pub fn remove<T>(&self, slot: &mut Tracked<T>) -> SdkResult<bool> {
        if slot.state == SlotState::Removed {
            return Ok(false);
        }
        let existed = self.store.remove_field_set(&slot.id)?;
        slot.state = SlotState::Removed;
        Ok(existed)
    }
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence").finish_non_exhaustive()
    }
}

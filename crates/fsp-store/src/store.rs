use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::sync::{Mutex, RwLock};

use fsp_types::{FieldSet, IdSanitizer, LogicalClock, ObjectId, ScopeId, Timestamp};
use tracing::{debug, info, warn};

use crate::cache::{CachedFieldSet, ScopedCache};
use crate::codec::{FieldSetCodec, JsonCodec};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::traits::FieldSetStore;

/// File-backed field-set store with one LRU cache per scope.
///
/// Construct one per base directory at startup and share it (`Arc`) between
/// request threads. The scope table sits behind a `RwLock`: lookups take the
/// read lock plus the scope's own mutex (an LRU touch mutates the cache),
/// while every mutation takes the write lock, so no lookup can observe a
/// half-applied store or removal.
pub struct PersistentStore {
    config: StoreConfig,
    codec: Box<dyn FieldSetCodec>,
    sanitizer: IdSanitizer,
    clock: LogicalClock,
    scopes: RwLock<HashMap<ScopeId, Mutex<ScopedCache>>>,
}

impl PersistentStore {
    /// Open a store using the JSON codec.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        Self::with_codec(config, Box::new(JsonCodec))
    }

    /// Open a store with a custom codec.
    pub fn with_codec(config: StoreConfig, codec: Box<dyn FieldSetCodec>) -> StoreResult<Self> {
        config.validate()?;
        info!(
            base_dir = %config.base_dir.display(),
            cache_capacity = config.cache_capacity,
            atomic_writes = config.atomic_writes,
            "field-set store opened"
        );
        Ok(Self {
            config,
            codec,
            sanitizer: IdSanitizer::new(),
            clock: LogicalClock::new(),
            scopes: RwLock::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Sanitized key for a raw id (memoized).
    pub fn object_id(&self, raw: &str) -> ObjectId {
        self.sanitizer.sanitize(raw)
    }

    /// Backing file path for a sanitized id.
    pub fn path_for(&self, id: &ObjectId) -> PathBuf {
        self.config
            .base_dir
            .join(id.file_name(&self.config.extension))
    }

    /// Give `scope` its own cache capacity (`0` = unbounded). Replaces any
    /// existing cache for the scope, dropping its entries.
    pub fn register_scope(&self, scope: ScopeId, capacity: usize) {
        let mut scopes = self.scopes.write().expect("lock poisoned");
        debug!(scope = %scope, capacity, "registered scope");
        scopes.insert(scope, Mutex::new(ScopedCache::new(capacity)));
    }

    /// Number of field sets currently cached for `scope`.
    pub fn cached_len(&self, scope: &ScopeId) -> usize {
        let scopes = self.scopes.read().expect("lock poisoned");
        scopes
            .get(scope)
            .map_or(0, |cache| cache.lock().expect("lock poisoned").len())
    }

    /// Raw ids of every backing file under the base directory, sorted.
    ///
    /// Files that do not carry the configured extension or whose names do
    /// not decode are skipped.
    pub fn list_ids(&self) -> StoreResult<Vec<String>> {
        let dir = &self.config.base_dir;
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(dir, e)),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(dir, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                warn!(file = ?name, "skipping non UTF-8 file name");
                continue;
            };
            // In-flight temp files from atomic writes.
            if name.starts_with('.') {
                continue;
            }
            match ObjectId::from_file_name(name, &self.config.extension).map(|id| id.to_raw()) {
                Some(Ok(raw)) => ids.push(raw),
                _ => warn!(file = name, "skipping unrecognised file in store directory"),
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Run `f` against `scope`'s cache, creating the cache on first use.
    fn with_scope<R>(&self, scope: &ScopeId, f: impl FnOnce(&mut ScopedCache) -> R) -> R {
        {
            let scopes = self.scopes.read().expect("lock poisoned");
            if let Some(cache) = scopes.get(scope) {
                let mut cache = cache.lock().expect("lock poisoned");
                return f(&mut *cache);
            }
        }
        let mut scopes = self.scopes.write().expect("lock poisoned");
        let cache = scopes
            .entry(scope.clone())
            .or_insert_with(|| Mutex::new(ScopedCache::new(self.config.cache_capacity)));
        f(cache.get_mut().expect("lock poisoned"))
    }

    /// Overlay `fields` onto the current copy of `id` and write it, under the
    /// write lock. With `expected`, refuse unless `scope`'s cached copy
    /// carries exactly that timestamp.
    fn write_fields(
        &self,
        raw: &str,
        fields: &FieldSet,
        scope: &ScopeId,
        expected: Option<Timestamp>,
    ) -> StoreResult<Timestamp> {
        let id = self.object_id(raw);
        let mut scopes = self.scopes.write().expect("lock poisoned");

        let timestamp = {
            let cache = scopes
                .entry(scope.clone())
                .or_insert_with(|| Mutex::new(ScopedCache::new(self.config.cache_capacity)))
                .get_mut()
                .expect("lock poisoned");

            if let Some(seen) = expected {
                let cached = cache.peek(&id).map(|entry| entry.timestamp);
                if cached != Some(seen) {
                    debug!(id = %id, scope = %scope, %seen, ?cached, "conditional store refused");
                    return Err(StoreError::Stale {
                        id: raw.to_string(),
                        seen,
                    });
                }
            }

            let current = match cache.get(&id) {
                Some(entry) => entry.fields.clone(),
                None => self.read_file(&id, scope)?.unwrap_or_default(),
            };
            let merged = current.overlaid(fields);

            if let Err(e) = self.write_file(&id, &merged) {
                warn!(id = %id, scope = %scope, error = %e, "write failed; dropping cached copies");
                for cache in scopes.values_mut() {
                    cache.get_mut().expect("lock poisoned").invalidate(&id);
                }
                return Err(e);
            }

            let timestamp = self.clock.tick();
            cache.put(id.clone(), CachedFieldSet::new(merged, timestamp));
            timestamp
        };

        let mut invalidated = 0usize;
        for (other, cache) in scopes.iter_mut() {
            if other != scope && cache.get_mut().expect("lock poisoned").invalidate(&id) {
                invalidated += 1;
            }
        }

        debug!(
            id = %id,
            scope = %scope,
            fields = fields.len(),
            %timestamp,
            invalidated,
            "stored changed fields"
        );
        Ok(timestamp)
    }

    fn read_file(&self, id: &ObjectId, scope: &ScopeId) -> StoreResult<Option<FieldSet>> {
        let path = self.path_for(id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(path, e)),
        };
        let fields = self
            .codec
            .decode(&bytes, scope)
            .map_err(|e| StoreError::Corrupt {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        debug!(id = %id, scope = %scope, bytes = bytes.len(), "loaded field set from disk");
        Ok(Some(fields))
    }

    fn write_file(&self, id: &ObjectId, fields: &FieldSet) -> StoreResult<()> {
        let dir = &self.config.base_dir;
        fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

        let bytes = self.codec.encode(fields)?;
        let path = self.path_for(id);

        if self.config.atomic_writes {
            let mut tmp = tempfile::Builder::new()
                .prefix(".fsp-")
                .suffix(".tmp")
                .tempfile_in(dir)
                .map_err(|e| StoreError::io(dir, e))?;
            tmp.write_all(&bytes).map_err(|e| StoreError::io(&path, e))?;
            tmp.as_file()
                .sync_all()
                .map_err(|e| StoreError::io(&path, e))?;
            tmp.persist(&path)
                .map_err(|e| StoreError::io(&path, e.error))?;
        } else {
            fs::write(&path, &bytes).map_err(|e| StoreError::io(&path, e))?;
        }

        debug!(id = %id, bytes = bytes.len(), "wrote field set");
        Ok(())
    }
}

impl FieldSetStore for PersistentStore {
    fn get_field_set(&self, id: &str, scope: &ScopeId) -> StoreResult<Option<CachedFieldSet>> {
        let id = self.object_id(id);
        self.with_scope(scope, |cache| {
            if let Some(hit) = cache.get(&id) {
                debug!(id = %id, scope = %scope, timestamp = %hit.timestamp, "cache hit");
                return Ok(Some(hit.clone()));
            }
            let Some(fields) = self.read_file(&id, scope)? else {
                return Ok(None);
            };
            let entry = CachedFieldSet::new(fields, self.clock.tick());
            cache.put(id, entry.clone());
            Ok(Some(entry))
        })
    }

    fn has_changed_since(&self, id: &str, scope: &ScopeId, since: Timestamp) -> bool {
        let id = self.object_id(id);
        let scopes = self.scopes.read().expect("lock poisoned");
        scopes
            .get(scope)
            .and_then(|cache| {
                let cache = cache.lock().expect("lock poisoned");
                cache.peek(&id).map(|entry| entry.timestamp != since)
            })
            .unwrap_or(true)
    }

    fn store_changed_fields(
        &self,
        id: &str,
        fields: &FieldSet,
        scope: &ScopeId,
    ) -> StoreResult<Timestamp> {
        self.write_fields(id, fields, scope, None)
    }

    fn store_if_unchanged(
        &self,
        id: &str,
        fields: &FieldSet,
        scope: &ScopeId,
        seen: Timestamp,
    ) -> StoreResult<Timestamp> {
        self.write_fields(id, fields, scope, Some(seen))
    }

    fn remove_field_set(&self, id: &str) -> StoreResult<bool> {
        let id = self.object_id(id);
        let path = self.path_for(&id);
        let mut scopes = self.scopes.write().expect("lock poisoned");

        let existed = match fs::remove_file(&path) {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(StoreError::io(path, e)),
        };
        for cache in scopes.values_mut() {
            cache.get_mut().expect("lock poisoned").invalidate(&id);
        }

        debug!(id = %id, existed, "removed field set");
        Ok(existed)
    }

    fn has_field_set_for(&self, id: &str, scope: &ScopeId) -> StoreResult<bool> {
        let id = self.object_id(id);
        let scopes = self.scopes.read().expect("lock poisoned");
        let cached = scopes
            .get(scope)
            .is_some_and(|cache| cache.lock().expect("lock poisoned").contains(&id));
        if cached {
            return Ok(true);
        }
        let path = self.path_for(&id);
        path.try_exists().map_err(|e| StoreError::io(path, e))
    }

    fn flush_all(&self) {
        let mut scopes = self.scopes.write().expect("lock poisoned");
        for cache in scopes.values_mut() {
            cache.get_mut().expect("lock poisoned").clear();
        }
        info!(scopes = scopes.len(), "flushed all scope caches");
    }

    fn flush_scope(&self, scope: &ScopeId) {
        let mut scopes = self.scopes.write().expect("lock poisoned");
        if let Some(cache) = scopes.get_mut(scope) {
            let cache = cache.get_mut().expect("lock poisoned");
            let dropped = cache.len();
            cache.clear();
            info!(scope = %scope, dropped, "flushed scope cache");
        }
    }
}

impl std::fmt::Debug for PersistentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scope_count = self.scopes.read().map(|s| s.len()).unwrap_or(0);
        f.debug_struct("PersistentStore")
            .field("base_dir", &self.config.base_dir)
            .field("scope_count", &scope_count)
            .finish()
    }
}

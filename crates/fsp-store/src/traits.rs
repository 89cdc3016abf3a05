use fsp_types::{FieldSet, ScopeId, Timestamp};

use crate::cache::CachedFieldSet;
use crate::error::StoreResult;

/// Scope-aware, durable field-set store.
///
/// All implementations must satisfy these invariants:
/// - A missing field set is `Ok(None)`, never an error.
/// - After `store_changed_fields(id, f, scope)` returns, `get_field_set(id, s)`
///   reflects `f` for every scope `s`.
/// - A failed write leaves no cache entry that disagrees with the durable copy.
/// - I/O and decode errors are propagated, never silently ignored.
pub trait FieldSetStore: Send + Sync {
    /// Current field set for `id` as seen from `scope`, with its timestamp.
    fn get_field_set(&self, id: &str, scope: &ScopeId) -> StoreResult<Option<CachedFieldSet>>;

    /// `true` if `scope`'s cached copy of `id` is not the one stamped `since`,
    /// or if `scope` holds no cached copy.
    fn has_changed_since(&self, id: &str, scope: &ScopeId, since: Timestamp) -> bool;

    /// Shallow-merge `fields` into the current field set for `id`, persist it,
    /// and return the new timestamp.
    fn store_changed_fields(
        &self,
        id: &str,
        fields: &FieldSet,
        scope: &ScopeId,
    ) -> StoreResult<Timestamp>;

    /// [`store_changed_fields`](Self::store_changed_fields), but only if
    /// `scope`'s cached copy of `id` is still the one stamped `seen`.
    ///
    /// The check and the write happen atomically. Fails with
    /// [`StoreError::Stale`](crate::StoreError::Stale) otherwise, including
    /// when `scope` holds no cached copy.
    fn store_if_unchanged(
        &self,
        id: &str,
        fields: &FieldSet,
        scope: &ScopeId,
        seen: Timestamp,
    ) -> StoreResult<Timestamp>;

    /// Delete `id` everywhere. Returns `true` if a backing file existed.
    fn remove_field_set(&self, id: &str) -> StoreResult<bool>;

    /// `true` if `scope` has `id` cached or a backing file exists.
    fn has_field_set_for(&self, id: &str, scope: &ScopeId) -> StoreResult<bool>;

    /// Drop every scope's cached field sets.
    fn flush_all(&self);

    /// Drop one scope's cached field sets. The scope keeps its capacity.
    fn flush_scope(&self, scope: &ScopeId);
}

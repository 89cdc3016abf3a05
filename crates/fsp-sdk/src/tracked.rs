use std::fmt;

use fsp_types::{FieldSet, ScopeId, Timestamp};

/// Lifecycle of one object slot.
///
/// ```text
/// Unloaded -> Loaded -> Modified -> Merging -> Loaded
///                  \         \
///                   +---------+-> Removed
/// ```
///
/// `Modified` is entered when a save observes a changed field, `Merging`
/// when the durable copy advanced since the slot last saw it. `Removed` is
/// terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotState {
    /// Never persisted.
    Unloaded,
    /// In sync with the durable copy it was loaded from.
    Loaded,
    /// Local edits are being written.
    Modified,
    /// Local edits are being merged with a newer durable copy.
    Merging,
    Removed,
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unloaded => "unloaded",
            Self::Loaded => "loaded",
            Self::Modified => "modified",
            Self::Merging => "merging",
            Self::Removed => "removed",
        };
        f.write_str(name)
    }
}

/// An object together with the durable field set it was last synced with.
///
/// Mutate the value freely through [`get_mut`](Self::get_mut); changes are
/// detected when the slot is saved.
pub struct Tracked<T> {
    pub(crate) id: String,
    pub(crate) scope: ScopeId,
    pub(crate) value: T,
    pub(crate) original: FieldSet,
    pub(crate) seen: Timestamp,
    pub(crate) state: SlotState,
}

impl<T> Tracked<T> {
    pub(crate) fn unloaded(id: String, scope: ScopeId, value: T) -> Self {
        Self {
            id,
            scope,
            value,
            original: FieldSet::new(),
            seen: Timestamp::zero(),
            state: SlotState::Unloaded,
        }
    }

    pub(crate) fn loaded(id: String, scope: ScopeId, value: T, original: FieldSet, seen: Timestamp) -> Self {
        Self {
            id,
            scope,
            value,
            original,
            seen,
            state: SlotState::Loaded,
        }
    }

    /// Raw (unsanitized) id.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn scope(&self) -> &ScopeId {
        &self.scope
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    /// Timestamp of the durable copy this slot last synced with.
    pub fn seen(&self) -> Timestamp {
        self.seen
    }

    /// The durable field set this slot last synced with.
    pub fn original(&self) -> &FieldSet {
        &self.original
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> std::ops::Deref for Tracked<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Tracked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracked")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("state", &self.state)
            .field("seen", &self.seen)
            .field("value", &self.value)
            .finish()
    }
}

/// `true` if `now` holds a field whose value differs from (or is missing in)
/// `original`. Fields present only in `original` do not count: they may
/// belong to another schema version of the same object.
pub(crate) fn is_modified(original: &FieldSet, now: &FieldSet) -> bool {
    now.iter().any(|(name, value)| original.get(name) != Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_slots_start_unloaded() {
        let slot = Tracked::unloaded("p1".into(), ScopeId::default_scope(), 5u8);
        assert_eq!(slot.state(), SlotState::Unloaded);
        assert_eq!(slot.seen(), Timestamp::zero());
        assert!(slot.original().is_empty());
        assert_eq!(*slot, 5);
    }

    #[test]
    fn modification_ignores_foreign_fields() {
        let original = FieldSet::new().with("a", 1).with("legacy", "x");
        assert!(!is_modified(&original, &FieldSet::new().with("a", 1)));
        assert!(is_modified(&original, &FieldSet::new().with("a", 2)));
        assert!(is_modified(&original, &FieldSet::new().with("a", 1).with("b", 0)));
    }

    #[test]
    fn state_display() {
        assert_eq!(SlotState::Merging.to_string(), "merging");
        assert_eq!(SlotState::Removed.to_string(), "removed");
    }
}

use fsp_types::{ScopeId, Timestamp};
use tracing::debug;

use crate::error::SdkResult;
use crate::introspect::{snapshot, Introspect};
use crate::persistence::Persistence;
use crate::tracked::Tracked;

/// Key-to-object projection over a [`Persistence`] handle.
///
/// Every key is stored under the id `<namespace>/<key>`, so maps with
/// different namespaces never see each other's entries.
#[derive(Clone, Debug)]
pub struct PersistentMap {
    persistence: Persistence,
    namespace: String,
    scope: ScopeId,
}

impl PersistentMap {
    pub fn new(persistence: Persistence, namespace: impl Into<String>, scope: ScopeId) -> Self {
        Self {
            persistence,
            namespace: namespace.into(),
            scope,
        }
    }

    /// Map shared by every session of one application.
    pub fn application(persistence: Persistence, app: &str, scope: ScopeId) -> Self {
        Self::new(persistence, format!("app/{app}"), scope)
    }

    /// Map shared by every application.
    pub fn shared(persistence: Persistence, scope: ScopeId) -> Self {
        Self::new(persistence, "shared", scope)
    }

    /// Map private to one session.
    pub fn session(persistence: Persistence, session: &str, scope: ScopeId) -> Self {
        Self::new(persistence, format!("session/{session}"), scope)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn scope(&self) -> &ScopeId {
        &self.scope
    }

    /// Store id backing `key`.
    pub fn id_for(&self, key: &str) -> String {
        format!("{}/{}", self.namespace, key)
    }

    pub fn get<T: Introspect>(&self, key: &str) -> SdkResult<Option<T>> {
        Ok(self.tracked(key)?.map(Tracked::into_inner))
    }

    /// Load `key` as a tracked slot, for edit-and-save use.
    pub fn tracked<T: Introspect>(&self, key: &str) -> SdkResult<Option<Tracked<T>>> {
        self.persistence.load(&self.id_for(key), &self.scope)
    }

    /// Store `value` under `key`. Fields of an existing entry that `T` does
    /// not declare are kept.
    pub fn put<T: Introspect>(&self, key: &str, value: &T) -> SdkResult<Timestamp> {
        let id = self.id_for(key);
        let mut fields = snapshot(value);
        fields.assign_missing_uids();
        let timestamp = self
            .persistence
            .store()
            .store_changed_fields(&id, &fields, &self.scope)?;
        debug!(namespace = %self.namespace, key, %timestamp, "map entry stored");
        Ok(timestamp)
    }

    /// Returns `true` if the key existed.
    pub fn remove(&self, key: &str) -> SdkResult<bool> {
        Ok(self.persistence.store().remove_field_set(&self.id_for(key))?)
    }

    pub fn contains(&self, key: &str) -> SdkResult<bool> {
        Ok(self
            .persistence
            .store()
            .has_field_set_for(&self.id_for(key), &self.scope)?)
    }
}

#[cfg(test)]
mod tests {
    use fsp_store::StoreConfig;

    use super::*;
    use crate::introspect::fixtures::Person;

    fn setup() -> (tempfile::TempDir, Persistence) {
        let dir = tempfile::tempdir().unwrap();
        let persistence = Persistence::open(StoreConfig::new(dir.path())).unwrap();
        (dir, persistence)
    }

    #[test]
    fn put_get_remove() {
        let (_dir, p) = setup();
        let map = PersistentMap::shared(p, ScopeId::default_scope());

        assert!(!map.contains("ann").unwrap());
        map.put("ann", &Person::new("Ann", 20)).unwrap();
        assert!(map.contains("ann").unwrap());
        assert_eq!(map.get::<Person>("ann").unwrap(), Some(Person::new("Ann", 20)));

        assert!(map.remove("ann").unwrap());
        assert!(!map.contains("ann").unwrap());
        assert_eq!(map.get::<Person>("ann").unwrap(), None);
        assert!(!map.remove("ann").unwrap());
    }

    #[test]
    fn namespaces_are_isolated() {
        let (_dir, p) = setup();
        let scope = ScopeId::default_scope();
        let app = PersistentMap::application(p.clone(), "shop", scope.clone());
        let one = PersistentMap::session(p.clone(), "s1", scope.clone());
        let two = PersistentMap::session(p, "s2", scope);

        one.put("me", &Person::new("Ann", 20)).unwrap();
        assert!(!two.contains("me").unwrap());
        assert!(!app.contains("me").unwrap());
        assert_eq!(one.id_for("me"), "session/s1/me");
        assert_eq!(app.id_for("me"), "app/shop/me");
    }

    #[test]
    fn tracked_entry_saves_through_persistence() {
        let (_dir, p) = setup();
        let map = PersistentMap::application(p.clone(), "shop", ScopeId::new("v1"));
        map.put("owner", &Person::new("Ann", 20)).unwrap();

        let mut slot = map.tracked::<Person>("owner").unwrap().unwrap();
        slot.get_mut().age = 21;
        p.save(&mut slot).unwrap();

        assert_eq!(map.get::<Person>("owner").unwrap().map(|x| x.age), Some(21));
    }
}

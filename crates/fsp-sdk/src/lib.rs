//! Object-level API for field-set persistence.
//!
//! Applications describe their types with [`Introspect`] and persist them
//! through a [`Persistence`] handle. Each loaded object lives in a
//! [`Tracked`] slot that remembers the field set it was loaded from, so a
//! save can write only what changed and, when the durable copy moved on in
//! the meantime, merge with it first.
//!
//! # Key Types
//!
//! - [`Introspect`]: field-set view of an application type
//! - [`Persistence`]: cloneable handle over a shared store
//! - [`Tracked`] / [`SlotState`]: one object and its lifecycle
//! - [`PersistentMap`]: namespaced key-to-object projection

pub mod error;
pub mod introspect;
pub mod map;
pub mod persistence;
pub mod tracked;

pub use error::{SdkError, SdkResult};
pub use introspect::Introspect;
pub use map::PersistentMap;
pub use persistence::Persistence;
pub use tracked::{SlotState, Tracked};

// Re-export key types
pub use fsp_store::{PersistentStore, StoreConfig};
pub use fsp_types::{FieldSet, FieldValue, Record, ScopeId, Timestamp};

//! File-backed field-set storage.
//!
//! Every persisted object is one file, `<base_dir>/<sanitized id>.<ext>`,
//! holding its [`FieldSet`](fsp_types::FieldSet) as encoded by a
//! [`FieldSetCodec`]. In front of the files sits one [`ScopedCache`] per
//! [`ScopeId`](fsp_types::ScopeId).
//!
//! # Design Rules
//!
//! 1. A scope never reads another scope's cache; scopes share data only
//!    through the backing files.
//! 2. Storing a field set invalidates the same id in every other scope.
//! 3. Mutations hold the store-wide write lock for the whole
//!    check-cache / touch-file / update-cache sequence.
//! 4. All I/O and decode errors are propagated, never silently ignored; a
//!    failed write removes the affected cache entry before returning.

pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod store;
pub mod traits;

pub use cache::{CachedFieldSet, ScopedCache};
pub use codec::{FieldSetCodec, JsonCodec};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use store::PersistentStore;
pub use traits::FieldSetStore;

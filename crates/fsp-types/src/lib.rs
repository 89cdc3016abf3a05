//! Foundation types for field-set persistence (FSP).
//!
//! This crate provides the identity, temporal, and structural types shared by
//! every other FSP crate.
//!
//! # Key Types
//!
//! - [`ObjectId`]: Filesystem-safe, case-preserving key derived from a raw id
//! - [`IdSanitizer`]: Memoizing `raw id -> ObjectId` mapper
//! - [`ScopeId`]: Type-loading boundary owning an independent cache
//! - [`Timestamp`] / [`LogicalClock`]: Store-wide logical clock
//! - [`FieldSet`] / [`FieldValue`] / [`Record`]: Named-field object snapshots

pub mod error;
pub mod field;
pub mod object;
pub mod sanitize;
pub mod scope;
pub mod temporal;

pub use error::TypeError;
pub use field::{FieldSet, FieldValue, Record};
pub use object::ObjectId;
pub use sanitize::{sanitize, unsanitize, IdSanitizer, CASE_CHUNK};
pub use scope::ScopeId;
pub use temporal::{LogicalClock, Timestamp};
pub use uuid::Uuid;

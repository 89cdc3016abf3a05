//! Merge engine for field-set persistence.
//!
//! Reconciles a locally modified object against the version that is
//! currently durable, given the baseline the local side started from.
//!
//! - [`IdentitySnapshot`]: surrogate-id arena captured from one version of
//!   an object graph
//! - [`MergeEngine`]: three-way merge of field sets, sequences, arrays, and
//!   maps
//!
//! Conflicting edits to the same scalar field are resolved in favour of the
//! local side and are not reported. Callers that need to surface conflicts
//! must compare [`fsp_diff::difference`] results themselves.

pub mod engine;
pub mod error;
pub mod identity;

pub use engine::MergeEngine;
pub use error::{MergeError, MergeResult};
pub use identity::{ElementKey, Handle, IdentitySnapshot};

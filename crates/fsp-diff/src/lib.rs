//! Diff engine for field-set persistence.
//!
//! # Key Items
//!
//! - [`difference`] -- Field-level change set between two [`FieldSet`]s
//! - [`FieldChanges`] -- Added/modified/removed summary of two field sets
//! - [`align`] / [`AlignOp`] -- Myers alignment of two identity-keyed sequences
//!
//! [`FieldSet`]: fsp_types::FieldSet

pub mod field_diff;
pub mod seq_diff;

pub use field_diff::{difference, diff_field_sets, FieldChange, FieldChanges};
pub use seq_diff::{align, AlignOp};

//! Sequence alignment over identity keys.
//!
//! Uses the `similar` crate (Myers O(ND) diff) on slices of keys. Callers
//! choose the key type, so elements are matched by whatever identity they
//! resolve to rather than by value equality.

use std::hash::Hash;

use similar::{capture_diff_slices, Algorithm, DiffTag};

/// One step of an alignment, in output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlignOp {
    /// Element present on both sides.
    Both { local: usize, newest: usize },
    /// Element only present in the local sequence.
    LocalOnly { local: usize },
    /// Element only present in the newest sequence.
    NewestOnly { newest: usize },
}

/// Align `local` against `newest`.
///
/// Every index of both inputs appears exactly once in the result. Within a
/// replaced region, local-only entries come before newest-only entries.
pub fn align<K: Hash + Eq + Ord>(local: &[K], newest: &[K]) -> Vec<AlignOp> {
    let mut ops = Vec::with_capacity(local.len().max(newest.len()));
    for op in capture_diff_slices(Algorithm::Myers, local, newest) {
        let (tag, local_range, newest_range) = op.as_tag_tuple();
        match tag {
            DiffTag::Equal => ops.extend(
                local_range
                    .zip(newest_range)
                    .map(|(local, newest)| AlignOp::Both { local, newest }),
            ),
            DiffTag::Delete => ops.extend(local_range.map(|local| AlignOp::LocalOnly { local })),
            DiffTag::Insert => {
                ops.extend(newest_range.map(|newest| AlignOp::NewestOnly { newest }))
            }
            DiffTag::Replace => {
                ops.extend(local_range.map(|local| AlignOp::LocalOnly { local }));
                ops.extend(newest_range.map(|newest| AlignOp::NewestOnly { newest }));
            }
        }
    }
    ops
}

use std::collections::{BTreeMap, HashMap, HashSet};

use fsp_diff::{align, difference, AlignOp};
use fsp_types::{FieldSet, FieldValue, Record};
use tracing::debug;
use uuid::Uuid;

use crate::error::{MergeError, MergeResult};
use crate::identity::{ElementKey, IdentitySnapshot};

/// Three-way merge of one object.
///
/// Holds two identity snapshots for the duration of a single merge:
///
/// - `local`: the baseline the local side loaded. It supplies uids and the
///   baseline fields of nested records.
/// - `newest`: the version that is currently durable. A record it no longer
///   contains anywhere was deleted remotely.
///
/// Collections are merged against the baseline copy of the same collection,
/// so "added", "deleted" and "untouched" are always judged per field.
/// Snapshots bind uids to one request's view of the graph. Build an engine
/// per merge and drop it afterwards.
pub struct MergeEngine {
    local: IdentitySnapshot,
    newest: IdentitySnapshot,
}

impl MergeEngine {
    pub fn new(local: IdentitySnapshot, newest: IdentitySnapshot) -> Self {
        Self { local, newest }
    }

    /// Capture both snapshots from the baseline and the durable version.
    pub fn for_versions(baseline: &FieldSet, newest: &FieldSet) -> Self {
        Self::new(
            IdentitySnapshot::capture(baseline),
            IdentitySnapshot::capture(newest),
        )
    }

    pub fn local(&self) -> &IdentitySnapshot {
        &self.local
    }

    pub fn newest(&self) -> &IdentitySnapshot {
        &self.newest
    }

    /// Stable surrogate id of `record`.
    ///
    /// A uid registered in the local snapshot is preferred, then one
    /// registered in the newest snapshot. A record nobody has registered
    /// keeps its own uid when it has one; otherwise a fresh uid is minted
    /// if `generate` is set.
    pub fn resolve_id(&self, record: &Record, generate: bool) -> Option<Uuid> {
        if let Some(uid) = record.uid {
            if self.local.handle_of(&uid).is_some() || self.newest.handle_of(&uid).is_some() {
                return Some(uid);
            }
            return generate.then_some(uid);
        }
        generate.then(Uuid::now_v7)
    }

    /// Identities used to align the elements of one collection.
    pub fn element_keys(&self, items: &[FieldValue]) -> Vec<ElementKey> {
        ElementKey::for_elements(items, |record| {
            self.resolve_id(record, true).unwrap_or_else(Uuid::now_v7)
        })
    }

    /// Merge `local_now` and `newest`, both derived from `local_before`.
    ///
    /// The result is `local_before`, overlaid with the remote changes, then
    /// with the local changes. Fields changed on both sides go through
    /// [`merge_value`](Self::merge_value) with their baseline value.
    pub fn merge_field_set(
        &self,
        local_before: &FieldSet,
        local_now: &FieldSet,
        newest: &FieldSet,
    ) -> FieldSet {
        let local_changes = difference(local_before, local_now);
        let remote_changes = difference(local_before, newest);

        let mut merged = local_before.clone();
        merged.overlay(&remote_changes);

        let mut reconciled = 0usize;
        for (name, local_value) in &local_changes {
            let value = match remote_changes.get(name) {
                Some(remote_value) => {
                    reconciled += 1;
                    self.merge_value(local_before.get(name), local_value, remote_value)
                }
                None => local_value.clone(),
            };
            merged.fields.insert(name.clone(), value);
        }
        if let Some(type_name) = &local_changes.type_name {
            merged.type_name = Some(type_name.clone());
        }

        debug!(
            local_changes = local_changes.len(),
            remote_changes = remote_changes.len(),
            reconciled,
            "merged field set"
        );
        merged
    }

    /// [`merge_field_set`](Self::merge_field_set), refusing to merge when
    /// the local copy and the durable copy declare different types.
    pub fn reconcile(
        &self,
        local_before: &FieldSet,
        local_now: &FieldSet,
        newest: &FieldSet,
    ) -> MergeResult<FieldSet> {
        if let (Some(local), Some(durable)) = (&local_now.type_name, &newest.type_name) {
            if local != durable {
                return Err(MergeError::TypeMismatch {
                    local: local.clone(),
                    newest: durable.clone(),
                });
            }
        }
        Ok(self.merge_field_set(local_before, local_now, newest))
    }

    /// Merge two versions of one value, given its baseline (`None` when the
    /// baseline did not have it).
    ///
    /// A side that still equals the baseline takes the other side's value.
    /// Otherwise collections of the same kind and records with the same uid
    /// are merged structurally; anything else resolves to the local value.
    pub fn merge_value(
        &self,
        baseline: Option<&FieldValue>,
        local: &FieldValue,
        newest: &FieldValue,
    ) -> FieldValue {
        if local == newest {
            return local.clone();
        }
        match baseline {
            Some(base) if base == local => return newest.clone(),
            Some(base) if base == newest => return local.clone(),
            _ => {}
        }
        match (local, newest) {
            (FieldValue::List(l), FieldValue::List(n)) => {
                FieldValue::List(self.merge_sequence(baseline_elements(baseline), l, n))
            }
            (FieldValue::Array(l), FieldValue::Array(n)) => {
                FieldValue::Array(self.merge_array(baseline_elements(baseline), l, n))
            }
            (FieldValue::Map(l), FieldValue::Map(n)) => {
                let empty = BTreeMap::new();
                let base = match baseline {
                    Some(FieldValue::Map(base)) => base,
                    _ => &empty,
                };
                FieldValue::Map(self.merge_map(base, l, n))
            }
            (FieldValue::Object(l), FieldValue::Object(n)) if l.uid.is_some() && l.uid == n.uid => {
                FieldValue::Object(self.merge_record(baseline.and_then(FieldValue::as_record), l, n))
            }
            _ => local.clone(),
        }
    }

    fn merge_record(&self, baseline: Option<&Record>, local: &Record, newest: &Record) -> Record {
        let baseline = baseline
            .filter(|base| base.uid == local.uid)
            .map(|base| &base.fields)
            .or_else(|| local.uid.and_then(|uid| self.local.fields_of(&uid)));
        let Some(baseline) = baseline else {
            return local.clone();
        };
        Record {
            uid: local.uid,
            fields: self.merge_field_set(baseline, &local.fields, &newest.fields),
        }
    }

    /// Merge two versions of an ordered sequence derived from `baseline`.
    ///
    /// Elements are aligned by identity: records by surrogate uid, other
    /// values by value and occurrence within the sequence. Surviving local
    /// elements keep their order. An element only the newest side has is
    /// spliced in at its aligned position unless the baseline held it (then
    /// the local side deleted it). An element only the local side has is
    /// kept unless the baseline held it and the newest side dropped it (then
    /// the remote side deleted it; a record counts as dropped only when the
    /// newest graph contains it nowhere).
    pub fn merge_sequence(
        &self,
        baseline: &[FieldValue],
        local: &[FieldValue],
        newest: &[FieldValue],
    ) -> Vec<FieldValue> {
        let base_keys = self.element_keys(baseline);
        let local_keys = self.element_keys(local);
        let newest_keys = self.element_keys(newest);

        let base_index: HashMap<&ElementKey, usize> =
            base_keys.iter().enumerate().map(|(i, key)| (key, i)).collect();
        let in_local: HashSet<&ElementKey> = local_keys.iter().collect();
        let in_newest: HashSet<&ElementKey> = newest_keys.iter().collect();

        let mut merged = Vec::with_capacity(local.len().max(newest.len()));
        let (mut spliced, mut dropped) = (0usize, 0usize);

        for op in align(&local_keys, &newest_keys) {
            match op {
                AlignOp::Both { local: l, newest: n } => {
                    let base = base_index.get(&local_keys[l]).map(|&i| &baseline[i]);
                    merged.push(self.merge_value(base, &local[l], &newest[n]));
                }
                AlignOp::LocalOnly { local: l } => {
                    let key = &local_keys[l];
                    let removed_remotely = base_index.contains_key(key)
                        && !in_newest.contains(key)
                        && match key {
                            ElementKey::Surrogate(uid) => !self.newest.knows(uid),
                            ElementKey::Value { .. } => true,
                        };
                    if removed_remotely {
                        dropped += 1;
                    } else {
                        merged.push(local[l].clone());
                    }
                }
                AlignOp::NewestOnly { newest: n } => {
                    let key = &newest_keys[n];
                    if !in_local.contains(key) && !base_index.contains_key(key) {
                        spliced += 1;
                        merged.push(newest[n].clone());
                    }
                }
            }
        }

        debug!(
            local = local.len(),
            newest = newest.len(),
            merged = merged.len(),
            spliced,
            dropped,
            "merged sequence"
        );
        merged
    }

    /// Merge two versions of a fixed-length array.
    ///
    /// Aligns like [`merge_sequence`](Self::merge_sequence), then truncates
    /// or pads with [`FieldValue::Null`] to the local length.
    pub fn merge_array(
        &self,
        baseline: &[FieldValue],
        local: &[FieldValue],
        newest: &[FieldValue],
    ) -> Vec<FieldValue> {
        let mut merged = self.merge_sequence(baseline, local, newest);
        merged.resize(local.len(), FieldValue::Null);
        merged
    }

    /// Merge two versions of a map derived from `baseline`, key by key.
    ///
    /// A key only the newest side has is added unless the baseline had it
    /// (then the local side removed it). A key only the local side has is
    /// dropped when the baseline had it with the same value (the remote side
    /// removed it). Keys on both sides are merged with
    /// [`merge_value`](Self::merge_value).
    pub fn merge_map(
        &self,
        baseline: &BTreeMap<String, FieldValue>,
        local: &BTreeMap<String, FieldValue>,
        newest: &BTreeMap<String, FieldValue>,
    ) -> BTreeMap<String, FieldValue> {
        let mut merged = BTreeMap::new();
        let (mut added, mut dropped) = (0usize, 0usize);

        for (key, value) in local {
            match newest.get(key) {
                Some(remote) => {
                    merged.insert(key.clone(), self.merge_value(baseline.get(key), value, remote));
                }
                None if baseline.get(key) == Some(value) => dropped += 1,
                None => {
                    merged.insert(key.clone(), value.clone());
                }
            }
        }
        for (key, value) in newest {
            if !local.contains_key(key) && !baseline.contains_key(key) {
                merged.insert(key.clone(), value.clone());
                added += 1;
            }
        }

        debug!(local = local.len(), newest = newest.len(), added, dropped, "merged map");
        merged
    }
}

fn baseline_elements(baseline: Option<&FieldValue>) -> &[FieldValue] {
    baseline.and_then(FieldValue::as_elements).unwrap_or(&[])
}

impl std::fmt::Debug for MergeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeEngine")
            .field("local", &self.local)
            .field("newest", &self.newest)
            .finish()
    }
}

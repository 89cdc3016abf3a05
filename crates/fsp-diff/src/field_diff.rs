//! Field-level diff between two snapshots of the same object.

use fsp_types::{FieldSet, FieldValue};

/// Entries of `changed` that differ from `original`.
///
/// A key is included when it is absent from `original`, or when either value
/// is not a scalar, or when the scalars are unequal. Non-scalar values are
/// always reported as changed: a nested value's equality cannot be decided
/// without identity information, and reporting it is never wrong.
///
/// Keys present in `original` but missing from `changed` are not reported.
/// The result carries `changed`'s type name.
pub fn difference(original: &FieldSet, changed: &FieldSet) -> FieldSet {
    let mut out = FieldSet {
        type_name: changed.type_name.clone(),
        ..FieldSet::default()
    };
    for (name, value) in changed {
        let unchanged = match original.get(name) {
            Some(before) => before.is_scalar() && value.is_scalar() && before == value,
            None => false,
        };
        if !unchanged {
            out.fields.insert(name.clone(), value.clone());
        }
    }
    out
}

/// A single change between two field sets.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldChange {
    Added { name: String, value: FieldValue },
    Removed { name: String, value: FieldValue },
    Modified {
        name: String,
        old: FieldValue,
        new: FieldValue,
    },
}

/// Full comparison of two field sets, using structural equality throughout.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldChanges {
    pub changes: Vec<FieldChange>,
}

impl FieldChanges {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn additions(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, FieldChange::Added { .. }))
            .count()
    }

    pub fn removals(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, FieldChange::Removed { .. }))
            .count()
    }

    pub fn modifications(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, FieldChange::Modified { .. }))
            .count()
    }
}

/// Compare two field sets key by key.
pub fn diff_field_sets(old: &FieldSet, new: &FieldSet) -> FieldChanges {
    let mut changes = Vec::new();

    for (name, old_val) in old {
        match new.get(name) {
            Some(new_val) if new_val != old_val => changes.push(FieldChange::Modified {
                name: name.clone(),
                old: old_val.clone(),
                new: new_val.clone(),
            }),
            Some(_) => {}
            None => changes.push(FieldChange::Removed {
                name: name.clone(),
                value: old_val.clone(),
            }),
        }
    }

    for (name, new_val) in new {
        if !old.contains_key(name) {
            changes.push(FieldChange::Added {
                name: name.clone(),
                value: new_val.clone(),
            });
        }
    }

    FieldChanges { changes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsp_types::Record;

    fn person(name: &str, age: i64) -> FieldSet {
        FieldSet::typed("Person").with("name", name).with("age", age)
    }

    #[test]
    fn difference_of_identical_scalars_is_empty() {
        let x = person("Ann", 20).with("active", true).with("score", 1.5);
        assert!(difference(&x, &x).is_empty());
    }

    #[test]
    fn difference_reports_changed_scalar() {
        let d = difference(&person("Ann", 20), &person("Ann", 21));
        assert_eq!(d.len(), 1);
        assert_eq!(d.get("age"), Some(&FieldValue::Int(21)));
        assert_eq!(d.type_name.as_deref(), Some("Person"));
    }

    #[test]
    fn difference_reports_new_key() {
        let d = difference(&person("Ann", 20), &person("Ann", 20).with("city", "Oslo"));
        assert_eq!(d.keys().collect::<Vec<_>>(), vec!["city"]);
    }

    #[test]
    fn difference_ignores_removed_key() {
        let d = difference(&person("Ann", 20), &FieldSet::typed("Person").with("name", "Ann"));
        assert!(d.is_empty());
    }

    #[test]
    fn difference_always_reports_nested_values() {
        let x = FieldSet::new()
            .with("tags", FieldValue::List(vec!["a".into()]))
            .with("owner", Record::new(FieldSet::new()));
        let d = difference(&x, &x);
        assert_eq!(d.len(), 2);
    }

    #[test]
    fn difference_null_vs_value() {
        let before = FieldSet::new().with("nick", FieldValue::Null);
        let after = FieldSet::new().with("nick", "annie");
        assert_eq!(difference(&before, &after).len(), 1);
        assert!(difference(&before, &before).is_empty());
    }

    #[test]
    fn diff_field_sets_mixed() {
        let old = FieldSet::new()
            .with("keep", true)
            .with("modify", "old")
            .with("remove", 42);
        let new = FieldSet::new()
            .with("keep", true)
            .with("modify", "new")
            .with("added", FieldValue::List(vec![1.into(), 2.into()]));

        let diff = diff_field_sets(&old, &new);
        assert_eq!(diff.len(), 3);
        assert_eq!(diff.additions(), 1);
        assert_eq!(diff.removals(), 1);
        assert_eq!(diff.modifications(), 1);
    }

    #[test]
    fn diff_field_sets_compares_nested_structurally() {
        let a = FieldSet::new().with("tags", FieldValue::List(vec!["x".into()]));
        assert!(diff_field_sets(&a, &a).is_empty());
    }
}

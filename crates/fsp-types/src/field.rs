//! Named-field object snapshots.
//!
//! A [`FieldSet`] is the persisted state of one object: a key-ordered map
//! from field name to [`FieldValue`]. An absent key means the field is not
//! part of the snapshot, which is distinct from a present key holding
//! [`FieldValue::Null`].

use std::collections::btree_map;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single field value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Growable ordered sequence.
    List(Vec<FieldValue>),
    /// Fixed-length sequence; merges keep the local length.
    Array(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
    /// Nested object with its own identity.
    Object(Record),
}

impl FieldValue {
    /// Scalars compare by value; everything else is structural.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::Null | Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::Text(_)
        )
    }

    /// Short name of the variant, for logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::List(_) => "list",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Object(_) => "object",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Object(r) => Some(r),
            _ => None,
        }
    }

    /// Elements of a list or array.
    pub fn as_elements(&self) -> Option<&[FieldValue]> {
        match self {
            Self::List(items) | Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Stable textual form of a scalar, used as its identity in sequences.
    ///
    /// Returns `None` for non-scalars.
    pub fn canonical_scalar(&self) -> Option<String> {
        match self {
            Self::Null => Some("null".into()),
            Self::Bool(b) => Some(format!("bool:{b}")),
            Self::Int(i) => Some(format!("int:{i}")),
            Self::Float(f) => Some(format!("float:{:x}", f.to_bits())),
            Self::Text(s) => Some(format!("text:{s}")),
            _ => None,
        }
    }

    fn assign_missing_uids(&mut self) -> usize {
        match self {
            Self::Object(record) => record.assign_missing_uids(),
            Self::List(items) | Self::Array(items) => {
                items.iter_mut().map(Self::assign_missing_uids).sum()
            }
            Self::Map(entries) => entries.values_mut().map(Self::assign_missing_uids).sum(),
            _ => 0,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Record> for FieldValue {
    fn from(r: Record) -> Self {
        Self::Object(r)
    }
}

impl From<serde_json::Value> for FieldValue {
    /// JSON objects become maps, never records; records need an explicit uid.
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
        }
    }
}

/// A nested object: a surrogate identity plus its own field set.
///
/// The `uid` is persisted alongside the fields so that the same logical
/// element can be recognised in two independently decoded versions of a
/// graph. Records built in memory start without one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<Uuid>,
    pub fields: FieldSet,
}

impl Record {
    /// A record that has not been assigned an identity yet.
    pub fn new(fields: FieldSet) -> Self {
        Self { uid: None, fields }
    }

    pub fn with_uid(uid: Uuid, fields: FieldSet) -> Self {
        Self {
            uid: Some(uid),
            fields,
        }
    }

    /// Return the uid, minting one first if the record has none.
    pub fn ensure_uid(&mut self) -> Uuid {
        *self.uid.get_or_insert_with(Uuid::now_v7)
    }

    fn assign_missing_uids(&mut self) -> usize {
        let minted = usize::from(self.uid.is_none());
        self.ensure_uid();
        minted + self.fields.assign_missing_uids()
    }
}

/// Persisted state of one object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSet {
    /// Declared type of the object the fields were taken from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty field set carrying a type name.
    pub fn typed(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, FieldValue> {
        self.fields.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Returns `true` if the type name matches, or either side is untyped.
    pub fn is_type_compatible(&self, type_name: &str) -> bool {
        self.type_name.as_deref().map_or(true, |t| t == type_name)
    }

    /// Shallow merge: every key of `incoming` replaces the local value. An
    /// incoming type name replaces the local one.
    pub fn overlay(&mut self, incoming: &FieldSet) {
        if incoming.type_name.is_some() {
            self.type_name.clone_from(&incoming.type_name);
        }
        for (name, value) in &incoming.fields {
            self.fields.insert(name.clone(), value.clone());
        }
    }

    /// Non-mutating form of [`FieldSet::overlay`].
    pub fn overlaid(&self, incoming: &FieldSet) -> FieldSet {
        let mut out = self.clone();
        out.overlay(incoming);
        out
    }

    /// Give every nested record without a uid a fresh one. Returns how many
    /// uids were minted.
    pub fn assign_missing_uids(&mut self) -> usize {
        self.fields
            .values_mut()
            .map(FieldValue::assign_missing_uids)
            .sum()
    }
}

impl<'a> IntoIterator for &'a FieldSet {
    type Item = (&'a String, &'a FieldValue);
    type IntoIter = btree_map::Iter<'a, String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl FromIterator<(String, FieldValue)> for FieldSet {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            type_name: None,
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_and_null_are_distinct() {
        let fs = FieldSet::new().with("nickname", FieldValue::Null);
        assert!(fs.contains_key("nickname"));
        assert_eq!(fs.get("nickname"), Some(&FieldValue::Null));
        assert!(!fs.contains_key("age"));
    }

    #[test]
    fn overlay_incoming_wins() {
        let mut base = FieldSet::typed("Person").with("name", "Ann").with("age", 20);
        let incoming = FieldSet::new().with("age", 21).with("city", "Oslo");
        base.overlay(&incoming);
        assert_eq!(base.get("name"), Some(&FieldValue::from("Ann")));
        assert_eq!(base.get("age"), Some(&FieldValue::Int(21)));
        assert_eq!(base.get("city"), Some(&FieldValue::from("Oslo")));
        // Untyped incoming keeps the existing type name.
        assert_eq!(base.type_name.as_deref(), Some("Person"));
    }

    #[test]
    fn scalar_classification() {
        assert!(FieldValue::Int(1).is_scalar());
        assert!(FieldValue::Null.is_scalar());
        assert!(!FieldValue::List(vec![]).is_scalar());
        assert!(!FieldValue::Object(Record::new(FieldSet::new())).is_scalar());
    }

    #[test]
    fn canonical_scalar_distinguishes_types() {
        assert_ne!(
            FieldValue::Int(1).canonical_scalar(),
            FieldValue::from("1").canonical_scalar()
        );
        assert!(FieldValue::Map(BTreeMap::new()).canonical_scalar().is_none());
    }

    #[test]
    fn assign_missing_uids_reaches_nested_records() {
        let existing = Uuid::now_v7();
        let inner = Record::new(FieldSet::new().with("n", 1));
        let outer = Record::with_uid(
            existing,
            FieldSet::new().with("child", FieldValue::Object(inner)),
        );
        let mut fs = FieldSet::new().with(
            "items",
            FieldValue::List(vec![
                FieldValue::Object(outer),
                FieldValue::Object(Record::new(FieldSet::new())),
            ]),
        );

        assert_eq!(fs.assign_missing_uids(), 2);
        assert_eq!(fs.assign_missing_uids(), 0);

        let items = fs.get("items").and_then(FieldValue::as_elements).unwrap();
        assert_eq!(items[0].as_record().unwrap().uid, Some(existing));
        assert!(items[1].as_record().unwrap().uid.is_some());
    }

    #[test]
    fn from_json_value() {
        let value = FieldValue::from(json!({"a": [1, 2.5, "x"], "b": null}));
        let FieldValue::Map(map) = value else {
            panic!("expected map");
        };
        assert_eq!(
            map["a"],
            FieldValue::List(vec![
                FieldValue::Int(1),
                FieldValue::Float(2.5),
                FieldValue::from("x")
            ])
        );
        assert_eq!(map["b"], FieldValue::Null);
    }

    #[test]
    fn serde_roundtrip_preserves_uids() {
        let uid = Uuid::now_v7();
        let fs = FieldSet::typed("Cart").with(
            "owner",
            Record::with_uid(uid, FieldSet::new().with("name", "Ann")),
        );
        let json = serde_json::to_string(&fs).unwrap();
        let back: FieldSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fs);
    }

    #[test]
    fn type_compatibility() {
        let typed = FieldSet::typed("Person");
        assert!(typed.is_type_compatible("Person"));
        assert!(!typed.is_type_compatible("Order"));
        assert!(FieldSet::new().is_type_compatible("Order"));
    }
}

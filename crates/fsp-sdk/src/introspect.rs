use fsp_types::FieldSet;
use tracing::warn;

/// Field-set view of an application type.
///
/// `introspect` and `restore` must agree: restoring a value from its own
/// introspection reproduces it.
pub trait Introspect: Default {
    /// Type name stored with every field set, used to detect mismatches.
    const TYPE_NAME: &'static str;

    /// Current state as named fields.
    fn introspect(&self) -> FieldSet;

    /// Overwrite `self` from `fields`. Returns `true` only if every declared
    /// field was present with the expected kind; fields that were not are
    /// left untouched.
    fn restore(&mut self, fields: &FieldSet) -> bool;
}

/// Introspect `value` and stamp the result with its type name.
pub(crate) fn snapshot<T: Introspect>(value: &T) -> FieldSet {
    let mut fields = value.introspect();
    fields.type_name = Some(T::TYPE_NAME.to_string());
    fields
}

/// Build a fresh value from `fields`. Missing fields keep their defaults.
pub(crate) fn materialize<T: Introspect>(fields: &FieldSet) -> T {
    let mut value = T::default();
    if !value.restore(fields) {
        warn!(type_name = T::TYPE_NAME, "field set incomplete, defaults kept");
    }
    value
}

/// Refresh `value` in place, reconstructing it when the field set does not
/// match its shape.
pub(crate) fn restore_in_place<T: Introspect>(value: &mut T, fields: &FieldSet) {
    if !value.restore(fields) {
        warn!(type_name = T::TYPE_NAME, "in-place restore incomplete, reconstructing");
        *value = materialize(fields);
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use fsp_types::{FieldSet, FieldValue, Record, Uuid};

    use super::Introspect;

    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct Person {
        pub name: String,
        pub age: i64,
    }

    impl Person {
        pub fn new(name: &str, age: i64) -> Self {
            Self {
                name: name.to_string(),
                age,
            }
        }
    }

    impl Introspect for Person {
        const TYPE_NAME: &'static str = "Person";

        fn introspect(&self) -> FieldSet {
            FieldSet::new()
                .with("name", self.name.as_str())
                .with("age", self.age)
        }

        fn restore(&mut self, fields: &FieldSet) -> bool {
            let mut complete = true;
            match fields.get("name").and_then(FieldValue::as_text) {
                Some(name) => self.name = name.to_string(),
                None => complete = false,
            }
            match fields.get("age").and_then(FieldValue::as_int) {
                Some(age) => self.age = age,
                None => complete = false,
            }
            complete
        }
    }

    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct Line {
        pub uid: Option<Uuid>,
        pub sku: String,
        pub qty: i64,
    }

    impl Line {
        pub fn new(sku: &str, qty: i64) -> Self {
            Self {
                uid: None,
                sku: sku.to_string(),
                qty,
            }
        }

        fn to_value(&self) -> FieldValue {
            FieldValue::Object(Record {
                uid: self.uid,
                fields: FieldSet::new()
                    .with("sku", self.sku.as_str())
                    .with("qty", self.qty),
            })
        }

        fn from_value(value: &FieldValue) -> Option<Self> {
            let record = value.as_record()?;
            Some(Self {
                uid: record.uid,
                sku: record.fields.get("sku")?.as_text()?.to_string(),
                qty: record.fields.get("qty")?.as_int()?,
            })
        }
    }

    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct Cart {
        pub owner: String,
        pub lines: Vec<Line>,
    }

    impl Cart {
        pub fn skus(&self) -> Vec<&str> {
            self.lines.iter().map(|l| l.sku.as_str()).collect()
        }
    }

    impl Introspect for Cart {
        const TYPE_NAME: &'static str = "Cart";

        fn introspect(&self) -> FieldSet {
            FieldSet::new().with("owner", self.owner.as_str()).with(
                "lines",
                FieldValue::List(self.lines.iter().map(Line::to_value).collect()),
            )
        }

        fn restore(&mut self, fields: &FieldSet) -> bool {
            let mut complete = true;
            match fields.get("owner").and_then(FieldValue::as_text) {
                Some(owner) => self.owner = owner.to_string(),
                None => complete = false,
            }
            match fields.get("lines").and_then(FieldValue::as_elements) {
                Some(items) => {
                    let lines: Option<Vec<Line>> = items.iter().map(Line::from_value).collect();
                    match lines {
                        Some(lines) => self.lines = lines,
                        None => complete = false,
                    }
                }
                None => complete = false,
            }
            complete
        }
    }
}

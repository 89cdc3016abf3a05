use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::sanitize;

/// Sanitized, filesystem-safe identifier for a persisted object.
///
/// An `ObjectId` is produced by [`sanitize`](crate::sanitize()) from a raw
/// application id. The lowercase URL-encoded prefix is safe on case-insensitive
/// filesystems; the trailing hex bitmap keeps enough case information for
/// [`ObjectId::to_raw`] to recover the original id exactly.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Sanitize a raw id. Uncached; see [`IdSanitizer`](crate::IdSanitizer).
    pub fn from_raw(raw: &str) -> Self {
        sanitize::sanitize(raw)
    }

    /// Wrap an already-sanitized string after checking that it decodes.
    pub fn parse(sanitized: &str) -> Result<Self, TypeError> {
        sanitize::unsanitize_str(sanitized)?;
        Ok(Self(sanitized.to_string()))
    }

    pub(crate) fn new_unchecked(sanitized: String) -> Self {
        Self(sanitized)
    }

    /// The sanitized form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recover the raw id this key was derived from.
    pub fn to_raw(&self) -> Result<String, TypeError> {
        sanitize::unsanitize(self)
    }

    /// Backing file name for this id with the given extension.
    pub fn file_name(&self, extension: &str) -> String {
        if extension.is_empty() {
            self.0.clone()
        } else {
            format!("{}.{}", self.0, extension)
        }
    }

    /// Inverse of [`ObjectId::file_name`]. Returns `None` when the name does
    /// not carry the extension or is not a valid sanitized id.
    pub fn from_file_name(name: &str, extension: &str) -> Option<Self> {
        let stem = if extension.is_empty() {
            name
        } else {
            name.strip_suffix(extension)?.strip_suffix('.')?
        };
        Self::parse(stem).ok()
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ObjectId {
    type Error = TypeError;

    fn try_from(sanitized: String) -> Result<Self, TypeError> {
        sanitize::unsanitize_str(&sanitized)?;
        Ok(Self(sanitized))
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_is_deterministic() {
        assert_eq!(ObjectId::from_raw("User42"), ObjectId::from_raw("User42"));
    }

    #[test]
    fn case_variants_produce_different_ids() {
        let lower = ObjectId::from_raw("abc");
        let upper = ObjectId::from_raw("ABC");
        assert_ne!(lower, upper);
        // Same encoded prefix, different bitmap.
        assert_eq!(lower.as_str().split('-').next(), upper.as_str().split('-').next());
    }

    #[test]
    fn file_name_roundtrip() {
        let id = ObjectId::from_raw("Session/Cart");
        let name = id.file_name("fsp.json");
        assert!(name.ends_with(".fsp.json"));
        assert_eq!(ObjectId::from_file_name(&name, "fsp.json"), Some(id));
    }

    #[test]
    fn from_file_name_rejects_other_extensions() {
        let id = ObjectId::from_raw("p1");
        let name = id.file_name("tmp");
        assert!(ObjectId::from_file_name(&name, "fsp.json").is_none());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(ObjectId::parse("no separator").is_err());
        assert!(ObjectId::parse("abc-zz").is_err());
    }

    #[test]
    fn display_is_sanitized_form() {
        let id = ObjectId::from_raw("Ab");
        assert_eq!(format!("{id}"), id.as_str());
    }

    #[test]
    fn serde_uses_sanitized_string() {
        let id = ObjectId::from_raw("p1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_str()));
        let parsed: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn deserialize_validates() {
        assert!(serde_json::from_str::<ObjectId>("\"no separator\"").is_err());
        assert!(serde_json::from_str::<ObjectId>("\"abc-zz\"").is_err());
        // Bitmap too short for a five-character id.
        assert!(serde_json::from_str::<ObjectId>("\"abcde-a\"").is_err());
    }
}

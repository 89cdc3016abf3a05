//! Raw id <-> filesystem key mapping.
//!
//! Grammar of a sanitized id:
//!
//! ```text
//! <lowercase url-encoded raw id> "-" <hex case bitmap>
//! ```
//!
//! The bitmap has `ceil(chars(raw) / CASE_CHUNK)` hex digits. Each digit
//! covers [`CASE_CHUNK`] consecutive characters of the raw id, the first
//! character of the chunk in the most significant bit. A set bit means the
//! character was an uppercase ASCII letter. Non-ASCII characters are never
//! case-folded, so they survive the round trip byte-for-byte.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::TypeError;
use crate::object::ObjectId;

/// Number of raw characters packed into one hex digit of the case bitmap.
pub const CASE_CHUNK: usize = 4;

/// Map a raw id to its sanitized [`ObjectId`].
pub fn sanitize(raw: &str) -> ObjectId {
    let mut out = String::with_capacity(raw.len() + raw.len() / CASE_CHUNK + 2);
    for byte in raw.bytes() {
        if is_unreserved(byte) {
            out.push(byte.to_ascii_lowercase() as char);
        } else {
            out.push('%');
            out.push_str(&hex::encode([byte]));
        }
    }
    out.push('-');

    let chars: Vec<char> = raw.chars().collect();
    for chunk in chars.chunks(CASE_CHUNK) {
        let mut digit = 0u32;
        for (pos, ch) in chunk.iter().enumerate() {
            if ch.is_ascii_uppercase() {
                digit |= 1 << (CASE_CHUNK - 1 - pos);
            }
        }
        // CASE_CHUNK <= 4 keeps `digit` inside one hex digit.
        out.push(char::from_digit(digit, 16).unwrap_or('0'));
    }

    ObjectId::new_unchecked(out)
}

/// Recover the raw id from a sanitized [`ObjectId`].
pub fn unsanitize(id: &ObjectId) -> Result<String, TypeError> {
    unsanitize_str(id.as_str())
}

pub(crate) fn unsanitize_str(sanitized: &str) -> Result<String, TypeError> {
    let invalid = |reason: &str| TypeError::InvalidObjectId {
        id: sanitized.to_string(),
        reason: reason.to_string(),
    };

    let (prefix, bitmap) = sanitized
        .rsplit_once('-')
        .ok_or_else(|| invalid("missing case bitmap separator"))?;

    let bytes = prefix.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let pair = bytes
                    .get(i + 1..i + 3)
                    .ok_or_else(|| invalid("truncated percent escape"))?;
                if pair.iter().any(u8::is_ascii_uppercase) {
                    return Err(invalid("percent escape must be lowercase"));
                }
                let byte = hex::decode(pair).map_err(|e| invalid(&e.to_string()))?;
                decoded.extend_from_slice(&byte);
                i += 3;
            }
            b if is_unreserved(b) && !b.is_ascii_uppercase() => {
                decoded.push(b);
                i += 1;
            }
            _ => return Err(invalid("unexpected character in encoded prefix")),
        }
    }

    let lowered = String::from_utf8(decoded).map_err(|_| invalid("prefix is not UTF-8"))?;
    let mut chars: Vec<char> = lowered.chars().collect();

    let expected_digits = chars.len().div_ceil(CASE_CHUNK);
    if bitmap.len() != expected_digits {
        return Err(invalid(&format!(
            "case bitmap has {} digits, expected {expected_digits}",
            bitmap.len()
        )));
    }

    for (chunk, digit) in bitmap.chars().enumerate() {
        if digit.is_ascii_uppercase() {
            return Err(invalid("case bitmap must be lowercase hex"));
        }
        let bits = digit
            .to_digit(16)
            .ok_or_else(|| invalid("case bitmap is not hex"))?;
        for pos in 0..CASE_CHUNK {
            if bits & (1 << (CASE_CHUNK - 1 - pos)) == 0 {
                continue;
            }
            let ch = chars
                .get_mut(chunk * CASE_CHUNK + pos)
                .ok_or_else(|| invalid("case bit set past end of id"))?;
            if !ch.is_ascii_lowercase() {
                return Err(invalid("case bit set on a non-letter"));
            }
            *ch = ch.to_ascii_uppercase();
        }
    }

    Ok(chars.into_iter().collect())
}

fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.')
}

/// Memoizing sanitizer.
///
/// Sanitized ids are computed once per raw id and kept for the lifetime of
/// the sanitizer (in practice, of the owning store).
#[derive(Default)]
pub struct IdSanitizer {
    memo: RwLock<HashMap<String, ObjectId>>,
}

impl IdSanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sanitize `raw`, reusing a previously computed result when available.
    pub fn sanitize(&self, raw: &str) -> ObjectId {
        if let Some(id) = self.memo.read().expect("lock poisoned").get(raw) {
            return id.clone();
        }
        let id = sanitize(raw);
        self.memo
            .write()
            .expect("lock poisoned")
            .entry(raw.to_string())
            .or_insert(id)
            .clone()
    }

    /// Number of memoized ids.
    pub fn len(&self) -> usize {
        self.memo.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for IdSanitizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdSanitizer")
            .field("memoized", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn lowercase_id_has_zero_bitmap() {
        assert_eq!(sanitize("abcde").as_str(), "abcde-00");
    }

    #[test]
    fn bitmap_marks_uppercase_msb_first() {
        // A b C d | E -> 1010 | 1000
        assert_eq!(sanitize("AbCdE").as_str(), "abcde-a8");
    }

    #[test]
    fn reserved_bytes_are_escaped_lowercase() {
        assert_eq!(sanitize("a/B c").as_str(), "a%2fb%20c-20");
    }

    #[test]
    fn dash_in_raw_id_survives() {
        let id = sanitize("first-Second");
        assert_eq!(unsanitize(&id).unwrap(), "first-Second");
    }

    #[test]
    fn empty_id() {
        let id = sanitize("");
        assert_eq!(id.as_str(), "-");
        assert_eq!(unsanitize(&id).unwrap(), "");
    }

    #[test]
    fn non_ascii_roundtrip() {
        let raw = "Ünïcødé/ПРИВЕТ";
        assert_eq!(unsanitize(&sanitize(raw)).unwrap(), raw);
    }

    #[test]
    fn wrong_bitmap_length_is_rejected() {
        let err = unsanitize_str("abcde-0").unwrap_err();
        assert!(matches!(err, TypeError::InvalidObjectId { .. }));
    }

    #[test]
    fn case_bit_on_digit_is_rejected() {
        assert!(unsanitize_str("1-8").is_err());
    }

    #[test]
    fn uppercase_prefix_is_rejected() {
        assert!(unsanitize_str("Abc-0").is_err());
    }

    #[test]
    fn memo_returns_same_id() {
        let sanitizer = IdSanitizer::new();
        let a = sanitizer.sanitize("Person:1");
        let b = sanitizer.sanitize("Person:1");
        assert_eq!(a, b);
        assert_eq!(sanitizer.len(), 1);
        assert_eq!(a, sanitize("Person:1"));
    }

    proptest! {
        #[test]
        fn printable_ascii_roundtrip(raw in "[ -~]{0,64}") {
            prop_assert_eq!(unsanitize(&sanitize(&raw)).unwrap(), raw);
        }

        #[test]
        fn any_string_roundtrip(raw in "\\PC{0,32}") {
            prop_assert_eq!(unsanitize(&sanitize(&raw)).unwrap(), raw);
        }

        #[test]
        fn distinct_ids_stay_distinct(a in "[ -~]{0,16}", b in "[ -~]{0,16}") {
            prop_assume!(a != b);
            prop_assert_ne!(sanitize(&a), sanitize(&b));
        }
    }
}

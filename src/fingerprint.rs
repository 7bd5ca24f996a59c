//! Payload validation, canonicalization, and fingerprint derivation.
//!
//! This module turns a raw request body into a stable entry key. The body
//! must parse as a flat JSON object: every field value is a scalar (string,
//! number, boolean, or null), never an array or a nested object. Flatness
//! removes any ordering ambiguity below the top level.
//!
//! The fingerprint is not a hash. Fields are walked in document order and
//! each field name is appended immediately followed by its stringified
//! value; the accumulated string's UTF-8 bytes are then encoded as URL-safe
//! base64. Keys are NOT sorted first, so two payloads with the same pairs
//! in a different order produce different fingerprints. That order
//! sensitivity is part of the key contract and must not be normalized away.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE;
use serde_json::Value;

use crate::models::EntryKey;
use crate::{Error, Result};

/// A validated flat JSON payload.
///
/// Holds the parsed fields in document order together with the canonical
/// (minimal, order-preserving) JSON text that the store persists as the
/// entry body.
///
/// # Example
///
/// ```rust
/// use dupmeter::fingerprint::FlatPayload;
///
/// # fn example() -> dupmeter::Result<()> {
/// let payload = FlatPayload::parse(br#"{ "a": 1, "b": 2 }"#)?;
/// assert_eq!(payload.canonical_text(), r#"{"a":1,"b":2}"#);
/// assert_eq!(payload.fingerprint().as_str(), "YTFiMg==");
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct FlatPayload {
    fields: serde_json::Map<String, Value>,
    canonical: String,
}

impl FlatPayload {
    /// Parses and validates a raw request body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPayload`] when the body is not valid JSON,
    /// is not a JSON object, or has a field whose value is an array or a
    /// nested object.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(raw)
            .map_err(|e| Error::InvalidPayload(format!("malformed JSON: {e}")))?;
        let Value::Object(fields) = value else {
            return Err(Error::InvalidPayload(
                "payload must be a JSON object".to_string(),
            ));
        };
        for (name, field_value) in &fields {
            if field_value.is_array() || field_value.is_object() {
                return Err(Error::InvalidPayload(format!(
                    "field '{name}' must be a scalar value"
                )));
            }
        }
        let canonical = serde_json::to_string(&fields).map_err(|e| {
            Error::InvalidPayload(format!("payload cannot be re-serialized: {e}"))
        })?;
        Ok(Self { fields, canonical })
    }

    /// Returns the canonical JSON text: minimal whitespace, field order
    /// exactly as parsed.
    #[must_use]
    pub fn canonical_text(&self) -> &str {
        &self.canonical
    }

    /// Derives the entry key for this payload.
    ///
    /// Walks the fields in document order, concatenating each field name
    /// with its stringified value, and encodes the result as URL-safe
    /// base64 (padded).
    #[must_use]
    pub fn fingerprint(&self) -> EntryKey {
        let mut joined = String::new();
        for (name, value) in &self.fields {
            joined.push_str(name);
            joined.push_str(&scalar_text(value));
        }
        EntryKey::new(URL_SAFE.encode(joined))
    }
}

/// Stringifies a scalar field value for key derivation.
///
/// Strings contribute their raw content without quotes; numbers, booleans,
/// and null contribute their JSON literal text. Validation has already
/// rejected arrays and objects.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_parse_accepts_all_scalar_types() {
        let payload =
            FlatPayload::parse(br#"{"s":"x","i":3,"f":1.5,"t":true,"n":null}"#).unwrap();
        assert_eq!(
            payload.canonical_text(),
            r#"{"s":"x","i":3,"f":1.5,"t":true,"n":null}"#
        );
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        let err = FlatPayload::parse(b"{not json").unwrap_err();
        assert!(matches!(err, Error::InvalidPayload(_)));
        assert!(err.to_string().contains("malformed JSON"));
    }

    #[test_case(br#"[1, 2, 3]"# ; "array root")]
    #[test_case(br#""just a string""# ; "string root")]
    #[test_case(br#"42"# ; "number root")]
    #[test_case(br#"true"# ; "boolean root")]
    #[test_case(br#"null"# ; "null root")]
    fn test_parse_rejects_non_object_roots(raw: &[u8]) {
        let err = FlatPayload::parse(raw).unwrap_err();
        assert!(err.to_string().contains("must be a JSON object"));
    }

    #[test]
    fn test_parse_rejects_nested_array_value() {
        let err = FlatPayload::parse(br#"{"a":1,"bad":[1,2]}"#).unwrap_err();
        assert!(err.to_string().contains("field 'bad'"));
    }

    #[test]
    fn test_parse_rejects_nested_object_value() {
        let err = FlatPayload::parse(br#"{"bad":{"x":1}}"#).unwrap_err();
        assert!(err.to_string().contains("field 'bad'"));
    }

    #[test]
    fn test_canonical_text_strips_insignificant_whitespace() {
        let payload = FlatPayload::parse(b"{ \"a\" : 1 ,\n\t\"b\" : 2 }").unwrap();
        assert_eq!(payload.canonical_text(), r#"{"a":1,"b":2}"#);
    }

    #[test]
    fn test_canonical_text_preserves_field_order() {
        let payload = FlatPayload::parse(br#"{"z":1,"a":2,"m":3}"#).unwrap();
        assert_eq!(payload.canonical_text(), r#"{"z":1,"a":2,"m":3}"#);
    }

    #[test]
    fn test_canonical_text_round_trips_to_itself() {
        let first = FlatPayload::parse(br#"{ "a": 1, "b": "two" }"#).unwrap();
        let second = FlatPayload::parse(first.canonical_text().as_bytes()).unwrap();
        assert_eq!(first.canonical_text(), second.canonical_text());
        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn test_fingerprint_known_vector() {
        // "a1b2" encodes to YTFiMg==
        let payload = FlatPayload::parse(br#"{"a":1,"b":2}"#).unwrap();
        assert_eq!(payload.fingerprint().as_str(), "YTFiMg==");
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let raw: &[u8] = br#"{"user":"alice","attempt":2,"ok":true}"#;
        let first = FlatPayload::parse(raw).unwrap().fingerprint();
        let second = FlatPayload::parse(raw).unwrap().fingerprint();
        assert_eq!(first, second);
    }

    #[test]
    fn test_fingerprint_depends_on_field_order() {
        // "b2a1" encodes to YjJhMQ==, distinct from the a-first ordering.
        let ab = FlatPayload::parse(br#"{"a":1,"b":2}"#).unwrap().fingerprint();
        let ba = FlatPayload::parse(br#"{"b":2,"a":1}"#).unwrap().fingerprint();
        assert_eq!(ba.as_str(), "YjJhMQ==");
        assert_ne!(ab, ba);
    }

    #[test]
    fn test_fingerprint_depends_on_values() {
        let one = FlatPayload::parse(br#"{"a":1}"#).unwrap().fingerprint();
        let two = FlatPayload::parse(br#"{"a":2}"#).unwrap().fingerprint();
        assert_ne!(one, two);
    }

    #[test]
    fn test_string_and_number_values_can_collide() {
        // "1" and 1 stringify identically; exactness is required of the
        // key, collision-freedom is not.
        let quoted = FlatPayload::parse(br#"{"a":"1"}"#).unwrap().fingerprint();
        let bare = FlatPayload::parse(br#"{"a":1}"#).unwrap().fingerprint();
        assert_eq!(quoted, bare);
    }

    #[test]
    fn test_boolean_and_null_render_as_json_literals() {
        let with_true = FlatPayload::parse(br#"{"a":true}"#).unwrap().fingerprint();
        let spelled = FlatPayload::parse(br#"{"a":"true"}"#).unwrap().fingerprint();
        assert_eq!(with_true, spelled);

        let with_null = FlatPayload::parse(br#"{"a":null}"#).unwrap().fingerprint();
        let spelled = FlatPayload::parse(br#"{"a":"null"}"#).unwrap().fingerprint();
        assert_eq!(with_null, spelled);
    }

    #[test]
    fn test_empty_object_has_empty_key() {
        let payload = FlatPayload::parse(b"{}").unwrap();
        assert_eq!(payload.canonical_text(), "{}");
        assert_eq!(payload.fingerprint().as_str(), "");
    }

    #[test]
    fn test_fingerprint_uses_url_safe_alphabet() {
        // The joined bytes of this payload encode to YcO_w78= with the
        // URL-safe alphabet; standard base64 would emit YcO/w78=.
        let payload = FlatPayload::parse(r#"{"a":"ÿÿ"}"#.as_bytes()).unwrap();
        let key = payload.fingerprint();
        assert_eq!(key.as_str(), "YcO_w78=");
        assert!(
            key.as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '=')
        );
    }

    #[test]
    fn test_unicode_values_fingerprint_their_utf8_bytes() {
        let first = FlatPayload::parse(r#"{"city":"東京"}"#.as_bytes())
            .unwrap()
            .fingerprint();
        let second = FlatPayload::parse(r#"{"city":"東京"}"#.as_bytes())
            .unwrap()
            .fingerprint();
        assert_eq!(first, second);
        assert!(!first.as_str().is_empty());
    }
}

//! Canonical JSON bytes: the single serialization-for-hashing routine.
//!
//! # Canonicalization rules
//!
//! 1. Object keys are sorted lexicographically (byte order).
//! 2. Compact form, no whitespace (`{"a":1,"b":2}`).
//! 3. Strings are escaped per RFC 8259 §7; other UTF-8 passes through.
//! 4. Numbers must be integers (`i64` or `u64`). Floats are rejected.
//!    Log scores are exported as IEEE-754 bit patterns via [`score_bits`]
//!    so that exports are bit-reproducible across platforms.
//! 5. `null`, `true`, `false` are written literally.

use std::io::Write;

use thiserror::Error;

/// Error type for canonical JSON serialization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanonError {
    /// A JSON number was not an integer.
    #[error("non-integer number in canonical JSON: {raw}")]
    NonIntegerNumber { raw: String },
}

/// Encode a log score as its `f32` bit pattern.
#[must_use]
pub fn score_bits(score: f32) -> serde_json::Value {
    serde_json::Value::from(score.to_bits())
}

/// Encode an `f64` configuration value as its bit pattern.
#[must_use]
pub fn f64_bits(value: f64) -> serde_json::Value {
    serde_json::Value::from(value.to_bits())
}

/// Produce canonical JSON bytes from a `serde_json::Value`.
///
/// # Errors
///
/// Returns [`CanonError::NonIntegerNumber`] if any number is not
/// representable as `i64` or `u64`.
pub fn canonical_json_bytes(value: &serde_json::Value) -> Result<Vec<u8>, CanonError> {
    let mut out = CanonWriter { buf: Vec::new() };
    out.value(value)?;
    Ok(out.buf)
}

struct CanonWriter {
    buf: Vec<u8>,
}

impl CanonWriter {
    fn value(&mut self, value: &serde_json::Value) -> Result<(), CanonError> {
        use serde_json::Value;
        match value {
            Value::Null => self.buf.extend_from_slice(b"null"),
            Value::Bool(true) => self.buf.extend_from_slice(b"true"),
            Value::Bool(false) => self.buf.extend_from_slice(b"false"),
            Value::Number(n) => self.number(n)?,
            Value::String(s) => self.string(s),
            Value::Array(items) => {
                self.buf.push(b'[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.buf.push(b',');
                    }
                    self.value(item)?;
                }
                self.buf.push(b']');
            }
            Value::Object(map) => {
                let mut entries: Vec<(&String, &Value)> = map.iter().collect();
                entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
                self.buf.push(b'{');
                for (i, (key, item)) in entries.into_iter().enumerate() {
                    if i > 0 {
                        self.buf.push(b',');
                    }
                    self.string(key);
                    self.buf.push(b':');
                    self.value(item)?;
                }
                self.buf.push(b'}');
            }
        }
        Ok(())
    }

    fn number(&mut self, n: &serde_json::Number) -> Result<(), CanonError> {
        if let Some(i) = n.as_i64() {
            let _ = write!(self.buf, "{i}");
        } else if let Some(u) = n.as_u64() {
            let _ = write!(self.buf, "{u}");
        } else {
            return Err(CanonError::NonIntegerNumber { raw: n.to_string() });
        }
        Ok(())
    }

    fn string(&mut self, s: &str) {
        self.buf.push(b'"');
        for ch in s.chars() {
            match ch {
                '"' => self.buf.extend_from_slice(b"\\\""),
                '\\' => self.buf.extend_from_slice(b"\\\\"),
                '\n' => self.buf.extend_from_slice(b"\\n"),
                '\r' => self.buf.extend_from_slice(b"\\r"),
                '\t' => self.buf.extend_from_slice(b"\\t"),
                c if c < '\u{0020}' => {
                    let _ = write!(self.buf, "\\u{:04x}", u32::from(c));
                }
                c => {
                    let mut utf8 = [0u8; 4];
                    self.buf.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
                }
            }
        }
        self.buf.push(b'"');
    }
}

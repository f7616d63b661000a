//! Data point model
//!
//! A data point is a mapping from field name to scalar value with an
//! optional timestamp. Values are restricted to a closed set of kinds, each
//! with a defined text representation; anything else is rejected up front
//! instead of best-effort stringified.

use std::collections::BTreeMap;

use crate::error::{ByteportError, ByteportResult};
use crate::fields::ensure_valid_field_name;
use crate::timestamp::Timestamp;

/// A scalar value accepted as data point field content
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Text, sent verbatim
    Text(String),

    /// Integer, rendered in decimal
    Integer(i64),

    /// Floating point, rendered via the shortest round-trip form
    Float(f64),

    /// Boolean, rendered as `true` / `false`
    Bool(bool),
}

impl Value {
    /// Render the transport text representation
    ///
    /// Every representable value is valid UTF-8 by construction; the only
    /// rejected inputs are floats with no finite text form.
    pub fn to_text(&self) -> ByteportResult<String> {
        match self {
            Value::Text(s) => Ok(s.clone()),
            Value::Integer(i) => Ok(i.to_string()),
            Value::Float(f) => {
                if !f.is_finite() {
                    return Err(ByteportError::InvalidDataType(format!(
                        "non-finite float value: {f}"
                    )));
                }
                Ok(f.to_string())
            }
            Value::Bool(b) => Ok(b.to_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// A named-field payload submitted for one device
#[derive(Debug, Clone, Default)]
pub struct DataPoint {
    fields: BTreeMap<String, Value>,
    timestamp: Option<Timestamp>,
}

impl DataPoint {
    /// Create an empty data point
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, builder style
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Set the timestamp, builder style
    pub fn at(mut self, timestamp: impl Into<Timestamp>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Insert a field
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// The optional timestamp
    pub fn timestamp(&self) -> Option<&Timestamp> {
        self.timestamp.as_ref()
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the data point carries no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Validate every field name and encode every value to its transport
    /// text form
    ///
    /// Fails with `InvalidFieldName` or `InvalidDataType` on the first
    /// offending entry; no partial output is produced.
    pub fn encode(&self) -> ByteportResult<BTreeMap<String, String>> {
        let mut encoded = BTreeMap::new();
        for (name, value) in &self.fields {
            ensure_valid_field_name(name)?;
            encoded.insert(name.clone(), value.to_text()?);
        }
        Ok(encoded)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for DataPoint {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            timestamp: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_text_representations() {
        assert_eq!(Value::from("on").to_text().unwrap(), "on");
        assert_eq!(Value::from(42i64).to_text().unwrap(), "42");
        assert_eq!(Value::from(-7i32).to_text().unwrap(), "-7");
        assert_eq!(Value::from(21.5).to_text().unwrap(), "21.5");
        assert_eq!(Value::from(true).to_text().unwrap(), "true");
        assert_eq!(Value::from(false).to_text().unwrap(), "false");
    }

    #[test]
    fn test_non_finite_float_is_invalid_data() {
        assert!(matches!(
            Value::from(f64::NAN).to_text(),
            Err(ByteportError::InvalidDataType(_))
        ));
    }

    #[test]
    fn test_encode_simple_mapping() {
        let point = DataPoint::new().field("temp", 21.5);
        let encoded = point.encode().unwrap();
        assert_eq!(encoded.len(), 1);
        assert_eq!(encoded["temp"], "21.5");
    }

    #[test]
    fn test_encode_rejects_bad_field_name() {
        let point = DataPoint::new().field("bad name", 1i64);
        assert!(matches!(
            point.encode(),
            Err(ByteportError::InvalidFieldName(_))
        ));
    }

    #[test]
    fn test_encode_aborts_on_first_invalid_entry() {
        let point = DataPoint::new()
            .field("ok", 1i64)
            .field("nan", f64::NAN)
            .field("zz", 2i64);
        // No partial mapping escapes the failure
        assert!(point.encode().is_err());
    }

    #[test]
    fn test_from_iterator_and_timestamp() {
        let point: DataPoint = [("a", 1i64), ("b", 2i64)].into_iter().collect();
        assert_eq!(point.len(), 2);
        assert!(point.timestamp().is_none());

        let stamped = point.at(1.5f64);
        assert_eq!(
            stamped.timestamp().unwrap().normalize().unwrap(),
            "1.5"
        );
    }
}

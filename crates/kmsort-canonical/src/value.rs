use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::CanonicalizeError;

/// Mapping node of the generic document tree.
///
/// Input key order carries no meaning, so keys are stored sorted.
pub type Mapping = BTreeMap<String, Value>;

/// Terminal value of a document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Explicit `null` (or an empty YAML node).
    Null,
    /// Boolean literal.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer that does not fit into `i64`.
    Uint(u64),
    /// Floating point number.
    Float(f64),
    /// String literal.
    String(String),
}

impl Scalar {
    /// Text form used when a scalar appears as a mapping key.
    pub fn to_key(&self) -> String {
        match self {
            Scalar::Null => "null".to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(n) => n.to_string(),
            Scalar::Uint(n) => n.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::String(s) => s.clone(),
        }
    }
}

/// Generic document tree produced from parsed YAML or JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Key/value node.
    Mapping(Mapping),
    /// Ordered list node.
    Sequence(Vec<Value>),
    /// Leaf node.
    Scalar(Scalar),
}

impl Value {
    /// Shorthand for a string scalar.
    pub fn string(s: impl Into<String>) -> Self {
        Value::Scalar(Scalar::String(s.into()))
    }

    /// Shorthand for an integer scalar.
    pub fn int(n: i64) -> Self {
        Value::Scalar(Scalar::Int(n))
    }

    /// Returns the mapping if this node is one.
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Name of the node shape, used in error messages.
    pub fn shape(&self) -> &'static str {
        match self {
            Value::Mapping(_) => "mapping",
            Value::Sequence(_) => "sequence",
            Value::Scalar(Scalar::Null) => "null",
            Value::Scalar(_) => "scalar",
        }
    }
}

impl TryFrom<serde_yaml::Value> for Value {
    type Error = CanonicalizeError;

    fn try_from(value: serde_yaml::Value) -> Result<Self, Self::Error> {
        use serde_yaml::Value as Yaml;

        Ok(match value {
            Yaml::Null => Value::Scalar(Scalar::Null),
            Yaml::Bool(b) => Value::Scalar(Scalar::Bool(b)),
            Yaml::Number(n) => Value::Scalar(number_to_scalar(&n)),
            Yaml::String(s) => Value::Scalar(Scalar::String(s)),
            Yaml::Sequence(items) => Value::Sequence(
                items
                    .into_iter()
                    .map(Value::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            Yaml::Mapping(entries) => {
                let mut map = Mapping::new();
                for (key, child) in entries {
                    let key = match Value::try_from(key)? {
                        Value::Scalar(scalar) => scalar.to_key(),
                        other => {
                            return Err(CanonicalizeError::Shape {
                                context: "<key>".to_string(),
                                expected: "scalar",
                                found: other.shape(),
                            })
                        }
                    };
                    if map.contains_key(&key) {
                        return Err(CanonicalizeError::Shape {
                            context: key,
                            expected: "unique key",
                            found: "duplicate key",
                        });
                    }
                    map.insert(key, Value::try_from(child)?);
                }
                Value::Mapping(map)
            }
            Yaml::Tagged(tagged) => {
                return Err(CanonicalizeError::Shape {
                    context: tagged.tag.to_string(),
                    expected: "untagged value",
                    found: "tagged",
                })
            }
        })
    }
}

/// Reads a YAML 1.1 octal literal (`0644`, `0o644`) as its integer value.
///
/// The YAML 1.2 loader keeps leading-zero digits as strings, which would
/// otherwise turn file modes into text.
pub fn octal_literal(text: &str) -> Option<i64> {
    let digits = text
        .strip_prefix("0o")
        .or_else(|| text.strip_prefix('0'))
        .filter(|digits| !digits.is_empty())?;
    if !digits.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
        return None;
    }
    i64::from_str_radix(digits, 8).ok()
}

fn number_to_scalar(n: &serde_yaml::Number) -> Scalar {
    if let Some(i) = n.as_i64() {
        Scalar::Int(i)
    } else if let Some(u) = n.as_u64() {
        Scalar::Uint(u)
    } else {
        Scalar::Float(n.as_f64().unwrap_or(f64::NAN))
    }
}

/// Canonicalized tree: mapping entries keep the order they were emitted in.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderedValue {
    /// Ordered key/value pairs.
    Mapping(Vec<(String, OrderedValue)>),
    /// Ordered elements.
    Sequence(Vec<OrderedValue>),
    /// Leaf, passed through unchanged.
    Scalar(Scalar),
}

impl OrderedValue {
    /// Copies a value without applying any policy; mapping keys come out in
    /// lexicographic order.
    pub fn verbatim(value: &Value) -> Self {
        match value {
            Value::Mapping(map) => OrderedValue::verbatim_mapping(map),
            Value::Sequence(items) => {
                OrderedValue::Sequence(items.iter().map(OrderedValue::verbatim).collect())
            }
            Value::Scalar(scalar) => OrderedValue::Scalar(scalar.clone()),
        }
    }

    /// [`OrderedValue::verbatim`] for a bare mapping.
    pub fn verbatim_mapping(map: &Mapping) -> Self {
        OrderedValue::Mapping(
            map.iter()
                .map(|(key, child)| (key.clone(), OrderedValue::verbatim(child)))
                .collect(),
        )
    }

    /// Keys of a mapping node in emission order; empty for other shapes.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            OrderedValue::Mapping(entries) => entries.iter().map(|(k, _)| k.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Looks up a mapping entry by key.
    pub fn get(&self, key: &str) -> Option<&OrderedValue> {
        match self {
            OrderedValue::Mapping(entries) => {
                entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
            }
            _ => None,
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Null => serializer.serialize_unit(),
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::Int(n) => serializer.serialize_i64(*n),
            Scalar::Uint(n) => serializer.serialize_u64(*n),
            Scalar::Float(f) => serializer.serialize_f64(*f),
            Scalar::String(s) => serializer.serialize_str(s),
        }
    }
}

impl Serialize for OrderedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OrderedValue::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            OrderedValue::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            OrderedValue::Scalar(scalar) => scalar.serialize(serializer),
        }
    }
}

impl fmt::Display for OrderedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_yaml::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

//! Call arguments and their canonical shapes.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;
use serde_json::Value;

use crate::CacheResult;

/// Scalar leaf of an argument tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
}

/// Canonical argument value.
///
/// Every argument is one of three shapes:
///
/// - `Scalar`: rendered as-is (strings quoted, floats always with a fraction).
/// - `Sequence`: order preserving; `[a, b]` and `[b, a]` render differently.
/// - `Mapping`: order independent; pairs are rendered sorted by key, so two
///   mappings with the same pairs render identically whatever the insertion
///   order was.
///
/// No shape relies on `Hash` or on memory addresses, so the rendering is
/// stable across runs and processes.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Scalar(Scalar),
    Sequence(Vec<ArgValue>),
    Mapping(BTreeMap<String, ArgValue>),
}

impl ArgValue {
    /// Converts any serializable value into its canonical shape.
    ///
    /// Arrays, tuples and tuple structs become sequences; maps and structs
    /// become mappings. Map keys that are not strings are rejected by
    /// `serde_json` and surface as an error.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> CacheResult<Self> {
        Ok(Self::from_json(&serde_json::to_value(value)?))
    }

    /// Converts a JSON value into its canonical shape.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => ArgValue::Scalar(Scalar::Null),
            Value::Bool(b) => ArgValue::Scalar(Scalar::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ArgValue::Scalar(Scalar::Int(i))
                } else if let Some(u) = n.as_u64() {
                    ArgValue::Scalar(Scalar::UInt(u))
                } else {
                    ArgValue::Scalar(Scalar::Float(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            Value::String(s) => ArgValue::Scalar(Scalar::Str(s.clone())),
            Value::Array(items) => ArgValue::Sequence(items.iter().map(Self::from_json).collect()),
            Value::Object(map) => ArgValue::Mapping(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Writes the canonical rendering of this value into `out`.
    pub fn render_into(&self, out: &mut String) {
        match self {
            ArgValue::Scalar(scalar) => render_scalar(scalar, out),
            ArgValue::Sequence(items) => {
                out.push('(');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.render_into(out);
                }
                if items.len() == 1 {
                    out.push(',');
                }
                out.push(')');
            }
            ArgValue::Mapping(map) => {
                // BTreeMap iterates in key order.
                out.push('{');
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push('(');
                    render_str(key, out);
                    out.push_str(", ");
                    value.render_into(out);
                    out.push(')');
                }
                out.push('}');
            }
        }
    }

    /// Returns the canonical rendering as a new string.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }
}

fn render_scalar(scalar: &Scalar, out: &mut String) {
    match scalar {
        Scalar::Null => out.push_str("None"),
        Scalar::Bool(true) => out.push_str("True"),
        Scalar::Bool(false) => out.push_str("False"),
        Scalar::Int(i) => {
            let _ = write!(out, "{}", i);
        }
        Scalar::UInt(u) => {
            let _ = write!(out, "{}", u);
        }
        // Debug keeps the fraction ("1.0"), so 1 and 1.0 stay distinct.
        Scalar::Float(f) => {
            let _ = write!(out, "{:?}", f);
        }
        Scalar::Str(s) => render_str(s, out),
    }
}

fn render_str(s: &str, out: &mut String) {
    let _ = write!(out, "{:?}", s);
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Scalar(Scalar::Str(value.to_string()))
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Scalar(Scalar::Str(value))
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Scalar(Scalar::Bool(value))
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Scalar(Scalar::Int(value))
    }
}

impl From<i32> for ArgValue {
    fn from(value: i32) -> Self {
        ArgValue::Scalar(Scalar::Int(i64::from(value)))
    }
}

impl From<u64> for ArgValue {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(i) => ArgValue::Scalar(Scalar::Int(i)),
            Err(_) => ArgValue::Scalar(Scalar::UInt(value)),
        }
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        ArgValue::Scalar(Scalar::Float(value))
    }
}

impl<T: Into<ArgValue>> From<Vec<T>> for ArgValue {
    fn from(values: Vec<T>) -> Self {
        ArgValue::Sequence(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ArgValue>> From<Option<T>> for ArgValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ArgValue::Scalar(Scalar::Null), Into::into)
    }
}

/// Positional and keyword arguments of one call.
///
/// Positional order matters; keyword arguments are kept by name, and a later
/// keyword with the same name replaces the earlier one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    positional: Vec<ArgValue>,
    keyword: BTreeMap<String, ArgValue>,
}

impl CallArgs {
    /// Creates an empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    pub fn with_arg(mut self, value: impl Into<ArgValue>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Adds a keyword argument.
    pub fn with_kwarg(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.keyword.insert(name.into(), value.into());
        self
    }

    /// Appends any serializable value as a positional argument.
    pub fn arg<T: Serialize + ?Sized>(mut self, value: &T) -> CacheResult<Self> {
        self.positional.push(ArgValue::from_serialize(value)?);
        Ok(self)
    }

    /// Adds any serializable value as a keyword argument.
    pub fn kwarg<T: Serialize + ?Sized>(
        mut self,
        name: impl Into<String>,
        value: &T,
    ) -> CacheResult<Self> {
        self.keyword
            .insert(name.into(), ArgValue::from_serialize(value)?);
        Ok(self)
    }

    pub fn push_arg(&mut self, value: ArgValue) {
        self.positional.push(value);
    }

    pub fn push_kwarg(&mut self, name: impl Into<String>, value: ArgValue) {
        self.keyword.insert(name.into(), value);
    }

    pub fn positional(&self) -> &[ArgValue] {
        &self.positional
    }

    pub fn keyword(&self) -> &BTreeMap<String, ArgValue> {
        &self.keyword
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }

    /// Canonical rendering of the positional arguments.
    ///
    /// The arguments are wrapped in a one-element outer sequence so their own
    /// order survives normalization.
    pub(crate) fn render_positional(&self) -> String {
        ArgValue::Sequence(vec![ArgValue::Sequence(self.positional.clone())]).render()
    }

    /// Canonical rendering of the keyword arguments.
    pub(crate) fn render_keyword(&self) -> String {
        ArgValue::Mapping(self.keyword.clone()).render()
    }
}

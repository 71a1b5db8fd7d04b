//! The typed document model produced by the parser
//!
//! Every parsed document is a tree of [`Value`]s. The model is deliberately
//! small: five kinds cover the whole schema family (scalars, vectors,
//! tables, mappings, lists), and numeric tables keep their data as one flat
//! buffer plus a shape so consumers can reshape or serialize them without
//! depending on the parser's internal recursion.

use std::collections::BTreeMap;

use serde::ser::{SerializeMap, SerializeSeq, SerializeStruct};
use serde::{Serialize, Serializer};

/// Mapping from resolved child name to value.
///
/// The key is `None` for anonymous elements (a value-carrying tag without a
/// `name` attribute). Entry order is not significant; a `BTreeMap` keeps
/// serialization deterministic.
pub type Mapping = BTreeMap<Option<String>, Value>;

/// A single typed leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Logical value (`T` in the source text)
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating-point value
    Float(f64),
    /// String value (whitespace-trimmed)
    Str(String),
}

impl Scalar {
    /// Numeric view of the scalar, widening integers to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(v) => Some(*v as f64),
            Scalar::Float(v) => Some(*v),
            _ => None,
        }
    }
}

/// Declared element type of a scalar or table field.
///
/// The schema spells these as `type` attribute tokens. An absent or empty
/// attribute always means [`ValueType::Float`]; omitted types are the
/// common case in the source files and always mean numeric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueType {
    /// `type="int"`
    Int,
    /// No `type` attribute, or `type=""`
    #[default]
    Float,
    /// `type="string"`
    Str,
    /// `type="logical"`
    Logical,
}

impl ValueType {
    /// Map a `type` attribute token to a value type.
    ///
    /// Returns `None` for tokens with no registered conversion rule; the
    /// caller turns that into an unknown-type error with context.
    pub fn from_attr(attr: Option<&str>) -> Option<ValueType> {
        match attr {
            None | Some("") => Some(ValueType::Float),
            Some("int") => Some(ValueType::Int),
            Some("string") => Some(ValueType::Str),
            Some("logical") => Some(ValueType::Logical),
            Some(_) => None,
        }
    }
}

impl Serialize for ValueType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let token = match self {
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Str => "string",
            ValueType::Logical => "logical",
        };
        serializer.serialize_str(token)
    }
}

/// A table field declaration: name plus optional explicit type.
///
/// `typ == None` marks an untyped (numeric) field. A table whose fields are
/// all untyped stores its values as a dense [`Tensor`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    /// Field (column) name
    pub name: String,
    /// Explicit declared type, if any
    #[serde(rename = "type")]
    pub typ: Option<ValueType>,
}

/// Dense N-dimensional numeric data: one flat buffer plus a shape.
///
/// Element `(i1, …, im, j)` lives at the row-major linear offset; the last
/// axis is always the field axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl Tensor {
    /// Build a tensor from a shape and a matching flat buffer.
    ///
    /// Callers must pass `data.len() == shape.iter().product()`; the
    /// assembler guarantees this by pre-sizing the buffer.
    pub(crate) fn new(shape: Vec<usize>, data: Vec<f64>) -> Tensor {
        debug_assert_eq!(shape.iter().product::<usize>(), data.len());
        Tensor { shape, data }
    }

    /// The tensor shape, dimension cardinalities then field count.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// The flat row-major buffer.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Element at a full multi-index, or `None` if out of bounds.
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut offset = 0usize;
        for (i, (&idx, &dim)) in index.iter().zip(&self.shape).enumerate() {
            if idx >= dim {
                return None;
            }
            let stride: usize = self.shape[i + 1..].iter().product();
            offset += idx * stride;
        }
        self.data.get(offset).copied()
    }
}

impl Serialize for Tensor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Slab {
            shape: &self.shape,
            data: &self.data,
        }
        .serialize(serializer)
    }
}

/// One nesting slice of a tensor, serialized as nested JSON arrays.
struct Slab<'a> {
    shape: &'a [usize],
    data: &'a [f64],
}

impl Serialize for Slab<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.shape {
            [] | [_] => {
                let mut seq = serializer.serialize_seq(Some(self.data.len()))?;
                for v in self.data {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
            [outer, rest @ ..] => {
                let stride: usize = rest.iter().product();
                let mut seq = serializer.serialize_seq(Some(*outer))?;
                if stride == 0 {
                    for _ in 0..*outer {
                        seq.serialize_element(&Slab { shape: rest, data: &[] })?;
                    }
                } else {
                    for chunk in self.data.chunks(stride).take(*outer) {
                        seq.serialize_element(&Slab { shape: rest, data: chunk })?;
                    }
                }
                seq.end()
            }
        }
    }
}

/// A heterogeneous table's row structure.
///
/// Nesting depth mirrors the repetition markers of the source document;
/// terminal rows are ordered sequences of mixed-type scalars in field
/// order.
#[derive(Debug, Clone, PartialEq)]
pub enum RowSet {
    /// A nested repetition group
    Set(Vec<RowSet>),
    /// One typed row, columns in field-declaration order
    Row(Vec<Scalar>),
}

impl Serialize for RowSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RowSet::Set(groups) => {
                let mut seq = serializer.serialize_seq(Some(groups.len()))?;
                for g in groups {
                    seq.serialize_element(g)?;
                }
                seq.end()
            }
            RowSet::Row(cols) => {
                let mut seq = serializer.serialize_seq(Some(cols.len()))?;
                for c in cols {
                    seq.serialize_element(c)?;
                }
                seq.end()
            }
        }
    }
}

/// The values of a table: dense tensor or ragged typed rows.
#[derive(Debug, Clone, PartialEq)]
pub enum TableData {
    /// All fields untyped/numeric: a dense tensor of shape
    /// `dimension-cardinalities ++ [field count]`
    Tensor(Tensor),
    /// At least one field carries an explicit type: nested typed rows
    Rows(Vec<RowSet>),
}

/// A parsed tabular node.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Dimension labels in declaration order
    pub dimensions: Vec<String>,
    /// Field declarations in declaration order
    pub fields: Vec<Field>,
    /// The table values
    pub values: TableData,
}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("Table", 3)?;
        st.serialize_field("dimensions", &self.dimensions)?;
        st.serialize_field("fields", &self.fields)?;
        match &self.values {
            TableData::Tensor(t) => st.serialize_field("values", t)?,
            TableData::Rows(rows) => st.serialize_field("values", rows)?,
        }
        st.end()
    }
}

/// A node of the parsed document.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A single typed leaf
    Scalar(Scalar),
    /// An ordered sequence of same-typed scalars
    Vector(Vec<Scalar>),
    /// A tabular node with dimensions, fields and values
    Table(Box<Table>),
    /// One entry per distinct child name
    Mapping(Mapping),
    /// Repeated same-named siblings, in document order
    List(Vec<Value>),
}

impl Value {
    /// Short kind label for diagnostics and summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "scalar",
            Value::Vector(_) => "vector",
            Value::Table(_) => "table",
            Value::Mapping(_) => "mapping",
            Value::List(_) => "list",
        }
    }

    /// Mapping view of this value.
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Named entry of a mapping value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.as_mapping()?.get(&Some(name.to_string()))
    }

    /// List view of this value.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Vector view of this value.
    pub fn as_vector(&self) -> Option<&[Scalar]> {
        match self {
            Value::Vector(items) => Some(items),
            _ => None,
        }
    }

    /// Table view of this value.
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Numeric view of a scalar value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Scalar(s) => s.as_f64(),
            _ => None,
        }
    }

    /// Integer view of a scalar value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Scalar(Scalar::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// String view of a scalar value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(Scalar::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Structural equality with a relative tolerance on floats.
    ///
    /// Two independently produced numeric parses may differ in the last
    /// bits, so downstream comparisons use this instead of `==`. Structure
    /// and non-float leaves must match exactly.
    pub fn approx_eq(&self, other: &Value, tol: f64) -> bool {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => scalar_approx_eq(a, b, tol),
            (Value::Vector(a), Value::Vector(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|(x, y)| scalar_approx_eq(x, y, tol))
            }
            (Value::Table(a), Value::Table(b)) => table_approx_eq(a, b, tol),
            (Value::Mapping(a), Value::Mapping(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| {
                        b.get(k).is_some_and(|w| v.approx_eq(w, tol))
                    })
            }
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|(x, y)| x.approx_eq(y, tol))
            }
            _ => false,
        }
    }
}

fn float_approx_eq(a: f64, b: f64, tol: f64) -> bool {
    a == b || (a - b).abs() <= tol + tol * a.abs().max(b.abs())
}

fn scalar_approx_eq(a: &Scalar, b: &Scalar, tol: f64) -> bool {
    match (a, b) {
        (Scalar::Float(x), Scalar::Float(y)) => float_approx_eq(*x, *y, tol),
        _ => a == b,
    }
}

fn table_approx_eq(a: &Table, b: &Table, tol: f64) -> bool {
    if a.dimensions != b.dimensions || a.fields != b.fields {
        return false;
    }
    match (&a.values, &b.values) {
        (TableData::Tensor(x), TableData::Tensor(y)) => {
            x.shape() == y.shape()
                && x.data().len() == y.data().len()
                && x.data()
                    .iter()
                    .zip(y.data())
                    .all(|(p, q)| float_approx_eq(*p, *q, tol))
        }
        (TableData::Rows(x), TableData::Rows(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| rowset_approx_eq(p, q, tol))
        }
        _ => false,
    }
}

fn rowset_approx_eq(a: &RowSet, b: &RowSet, tol: f64) -> bool {
    match (a, b) {
        (RowSet::Set(x), RowSet::Set(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| rowset_approx_eq(p, q, tol))
        }
        (RowSet::Row(x), RowSet::Row(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| scalar_approx_eq(p, q, tol))
        }
        _ => false,
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Bool(v) => serializer.serialize_bool(*v),
            Scalar::Int(v) => serializer.serialize_i64(*v),
            Scalar::Float(v) => serializer.serialize_f64(*v),
            Scalar::Str(v) => serializer.serialize_str(v),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Scalar(s) => s.serialize(serializer),
            Value::Vector(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Table(t) => t.serialize(serializer),
            // Anonymous entries serialize under the empty key; JSON has no
            // null object keys.
            Value::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key.as_deref().unwrap_or(""), value)?;
                }
                map.end()
            }
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tensor_2x3x2() -> Tensor {
        Tensor::new(
            vec![2, 3, 2],
            (0..12).map(|i| i as f64).collect(),
        )
    }

    #[test]
    fn test_tensor_indexing() {
        let t = tensor_2x3x2();
        assert_eq!(t.shape(), &[2, 3, 2]);
        assert_eq!(t.get(&[0, 0, 0]), Some(0.0));
        assert_eq!(t.get(&[0, 0, 1]), Some(1.0));
        assert_eq!(t.get(&[1, 0, 1]), Some(7.0));
        assert_eq!(t.get(&[1, 2, 1]), Some(11.0));
        assert_eq!(t.get(&[2, 0, 0]), None);
        assert_eq!(t.get(&[1, 0]), None);
    }

    #[test]
    fn test_tensor_serializes_nested() {
        let t = Tensor::new(vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "[[1.0,2.0],[3.0,4.0]]");
    }

    #[test]
    fn test_empty_tensor_serializes() {
        let t = Tensor::new(vec![0, 2], Vec::new());
        assert_eq!(serde_json::to_string(&t).unwrap(), "[]");
    }

    #[test]
    fn test_mapping_serialization_uses_empty_key_for_anonymous() {
        let mut m = Mapping::new();
        m.insert(None, Value::Scalar(Scalar::Int(1)));
        m.insert(Some("x".into()), Value::Scalar(Scalar::Float(2.5)));
        let json = serde_json::to_string(&Value::Mapping(m)).unwrap();
        assert_eq!(json, r#"{"":1,"x":2.5}"#);
    }

    #[test]
    fn test_value_type_from_attr_defaults_to_float() {
        assert_eq!(ValueType::from_attr(None), Some(ValueType::Float));
        assert_eq!(ValueType::from_attr(Some("")), Some(ValueType::Float));
        assert_eq!(ValueType::from_attr(Some("int")), Some(ValueType::Int));
        assert_eq!(ValueType::from_attr(Some("string")), Some(ValueType::Str));
        assert_eq!(
            ValueType::from_attr(Some("logical")),
            Some(ValueType::Logical)
        );
        assert_eq!(ValueType::from_attr(Some("complex")), None);
    }

    #[test]
    fn test_approx_eq_tolerates_last_bit_differences() {
        let a = Value::Scalar(Scalar::Float(1.0));
        let b = Value::Scalar(Scalar::Float(1.0 + 1e-12));
        assert!(a.approx_eq(&b, 1e-7));
        let c = Value::Scalar(Scalar::Float(1.1));
        assert!(!a.approx_eq(&c, 1e-7));
    }

    #[test]
    fn test_approx_eq_distinguishes_kinds() {
        let a = Value::Scalar(Scalar::Int(1));
        let b = Value::Scalar(Scalar::Float(1.0));
        assert!(!a.approx_eq(&b, 1e-7));
    }

    #[test]
    fn test_mapping_get() {
        let mut m = Mapping::new();
        m.insert(Some("volume".into()), Value::Scalar(Scalar::Float(163.5)));
        let v = Value::Mapping(m);
        assert_eq!(v.get("volume").and_then(Value::as_f64), Some(163.5));
        assert!(v.get("missing").is_none());
    }
}

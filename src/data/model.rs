use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value as JsonValue;

// ---------------------------------------------------------------------------
// Value – a single cell of a record
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring the column dtypes of the source
/// tables. Used as a key in `BTreeMap` / `BTreeSet`, so it must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Null,
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                Text(_) => 4,
                Date(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Text(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Date(d) => d.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Null => write!(f, "<null>"),
        }
    }
}

/// Serialized as the plain JSON scalar; dates become `YYYY-MM-DD` strings.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Text(s) => serializer.serialize_str(s),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
            Value::Null => serializer.serialize_none(),
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
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl Value {
    /// Try to interpret the value as an `f64` for numeric comparison and
    /// aggregation.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Date(_) => "date",
            Value::Null => "null",
        }
    }

    /// Convert a JSON scalar. Nested arrays/objects are kept as their text.
    pub fn from_json(val: &JsonValue) -> Value {
        match val {
            JsonValue::String(s) => Value::Text(s.clone()),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    Value::Text(n.to_string())
                }
            }
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Null => Value::Null,
            other => Value::Text(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Sex – canonical participant sex categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Sex {
    Male,
    Female,
    Unknown,
}

impl Sex {
    pub const ALL: [Sex; 3] = [Sex::Male, Sex::Female, Sex::Unknown];

    /// Display label written into the normalized dataset.
    pub fn label(self) -> &'static str {
        match self {
            Sex::Male => "Hombre",
            Sex::Female => "Mujer",
            Sex::Unknown => "Sin dato",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the table
// ---------------------------------------------------------------------------

/// One participant row: column_name → value.
pub type Record = BTreeMap<String, Value>;

// ---------------------------------------------------------------------------
// Dataset – a complete table value
// ---------------------------------------------------------------------------

/// An immutable table with a pre-computed column index. Pipeline stages
/// consume one `Dataset` and build a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// All rows.
    pub records: Vec<Record>,
    /// Sorted list of column names (the union of all record keys).
    pub column_names: Vec<String>,
}

impl Dataset {
    /// Build the column index from the given records.
    pub fn from_records(records: Vec<Record>) -> Self {
        let column_names: Vec<String> = records
            .iter()
            .flat_map(|rec| rec.keys().cloned())
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect();
        Dataset {
            records,
            column_names,
        }
    }

    /// Like [`Dataset::from_records`], but keeps `schema` columns even when
    /// no record carries them (a filter may remove every row).
    pub fn with_schema(records: Vec<Record>, schema: &[String]) -> Self {
        let mut ds = Dataset::from_records(records);
        let mut names: BTreeSet<String> = ds.column_names.drain(..).collect();
        names.extend(schema.iter().cloned());
        ds.column_names = names.into_iter().collect();
        ds
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// No rows and no columns: nothing was read, not even a header.
    pub fn is_blank(&self) -> bool {
        self.records.is_empty() && self.column_names.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.binary_search_by(|c| c.as_str().cmp(column)).is_ok()
    }

    /// Sorted distinct non-null values of `column`.
    pub fn unique_values(&self, column: &str) -> BTreeSet<&Value> {
        self.records
            .iter()
            .map(|rec| field(rec, column))
            .filter(|v| !v.is_null())
            .collect()
    }

    /// Concatenate datasets (e.g. one file per reporting year).
    pub fn concat(parts: Vec<Dataset>) -> Self {
        let schema: Vec<String> = parts
            .iter()
            .flat_map(|p| p.column_names.iter().cloned())
            .collect();
        let records = parts.into_iter().flat_map(|p| p.records).collect();
        Dataset::with_schema(records, &schema)
    }
}

/// Read a field, treating a schema column missing from this row as `Null`.
pub fn field<'a>(record: &'a Record, column: &str) -> &'a Value {
    static NULL: Value = Value::Null;
    record.get(column).unwrap_or(&NULL)
}

//! Per-document property columns.
//!
//! Property columns back the bitmap filter compiler, the property sorter, the
//! categorical scorer and the custom ranker reference implementations.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::store::DocId;

/// Property value types.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Missing value
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// String value
    Text(String),
}

impl PropertyValue {
    /// Get the type name for this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Null => "null",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Int(_) => "int",
            PropertyValue::Float(_) => "float",
            PropertyValue::Text(_) => "text",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Int(v) => Some(*v as f64),
            PropertyValue::Float(v) => Some(*v),
            PropertyValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            PropertyValue::Null | PropertyValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            PropertyValue::Null => 0,
            PropertyValue::Bool(_) => 1,
            PropertyValue::Int(_) | PropertyValue::Float(_) => 2,
            PropertyValue::Text(_) => 3,
        }
    }
}

impl Ord for PropertyValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (PropertyValue::Bool(a), PropertyValue::Bool(b)) => a.cmp(b),
            (PropertyValue::Int(a), PropertyValue::Int(b)) => a.cmp(b),
            (PropertyValue::Float(a), PropertyValue::Float(b)) => {
                if a == b {
                    Ordering::Equal
                } else {
                    a.total_cmp(b)
                }
            }
            // Cross-type numeric comparisons are exact, never through a lossy cast.
            (PropertyValue::Int(a), PropertyValue::Float(b)) => cmp_int_float(*a, *b),
            (PropertyValue::Float(a), PropertyValue::Int(b)) => cmp_int_float(*b, *a).reverse(),
            (PropertyValue::Text(a), PropertyValue::Text(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

/// 2^63 as f64, the first float above every i64.
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

fn cmp_int_float(int: i64, float: f64) -> Ordering {
    if float.is_nan() {
        // Same placement as `total_cmp`: negative NaN first, positive NaN last.
        return if float.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if float >= I64_UPPER {
        return Ordering::Less;
    }
    if float < -I64_UPPER {
        return Ordering::Greater;
    }

    let whole = float.trunc();
    match int.cmp(&(whole as i64)) {
        // Same integer part: the fraction decides.
        Ordering::Equal if float > whole => Ordering::Less,
        Ordering::Equal if float < whole => Ordering::Greater,
        other => other,
    }
}

/// The float as an i64 when it holds an integral value in range.
fn exact_int(float: f64) -> Option<i64> {
    (float.fract() == 0.0 && (-I64_UPPER..I64_UPPER).contains(&float)).then(|| float as i64)
}

impl PartialOrd for PropertyValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PropertyValue {}

impl Hash for PropertyValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            PropertyValue::Null => 0u8.hash(state),
            PropertyValue::Bool(v) => {
                1u8.hash(state);
                v.hash(state);
            }
            // An integral float equals the Int of the same value, so it hashes as one.
            PropertyValue::Int(v) => {
                2u8.hash(state);
                v.hash(state);
            }
            PropertyValue::Float(v) => match exact_int(*v) {
                Some(int) => {
                    2u8.hash(state);
                    int.hash(state);
                }
                None => {
                    4u8.hash(state);
                    v.to_bits().hash(state);
                }
            },
            PropertyValue::Text(s) => {
                3u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

/// A column stores one property's values, indexed by document id.
#[derive(Debug, Default)]
pub struct PropertyColumn {
    values: Vec<PropertyValue>,
}

impl PropertyColumn {
    /// Set the value for a document, growing the column with nulls as needed.
    pub fn set(&mut self, doc_id: DocId, value: PropertyValue) {
        let pos = doc_id as usize;
        if pos >= self.values.len() {
            self.values.resize(pos + 1, PropertyValue::Null);
        }
        self.values[pos] = value;
    }

    /// Get the value for a document. Missing documents read as null.
    pub fn get(&self, doc_id: DocId) -> &PropertyValue {
        static NULL: PropertyValue = PropertyValue::Null;
        self.values.get(doc_id as usize).unwrap_or(&NULL)
    }

    /// One past the highest document id with a slot in this column.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(doc_id, value)` pairs, nulls included.
    pub fn iter(&self) -> impl Iterator<Item = (DocId, &PropertyValue)> {
        self.values
            .iter()
            .enumerate()
            .map(|(pos, value)| (pos as DocId, value))
    }
}

/// Property table managing one column per property name.
#[derive(Debug, Default)]
pub struct PropertyTable {
    columns: RwLock<AHashMap<String, Arc<RwLock<PropertyColumn>>>>,
}

impl PropertyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the column for a property.
    pub fn column(&self, property: &str) -> Arc<RwLock<PropertyColumn>> {
        if let Some(column) = self.columns.read().get(property) {
            return Arc::clone(column);
        }

        let mut columns = self.columns.write();
        Arc::clone(columns.entry(property.to_string()).or_default())
    }

    /// Get the column for a property if it exists.
    pub fn existing_column(&self, property: &str) -> Option<Arc<RwLock<PropertyColumn>>> {
        self.columns.read().get(property).map(Arc::clone)
    }

    /// Check whether a column exists for the property.
    pub fn has_property(&self, property: &str) -> bool {
        self.columns.read().contains_key(property)
    }

    /// Set a value.
    pub fn set_value<V: Into<PropertyValue>>(&self, property: &str, doc_id: DocId, value: V) {
        self.column(property).write().set(doc_id, value.into());
    }

    /// Get a value. Unknown properties and documents read as null.
    pub fn get_value(&self, property: &str, doc_id: DocId) -> PropertyValue {
        self.existing_column(property)
            .map(|column| column.read().get(doc_id).clone())
            .unwrap_or_default()
    }

    /// Get all property names.
    pub fn property_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.columns.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// One past the highest document id stored in any column.
    pub fn max_doc(&self) -> usize {
        self.columns
            .read()
            .values()
            .map(|column| column.read().len())
            .max()
            .unwrap_or(0)
    }
}

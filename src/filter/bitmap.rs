//! Bitmap filters compiled once per query.

use std::fmt::Debug;
use std::sync::Arc;

use bit_vec::BitVec;
use serde::{Deserialize, Serialize};

use crate::error::{RankflowError, Result};
use crate::property::{PropertyTable, PropertyValue};
use crate::store::DocId;

/// Comparison applied by a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperation {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterEqual,
    LessThan,
    LessEqual,
    /// Inclusive range, two operands.
    Range,
    /// Equal to any operand.
    In,
    /// Equal to none of the operands.
    NotIn,
    /// Text prefix, one operand.
    Prefix,
}

/// One filter condition on a document property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub property: String,
    pub operation: FilterOperation,
    pub values: Vec<PropertyValue>,
}

impl FilterCondition {
    pub fn new(
        property: impl Into<String>,
        operation: FilterOperation,
        values: Vec<PropertyValue>,
    ) -> Self {
        FilterCondition {
            property: property.into(),
            operation,
            values,
        }
    }

    pub fn equal<V: Into<PropertyValue>>(property: impl Into<String>, value: V) -> Self {
        Self::new(property, FilterOperation::Equal, vec![value.into()])
    }

    pub fn range<V: Into<PropertyValue>>(property: impl Into<String>, min: V, max: V) -> Self {
        Self::new(property, FilterOperation::Range, vec![min.into(), max.into()])
    }

    /// Check the operand count for the operation.
    pub fn validate(&self) -> Result<()> {
        let arity_ok = match self.operation {
            FilterOperation::Range => self.values.len() == 2,
            FilterOperation::In | FilterOperation::NotIn => !self.values.is_empty(),
            _ => self.values.len() == 1,
        };
        if !arity_ok {
            return Err(RankflowError::filter(format!(
                "{:?} on {:?} got {} operand(s)",
                self.operation,
                self.property,
                self.values.len()
            )));
        }

        if self.operation == FilterOperation::Prefix && self.values[0].as_str().is_none() {
            return Err(RankflowError::filter(format!(
                "Prefix on {:?} needs a text operand, got {}",
                self.property,
                self.values[0].type_name()
            )));
        }
        Ok(())
    }

    /// Evaluate against a property value. Null values never match.
    pub fn matches(&self, value: &PropertyValue) -> bool {
        if value.is_null() {
            return false;
        }
        let values = &self.values;
        match self.operation {
            FilterOperation::Equal => *value == values[0],
            FilterOperation::NotEqual => *value != values[0],
            FilterOperation::GreaterThan => *value > values[0],
            FilterOperation::GreaterEqual => *value >= values[0],
            FilterOperation::LessThan => *value < values[0],
            FilterOperation::LessEqual => *value <= values[0],
            FilterOperation::Range => *value >= values[0] && *value <= values[1],
            FilterOperation::In => values.contains(value),
            FilterOperation::NotIn => !values.contains(value),
            FilterOperation::Prefix => match (value.as_str(), values[0].as_str()) {
                (Some(text), Some(prefix)) => text.starts_with(prefix),
                _ => false,
            },
        }
    }
}

/// A compiled filter: bit set = document passes.
#[derive(Debug, Clone, Default)]
pub struct FilterBitmap {
    bits: BitVec,
}

impl FilterBitmap {
    /// Wrap a bit vector indexed by document id.
    pub fn from_bits(bits: BitVec) -> Self {
        FilterBitmap { bits }
    }

    /// O(1) membership test. Documents beyond the bitmap do not pass.
    #[inline]
    pub fn test(&self, doc_id: DocId) -> bool {
        self.bits.get(doc_id as usize).unwrap_or(false)
    }

    /// Number of passing documents.
    pub fn count_ones(&self) -> usize {
        self.bits.iter().filter(|bit| *bit).count()
    }
}

impl FromIterator<DocId> for FilterBitmap {
    fn from_iter<I: IntoIterator<Item = DocId>>(iter: I) -> Self {
        let mut bits = BitVec::new();
        for doc_id in iter {
            let pos = doc_id as usize;
            if pos >= bits.len() {
                bits.grow(pos + 1 - bits.len(), false);
            }
            bits.set(pos, true);
        }
        FilterBitmap::from_bits(bits)
    }
}

/// Compiles filter conditions into a bitmap.
pub trait BitmapFilterCompiler: Send + Sync + Debug {
    fn compile(&self, conditions: &[FilterCondition]) -> Result<FilterBitmap>;
}

/// Compiles conditions by scanning the columns of a [`PropertyTable`].
#[derive(Debug, Clone)]
pub struct PropertyFilterCompiler {
    table: Arc<PropertyTable>,
}

impl PropertyFilterCompiler {
    pub fn new(table: Arc<PropertyTable>) -> Self {
        PropertyFilterCompiler { table }
    }
}

impl BitmapFilterCompiler for PropertyFilterCompiler {
    fn compile(&self, conditions: &[FilterCondition]) -> Result<FilterBitmap> {
        for condition in conditions {
            condition.validate()?;
        }

        let max_doc = self.table.max_doc();
        let mut bits = BitVec::from_elem(max_doc, true);

        for condition in conditions {
            let Some(column) = self.table.existing_column(&condition.property) else {
                return Err(RankflowError::filter(format!(
                    "unknown filter property {:?}",
                    condition.property
                )));
            };
            let column = column.read();
            for pos in 0..max_doc {
                if bits[pos] && !condition.matches(column.get(pos as DocId)) {
                    bits.set(pos, false);
                }
            }
        }

        Ok(FilterBitmap::from_bits(bits))
    }
}

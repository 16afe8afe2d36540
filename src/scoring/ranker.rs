//! Custom per-document ranking.

use std::fmt::Debug;
use std::sync::Arc;

use crate::property::PropertyTable;
use crate::store::DocId;

/// Computes a custom score for a document that survived every filter.
///
/// Evaluation may be expensive; the pipeline never calls it for filtered
/// candidates.
pub trait CustomRanker: Send + Sync + Debug {
    fn evaluate(&self, doc_id: DocId) -> f32;
}

/// Weighted sum of numeric properties. Non-numeric or missing values count as 0.
#[derive(Debug, Clone)]
pub struct PropertyRanker {
    table: Arc<PropertyTable>,
    weights: Vec<(String, f32)>,
}

impl PropertyRanker {
    pub fn new(table: Arc<PropertyTable>) -> Self {
        PropertyRanker {
            table,
            weights: Vec::new(),
        }
    }

    pub fn with_weight(mut self, property: impl Into<String>, weight: f32) -> Self {
        self.weights.push((property.into(), weight));
        self
    }
}

impl CustomRanker for PropertyRanker {
    fn evaluate(&self, doc_id: DocId) -> f32 {
        self.weights
            .iter()
            .map(|(property, weight)| {
                let value = self.table.get_value(property, doc_id).as_f64().unwrap_or(0.0);
                value as f32 * weight
            })
            .sum()
    }
}

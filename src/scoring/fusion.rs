//! Fusion of base relevance with categorical (product) scores.

use std::fmt::Debug;
use std::sync::Arc;

use ahash::AHashMap;

use crate::config::FusionPolicy;
use crate::property::{PropertyTable, PropertyValue};
use crate::store::DocId;

/// Supplies a categorical boost for a document.
pub trait CategoricalScorer: Send + Sync + Debug {
    fn score(&self, doc_id: DocId) -> f32;
}

/// Boosts documents by the value of one categorical property.
#[derive(Debug)]
pub struct CategoryBoostScorer {
    table: Arc<PropertyTable>,
    property: String,
    boosts: AHashMap<PropertyValue, f32>,
}

impl CategoryBoostScorer {
    pub fn new(table: Arc<PropertyTable>, property: impl Into<String>) -> Self {
        CategoryBoostScorer {
            table,
            property: property.into(),
            boosts: AHashMap::new(),
        }
    }

    /// Set the boost for documents whose property equals `value`.
    pub fn with_boost<V: Into<PropertyValue>>(mut self, value: V, boost: f32) -> Self {
        self.boosts.insert(value.into(), boost);
        self
    }
}

impl CategoricalScorer for CategoryBoostScorer {
    fn score(&self, doc_id: DocId) -> f32 {
        let value = self.table.get_value(&self.property, doc_id);
        self.boosts.get(&value).copied().unwrap_or(0.0)
    }
}

/// Combines a candidate's base score with its categorical score.
#[derive(Debug, Clone, Copy)]
pub struct ScoreFusion<'a> {
    scorer: Option<&'a dyn CategoricalScorer>,
    policy: FusionPolicy,
}

impl<'a> ScoreFusion<'a> {
    pub fn new(scorer: Option<&'a dyn CategoricalScorer>, policy: FusionPolicy) -> Self {
        ScoreFusion { scorer, policy }
    }

    /// Fused score for one candidate. The categorical score is 0 without a scorer.
    #[inline]
    pub fn fuse(&self, doc_id: DocId, base_score: f32) -> f32 {
        let categorical = self.scorer.map_or(0.0, |scorer| scorer.score(doc_id));
        match self.policy {
            FusionPolicy::Additive => base_score + categorical,
            FusionPolicy::Weighted {
                relevance_weight,
                categorical_weight,
            } => base_score * relevance_weight + categorical * categorical_weight,
        }
    }
}

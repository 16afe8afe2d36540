//! Scoring signals applied to candidates.

pub mod fusion;
pub mod ranker;

pub use self::fusion::{CategoricalScorer, CategoryBoostScorer, ScoreFusion};
pub use self::ranker::{CustomRanker, PropertyRanker};

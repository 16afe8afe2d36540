//! Candidate retrieval: query text to `(doc_id, base_score)` pairs.

pub mod index;
pub mod tokenizer;

use std::sync::Arc;

use log::info;

use crate::error::{RankflowError, Result};
use crate::store::DocId;

pub use self::index::{InvertedIndexLookup, MemoryInvertedIndex};
pub use self::tokenizer::{Tokenizer, UnicodeWordTokenizer};

/// Candidate documents and their base scores, as parallel lists.
///
/// Doc ids may repeat; every occurrence is treated as its own candidate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSet {
    pub doc_ids: Vec<DocId>,
    pub scores: Vec<f32>,
}

impl CandidateSet {
    pub fn new(doc_ids: Vec<DocId>, scores: Vec<f32>) -> Self {
        CandidateSet { doc_ids, scores }
    }

    /// Number of candidate doc ids.
    pub fn len(&self) -> usize {
        self.doc_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }

    /// Fail if the doc id and score lists have different lengths.
    pub fn validate(&self) -> Result<()> {
        if self.doc_ids.len() != self.scores.len() {
            return Err(RankflowError::candidate_mismatch(
                self.doc_ids.len(),
                self.scores.len(),
            ));
        }
        Ok(())
    }

    /// Iterate over `(doc_id, base_score)` pairs. Call [`validate`](Self::validate) first.
    pub fn iter(&self) -> impl Iterator<Item = (DocId, f32)> + '_ {
        self.doc_ids.iter().copied().zip(self.scores.iter().copied())
    }
}

impl FromIterator<(DocId, f32)> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = (DocId, f32)>>(iter: I) -> Self {
        let (doc_ids, scores) = iter.into_iter().unzip();
        CandidateSet { doc_ids, scores }
    }
}

/// Fetches candidates for a query, falling back to sub-tokenization.
#[derive(Debug, Clone)]
pub struct CandidateSource {
    tokenizer: Arc<dyn Tokenizer>,
    index: Option<Arc<dyn InvertedIndexLookup>>,
    max_candidates: usize,
}

impl CandidateSource {
    pub fn new(
        tokenizer: Arc<dyn Tokenizer>,
        index: Option<Arc<dyn InvertedIndexLookup>>,
        max_candidates: usize,
    ) -> Self {
        CandidateSource {
            tokenizer,
            index,
            max_candidates,
        }
    }

    /// Fetch candidates for the query text.
    ///
    /// Returns `Ok(None)` when neither the primary tokens nor the
    /// sub-tokens match anything.
    pub fn fetch(&self, text: &str) -> Result<Option<CandidateSet>> {
        let index = self
            .index
            .as_ref()
            .ok_or_else(|| RankflowError::missing_collaborator("inverted index is not configured"))?;

        let tokens = self.tokenizer.tokenize(text);
        let mut candidates = index.search(&tokens, self.max_candidates)?;

        if candidates.is_empty() {
            let subtokens = self.tokenizer.subtokenize(&tokens);
            info!(
                "no candidates for {:?}, retrying with {} sub-tokens",
                text,
                subtokens.len()
            );
            candidates = index.search(&subtokens, self.max_candidates)?;
        }

        if candidates.is_empty() {
            info!("empty search result for query: {text:?}");
            return Ok(None);
        }

        candidates.validate()?;
        Ok(Some(candidates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Index returning canned results per token list.
    #[derive(Debug)]
    struct CannedIndex {
        primary: CandidateSet,
        fallback: CandidateSet,
    }

    impl InvertedIndexLookup for CannedIndex {
        fn search(&self, tokens: &[String], _cap: usize) -> Result<CandidateSet> {
            // Sub-tokens are bigrams, primary tokens are longer.
            if tokens.iter().all(|t| t.chars().count() <= 2) {
                Ok(self.fallback.clone())
            } else {
                Ok(self.primary.clone())
            }
        }
    }

    fn source(primary: CandidateSet, fallback: CandidateSet) -> CandidateSource {
        CandidateSource::new(
            Arc::new(UnicodeWordTokenizer::new()),
            Some(Arc::new(CannedIndex { primary, fallback })),
            100,
        )
    }

    #[test]
    fn test_primary_hit() {
        let primary: CandidateSet = vec![(1, 1.0)].into_iter().collect();
        let found = source(primary.clone(), CandidateSet::default())
            .fetch("shoes")
            .unwrap();
        assert_eq!(found, Some(primary));
    }

    #[test]
    fn test_fallback_to_subtokens() {
        let fallback: CandidateSet = vec![(7, 0.5)].into_iter().collect();
        let found = source(CandidateSet::default(), fallback.clone())
            .fetch("shoes")
            .unwrap();
        assert_eq!(found, Some(fallback));
    }

    #[test]
    fn test_no_match_after_fallback() {
        let found = source(CandidateSet::default(), CandidateSet::default())
            .fetch("shoes")
            .unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn test_mismatch_is_error() {
        let broken = CandidateSet::new(vec![1, 2, 3], vec![1.0]);
        let result = source(broken, CandidateSet::default()).fetch("shoes");
        assert!(matches!(
            result,
            Err(RankflowError::CandidateMismatch {
                candidates: 3,
                scores: 1
            })
        ));
    }

    #[test]
    fn test_missing_index() {
        let source = CandidateSource::new(Arc::new(UnicodeWordTokenizer::new()), None, 10);
        assert!(matches!(
            source.fetch("shoes"),
            Err(RankflowError::MissingCollaborator(_))
        ));
    }
}

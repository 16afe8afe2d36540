//! Inverted index lookup.

use std::cmp::Ordering;
use std::fmt::Debug;

use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;

use crate::error::Result;
use crate::source::CandidateSet;
use crate::store::DocId;

/// BM25 term frequency saturation.
const K1: f32 = 1.2;

/// Maps search tokens to scored candidate documents.
pub trait InvertedIndexLookup: Send + Sync + Debug {
    /// Return at most `cap` candidates with their base relevance scores.
    fn search(&self, tokens: &[String], cap: usize) -> Result<CandidateSet>;
}

#[derive(Debug, Clone, Copy)]
struct Posting {
    doc_id: DocId,
    term_freq: u32,
}

#[derive(Debug, Default)]
struct IndexState {
    postings: AHashMap<String, Vec<Posting>>,
    doc_count: usize,
}

/// In-memory inverted index scoring with BM25 idf and saturated term frequency.
#[derive(Debug, Default)]
pub struct MemoryInvertedIndex {
    state: RwLock<IndexState>,
}

impl MemoryInvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the tokens of one document.
    pub fn add_document(&self, doc_id: DocId, tokens: &[String]) {
        let mut freqs: AHashMap<&str, u32> = AHashMap::new();
        for token in tokens {
            *freqs.entry(token.as_str()).or_insert(0) += 1;
        }

        let mut state = self.state.write();
        for (term, term_freq) in freqs {
            state
                .postings
                .entry(term.to_string())
                .or_default()
                .push(Posting { doc_id, term_freq });
        }
        state.doc_count += 1;
    }

    /// Number of indexed documents.
    pub fn doc_count(&self) -> usize {
        self.state.read().doc_count
    }

    /// Number of documents containing a term.
    pub fn doc_freq(&self, term: &str) -> usize {
        self.state
            .read()
            .postings
            .get(term)
            .map(|postings| postings.len())
            .unwrap_or(0)
    }

    fn idf(doc_count: usize, doc_freq: usize) -> f32 {
        let n = doc_count as f32;
        let df = doc_freq as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }
}

impl InvertedIndexLookup for MemoryInvertedIndex {
    fn search(&self, tokens: &[String], cap: usize) -> Result<CandidateSet> {
        let state = self.state.read();
        let mut accumulated: AHashMap<DocId, f32> = AHashMap::new();
        let mut seen = AHashSet::new();

        for token in tokens {
            if !seen.insert(token.as_str()) {
                continue;
            }
            let Some(postings) = state.postings.get(token) else {
                continue;
            };

            let idf = Self::idf(state.doc_count, postings.len());
            for posting in postings {
                let tf = posting.term_freq as f32;
                *accumulated.entry(posting.doc_id).or_insert(0.0) +=
                    idf * tf * (K1 + 1.0) / (tf + K1);
            }
        }

        let mut scored: Vec<(DocId, f32)> = accumulated.into_iter().collect();
        scored.sort_by(|a, b| match b.1.total_cmp(&a.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });
        scored.truncate(cap);

        let (doc_ids, scores): (Vec<DocId>, Vec<f32>) = scored.into_iter().unzip();
        Ok(CandidateSet::new(doc_ids, scores))
    }
}

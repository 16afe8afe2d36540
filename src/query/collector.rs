//! Bounded top-K selection of ranked hits.

use std::cmp::Ordering;

use crate::property::PropertyValue;
use crate::query::sort::{SortField, SortOrder, SortTarget};
use crate::store::DocId;

/// Upper bound on the slots reserved up front; the heap grows past it on demand.
const MAX_PREALLOCATED: usize = 1 << 16;

/// A candidate that passed every filter.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreDoc {
    pub doc_id: DocId,
    /// Fused relevance score.
    pub score: f32,
    /// Custom ranker score, when the query carries a ranker.
    pub custom_score: Option<f32>,
    /// Sort key values aligned with the query's sort fields.
    pub sort_values: Vec<PropertyValue>,
}

impl ScoreDoc {
    pub fn new(doc_id: DocId, score: f32) -> Self {
        ScoreDoc {
            doc_id,
            score,
            custom_score: None,
            sort_values: Vec::new(),
        }
    }

    pub fn with_custom_score(mut self, custom_score: f32) -> Self {
        self.custom_score = Some(custom_score);
        self
    }

    pub fn with_sort_values(mut self, sort_values: Vec<PropertyValue>) -> Self {
        self.sort_values = sort_values;
        self
    }
}

/// How hits are ranked against each other.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum HitOrdering {
    /// Higher fused score first.
    #[default]
    Score,
    /// Multi-key sort; nulls rank last in either direction.
    Sorted(Vec<SortField>),
}

impl HitOrdering {
    /// Compare two hits. `Greater` means `a` ranks ahead of `b`.
    ///
    /// Hits equal on every key are ordered by ascending doc id, so the
    /// ordering is total and the selection deterministic.
    pub fn compare(&self, a: &ScoreDoc, b: &ScoreDoc) -> Ordering {
        let ord = match self {
            HitOrdering::Score => a.score.total_cmp(&b.score),
            HitOrdering::Sorted(fields) => fields
                .iter()
                .enumerate()
                .map(|(i, field)| compare_key(field, i, a, b))
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal),
        };
        ord.then_with(|| b.doc_id.cmp(&a.doc_id))
    }
}

fn compare_key(field: &SortField, i: usize, a: &ScoreDoc, b: &ScoreDoc) -> Ordering {
    let natural = match &field.target {
        SortTarget::Relevance => Some(a.score.total_cmp(&b.score)),
        SortTarget::CustomScore => match (a.custom_score, b.custom_score) {
            (Some(x), Some(y)) => Some(x.total_cmp(&y)),
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => None,
        },
        SortTarget::Property(_) => {
            let x = a.sort_values.get(i).unwrap_or(&PropertyValue::Null);
            let y = b.sort_values.get(i).unwrap_or(&PropertyValue::Null);
            match (x.is_null(), y.is_null()) {
                (false, false) => Some(x.cmp(y)),
                (false, true) => return Ordering::Greater,
                (true, false) => return Ordering::Less,
                (true, true) => None,
            }
        }
    };

    match (natural, field.order) {
        (None, _) => Ordering::Equal,
        (Some(ord), SortOrder::Descending) => ord,
        (Some(ord), SortOrder::Ascending) => ord.reverse(),
    }
}

/// Keeps the best `capacity` hits seen so far.
///
/// A binary min-heap under [`HitOrdering`]: the root is the worst kept hit,
/// so a new hit either replaces the root or is rejected in O(log k).
#[derive(Debug)]
pub struct TopKSelector {
    capacity: usize,
    ordering: HitOrdering,
    heap: Vec<ScoreDoc>,
}

impl TopKSelector {
    pub fn new(capacity: usize, ordering: HitOrdering) -> Self {
        TopKSelector {
            capacity,
            ordering,
            heap: Vec::with_capacity(capacity.min(MAX_PREALLOCATED)),
        }
    }

    /// Selector sized for the page `[offset, offset + limit)`.
    pub fn for_page(limit: usize, offset: usize, ordering: HitOrdering) -> Self {
        Self::new(limit.saturating_add(offset), ordering)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Offer a hit. Returns whether it was kept.
    pub fn insert(&mut self, hit: ScoreDoc) -> bool {
        if self.capacity == 0 {
            return false;
        }

        if self.heap.len() < self.capacity {
            self.heap.push(hit);
            self.sift_up(self.heap.len() - 1);
            return true;
        }

        if self.ordering.compare(&hit, &self.heap[0]) == Ordering::Greater {
            self.heap[0] = hit;
            self.sift_down(0);
            true
        } else {
            false
        }
    }

    /// The worst kept hit.
    pub fn peek_worst(&self) -> Option<&ScoreDoc> {
        self.heap.first()
    }

    pub fn pop_worst(&mut self) -> Option<ScoreDoc> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.heap.swap(0, last);
        let worst = self.heap.pop();
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        worst
    }

    /// Best-first hits after skipping the best `offset`.
    ///
    /// Pops worst-first, filling the page from its back, and stops once the
    /// page is full; the `offset` best hits are never materialized.
    pub fn drain_page(mut self, offset: usize) -> Vec<ScoreDoc> {
        let count = self.heap.len().saturating_sub(offset);
        let mut page = Vec::with_capacity(count);
        while page.len() < count {
            match self.pop_worst() {
                Some(hit) => page.push(hit),
                None => break,
            }
        }
        page.reverse();
        page
    }

    #[inline]
    fn worse(&self, a: usize, b: usize) -> bool {
        self.ordering.compare(&self.heap[a], &self.heap[b]) == Ordering::Less
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.worse(pos, parent) {
                break;
            }
            self.heap.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.worse(right, left) {
                right
            } else {
                left
            };
            if !self.worse(child, pos) {
                break;
            }
            self.heap.swap(pos, child);
            pos = child;
        }
    }
}

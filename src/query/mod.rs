//! Queries and ranked hit selection.

pub mod collector;
pub mod sort;

use std::fmt;
use std::sync::Arc;

use crate::facet::GroupParam;
use crate::filter::FilterCondition;
use crate::scoring::CustomRanker;

pub use self::collector::{HitOrdering, ScoreDoc, TopKSelector};
pub use self::sort::{
    PropertySorter, SortColumn, SortField, SortOrder, SortTarget, SorterFactory, TableSorter,
    TableSorterFactory, is_relevance_order,
};

/// Page size used by [`Query::new`].
pub const DEFAULT_LIMIT: usize = 10;

/// A ranked retrieval request. The engine never modifies it.
#[derive(Clone)]
pub struct Query {
    /// Free text matched against the inverted index.
    pub text: String,
    /// Maximum number of hits returned.
    pub limit: usize,
    /// Number of best hits skipped before the page starts.
    pub offset: usize,
    /// Property filter conditions, all of which must hold.
    pub filters: Vec<FilterCondition>,
    /// Facet restriction and counting.
    pub group: Option<GroupParam>,
    /// Sort keys; empty means relevance order.
    pub sort: Vec<SortField>,
    /// Secondary ranker evaluated on filter survivors.
    pub custom_ranker: Option<Arc<dyn CustomRanker>>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Query {
            text: text.into(),
            limit: DEFAULT_LIMIT,
            offset: 0,
            filters: Vec::new(),
            group: None,
            sort: Vec::new(),
            custom_ranker: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_filter(mut self, condition: FilterCondition) -> Self {
        self.filters.push(condition);
        self
    }

    pub fn with_group(mut self, group: GroupParam) -> Self {
        self.group = Some(group);
        self
    }

    pub fn with_sort(mut self, field: SortField) -> Self {
        self.sort.push(field);
        self
    }

    pub fn with_custom_ranker(mut self, ranker: Arc<dyn CustomRanker>) -> Self {
        self.custom_ranker = Some(ranker);
        self
    }

    /// Ordering of hits implied by the sort keys.
    pub fn hit_ordering(&self) -> HitOrdering {
        if is_relevance_order(&self.sort) {
            HitOrdering::Score
        } else {
            HitOrdering::Sorted(self.sort.clone())
        }
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("text", &self.text)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("filters", &self.filters)
            .field("group", &self.group)
            .field("sort", &self.sort)
            .field("custom_ranker", &self.custom_ranker.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder() {
        let query = Query::new("red shoes")
            .with_limit(5)
            .with_offset(10)
            .with_filter(FilterCondition::equal("brand", "acme"))
            .with_group(GroupParam::new(["category"]));

        assert_eq!(query.text, "red shoes");
        assert_eq!(query.limit, 5);
        assert_eq!(query.offset, 10);
        assert_eq!(query.filters.len(), 1);
        assert!(query.group.is_some());
        assert!(query.custom_ranker.is_none());
    }

    #[test]
    fn test_hit_ordering() {
        assert_eq!(Query::new("a").hit_ordering(), HitOrdering::Score);
        assert_eq!(
            Query::new("a").with_sort(SortField::relevance()).hit_ordering(),
            HitOrdering::Score
        );

        let price = SortField::property("price", SortOrder::Ascending);
        assert_eq!(
            Query::new("a").with_sort(price.clone()).hit_ordering(),
            HitOrdering::Sorted(vec![price])
        );
    }
}

//! The per-query ranked retrieval pipeline.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::config::{AttributeFacetScope, RetrievalConfig};
use crate::error::{RankflowError, Result};
use crate::facet::{FacetAggregator, GroupFilter, GroupFilterBuilder};
use crate::filter::{BitmapFilterCompiler, FilterBitmap, FilterChain};
use crate::query::{HitOrdering, PropertySorter, Query, ScoreDoc, SorterFactory, TopKSelector};
use crate::result::{ResultAssembler, ResultSet, SearchResponse};
use crate::scoring::{CategoricalScorer, CustomRanker, ScoreFusion};
use crate::source::{CandidateSource, InvertedIndexLookup, Tokenizer, UnicodeWordTokenizer};
use crate::store::{DocId, DocumentStore};

/// Per-query collaborators. `None` means the stage does not run.
struct Capabilities<'q> {
    ranker: Option<&'q dyn CustomRanker>,
    bitmap: Option<FilterBitmap>,
    group_filter: Option<Box<dyn GroupFilter>>,
    /// Attribute filter fed during the scan ([`AttributeFacetScope::AllSurvivors`]).
    attribute_filter: Option<Box<dyn GroupFilter>>,
    sorter: Option<Box<dyn PropertySorter>>,
}

/// Runs ranked retrieval queries against injected collaborators.
///
/// The engine holds no per-query state; one instance serves concurrent
/// queries from any number of threads.
#[derive(Debug)]
pub struct RankingEngine {
    config: RetrievalConfig,
    source: CandidateSource,
    store: Arc<dyn DocumentStore>,
    categorical_scorer: Option<Arc<dyn CategoricalScorer>>,
    filter_compiler: Option<Arc<dyn BitmapFilterCompiler>>,
    group_builder: Option<Arc<dyn GroupFilterBuilder>>,
    sorter_factory: Option<Arc<dyn SorterFactory>>,
}

impl RankingEngine {
    pub fn builder() -> RankingEngineBuilder {
        RankingEngineBuilder::default()
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Run a query, recovering every failure into the response status.
    pub fn search(&self, query: &Query) -> SearchResponse {
        match self.try_search(query) {
            Ok(Some(result)) => SearchResponse::matched(result),
            Ok(None) => SearchResponse::no_match(),
            Err(e) => {
                warn!("query {:?} aborted: {e}", query.text);
                SearchResponse::aborted(&e)
            }
        }
    }

    /// Run independent queries in parallel. Responses keep the input order.
    pub fn search_many(&self, queries: &[Query]) -> Vec<SearchResponse> {
        queries.par_iter().map(|query| self.search(query)).collect()
    }

    /// Run a query. `Ok(None)` means nothing matched the query text.
    pub fn try_search(&self, query: &Query) -> Result<Option<ResultSet>> {
        if query.text.trim().is_empty() {
            return Ok(None);
        }

        let start = Instant::now();
        info!(
            "search {:?} (limit {}, offset {})",
            query.text, query.limit, query.offset
        );

        let Some(candidates) = self.source.fetch(&query.text)? else {
            return Ok(None);
        };

        let aggregator = FacetAggregator::new(
            self.group_builder.as_deref(),
            self.config.attribute_top_docs,
        );
        let mut caps = self.capabilities(query, &aggregator)?;

        let fusion = ScoreFusion::new(self.categorical_scorer.as_deref(), self.config.fusion);
        let mut selector = TopKSelector::for_page(query.limit, query.offset, query.hit_ordering());
        let mut total_count = 0;

        let stats = {
            let liveness = self.store.read();
            let group = caps
                .group_filter
                .as_deref_mut()
                .map(|filter| filter as &mut dyn GroupFilter);
            let mut chain = FilterChain::new(&*liveness, caps.bitmap.as_ref(), group);

            for (doc_id, base_score) in candidates.iter() {
                if !chain.test(doc_id) {
                    continue;
                }
                total_count += 1;

                if let Some(filter) = caps.attribute_filter.as_mut() {
                    filter.test(doc_id);
                }

                let mut hit = ScoreDoc::new(doc_id, fusion.fuse(doc_id, base_score));
                if let Some(ranker) = caps.ranker {
                    hit = hit.with_custom_score(ranker.evaluate(doc_id));
                }
                if let Some(sorter) = &caps.sorter {
                    hit = hit.with_sort_values(sorter.sort_values(doc_id));
                }
                selector.insert(hit);
            }

            chain.stats()
        };
        debug!("filter stats for {:?}: {stats:?}", query.text);

        let page = selector.drain_page(query.offset);
        let group_rep = caps
            .group_filter
            .as_ref()
            .map(|filter| filter.group_representation());

        let attr_rep = match caps.attribute_filter {
            Some(filter) => Some(filter.attribute_representation()),
            None => {
                let ranked: Vec<DocId> = page.iter().map(|hit| hit.doc_id).collect();
                aggregator.attribute_pass(query.group.as_ref(), &ranked)
            }
        };

        let result = ResultAssembler::new(total_count, page)
            .with_custom_scores(caps.ranker.is_some())
            .with_sort_fields(caps.sorter.as_ref().map(|sorter| sorter.sort_fields()))
            .with_group_rep(group_rep)
            .with_attr_rep(attr_rep)
            .assemble();

        info!(
            "search {:?}: {} candidates, {} matched, {} returned in {:?}",
            query.text,
            candidates.len(),
            result.total_count,
            result.len(),
            start.elapsed()
        );
        Ok(Some(result))
    }

    fn capabilities<'q>(
        &self,
        query: &'q Query,
        aggregator: &FacetAggregator<'_>,
    ) -> Result<Capabilities<'q>> {
        let bitmap = if query.filters.is_empty() {
            None
        } else {
            let compiler = self.filter_compiler.as_ref().ok_or_else(|| {
                RankflowError::missing_collaborator("query has filters but no filter compiler")
            })?;
            Some(compiler.compile(&query.filters)?)
        };

        let sorter = match query.hit_ordering() {
            HitOrdering::Score => None,
            // Relevance and custom score keys are read off the hit itself.
            HitOrdering::Sorted(fields)
                if fields.iter().all(|field| field.property_name().is_none()) =>
            {
                None
            }
            HitOrdering::Sorted(fields) => {
                let factory = self.sorter_factory.as_ref().ok_or_else(|| {
                    RankflowError::missing_collaborator(
                        "query sorts by a property but no sorter factory",
                    )
                })?;
                Some(factory.create_sorter(&fields)?)
            }
        };

        if query.group.is_some() && self.group_builder.is_none() {
            debug!("no group filter builder, skipping facets for {:?}", query.text);
        }

        let attribute_filter = match self.config.attribute_scope {
            AttributeFacetScope::AllSurvivors => aggregator.attribute_filter(query.group.as_ref()),
            AttributeFacetScope::RankedPrefix => None,
        };

        Ok(Capabilities {
            ranker: query.custom_ranker.as_deref(),
            bitmap,
            group_filter: aggregator.group_filter(query.group.as_ref()),
            attribute_filter,
            sorter,
        })
    }
}

/// Builder for [`RankingEngine`]. Only the document store is required.
#[derive(Debug, Default)]
pub struct RankingEngineBuilder {
    config: RetrievalConfig,
    tokenizer: Option<Arc<dyn Tokenizer>>,
    index: Option<Arc<dyn InvertedIndexLookup>>,
    store: Option<Arc<dyn DocumentStore>>,
    categorical_scorer: Option<Arc<dyn CategoricalScorer>>,
    filter_compiler: Option<Arc<dyn BitmapFilterCompiler>>,
    group_builder: Option<Arc<dyn GroupFilterBuilder>>,
    sorter_factory: Option<Arc<dyn SorterFactory>>,
}

impl RankingEngineBuilder {
    pub fn config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    /// Defaults to [`UnicodeWordTokenizer`].
    pub fn tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    /// Queries abort with a missing-collaborator diagnostic when unset.
    pub fn index(mut self, index: Arc<dyn InvertedIndexLookup>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn categorical_scorer(mut self, scorer: Arc<dyn CategoricalScorer>) -> Self {
        self.categorical_scorer = Some(scorer);
        self
    }

    pub fn filter_compiler(mut self, compiler: Arc<dyn BitmapFilterCompiler>) -> Self {
        self.filter_compiler = Some(compiler);
        self
    }

    pub fn group_builder(mut self, builder: Arc<dyn GroupFilterBuilder>) -> Self {
        self.group_builder = Some(builder);
        self
    }

    pub fn sorter_factory(mut self, factory: Arc<dyn SorterFactory>) -> Self {
        self.sorter_factory = Some(factory);
        self
    }

    pub fn build(self) -> Result<RankingEngine> {
        self.config.validate()?;
        let store = self
            .store
            .ok_or_else(|| RankflowError::missing_collaborator("document store"))?;
        let tokenizer = self
            .tokenizer
            .unwrap_or_else(|| Arc::new(UnicodeWordTokenizer::new()));

        Ok(RankingEngine {
            source: CandidateSource::new(tokenizer, self.index, self.config.max_candidates),
            config: self.config,
            store,
            categorical_scorer: self.categorical_scorer,
            filter_compiler: self.filter_compiler,
            group_builder: self.group_builder,
            sorter_factory: self.sorter_factory,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::config::FusionPolicy;
    use crate::facet::{FacetConfig, FacetGroupFilterBuilder, FacetPath, FacetTable, GroupParam};
    use crate::filter::{FilterCondition, PropertyFilterCompiler};
    use crate::property::{PropertyTable, PropertyValue};
    use crate::query::{SortField, SortOrder};
    use crate::result::{DiagnosticKind, SearchStatus};
    use crate::source::CandidateSet;
    use crate::store::{DocId, MemoryDocumentStore};

    /// Returns the same candidates for every lookup.
    #[derive(Debug)]
    struct FixedIndex(CandidateSet);

    impl InvertedIndexLookup for FixedIndex {
        fn search(&self, _tokens: &[String], cap: usize) -> Result<CandidateSet> {
            Ok(self.0.iter().take(cap).collect())
        }
    }

    #[derive(Debug)]
    struct MismatchedIndex;

    impl InvertedIndexLookup for MismatchedIndex {
        fn search(&self, _tokens: &[String], _cap: usize) -> Result<CandidateSet> {
            Ok(CandidateSet::new(vec![1, 2, 3], vec![1.0, 2.0]))
        }
    }

    #[derive(Debug, Default)]
    struct CountingRanker {
        calls: AtomicUsize,
    }

    impl CustomRanker for CountingRanker {
        fn evaluate(&self, doc_id: DocId) -> f32 {
            self.calls.fetch_add(1, Ordering::SeqCst);
            doc_id as f32 * 10.0
        }
    }

    #[derive(Debug)]
    struct EvenBoost;

    impl CategoricalScorer for EvenBoost {
        fn score(&self, doc_id: DocId) -> f32 {
            if doc_id % 2 == 0 { 100.0 } else { 0.0 }
        }
    }

    fn candidates() -> CandidateSet {
        CandidateSet::new(vec![1, 2, 3], vec![5.0, 9.0, 1.0])
    }

    fn engine_with(store: Arc<MemoryDocumentStore>) -> RankingEngineBuilder {
        RankingEngine::builder()
            .index(Arc::new(FixedIndex(candidates())))
            .store(store)
    }

    fn engine() -> RankingEngine {
        engine_with(Arc::new(MemoryDocumentStore::with_documents(10)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_score_order() {
        let result = engine()
            .try_search(&Query::new("shoes").with_limit(2))
            .unwrap()
            .unwrap();
        assert_eq!(result.doc_ids, vec![2, 1]);
        assert_eq!(result.scores, vec![9.0, 5.0]);
        assert_eq!(result.total_count, 3);
    }

    #[test]
    fn test_empty_text_is_no_match() {
        let response = engine().search(&Query::new("   "));
        assert_eq!(response.status, SearchStatus::NoMatch);
        assert!(response.result.is_empty());
    }

    #[test]
    fn test_missing_index_aborts() {
        let engine = RankingEngine::builder()
            .store(Arc::new(MemoryDocumentStore::with_documents(4)))
            .build()
            .unwrap();
        let response = engine.search(&Query::new("shoes"));
        match response.status {
            SearchStatus::Aborted(diagnostic) => {
                assert_eq!(diagnostic.kind, DiagnosticKind::MissingCollaborator)
            }
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn test_missing_store_fails_build() {
        let result = RankingEngine::builder()
            .index(Arc::new(FixedIndex(candidates())))
            .build();
        assert!(matches!(result, Err(RankflowError::MissingCollaborator(_))));
    }

    #[test]
    fn test_candidate_mismatch_aborts() {
        let engine = RankingEngine::builder()
            .index(Arc::new(MismatchedIndex))
            .store(Arc::new(MemoryDocumentStore::with_documents(4)))
            .build()
            .unwrap();
        let response = engine.search(&Query::new("shoes"));
        assert!(response.is_aborted());
        assert!(response.result.is_empty());
        assert_eq!(response.result.total_count, 0);
    }

    #[test]
    fn test_categorical_fusion() {
        let engine = engine_with(Arc::new(MemoryDocumentStore::with_documents(10)))
            .categorical_scorer(Arc::new(EvenBoost))
            .build()
            .unwrap();
        let result = engine.try_search(&Query::new("x")).unwrap().unwrap();
        assert_eq!(result.doc_ids, vec![2, 1, 3]);
        assert_eq!(result.scores, vec![109.0, 5.0, 1.0]);

        let config = RetrievalConfig {
            fusion: FusionPolicy::Weighted {
                relevance_weight: 1.0,
                categorical_weight: 0.0,
            },
            ..Default::default()
        };
        let weighted = engine_with(Arc::new(MemoryDocumentStore::with_documents(10)))
            .categorical_scorer(Arc::new(EvenBoost))
            .config(config)
            .build()
            .unwrap();
        let result = weighted.try_search(&Query::new("x")).unwrap().unwrap();
        assert_eq!(result.scores, vec![9.0, 5.0, 1.0]);
    }

    #[test]
    fn test_custom_ranker_only_on_survivors() {
        let store = Arc::new(MemoryDocumentStore::with_documents(10));
        store.delete_document(2).unwrap();
        let engine = engine_with(store).build().unwrap();
        let ranker = Arc::new(CountingRanker::default());

        let result = engine
            .try_search(&Query::new("x").with_custom_ranker(ranker.clone()))
            .unwrap()
            .unwrap();

        assert_eq!(ranker.calls.load(Ordering::SeqCst), 2);
        assert_eq!(result.doc_ids, vec![1, 3]);
        assert_eq!(result.custom_scores, Some(vec![10.0, 30.0]));
    }

    #[test]
    fn test_filters_need_compiler() {
        let response = engine().search(&Query::new("x").with_filter(FilterCondition::equal("brand", "acme")));
        assert!(response.is_aborted());
    }

    #[test]
    fn test_bitmap_filter() {
        let table = Arc::new(PropertyTable::new());
        for (doc_id, brand) in [(1, "acme"), (2, "zenith"), (3, "acme")] {
            table.set_value("brand", doc_id, brand);
        }
        let engine = engine_with(Arc::new(MemoryDocumentStore::with_documents(10)))
            .filter_compiler(Arc::new(PropertyFilterCompiler::new(table)))
            .build()
            .unwrap();

        let result = engine
            .try_search(&Query::new("x").with_filter(FilterCondition::equal("brand", "acme")))
            .unwrap()
            .unwrap();
        assert_eq!(result.doc_ids, vec![1, 3]);
        assert_eq!(result.total_count, 2);
    }

    #[test]
    fn test_sorted_mode() {
        let table = Arc::new(PropertyTable::new());
        table.set_value("price", 1, 30.0);
        table.set_value("price", 2, 20.0);
        let engine = engine_with(Arc::new(MemoryDocumentStore::with_documents(10)))
            .sorter_factory(Arc::new(crate::query::TableSorterFactory::new(table)))
            .build()
            .unwrap();

        let result = engine
            .try_search(&Query::new("x").with_sort(SortField::property("price", SortOrder::Ascending)))
            .unwrap()
            .unwrap();

        assert_eq!(result.doc_ids, vec![2, 1, 3]);
        let sort_data = result.sort_data.unwrap();
        assert_eq!(sort_data[0].property, "price");
        assert_eq!(
            sort_data[0].values,
            vec![PropertyValue::Float(20.0), PropertyValue::Float(30.0), PropertyValue::Null]
        );
    }

    #[test]
    fn test_custom_score_sort_without_sorter_factory() {
        let ranker = Arc::new(CountingRanker::default());
        let query = Query::new("x")
            .with_custom_ranker(ranker.clone())
            .with_sort(SortField::custom_score(SortOrder::Ascending));

        let response = engine().search(&query);
        assert!(response.is_matched());
        assert_eq!(response.result.doc_ids, vec![1, 2, 3]);
        assert_eq!(response.result.custom_scores, Some(vec![10.0, 20.0, 30.0]));
        assert_eq!(response.result.sort_data, None);
    }

    #[test]
    fn test_property_sort_needs_sorter_factory() {
        let query = Query::new("x").with_sort(SortField::property("price", SortOrder::Ascending));
        match engine().search(&query).status {
            SearchStatus::Aborted(diagnostic) => {
                assert_eq!(diagnostic.kind, DiagnosticKind::MissingCollaborator)
            }
            other => panic!("unexpected status {other:?}"),
        }
    }

    fn facet_table() -> Arc<FacetTable> {
        let mut table = FacetTable::new();
        table.add_facet(1, "category", "Shoes/Running");
        table.add_facet(2, "category", "Hats");
        table.add_facet(3, "category", "Shoes/Hiking");
        for doc_id in 1..=3 {
            table.add_attribute(doc_id, "color", "red");
        }
        Arc::new(table)
    }

    #[test]
    fn test_group_and_attribute_facets() {
        let builder = FacetGroupFilterBuilder::new(facet_table(), FacetConfig::default());
        let engine = engine_with(Arc::new(MemoryDocumentStore::with_documents(10)))
            .group_builder(Arc::new(builder))
            .build()
            .unwrap();

        let group = GroupParam::new(["category"])
            .require(FacetPath::from_value("category", "Shoes"))
            .with_attributes(0);
        let query = Query::new("x").with_limit(1).with_group(group);
        let result = engine.try_search(&query).unwrap().unwrap();

        assert_eq!(result.total_count, 2);
        assert_eq!(result.doc_ids, vec![1]);
        let group_rep = result.group_rep.unwrap();
        assert_eq!(group_rep.count_of(&FacetPath::from_value("category", "Shoes")), Some(2));
        // The attribute pass only sees the ranked page.
        assert_eq!(result.attr_rep.unwrap().value_count("color", "red"), Some(1));
    }

    #[test]
    fn test_attribute_scope_all_survivors() {
        let builder = FacetGroupFilterBuilder::new(facet_table(), FacetConfig::default());
        let config = RetrievalConfig {
            attribute_scope: AttributeFacetScope::AllSurvivors,
            ..Default::default()
        };
        let engine = engine_with(Arc::new(MemoryDocumentStore::with_documents(10)))
            .group_builder(Arc::new(builder))
            .config(config)
            .build()
            .unwrap();

        let query = Query::new("x")
            .with_limit(1)
            .with_group(GroupParam::default().with_attributes(0));
        let result = engine.try_search(&query).unwrap().unwrap();

        assert_eq!(result.doc_ids.len(), 1);
        assert_eq!(result.attr_rep.unwrap().value_count("color", "red"), Some(3));
    }

    #[test]
    fn test_query_is_not_modified() {
        let builder = FacetGroupFilterBuilder::new(facet_table(), FacetConfig::default());
        let engine = engine_with(Arc::new(MemoryDocumentStore::with_documents(10)))
            .group_builder(Arc::new(builder))
            .build()
            .unwrap();

        let group = GroupParam::new(["category"]).with_attributes(3);
        let query = Query::new("x").with_group(group.clone());
        engine.try_search(&query).unwrap();
        assert_eq!(query.group, Some(group));
    }

    #[test]
    fn test_search_many_keeps_order() {
        let engine = engine();
        let queries = vec![
            Query::new("a").with_limit(1),
            Query::new(""),
            Query::new("b").with_limit(2).with_offset(2),
        ];
        let responses = engine.search_many(&queries);

        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0].result.doc_ids, vec![2]);
        assert_eq!(responses[1].status, SearchStatus::NoMatch);
        assert_eq!(responses[2].result.doc_ids, vec![3]);
    }
}

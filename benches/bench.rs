//! Criterion benchmarks for the rankflow pipeline.
//!
//! - Top-K selection over a large candidate stream
//! - Full queries with filters, facets and a custom ranker

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use rankflow::engine::RankingEngine;
use rankflow::facet::{FacetConfig, FacetGroupFilterBuilder, FacetTable, GroupParam};
use rankflow::filter::{FilterCondition, PropertyFilterCompiler};
use rankflow::property::PropertyTable;
use rankflow::query::{HitOrdering, Query, ScoreDoc, TopKSelector};
use rankflow::scoring::PropertyRanker;
use rankflow::source::{MemoryInvertedIndex, Tokenizer, UnicodeWordTokenizer};
use rankflow::store::{DocId, MemoryDocumentStore};

const WORDS: &[&str] = &[
    "search", "engine", "index", "query", "document", "ranking", "filter", "facet", "score",
    "relevance", "product", "shoes", "running", "hiking", "red", "blue", "green",
];

fn bench_top_k(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let hits: Vec<ScoreDoc> = (0..100_000)
        .map(|doc_id| ScoreDoc::new(doc_id, rng.random::<f32>()))
        .collect();

    let mut group = c.benchmark_group("top_k");
    group.throughput(Throughput::Elements(hits.len() as u64));
    for capacity in [10, 100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &k| {
            b.iter(|| {
                let mut selector = TopKSelector::new(k, HitOrdering::Score);
                for hit in &hits {
                    selector.insert(hit.clone());
                }
                black_box(selector.drain_page(0))
            })
        });
    }
    group.finish();
}

fn build_engine(doc_count: usize) -> RankingEngine {
    let mut rng = StdRng::seed_from_u64(7);
    let tokenizer = UnicodeWordTokenizer::new();
    let index = MemoryInvertedIndex::new();
    let store = MemoryDocumentStore::new();
    let properties = Arc::new(PropertyTable::new());
    let mut facets = FacetTable::new();

    for _ in 0..doc_count {
        let doc_id: DocId = store.add_document();
        let text: Vec<&str> = (0..12)
            .map(|_| WORDS[rng.random_range(0..WORDS.len())])
            .collect();
        index.add_document(doc_id, &tokenizer.tokenize(&text.join(" ")));

        properties.set_value("price", doc_id, rng.random_range(1.0..200.0));
        properties.set_value("sales", doc_id, rng.random_range(0..1_000i64));
        facets.add_facet(doc_id, "category", ["shoes/running", "shoes/hiking", "hats"][doc_id as usize % 3]);
        facets.add_attribute(doc_id, "color", WORDS[14 + doc_id as usize % 3]);
    }

    RankingEngine::builder()
        .index(Arc::new(index))
        .store(Arc::new(store))
        .filter_compiler(Arc::new(PropertyFilterCompiler::new(Arc::clone(&properties))))
        .group_builder(Arc::new(FacetGroupFilterBuilder::new(
            Arc::new(facets),
            FacetConfig::default(),
        )))
        .build()
        .unwrap()
}

fn bench_query(c: &mut Criterion) {
    let engine = build_engine(20_000);
    let ranker_table = Arc::new(PropertyTable::new());
    for doc_id in 0..20_000 {
        ranker_table.set_value("sales", doc_id, (doc_id % 97) as i64);
    }
    let ranker = Arc::new(PropertyRanker::new(ranker_table).with_weight("sales", 0.01));

    let mut group = c.benchmark_group("query");
    group.bench_function("plain", |b| {
        let query = Query::new("red running shoes").with_limit(20);
        b.iter(|| black_box(engine.search(&query)))
    });
    group.bench_function("filtered_faceted", |b| {
        let query = Query::new("red running shoes")
            .with_limit(20)
            .with_filter(FilterCondition::range("price", 20.0, 120.0))
            .with_group(GroupParam::new(["category"]).with_attributes(0))
            .with_custom_ranker(ranker.clone());
        b.iter(|| black_box(engine.search(&query)))
    });
    group.finish();
}

criterion_group!(benches, bench_top_k, bench_query);
criterion_main!(benches);

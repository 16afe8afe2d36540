//! Group filters: facet restriction plus facet counting in one test.

use std::fmt::Debug;
use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::facet::{
    AttributeCounter, AttributeResults, FacetCollector, FacetConfig, FacetFilter, FacetPath,
    FacetResults,
};
use crate::store::DocId;

/// Group (facet) parameters of a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupParam {
    /// Fields whose facet counts are reported.
    pub group_fields: Vec<String>,
    /// Facet restrictions candidates must satisfy.
    pub filter: FacetFilter,
    /// Whether attribute facets are requested (or, on a filter, built).
    pub attr_group: bool,
    /// Maximum attribute names to report; 0 uses the configured default.
    pub attr_group_num: usize,
}

impl GroupParam {
    /// Report facet counts for the given fields.
    pub fn new<S: Into<String>>(group_fields: impl IntoIterator<Item = S>) -> Self {
        GroupParam {
            group_fields: group_fields.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Keep only candidates with this facet path (or one below it).
    pub fn require(mut self, path: FacetPath) -> Self {
        self.filter.require(path);
        self
    }

    /// Drop candidates with this facet path (or one below it).
    pub fn exclude(mut self, path: FacetPath) -> Self {
        self.filter.exclude(path);
        self
    }

    /// Request attribute facets over the top of the ranked list.
    pub fn with_attributes(mut self, attr_group_num: usize) -> Self {
        self.attr_group = true;
        self.attr_group_num = attr_group_num;
        self
    }

    /// Parameters of the filter used inside the filter chain.
    pub fn group_pass(&self) -> GroupParam {
        GroupParam {
            attr_group: false,
            ..self.clone()
        }
    }

    /// Parameters of the attribute-counting filter. It restricts nothing.
    pub fn attribute_pass(&self) -> GroupParam {
        GroupParam {
            group_fields: Vec::new(),
            filter: FacetFilter::new(),
            attr_group: true,
            attr_group_num: self.attr_group_num,
        }
    }

    /// True when the parameters neither restrict nor count anything.
    pub fn is_empty(&self) -> bool {
        self.group_fields.is_empty() && self.filter.is_empty() && !self.attr_group
    }
}

/// A per-query filter testing facet membership and counting survivors.
pub trait GroupFilter: Send + Debug {
    /// Test a candidate. Survivors are added to the filter's counts.
    fn test(&mut self, doc_id: DocId) -> bool;

    /// Facet counts of the documents that passed.
    fn group_representation(&self) -> FacetResults;

    /// Attribute counts of the documents that passed.
    fn attribute_representation(&self) -> AttributeResults;
}

/// Creates group filters from query parameters.
pub trait GroupFilterBuilder: Send + Sync + Debug {
    /// Returns `None` when the parameters need no filter.
    fn create_filter(&self, param: &GroupParam) -> Option<Box<dyn GroupFilter>>;
}

#[derive(Debug, Default)]
struct DocFacets {
    paths: Vec<FacetPath>,
    attributes: Vec<(String, String)>,
}

/// Facet paths and attributes per document.
#[derive(Debug, Default)]
pub struct FacetTable {
    docs: AHashMap<DocId, DocFacets>,
}

impl FacetTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a facet value; `/` separates hierarchy levels.
    pub fn add_facet(&mut self, doc_id: DocId, field: &str, value: &str) {
        self.docs
            .entry(doc_id)
            .or_default()
            .paths
            .push(FacetPath::from_delimited(field, value, "/"));
    }

    /// Assign an attribute `name: value` pair.
    pub fn add_attribute(&mut self, doc_id: DocId, name: &str, value: &str) {
        self.docs
            .entry(doc_id)
            .or_default()
            .attributes
            .push((name.to_string(), value.to_string()));
    }

    pub fn facets(&self, doc_id: DocId) -> &[FacetPath] {
        self.docs
            .get(&doc_id)
            .map(|doc| doc.paths.as_slice())
            .unwrap_or(&[])
    }

    pub fn attributes(&self, doc_id: DocId) -> &[(String, String)] {
        self.docs
            .get(&doc_id)
            .map(|doc| doc.attributes.as_slice())
            .unwrap_or(&[])
    }
}

/// Group filter over a [`FacetTable`].
#[derive(Debug)]
pub struct FacetGroupFilter {
    table: Arc<FacetTable>,
    param: GroupParam,
    max_attributes: usize,
    collector: FacetCollector,
    attributes: AttributeCounter,
}

impl FacetGroupFilter {
    pub fn new(table: Arc<FacetTable>, param: GroupParam, config: &FacetConfig) -> Self {
        let max_attributes = if param.attr_group_num > 0 {
            param.attr_group_num
        } else {
            config.max_attributes
        };

        FacetGroupFilter {
            table,
            param,
            max_attributes,
            collector: FacetCollector::new(config.clone()),
            attributes: AttributeCounter::new(),
        }
    }
}

impl GroupFilter for FacetGroupFilter {
    fn test(&mut self, doc_id: DocId) -> bool {
        if self.param.attr_group {
            self.attributes.add_doc(self.table.attributes(doc_id));
            return true;
        }

        let facets = self.table.facets(doc_id);
        if !self.param.filter.matches_doc(facets) {
            return false;
        }

        let group_fields = &self.param.group_fields;
        self.collector.collect_doc(
            facets
                .iter()
                .filter(|path| group_fields.iter().any(|field| *field == path.field)),
        );
        true
    }

    fn group_representation(&self) -> FacetResults {
        self.collector.results()
    }

    fn attribute_representation(&self) -> AttributeResults {
        self.attributes.results(self.max_attributes)
    }
}

/// Builds [`FacetGroupFilter`]s sharing one facet table.
#[derive(Debug, Clone)]
pub struct FacetGroupFilterBuilder {
    table: Arc<FacetTable>,
    config: FacetConfig,
}

impl FacetGroupFilterBuilder {
    pub fn new(table: Arc<FacetTable>, config: FacetConfig) -> Self {
        FacetGroupFilterBuilder { table, config }
    }
}

impl GroupFilterBuilder for FacetGroupFilterBuilder {
    fn create_filter(&self, param: &GroupParam) -> Option<Box<dyn GroupFilter>> {
        if param.is_empty() {
            return None;
        }
        Some(Box::new(FacetGroupFilter::new(
            Arc::clone(&self.table),
            param.clone(),
            &self.config,
        )))
    }
}

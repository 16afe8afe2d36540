//! Faceted counting over surviving candidates.
//!
//! Facet counts come from two passes. The group pass runs inside the filter
//! chain: the group filter both restricts candidates and counts the facet
//! paths of every survivor. The attribute pass runs after ranking, over the
//! top of the ranked page only (see [`aggregator::FacetAggregator`]).

pub mod aggregator;
pub mod attribute;
pub mod group;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

pub use self::aggregator::FacetAggregator;
pub use self::attribute::{AttributeCount, AttributeCounter, AttributeResults, AttributeValueCount};
pub use self::group::{
    FacetGroupFilter, FacetGroupFilterBuilder, FacetTable, GroupFilter, GroupFilterBuilder,
    GroupParam,
};

/// Represents a facet field and its hierarchical structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FacetPath {
    /// The field name this facet belongs to.
    pub field: String,
    /// Hierarchical path components (e.g., ["Electronics", "Computers", "Laptops"]).
    pub path: Vec<String>,
}

impl FacetPath {
    /// Create a new facet path.
    pub fn new(field: impl Into<String>, path: Vec<String>) -> Self {
        FacetPath {
            field: field.into(),
            path,
        }
    }

    /// Create a facet path from a single value.
    pub fn from_value(field: impl Into<String>, value: impl Into<String>) -> Self {
        FacetPath {
            field: field.into(),
            path: vec![value.into()],
        }
    }

    /// Create a facet path from a delimited string.
    pub fn from_delimited(field: impl Into<String>, path_str: &str, delimiter: &str) -> Self {
        let path = path_str
            .split(delimiter)
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        FacetPath {
            field: field.into(),
            path,
        }
    }

    /// Get the depth of this facet path.
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Check if this path is a strict ancestor of another path.
    pub fn is_parent_of(&self, other: &FacetPath) -> bool {
        if self.field != other.field || self.depth() >= other.depth() {
            return false;
        }

        self.path.iter().zip(other.path.iter()).all(|(a, b)| a == b)
    }

    /// Check if `other` equals this path or lies below it.
    pub fn covers(&self, other: &FacetPath) -> bool {
        self == other || self.is_parent_of(other)
    }

    /// Get the parent path (one level up).
    pub fn parent(&self) -> Option<FacetPath> {
        if self.path.len() > 1 {
            let mut parent_path = self.path.clone();
            parent_path.pop();
            Some(FacetPath {
                field: self.field.clone(),
                path: parent_path,
            })
        } else {
            None
        }
    }

    /// Truncate to at most `depth` components.
    pub fn truncated(&self, depth: usize) -> FacetPath {
        FacetPath {
            field: self.field.clone(),
            path: self.path.iter().take(depth).cloned().collect(),
        }
    }

    /// Last path component.
    pub fn label(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or("")
    }
}

/// Represents a facet count for a specific path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetCount {
    /// The facet path.
    pub path: FacetPath,
    /// Number of documents matching this facet.
    pub count: u64,
    /// Child facets (for hierarchical display).
    pub children: Vec<FacetCount>,
}

impl FacetCount {
    /// Create a new facet count.
    pub fn new(path: FacetPath, count: u64) -> Self {
        FacetCount {
            path,
            count,
            children: Vec::new(),
        }
    }
}

/// Configuration for facet representations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FacetConfig {
    /// Maximum number of facet values to return per level of a field.
    pub max_facets_per_field: usize,
    /// Maximum depth for hierarchical facets.
    pub max_depth: usize,
    /// Minimum count threshold for including a facet.
    pub min_count: u64,
    /// Sort facets by count (true) or alphabetically (false).
    pub sort_by_count: bool,
    /// Maximum number of attribute names in an attribute representation.
    pub max_attributes: usize,
}

impl Default for FacetConfig {
    fn default() -> Self {
        FacetConfig {
            max_facets_per_field: 100,
            max_depth: 10,
            min_count: 1,
            sort_by_count: true,
            max_attributes: 20,
        }
    }
}

/// Facet collector that accumulates facet counts during search.
#[derive(Debug)]
pub struct FacetCollector {
    config: FacetConfig,
    facet_counts: AHashMap<FacetPath, u64>,
}

impl FacetCollector {
    /// Create a new facet collector.
    pub fn new(config: FacetConfig) -> Self {
        FacetCollector {
            config,
            facet_counts: AHashMap::new(),
        }
    }

    /// Count one document carrying the given facet paths.
    ///
    /// Each path and all of its ancestors are counted once per document, even
    /// when several of the document's paths share an ancestor.
    pub fn collect_doc<'p, I>(&mut self, paths: I)
    where
        I: IntoIterator<Item = &'p FacetPath>,
    {
        let mut doc_paths = AHashSet::new();
        for path in paths {
            let mut current = Some(path.truncated(self.config.max_depth));
            while let Some(path) = current {
                current = path.parent();
                if path.depth() > 0 {
                    doc_paths.insert(path);
                }
            }
        }

        for path in doc_paths {
            *self.facet_counts.entry(path).or_insert(0) += 1;
        }
    }

    /// Build the hierarchical facet counts collected so far.
    pub fn results(&self) -> FacetResults {
        let mut by_parent: AHashMap<Option<FacetPath>, Vec<FacetCount>> = AHashMap::new();
        for (path, &count) in &self.facet_counts {
            if count >= self.config.min_count {
                by_parent
                    .entry(path.parent())
                    .or_default()
                    .push(FacetCount::new(path.clone(), count));
            }
        }

        let roots = by_parent.remove(&None).unwrap_or_default();
        let mut field_facets: BTreeMap<String, Vec<FacetCount>> = BTreeMap::new();
        for root in roots {
            field_facets
                .entry(root.path.field.clone())
                .or_default()
                .push(root);
        }

        for facets in field_facets.values_mut() {
            self.attach_children(facets, &mut by_parent);
        }

        FacetResults { field_facets }
    }

    fn attach_children(
        &self,
        level: &mut Vec<FacetCount>,
        by_parent: &mut AHashMap<Option<FacetPath>, Vec<FacetCount>>,
    ) {
        self.sort_level(level);
        level.truncate(self.config.max_facets_per_field);

        for facet in level.iter_mut() {
            if let Some(mut children) = by_parent.remove(&Some(facet.path.clone())) {
                self.attach_children(&mut children, by_parent);
                facet.children = children;
            }
        }
    }

    fn sort_level(&self, level: &mut [FacetCount]) {
        if self.config.sort_by_count {
            level.sort_by(|a, b| match b.count.cmp(&a.count) {
                Ordering::Equal => a.path.label().cmp(b.path.label()),
                other => other,
            });
        } else {
            level.sort_by(|a, b| a.path.label().cmp(b.path.label()));
        }
    }
}

/// Results of facet collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetResults {
    /// Top-level facet counts grouped by field, children nested.
    pub field_facets: BTreeMap<String, Vec<FacetCount>>,
}

impl FacetResults {
    /// Create empty facet results.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Get facet counts for a specific field.
    pub fn get_field_facets(&self, field_name: &str) -> Option<&Vec<FacetCount>> {
        self.field_facets.get(field_name)
    }

    /// Find the count of a path anywhere in the hierarchy.
    pub fn count_of(&self, path: &FacetPath) -> Option<u64> {
        fn find(level: &[FacetCount], path: &FacetPath) -> Option<u64> {
            level.iter().find_map(|facet| {
                if facet.path == *path {
                    Some(facet.count)
                } else if facet.path.is_parent_of(path) {
                    find(&facet.children, path)
                } else {
                    None
                }
            })
        }

        self.field_facets
            .get(&path.field)
            .and_then(|level| find(level, path))
    }

    pub fn is_empty(&self) -> bool {
        self.field_facets.is_empty()
    }
}

/// Facet filter for constraining search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetFilter {
    /// Facet paths that must match (AND condition).
    pub required_paths: Vec<FacetPath>,
    /// Facet paths that must not match (NOT condition).
    pub excluded_paths: Vec<FacetPath>,
}

impl FacetFilter {
    /// Create a new empty facet filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required facet path.
    pub fn require(&mut self, path: FacetPath) {
        self.required_paths.push(path);
    }

    /// Add an excluded facet path.
    pub fn exclude(&mut self, path: FacetPath) {
        self.excluded_paths.push(path);
    }

    pub fn is_empty(&self) -> bool {
        self.required_paths.is_empty() && self.excluded_paths.is_empty()
    }

    /// Check if a document matches this filter.
    ///
    /// A path matches a document path equal to it or below it.
    pub fn matches_doc(&self, doc_facets: &[FacetPath]) -> bool {
        let required = self
            .required_paths
            .iter()
            .all(|required| doc_facets.iter().any(|facet| required.covers(facet)));

        required
            && !self
                .excluded_paths
                .iter()
                .any(|excluded| doc_facets.iter().any(|facet| excluded.covers(facet)))
    }
}

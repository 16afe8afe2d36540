//! Result packaging and per-query status.

use serde::{Deserialize, Serialize};

use crate::error::RankflowError;
use crate::facet::{AttributeResults, FacetResults};
use crate::property::PropertyValue;
use crate::query::{ScoreDoc, SortColumn, SortField};
use crate::store::DocId;

/// The ranked page of a query plus its aggregates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Candidates that passed every filter, independent of the page window.
    pub total_count: usize,
    /// Page hits, best first.
    pub doc_ids: Vec<DocId>,
    /// Fused scores aligned with `doc_ids`.
    pub scores: Vec<f32>,
    /// Custom ranker scores, when the query carried a ranker.
    pub custom_scores: Option<Vec<f32>>,
    /// Facet counts, when a group filter ran.
    pub group_rep: Option<FacetResults>,
    /// Attribute facet counts, when the attribute pass ran.
    pub attr_rep: Option<AttributeResults>,
    /// Sort property values of the page, when sorted by properties.
    pub sort_data: Option<Vec<SortColumn>>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.doc_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }
}

/// Packages drained hits and aggregates into a [`ResultSet`].
#[derive(Debug, Default)]
pub struct ResultAssembler<'a> {
    total_count: usize,
    page: Vec<ScoreDoc>,
    custom_scores: bool,
    sort_fields: Option<&'a [SortField]>,
    group_rep: Option<FacetResults>,
    attr_rep: Option<AttributeResults>,
}

impl<'a> ResultAssembler<'a> {
    pub fn new(total_count: usize, page: Vec<ScoreDoc>) -> Self {
        ResultAssembler {
            total_count,
            page,
            ..Default::default()
        }
    }

    /// Report the custom scores carried by the hits.
    pub fn with_custom_scores(mut self, ran: bool) -> Self {
        self.custom_scores = ran;
        self
    }

    /// Report sort values; hits carry one value per field.
    pub fn with_sort_fields(mut self, fields: Option<&'a [SortField]>) -> Self {
        self.sort_fields = fields;
        self
    }

    pub fn with_group_rep(mut self, group_rep: Option<FacetResults>) -> Self {
        self.group_rep = group_rep;
        self
    }

    pub fn with_attr_rep(mut self, attr_rep: Option<AttributeResults>) -> Self {
        self.attr_rep = attr_rep;
        self
    }

    pub fn assemble(self) -> ResultSet {
        let custom_scores = self.custom_scores.then(|| {
            self.page
                .iter()
                .map(|hit| hit.custom_score.unwrap_or(0.0))
                .collect()
        });

        let sort_data = self
            .sort_fields
            .map(|fields| sort_columns(fields, &self.page))
            .filter(|columns| !columns.is_empty());

        ResultSet {
            total_count: self.total_count,
            doc_ids: self.page.iter().map(|hit| hit.doc_id).collect(),
            scores: self.page.iter().map(|hit| hit.score).collect(),
            custom_scores,
            group_rep: self.group_rep,
            attr_rep: self.attr_rep,
            sort_data,
        }
    }
}

fn sort_columns(fields: &[SortField], page: &[ScoreDoc]) -> Vec<SortColumn> {
    fields
        .iter()
        .enumerate()
        .filter_map(|(i, field)| {
            let property = field.property_name()?;
            let values = page
                .iter()
                .map(|hit| hit.sort_values.get(i).cloned().unwrap_or(PropertyValue::Null))
                .collect();
            Some(SortColumn {
                property: property.to_string(),
                values,
            })
        })
        .collect()
}

/// Category of an aborted query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    CandidateMismatch,
    MissingCollaborator,
    InvalidFilter,
    InvalidArgument,
    Internal,
}

/// Why a query was aborted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl From<&RankflowError> for Diagnostic {
    fn from(err: &RankflowError) -> Self {
        Diagnostic {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Outcome of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchStatus {
    /// At least one candidate was retrieved. The page may still be empty.
    Matched,
    /// Empty text, or no candidates after the sub-token retry.
    NoMatch,
    /// The query failed; the result is empty.
    Aborted(Diagnostic),
}

/// A result set with the status it was produced under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub result: ResultSet,
    pub status: SearchStatus,
}

impl SearchResponse {
    pub fn matched(result: ResultSet) -> Self {
        SearchResponse {
            result,
            status: SearchStatus::Matched,
        }
    }

    pub fn no_match() -> Self {
        SearchResponse {
            result: ResultSet::default(),
            status: SearchStatus::NoMatch,
        }
    }

    pub fn aborted(err: &RankflowError) -> Self {
        SearchResponse {
            result: ResultSet::default(),
            status: SearchStatus::Aborted(Diagnostic::from(err)),
        }
    }

    pub fn is_matched(&self) -> bool {
        self.status == SearchStatus::Matched
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.status, SearchStatus::Aborted(_))
    }
}

//! Construction of the two facet passes of a query.

use log::debug;

use crate::facet::{AttributeResults, GroupFilter, GroupFilterBuilder, GroupParam};
use crate::store::DocId;

/// Builds the group-pass filter and runs the attribute pass.
///
/// The attribute pass is evaluated over the first `top_docs` ranked documents
/// only. Exhaustive attribute faceting over every surviving candidate is left
/// to [`AttributeFacetScope::AllSurvivors`](crate::config::AttributeFacetScope).
#[derive(Debug, Clone, Copy)]
pub struct FacetAggregator<'a> {
    builder: Option<&'a dyn GroupFilterBuilder>,
    top_docs: usize,
}

impl<'a> FacetAggregator<'a> {
    pub fn new(builder: Option<&'a dyn GroupFilterBuilder>, top_docs: usize) -> Self {
        FacetAggregator { builder, top_docs }
    }

    /// Filter used inside the filter chain (pass 1), if the query needs one.
    pub fn group_filter(&self, param: Option<&GroupParam>) -> Option<Box<dyn GroupFilter>> {
        let param = param?.group_pass();
        self.builder?.create_filter(&param)
    }

    /// Attribute-counting filter, if the query requests attribute facets.
    pub fn attribute_filter(&self, param: Option<&GroupParam>) -> Option<Box<dyn GroupFilter>> {
        let param = param.filter(|param| param.attr_group)?;
        self.builder?.create_filter(&param.attribute_pass())
    }

    /// Attribute pass over the top of the ranked list (pass 2).
    pub fn attribute_pass(
        &self,
        param: Option<&GroupParam>,
        ranked_doc_ids: &[DocId],
    ) -> Option<AttributeResults> {
        let mut filter = self.attribute_filter(param)?;
        let top_num = ranked_doc_ids.len().min(self.top_docs);
        for &doc_id in &ranked_doc_ids[..top_num] {
            filter.test(doc_id);
        }

        debug!("attribute facets computed over {top_num} ranked documents");
        Some(filter.attribute_representation())
    }
}

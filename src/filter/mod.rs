//! The per-candidate filter chain.

pub mod bitmap;

use crate::facet::GroupFilter;
use crate::store::{DocId, LivenessView};

pub use self::bitmap::{
    BitmapFilterCompiler, FilterBitmap, FilterCondition, FilterOperation, PropertyFilterCompiler,
};

/// Rejection counts per filter stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub deleted: usize,
    pub bitmap: usize,
    pub group: usize,
    pub passed: usize,
}

/// Liveness, bitmap and group filters, tested in that order.
///
/// The chain borrows the liveness view of a read guard the caller already
/// holds; it never locks the document store itself.
pub struct FilterChain<'a> {
    liveness: &'a dyn LivenessView,
    bitmap: Option<&'a FilterBitmap>,
    group: Option<&'a mut dyn GroupFilter>,
    stats: FilterStats,
}

impl<'a> FilterChain<'a> {
    pub fn new(
        liveness: &'a dyn LivenessView,
        bitmap: Option<&'a FilterBitmap>,
        group: Option<&'a mut dyn GroupFilter>,
    ) -> Self {
        FilterChain {
            liveness,
            bitmap,
            group,
            stats: FilterStats::default(),
        }
    }

    /// Test one candidate, stopping at the first failing stage.
    ///
    /// The group filter counts the facets of every candidate it accepts, so
    /// it only sees candidates that are live and in the bitmap.
    pub fn test(&mut self, doc_id: DocId) -> bool {
        if self.liveness.is_deleted(doc_id) {
            self.stats.deleted += 1;
            return false;
        }

        if let Some(bitmap) = self.bitmap {
            if !bitmap.test(doc_id) {
                self.stats.bitmap += 1;
                return false;
            }
        }

        if let Some(group) = self.group.as_deref_mut() {
            if !group.test(doc_id) {
                self.stats.group += 1;
                return false;
            }
        }

        self.stats.passed += 1;
        true
    }

    pub fn stats(&self) -> FilterStats {
        self.stats
    }
}

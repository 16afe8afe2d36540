//! Document store access used by the liveness filter.
//!
//! The ranking pipeline does not own the document store. It takes one shared
//! read guard through [`DocumentStore::read`] before scanning candidates and
//! drops it when the scan is over, so every liveness check of a query sees the
//! same deletion state. Writers block until the guard is released.

use std::fmt::Debug;

use bit_vec::BitVec;
use parking_lot::{RwLock, RwLockReadGuard};

use crate::error::{RankflowError, Result};

/// Document identifier assigned by the index.
pub type DocId = u32;

/// Read access to document liveness, valid while the guard is alive.
pub trait LivenessView {
    /// Check if a document is deleted.
    fn is_deleted(&self, doc_id: DocId) -> bool;
}

/// A document store the pipeline can lock for reading.
pub trait DocumentStore: Send + Sync + Debug {
    /// Acquire the shared read side of the store lock.
    ///
    /// Blocks while a writer holds the lock. The returned view must not
    /// re-acquire the lock on each lookup.
    fn read(&self) -> Box<dyn LivenessView + '_>;
}

/// A bitmap-based deletion tracker.
#[derive(Debug, Clone, Default)]
pub struct DeletionBitmap {
    /// Bitmap of deleted documents (bit set = deleted).
    deleted_docs: BitVec,

    /// Number of deleted documents.
    deleted_count: u64,
}

impl DeletionBitmap {
    /// Create a new deletion bitmap covering `total_docs` documents.
    pub fn new(total_docs: usize) -> Self {
        DeletionBitmap {
            deleted_docs: BitVec::from_elem(total_docs, false),
            deleted_count: 0,
        }
    }

    /// Total number of documents tracked.
    pub fn total_docs(&self) -> usize {
        self.deleted_docs.len()
    }

    /// Number of deleted documents.
    pub fn deleted_count(&self) -> u64 {
        self.deleted_count
    }

    /// Track one more document, returning its id.
    pub fn push(&mut self) -> DocId {
        let doc_id = self.deleted_docs.len() as DocId;
        self.deleted_docs.push(false);
        doc_id
    }

    /// Mark a document as deleted. Returns false if it already was.
    pub fn delete_document(&mut self, doc_id: DocId) -> Result<bool> {
        let pos = doc_id as usize;
        if pos >= self.deleted_docs.len() {
            return Err(RankflowError::store(format!(
                "Document ID {doc_id} out of range ({} documents)",
                self.deleted_docs.len()
            )));
        }

        let was_already_deleted = self.deleted_docs.get(pos).unwrap_or(false);
        if !was_already_deleted {
            self.deleted_docs.set(pos, true);
            self.deleted_count += 1;
        }

        Ok(!was_already_deleted)
    }

    /// Check if a document is deleted. Unknown ids count as deleted.
    pub fn is_deleted(&self, doc_id: DocId) -> bool {
        self.deleted_docs.get(doc_id as usize).unwrap_or(true)
    }

    /// Get number of live (non-deleted) documents.
    pub fn live_count(&self) -> u64 {
        self.deleted_docs.len() as u64 - self.deleted_count
    }
}

/// In-memory document store tracking liveness only.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    state: RwLock<DeletionBitmap>,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with `total_docs` live documents, ids `0..total_docs`.
    pub fn with_documents(total_docs: usize) -> Self {
        MemoryDocumentStore {
            state: RwLock::new(DeletionBitmap::new(total_docs)),
        }
    }

    /// Add a live document and return its id.
    pub fn add_document(&self) -> DocId {
        self.state.write().push()
    }

    /// Mark a document deleted. Blocks while a query holds the read guard.
    pub fn delete_document(&self, doc_id: DocId) -> Result<bool> {
        self.state.write().delete_document(doc_id)
    }

    /// Number of documents ever added.
    pub fn max_doc(&self) -> usize {
        self.state.read().total_docs()
    }

    /// Number of live documents.
    pub fn live_count(&self) -> u64 {
        self.state.read().live_count()
    }
}

/// Read guard over a [`MemoryDocumentStore`].
pub struct MemoryStoreGuard<'a> {
    state: RwLockReadGuard<'a, DeletionBitmap>,
}

impl LivenessView for MemoryStoreGuard<'_> {
    fn is_deleted(&self, doc_id: DocId) -> bool {
        self.state.is_deleted(doc_id)
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn read(&self) -> Box<dyn LivenessView + '_> {
        Box::new(MemoryStoreGuard {
            state: self.state.read(),
        })
    }
}

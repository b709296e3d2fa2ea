//! Inference backend abstraction
//!
//! The store never does document work itself; it hands every request to an
//! `InferenceBackend`. Today the only implementation is the in-process mock,
//! but a service-backed implementation can be dropped in without touching the
//! store or the views.

pub mod mock;

use async_trait::async_trait;

use crate::error::BackendError;
use crate::legal::{DocumentType, LegalReport};
use crate::models::{
    ClauseHit, Comparison, DocumentId, DocumentMetadata, SummaryStyle, UploadFile,
};

pub use mock::MockBackend;

/// Unified document-processing interface
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Ingest an uploaded file under the id the store assigned to it.
    ///
    /// Fails with `Rejected` for invalid or corrupt input.
    async fn ingest(
        &self,
        document_id: &DocumentId,
        file: &UploadFile,
    ) -> Result<DocumentMetadata, BackendError>;

    /// Answer a question scoped to one document
    async fn answer(&self, document_id: &DocumentId, query: &str) -> Result<String, BackendError>;

    /// Summarize one document in the requested style
    async fn summarize(
        &self,
        document_id: &DocumentId,
        style: SummaryStyle,
    ) -> Result<String, BackendError>;

    /// Compare two documents clause by clause
    async fn compare(
        &self,
        left: &DocumentId,
        right: &DocumentId,
    ) -> Result<Comparison, BackendError>;

    /// Find passages mentioning `term` in each of the given documents.
    /// Hits are grouped by document in the order the ids were given.
    async fn search_clauses(
        &self,
        document_ids: &[DocumentId],
        term: &str,
    ) -> Result<Vec<ClauseHit>, BackendError>;

    /// Check a document against the clause rules of `document_type`
    async fn legal_check(
        &self,
        document_id: &DocumentId,
        document_type: DocumentType,
    ) -> Result<LegalReport, BackendError>;

    /// Forget a document and anything derived from it
    async fn remove(&self, document_id: &DocumentId) -> Result<(), BackendError>;

    /// Get the backend name (e.g., "mock")
    fn backend_name(&self) -> &'static str;
}

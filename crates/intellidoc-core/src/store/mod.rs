//! Document store: the single owner of session state.
//!
//! ```text
//! view ──► operation ──► validate ──► claim slot ──► busy ──► backend call
//!                            │                                    │
//!                            ▼                          (timeout / cancel)
//!                     StoreError::Validation                      │
//!                                                                 ▼
//!                         commit only if claim still current ◄────┘
//! ```
//!
//! Views get a cloneable handle and read owned snapshots; every mutation goes
//! through the operations below. State events are emitted before the write
//! lock is released, so observers see them in commit order.

mod slots;


pub use slots::Slot;

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::InferenceBackend;
use crate::config::Settings;
use crate::error::{BackendError, StoreError};
use crate::legal::{DocumentType, LegalReport};
use crate::models::{
    ChatMessage, ClauseHit, Comparison, Document, DocumentId, DocumentStatus, SessionSnapshot,
    SummaryStyle, UploadFile,
};
use crate::{NoOpObserver, StoreEvent, StoreObserver};
use slots::{Claim, SlotTable};

/// Default bound on a single backend call
pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct CurrentSummary {
    document_id: DocumentId,
    style: SummaryStyle,
    text: String,
}

#[derive(Debug, Default)]
struct SessionState {
    documents: Vec<Document>,
    chat_messages: Vec<ChatMessage>,
    current_summary: Option<CurrentSummary>,
    last_error: Option<StoreError>,
    slots: SlotTable,
}

impl SessionState {
    /// Resolve a document that operations can run against
    fn require_ready(&self, document_id: &DocumentId) -> Result<(), StoreError> {
        if document_id.is_empty() {
            return Err(StoreError::validation("Please select a document first."));
        }
        let document = self
            .documents
            .iter()
            .find(|d| &d.id == document_id)
            .ok_or_else(|| StoreError::not_found(document_id))?;

        match document.status {
            DocumentStatus::Ready => Ok(()),
            DocumentStatus::Uploading => Err(StoreError::validation(format!(
                "'{}' is still being processed",
                document.name
            ))),
            DocumentStatus::Failed => Err(StoreError::validation(format!(
                "'{}' failed to upload; upload it again",
                document.name
            ))),
        }
    }
}

/// Raises the busy flag for as long as it lives.
///
/// Released on drop so an abandoned operation future cannot leave the store
/// stuck in the loading state.
struct BusyGuard {
    busy: Arc<AtomicUsize>,
    observer: Arc<dyn StoreObserver>,
}

impl BusyGuard {
    fn acquire(busy: &Arc<AtomicUsize>, observer: &Arc<dyn StoreObserver>) -> Self {
        if busy.fetch_add(1, Ordering::SeqCst) == 0 {
            observer.on_event(StoreEvent::LoadingChanged { is_loading: true });
        }
        Self {
            busy: busy.clone(),
            observer: observer.clone(),
        }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        if self.busy.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.observer
                .on_event(StoreEvent::LoadingChanged { is_loading: false });
        }
    }
}

/// Authoritative holder of session state
#[derive(Clone)]
pub struct DocumentStore {
    state: Arc<RwLock<SessionState>>,
    busy: Arc<AtomicUsize>,
    backend: Arc<dyn InferenceBackend>,
    observer: Arc<dyn StoreObserver>,
    timeout: Duration,
}

impl DocumentStore {
    /// Create an empty store driving the given backend
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        Self {
            state: Arc::new(RwLock::new(SessionState::default())),
            busy: Arc::new(AtomicUsize::new(0)),
            backend,
            observer: Arc::new(NoOpObserver),
            timeout: DEFAULT_BACKEND_TIMEOUT,
        }
    }

    /// Create a store using the timeout from user settings
    pub fn from_settings(settings: &Settings, backend: Arc<dyn InferenceBackend>) -> Self {
        Self::new(backend).with_timeout(settings.backend_timeout())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn StoreObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Owned copy of the whole session
    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;
        SessionSnapshot {
            documents: state.documents.clone(),
            chat_messages: state.chat_messages.clone(),
            current_summary: state.current_summary.as_ref().map(|s| s.text.clone()),
            is_loading: self.is_loading(),
            last_error: state.last_error.clone(),
        }
    }

    pub async fn document(&self, document_id: &DocumentId) -> Option<Document> {
        self.state
            .read()
            .await
            .documents
            .iter()
            .find(|d| &d.id == document_id)
            .cloned()
    }

    pub async fn documents(&self) -> Vec<Document> {
        self.state.read().await.documents.clone()
    }

    /// Style of the summary currently shown, if any
    pub async fn summary_style(&self) -> Option<SummaryStyle> {
        self.state
            .read()
            .await
            .current_summary
            .as_ref()
            .map(|s| s.style)
    }

    pub fn is_loading(&self) -> bool {
        self.busy.load(Ordering::SeqCst) > 0
    }

    /// Take the most recent user-visible failure, clearing it
    pub async fn take_error(&self) -> Option<StoreError> {
        self.state.write().await.last_error.take()
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Upload a file.
    ///
    /// The document is listed as `Uploading` before the backend is called and
    /// ends up `Ready` or `Failed`. A failed entry stays in the list.
    pub async fn upload_document(&self, file: UploadFile) -> Result<DocumentId, StoreError> {
        let name = file.name.trim().to_string();
        if name.is_empty() {
            return Err(self
                .fail(StoreError::validation("Please choose a file to upload."))
                .await);
        }

        let document_id = DocumentId::new();
        let document = Document::uploading(document_id.clone(), name);
        let claim = {
            let mut state = self.state.write().await;
            state.documents.push(document.clone());
            self.emit(StoreEvent::DocumentAdded { document });
            state.slots.issue(
                Slot::Upload(document_id.clone()),
                vec![document_id.clone()],
            )
        };

        let _busy = self.busy();
        info!(
            doc_id = %document_id,
            name = %file.name,
            size = file.data.len(),
            backend = self.backend.backend_name(),
            "Uploading document"
        );

        let outcome = self
            .dispatch(&claim.cancel, self.backend.ingest(&document_id, &file))
            .await;

        let mut state = self.state.write().await;
        state.slots.release(&claim);
        let Some(document) = state.documents.iter_mut().find(|d| d.id == document_id) else {
            debug!(doc_id = %document_id, "Document removed during upload, discarding result");
            return Err(StoreError::not_found(&document_id));
        };

        let error = match outcome {
            Some(Ok(metadata)) => {
                document.status = DocumentStatus::Ready;
                if !metadata.name.trim().is_empty() {
                    document.name = metadata.name.clone();
                }
                document.metadata = Some(metadata);
                None
            }
            Some(Err(e)) => {
                document.status = DocumentStatus::Failed;
                Some(e.into_ingest_error(&document_id))
            }
            None => {
                document.status = DocumentStatus::Failed;
                Some(StoreError::ingest(&document_id, "Upload cancelled"))
            }
        };
        let updated = document.clone();
        self.emit(StoreEvent::DocumentUpdated {
            document: updated.clone(),
        });
        drop(state);

        match error {
            None => {
                info!(doc_id = %document_id, name = %updated.name, "Document ready");
                Ok(document_id)
            }
            Some(e) => Err(self.fail(e).await),
        }
    }

    /// Upload several files concurrently. Results are in input order.
    pub async fn upload_documents(
        &self,
        files: Vec<UploadFile>,
    ) -> Vec<Result<DocumentId, StoreError>> {
        futures::future::join_all(files.into_iter().map(|f| self.upload_document(f))).await
    }

    /// Ask a question about one document.
    ///
    /// The user message is visible before the backend is called. The answer is
    /// appended only if no newer chat operation (or `clear_chat`) happened in
    /// the meantime.
    pub async fn ask_question(
        &self,
        query: &str,
        document_id: &DocumentId,
    ) -> Result<(), StoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(self
                .fail(StoreError::validation("Please enter a question."))
                .await);
        }

        let claim = {
            let mut state = self.state.write().await;
            if let Err(e) = state.require_ready(document_id) {
                drop(state);
                return Err(self.fail(e).await);
            }
            let message = ChatMessage::user(query);
            state.chat_messages.push(message.clone());
            self.emit(StoreEvent::MessageAppended { message });
            state.slots.issue(Slot::Chat, vec![document_id.clone()])
        };

        let _busy = self.busy();
        debug!(doc_id = %document_id, query_len = query.len(), "Asking question");

        let outcome = self
            .dispatch(&claim.cancel, self.backend.answer(document_id, query))
            .await;

        let mut state = self.state.write().await;
        let current = state.slots.release(&claim);
        match outcome {
            Some(Ok(text)) if current && !text.trim().is_empty() => {
                let message = ChatMessage::assistant(text);
                state.chat_messages.push(message.clone());
                self.emit(StoreEvent::MessageAppended { message });
                drop(state);

                info!(doc_id = %document_id, "Question answered");
                Ok(())
            }
            Some(Ok(_)) if current => {
                drop(state);
                Err(self
                    .fail(StoreError::backend("The backend returned an empty answer"))
                    .await)
            }
            Some(Err(e)) if current => {
                drop(state);
                Err(self.fail(e.into_store_error()).await)
            }
            _ => {
                drop(state);
                debug!(doc_id = %document_id, "Discarding superseded answer");
                Err(StoreError::superseded())
            }
        }
    }

    /// Summarize one document. Only the newest request's summary is kept.
    pub async fn get_summary(
        &self,
        document_id: &DocumentId,
        style: SummaryStyle,
    ) -> Result<(), StoreError> {
        let claim = {
            let mut state = self.state.write().await;
            if let Err(e) = state.require_ready(document_id) {
                drop(state);
                return Err(self.fail(e).await);
            }
            state.current_summary = None;
            self.emit(StoreEvent::SummaryUpdated { summary: None });
            state.slots.issue(Slot::Summary, vec![document_id.clone()])
        };

        let _busy = self.busy();
        debug!(doc_id = %document_id, %style, "Requesting summary");

        let outcome = self
            .dispatch(&claim.cancel, self.backend.summarize(document_id, style))
            .await;

        let mut state = self.state.write().await;
        let current = state.slots.release(&claim);
        match outcome {
            Some(Ok(text)) if current => {
                state.current_summary = Some(CurrentSummary {
                    document_id: document_id.clone(),
                    style,
                    text: text.clone(),
                });
                self.emit(StoreEvent::SummaryUpdated {
                    summary: Some(text),
                });
                drop(state);

                info!(doc_id = %document_id, %style, "Summary ready");
                Ok(())
            }
            Some(Err(e)) if current => {
                drop(state);
                Err(self.fail(e.into_store_error()).await)
            }
            _ => {
                drop(state);
                debug!(doc_id = %document_id, %style, "Discarding superseded summary");
                Err(StoreError::superseded())
            }
        }
    }

    /// Compare two documents. The result goes to the caller, not into the session.
    pub async fn compare_documents(
        &self,
        left: &DocumentId,
        right: &DocumentId,
    ) -> Result<Comparison, StoreError> {
        let claim = {
            let mut state = self.state.write().await;
            let checked = if !left.is_empty() && left == right {
                Err(StoreError::validation(
                    "Please select two different documents to compare.",
                ))
            } else {
                state
                    .require_ready(left)
                    .and_then(|_| state.require_ready(right))
            };
            if let Err(e) = checked {
                drop(state);
                return Err(self.fail(e).await);
            }
            state
                .slots
                .issue(Slot::Compare, vec![left.clone(), right.clone()])
        };

        let _busy = self.busy();
        debug!(left = %left, right = %right, "Comparing documents");

        let outcome = self
            .dispatch(&claim.cancel, self.backend.compare(left, right))
            .await;

        let current = self.state.write().await.slots.release(&claim);
        match outcome {
            Some(Ok(comparison)) if current => {
                info!(
                    left = %left,
                    right = %right,
                    added = comparison.added,
                    removed = comparison.removed,
                    "Comparison ready"
                );
                Ok(comparison)
            }
            Some(Err(e)) if current => Err(self.fail(e.into_store_error()).await),
            _ => {
                debug!(left = %left, right = %right, "Discarding superseded comparison");
                Err(StoreError::superseded())
            }
        }
    }

    /// Search every ready document for passages mentioning `term`.
    ///
    /// With no ready documents the result is empty and the backend is not
    /// called.
    pub async fn search_clauses(&self, term: &str) -> Result<Vec<ClauseHit>, StoreError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(self
                .fail(StoreError::validation("Please enter a clause or term to search for."))
                .await);
        }

        let (claim, ready) = {
            let mut state = self.state.write().await;
            let ready: Vec<DocumentId> = state
                .documents
                .iter()
                .filter(|d| d.is_ready())
                .map(|d| d.id.clone())
                .collect();
            if ready.is_empty() {
                return Ok(Vec::new());
            }
            (state.slots.issue(Slot::Search, ready.clone()), ready)
        };

        let _busy = self.busy();
        debug!(term, documents = ready.len(), "Searching clauses");

        let outcome = self
            .dispatch(&claim.cancel, self.backend.search_clauses(&ready, term))
            .await;

        let current = self.state.write().await.slots.release(&claim);
        match outcome {
            Some(Ok(hits)) if current => {
                info!(term, hits = hits.len(), "Clause search complete");
                Ok(hits)
            }
            Some(Err(e)) if current => Err(self.fail(e.into_store_error()).await),
            _ => {
                debug!(term, "Discarding superseded clause search");
                Err(StoreError::superseded())
            }
        }
    }

    /// Run the rule-based legal check on one document. The report goes to the
    /// caller, not into the session.
    pub async fn legal_check(
        &self,
        document_id: &DocumentId,
        document_type: DocumentType,
    ) -> Result<LegalReport, StoreError> {
        let claim = {
            let mut state = self.state.write().await;
            if let Err(e) = state.require_ready(document_id) {
                drop(state);
                return Err(self.fail(e).await);
            }
            state
                .slots
                .issue(Slot::LegalCheck, vec![document_id.clone()])
        };

        let _busy = self.busy();
        debug!(doc_id = %document_id, %document_type, "Running legal check");

        let outcome = self
            .dispatch(
                &claim.cancel,
                self.backend.legal_check(document_id, document_type),
            )
            .await;

        let current = self.state.write().await.slots.release(&claim);
        match outcome {
            Some(Ok(report)) if current => {
                info!(
                    doc_id = %document_id,
                    %document_type,
                    risk_score = report.risk_score,
                    missing = report.missing().count(),
                    "Legal check complete"
                );
                Ok(report)
            }
            Some(Err(e)) if current => Err(self.fail(e.into_store_error()).await),
            _ => {
                debug!(doc_id = %document_id, "Discarding superseded legal check");
                Err(StoreError::superseded())
            }
        }
    }

    /// Empty the chat transcript. A pending answer is cancelled so it cannot
    /// land in the cleared transcript.
    pub async fn clear_chat(&self) {
        let cancelled = {
            let mut state = self.state.write().await;
            state.chat_messages.clear();
            self.emit(StoreEvent::ChatCleared);
            state.slots.cancel(&Slot::Chat)
        };
        if cancelled {
            debug!("Cancelled pending answer while clearing chat");
        }
    }

    /// Drop the current summary and cancel a pending one
    pub async fn clear_summary(&self) {
        let mut state = self.state.write().await;
        state.current_summary = None;
        state.slots.cancel(&Slot::Summary);
        self.emit(StoreEvent::SummaryUpdated { summary: None });
    }

    /// Remove a document, cancelling anything still running against it
    pub async fn delete_document(&self, document_id: &DocumentId) -> Result<Document, StoreError> {
        let removed = {
            let mut state = self.state.write().await;
            let Some(position) = state.documents.iter().position(|d| &d.id == document_id) else {
                drop(state);
                return Err(self.fail(StoreError::not_found(document_id)).await);
            };
            let removed = state.documents.remove(position);
            let cancelled = state.slots.cancel_document(document_id);
            if cancelled > 0 {
                debug!(doc_id = %document_id, cancelled, "Cancelled operations for deleted document");
            }

            let summary_dropped = state
                .current_summary
                .as_ref()
                .is_some_and(|s| &s.document_id == document_id);
            self.emit(StoreEvent::DocumentRemoved {
                document_id: document_id.clone(),
            });
            if summary_dropped {
                state.current_summary = None;
                self.emit(StoreEvent::SummaryUpdated { summary: None });
            }
            removed
        };

        match tokio::time::timeout(self.timeout, self.backend.remove(document_id)).await {
            Ok(Ok(())) => {}
            Ok(Err(BackendError::NotFound(_))) => {
                debug!(doc_id = %document_id, "Backend never ingested deleted document");
            }
            Ok(Err(e)) => warn!(doc_id = %document_id, error = %e, "Backend failed to remove document"),
            Err(_) => warn!(doc_id = %document_id, "Backend timed out removing document"),
        }

        info!(doc_id = %document_id, name = %removed.name, "Document deleted");
        Ok(removed)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn busy(&self) -> BusyGuard {
        BusyGuard::acquire(&self.busy, &self.observer)
    }

    fn emit(&self, event: StoreEvent) {
        self.observer.on_event(event);
    }

    /// Run a backend call bounded by the timeout.
    ///
    /// Returns `None` when the claim was cancelled before the call finished.
    async fn dispatch<T>(
        &self,
        cancel: &CancellationToken,
        call: impl Future<Output = Result<T, BackendError>>,
    ) -> Option<Result<T, BackendError>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = tokio::time::timeout(self.timeout, call) => {
                Some(result.unwrap_or_else(|_| Err(BackendError::Timeout(self.timeout))))
            }
        }
    }

    /// Record a user-visible failure and notify the observer
    async fn fail(&self, error: StoreError) -> StoreError {
        if error.is_user_visible() {
            warn!(kind = error.kind(), error = %error, "Store operation failed");
            let mut state = self.state.write().await;
            state.last_error = Some(error.clone());
            self.emit(StoreEvent::OperationFailed {
                error: error.clone(),
            });
        }
        error
    }
}

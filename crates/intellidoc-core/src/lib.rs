//! IntelliDoc Core - session state and inference seam for document analysis
//!
//! This crate contains everything below the view layer:
//! - Document store (uploads, Q&A transcript, summaries, comparisons)
//! - Inference backend trait and the in-process mock backend
//! - Request supersession, timeouts and error normalization
//! - Rule-based legal checks, risk scoring and clause search
//! - Configuration and user settings

pub mod backend;
pub mod config;
pub mod error;
pub mod legal;
pub mod models;
pub mod store;

use serde::Serialize;
use tokio::sync::mpsc;

use std::sync::Arc;

pub use backend::{InferenceBackend, MockBackend};
pub use config::{Config, Settings};
pub use error::{BackendError, StoreError};
pub use legal::{ClauseCheck, ClauseStatus, DocumentType, LegalReport};
pub use models::{
    ChatMessage, ClauseHit, Comparison, DiffKind, DiffLine, Document, DocumentId, DocumentMetadata,
    DocumentStatus, Sender, SessionSnapshot, SummaryStyle, UploadFile,
};
pub use store::DocumentStore;

/// State change notifications for views
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StoreEvent {
    /// A document was accepted for upload
    DocumentAdded { document: Document },
    /// A document changed status
    DocumentUpdated { document: Document },
    /// A document was deleted
    DocumentRemoved { document_id: DocumentId },
    /// A message was appended to the transcript
    MessageAppended { message: ChatMessage },
    /// The transcript was emptied
    ChatCleared,
    /// The current summary was replaced or invalidated
    SummaryUpdated { summary: Option<String> },
    /// The busy flag flipped
    LoadingChanged { is_loading: bool },
    /// An operation failed in a way the user should see
    OperationFailed { error: StoreError },
}

/// Trait for receiving store events.
///
/// Called synchronously while the store still holds its state lock, so events
/// arrive in the order the changes were committed. Implementations must not
/// block or call back into the store.
pub trait StoreObserver: Send + Sync {
    fn on_event(&self, event: StoreEvent);
}

/// No-op implementation for testing
pub struct NoOpObserver;

impl StoreObserver for NoOpObserver {
    fn on_event(&self, _event: StoreEvent) {}
}

/// Forwards events into a channel for an async consumer
pub struct ChannelObserver {
    tx: mpsc::Sender<StoreEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Arc<Self>, mpsc::Receiver<StoreEvent>) {
        let (tx, rx) = mpsc::channel(256);
        (Arc::new(Self { tx }), rx)
    }
}

impl StoreObserver for ChannelObserver {
    fn on_event(&self, event: StoreEvent) {
        if let Err(e) = self.tx.try_send(event) {
            tracing::debug!("Dropping store event: {}", e);
        }
    }
}

/// Build a store backed by the mock backend, tuned by user settings
pub fn mock_store(settings: &Settings) -> DocumentStore {
    let backend = MockBackend::new(settings.mock_latency());
    DocumentStore::from_settings(settings, Arc::new(backend))
}

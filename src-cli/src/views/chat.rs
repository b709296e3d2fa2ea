//! Smart Q&A view

use intellidoc_core::{DocumentId, DocumentStore, StoreError};
use rand::seq::IndexedRandom;

/// Questions offered as one-click suggestions
const SUGGESTED_QUESTIONS: &[&str] = &[
    "Summarize this document",
    "What is the 'Governing Law'?",
    "List all parties involved",
    "What are the key deadlines?",
    "Identify any risks or liabilities",
    "Compare this to [another doc]",
];

/// Number of suggestions shown at once
const SUGGESTION_COUNT: usize = 3;

/// Question sent automatically when a document is opened in the chat view
pub fn greeting(document_name: &str) -> String {
    format!("Analyze this document: {}", document_name)
}

pub struct ChatView {
    store: DocumentStore,
    selected: Option<DocumentId>,
}

impl ChatView {
    pub fn new(store: DocumentStore) -> Self {
        Self {
            store,
            selected: None,
        }
    }

    pub fn selected(&self) -> Option<&DocumentId> {
        self.selected.as_ref()
    }

    /// Switch the conversation to another document.
    ///
    /// The transcript is cleared before the greeting goes out, so nothing from
    /// the previous document survives the switch. Re-selecting the current
    /// document is a no-op.
    pub async fn select(&mut self, document_id: DocumentId) -> Result<(), StoreError> {
        if self.selected.as_ref() == Some(&document_id) {
            return Ok(());
        }
        let document = self
            .store
            .document(&document_id)
            .await
            .ok_or_else(|| StoreError::not_found(&document_id))?;

        self.selected = Some(document_id.clone());
        self.store.clear_chat().await;
        self.store
            .ask_question(&greeting(&document.name), &document_id)
            .await
    }

    pub async fn send(&self, query: &str) -> Result<(), StoreError> {
        let Some(document_id) = &self.selected else {
            return Err(StoreError::validation(
                "Please select a document to chat with first.",
            ));
        };
        self.store.ask_question(query, document_id).await
    }

    /// Forget the selection if it points at a deleted document
    pub fn forget(&mut self, document_id: &DocumentId) {
        if self.selected.as_ref() == Some(document_id) {
            self.selected = None;
        }
    }

    /// A random handful of suggested questions
    pub fn suggestions(&self) -> Vec<&'static str> {
        SUGGESTED_QUESTIONS
            .choose_multiple(&mut rand::rng(), SUGGESTION_COUNT)
            .copied()
            .collect()
    }
}

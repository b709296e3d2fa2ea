//! Store error types
//!
//! Views only ever see `StoreError`; raw backend failures are mapped at the
//! store boundary. Each variant serializes as `{"code": "...", "message": "..."}`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::DocumentId;

/// Errors surfaced by document store operations
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum StoreError {
    /// Caller input rejected before any backend call
    #[error("{message}")]
    Validation { message: String },

    /// Referenced document does not exist (or no longer exists)
    #[error("{message}")]
    NotFound {
        message: String,
        document_id: DocumentId,
    },

    /// Backend rejected or failed to process an uploaded file
    #[error("{message}")]
    Ingest {
        message: String,
        document_id: DocumentId,
    },

    /// Answer, summary or compare failed in the backend
    #[error("{message}")]
    Backend { message: String },

    /// A newer operation for the same slot replaced this one
    #[error("{message}")]
    Superseded { message: String },
}

impl StoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(document_id: &DocumentId) -> Self {
        Self::NotFound {
            message: format!("Document not found: {}", document_id),
            document_id: document_id.clone(),
        }
    }

    pub fn ingest(document_id: &DocumentId, message: impl Into<String>) -> Self {
        Self::Ingest {
            message: message.into(),
            document_id: document_id.clone(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    pub fn superseded() -> Self {
        Self::Superseded {
            message: "Superseded by a newer request".to_string(),
        }
    }

    /// Stable name of the error class, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Ingest { .. } => "ingest",
            Self::Backend { .. } => "backend",
            Self::Superseded { .. } => "superseded",
        }
    }

    /// Whether this failure should be shown to the user.
    ///
    /// A superseded operation did not fail; its result was simply no longer wanted.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::Superseded { .. })
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded { .. })
    }
}

/// Errors reported by an inference backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("document not found: {0}")]
    NotFound(DocumentId),

    #[error("input rejected: {0}")]
    Rejected(String),

    #[error("processing failed: {0}")]
    Failed(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl BackendError {
    /// Map a failure from `answer`, `summarize` or `compare`
    pub(crate) fn into_store_error(self) -> StoreError {
        match self {
            BackendError::NotFound(id) => StoreError::not_found(&id),
            other => StoreError::backend(other.to_string()),
        }
    }

    /// Map a failure from `ingest`; every ingest failure marks the document failed
    pub(crate) fn into_ingest_error(self, document_id: &DocumentId) -> StoreError {
        StoreError::ingest(document_id, format!("Upload failed: {}", self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_code_tag() {
        let err = StoreError::validation("Please enter a question.");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "validation");
        assert_eq!(json["message"], "Please enter a question.");
    }

    #[test]
    fn test_not_found_carries_document_id() {
        let id = DocumentId::from("doc-1");
        let err = StoreError::not_found(&id);
        assert_eq!(err.to_string(), "Document not found: doc-1");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "not_found");
        assert_eq!(json["document_id"], "doc-1");
    }

    #[test]
    fn test_backend_error_mapping() {
        let id = DocumentId::from("doc-2");
        assert_eq!(
            BackendError::NotFound(id.clone()).into_store_error().kind(),
            "not_found"
        );
        assert_eq!(
            BackendError::Timeout(Duration::from_secs(1))
                .into_store_error()
                .kind(),
            "backend"
        );
        assert_eq!(
            BackendError::Failed("boom".into())
                .into_ingest_error(&id)
                .kind(),
            "ingest"
        );
    }

    #[test]
    fn test_superseded_is_not_user_visible() {
        assert!(!StoreError::superseded().is_user_visible());
        assert!(StoreError::backend("x").is_user_visible());
    }
}

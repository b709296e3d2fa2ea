//! Session entities: documents, chat messages, summaries and comparisons.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Unique identifier of an uploaded document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Generate a fresh random id
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Processing status of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Uploading,
    Ready,
    Failed,
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentStatus::Uploading => f.write_str("uploading"),
            DocumentStatus::Ready => f.write_str("ready"),
            DocumentStatus::Failed => f.write_str("failed"),
        }
    }
}

/// Metadata reported by the backend once a file has been ingested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub name: String,
    pub size_bytes: u64,
    pub page_count: usize,
    /// BLAKE3 hex digest of the file contents, when contents were supplied
    pub checksum: Option<String>,
}

/// A document tracked by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub name: String,
    pub status: DocumentStatus,
    pub metadata: Option<DocumentMetadata>,
    pub uploaded_at: String,
}

impl Document {
    pub(crate) fn uploading(id: DocumentId, name: String) -> Self {
        Self {
            id,
            name,
            status: DocumentStatus::Uploading,
            metadata: None,
            uploaded_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == DocumentStatus::Ready
    }
}

/// A file handed to the store for upload.
///
/// Only the name is required; contents are optional so callers that only know
/// a file name (drag-and-drop previews, tests) can still upload.
#[derive(Debug, Clone, Default)]
pub struct UploadFile {
    pub name: String,
    pub data: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// A file descriptor carrying a name and no contents
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Bytes::new(),
        }
    }

    /// Lowercased extension of the file name, without the dot
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// Who wrote a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// A message in the chat transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Assistant,
            text: text.into(),
        }
    }
}

/// Summary flavours offered by the summarize view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStyle {
    #[default]
    Concise,
    Detailed,
    Keywords,
}

impl SummaryStyle {
    pub const ALL: [SummaryStyle; 3] = [
        SummaryStyle::Concise,
        SummaryStyle::Detailed,
        SummaryStyle::Keywords,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryStyle::Concise => "concise",
            SummaryStyle::Detailed => "detailed",
            SummaryStyle::Keywords => "keywords",
        }
    }

    /// Label shown in the style selector
    pub fn label(&self) -> &'static str {
        match self {
            SummaryStyle::Concise => "Concise",
            SummaryStyle::Detailed => "Detailed",
            SummaryStyle::Keywords => "Key Terms",
        }
    }
}

impl fmt::Display for SummaryStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryStyle {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "concise" => Ok(SummaryStyle::Concise),
            "detailed" => Ok(SummaryStyle::Detailed),
            "keywords" | "key-terms" | "key_terms" => Ok(SummaryStyle::Keywords),
            other => Err(StoreError::validation(format!(
                "Unknown summary style '{}' (expected concise, detailed or keywords)",
                other
            ))),
        }
    }
}

/// Kind of a line in a comparison pane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Same,
    Added,
    Removed,
}

/// One line of a comparison pane.
///
/// Lines with the same `id` on the left and right panes are aligned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub id: u32,
    pub kind: DiffKind,
    pub text: String,
}

impl DiffLine {
    pub fn new(id: u32, kind: DiffKind, text: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            text: text.into(),
        }
    }
}

/// Side-by-side comparison of two documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub left_id: DocumentId,
    pub right_id: DocumentId,
    pub left: Vec<DiffLine>,
    pub right: Vec<DiffLine>,
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
}

impl Comparison {
    /// Build a comparison from aligned panes, deriving the counters.
    pub fn from_panes(
        left_id: DocumentId,
        right_id: DocumentId,
        left: Vec<DiffLine>,
        right: Vec<DiffLine>,
    ) -> Self {
        let removed = left.iter().filter(|l| l.kind == DiffKind::Removed).count();
        let added = right.iter().filter(|l| l.kind == DiffKind::Added).count();
        let changed = left
            .iter()
            .filter(|l| l.kind != DiffKind::Same)
            .filter(|l| {
                right
                    .iter()
                    .any(|r| r.id == l.id && r.kind != DiffKind::Same)
            })
            .count();

        Self {
            left_id,
            right_id,
            left,
            right,
            added,
            removed,
            changed,
        }
    }

    /// Ids of aligned lines that differ on either side, in pane order
    pub fn diff_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self
            .left
            .iter()
            .chain(self.right.iter())
            .filter(|l| l.kind != DiffKind::Same)
            .map(|l| l.id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// A passage in one document that mentions a searched term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseHit {
    pub document_id: DocumentId,
    pub snippet: String,
}

/// Owned copy of the session state handed to views
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub documents: Vec<Document>,
    pub chat_messages: Vec<ChatMessage>,
    pub current_summary: Option<String>,
    pub is_loading: bool,
    pub last_error: Option<StoreError>,
}

impl SessionSnapshot {
    pub fn document(&self, id: &DocumentId) -> Option<&Document> {
        self.documents.iter().find(|d| &d.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_ids_are_unique() {
        let a = DocumentId::new();
        let b = DocumentId::new();
        assert_ne!(a, b);
        assert!(!a.is_empty());
        assert!(DocumentId::from("  ").is_empty());
    }

    #[test]
    fn test_summary_style_parsing() {
        assert_eq!(
            "Concise".parse::<SummaryStyle>().unwrap(),
            SummaryStyle::Concise
        );
        assert_eq!(
            "detailed".parse::<SummaryStyle>().unwrap(),
            SummaryStyle::Detailed
        );
        assert_eq!(
            "key-terms".parse::<SummaryStyle>().unwrap(),
            SummaryStyle::Keywords
        );
        assert!("bullet".parse::<SummaryStyle>().is_err());
    }

    #[test]
    fn test_upload_file_extension() {
        assert_eq!(
            UploadFile::named("contract.PDF").extension().as_deref(),
            Some("pdf")
        );
        assert_eq!(UploadFile::named("README").extension(), None);
        assert_eq!(UploadFile::named(".bashrc").extension(), None);
    }

    #[test]
    fn test_comparison_counters() {
        let left = vec![
            DiffLine::new(1, DiffKind::Same, "a"),
            DiffLine::new(2, DiffKind::Removed, "old"),
            DiffLine::new(3, DiffKind::Same, "c"),
        ];
        let right = vec![
            DiffLine::new(1, DiffKind::Same, "a"),
            DiffLine::new(2, DiffKind::Added, "new"),
            DiffLine::new(3, DiffKind::Added, "extra"),
        ];
        let comparison =
            Comparison::from_panes(DocumentId::from("l"), DocumentId::from("r"), left, right);

        assert_eq!(comparison.removed, 1);
        assert_eq!(comparison.added, 2);
        assert_eq!(comparison.changed, 1);
        assert_eq!(comparison.diff_ids(), vec![2, 3]);
    }

    #[test]
    fn test_message_serializes_lowercase_sender() {
        let json = serde_json::to_value(ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json["sender"], "assistant");
        assert_eq!(json["text"], "hi");
    }
}

use intellidoc_core::{DocumentStatus, SessionSnapshot};
use serde::Serialize;

/// Counters shown on the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total: usize,
    pub ready: usize,
    pub processing: usize,
    pub failed: usize,
    pub messages: usize,
}

impl DashboardStats {
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        let count = |status: DocumentStatus| {
            snapshot
                .documents
                .iter()
                .filter(|d| d.status == status)
                .count()
        };
        Self {
            total: snapshot.documents.len(),
            ready: count(DocumentStatus::Ready),
            processing: count(DocumentStatus::Uploading),
            failed: count(DocumentStatus::Failed),
            messages: snapshot.chat_messages.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intellidoc_core::{DocumentStore, MockBackend, UploadFile};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_stats_count_statuses() {
        let backend = MockBackend::instant().with_rejected_names(["broken.pdf"]);
        let store = DocumentStore::new(Arc::new(backend));
        store
            .upload_document(UploadFile::named("a.pdf"))
            .await
            .unwrap();
        store
            .upload_document(UploadFile::named("broken.pdf"))
            .await
            .unwrap_err();

        let stats = DashboardStats::from_snapshot(&store.snapshot().await);

        assert_eq!(
            stats,
            DashboardStats {
                total: 2,
                ready: 1,
                processing: 0,
                failed: 1,
                messages: 0,
            }
        );
    }

    #[test]
    fn test_empty_session() {
        let stats = DashboardStats::from_snapshot(&SessionSnapshot::default());
        assert_eq!(stats, DashboardStats::default());
    }
}

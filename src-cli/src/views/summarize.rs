use intellidoc_core::{DocumentId, DocumentStore, StoreError, SummaryStyle};

/// Summarize view: one selected document and a style
pub struct SummarizeView {
    store: DocumentStore,
    selected: Option<DocumentId>,
    style: SummaryStyle,
}

impl SummarizeView {
    pub fn new(store: DocumentStore) -> Self {
        Self {
            store,
            selected: None,
            style: SummaryStyle::default(),
        }
    }

    pub fn selected(&self) -> Option<&DocumentId> {
        self.selected.as_ref()
    }

    pub fn style(&self) -> SummaryStyle {
        self.style
    }

    pub fn set_style(&mut self, style: SummaryStyle) {
        self.style = style;
    }

    /// Pick the document to summarize. A different document invalidates the
    /// summary currently shown.
    pub async fn select(&mut self, document_id: DocumentId) {
        if self.selected.as_ref() != Some(&document_id) {
            self.selected = Some(document_id);
            self.store.clear_summary().await;
        }
    }

    pub async fn generate(&self) -> Result<(), StoreError> {
        let Some(document_id) = &self.selected else {
            return Err(StoreError::validation(
                "Please select a document to summarize.",
            ));
        };
        self.store.get_summary(document_id, self.style).await
    }

    pub fn forget(&mut self, document_id: &DocumentId) {
        if self.selected.as_ref() == Some(document_id) {
            self.selected = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intellidoc_core::{MockBackend, UploadFile};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_generate_uses_selected_style() {
        let store = DocumentStore::new(Arc::new(MockBackend::instant()));
        let id = store
            .upload_document(UploadFile::named("lease.docx"))
            .await
            .unwrap();
        let mut view = SummarizeView::new(store.clone());

        view.select(id).await;
        view.set_style(SummaryStyle::Keywords);
        view.generate().await.unwrap();

        let summary = store.snapshot().await.current_summary.unwrap();
        assert!(summary.starts_with("Key terms in lease.docx"));
    }

    #[tokio::test]
    async fn test_switching_document_clears_summary() {
        let store = DocumentStore::new(Arc::new(MockBackend::instant()));
        let a = store
            .upload_document(UploadFile::named("a.pdf"))
            .await
            .unwrap();
        let b = store
            .upload_document(UploadFile::named("b.pdf"))
            .await
            .unwrap();
        let mut view = SummarizeView::new(store.clone());

        view.select(a.clone()).await;
        view.generate().await.unwrap();
        view.select(a).await;
        assert!(store.snapshot().await.current_summary.is_some());

        view.select(b).await;
        assert!(store.snapshot().await.current_summary.is_none());
    }

    #[tokio::test]
    async fn test_generate_without_selection() {
        let store = DocumentStore::new(Arc::new(MockBackend::instant()));
        let view = SummarizeView::new(store);

        let err = view.generate().await.unwrap_err();
        assert_eq!(err.kind(), "validation");
    }
}

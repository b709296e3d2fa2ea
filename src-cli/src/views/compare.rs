use intellidoc_core::{Comparison, DocumentId, DocumentStore, StoreError};

/// Side-by-side comparison with a cursor over the differing lines
pub struct CompareView {
    store: DocumentStore,
    left: Option<DocumentId>,
    right: Option<DocumentId>,
    result: Option<Comparison>,
    cursor: Option<usize>,
}

impl CompareView {
    pub fn new(store: DocumentStore) -> Self {
        Self {
            store,
            left: None,
            right: None,
            result: None,
            cursor: None,
        }
    }

    pub fn select(&mut self, left: DocumentId, right: DocumentId) {
        if self.left.as_ref() != Some(&left) || self.right.as_ref() != Some(&right) {
            self.result = None;
            self.cursor = None;
        }
        self.left = Some(left);
        self.right = Some(right);
    }

    pub fn result(&self) -> Option<&Comparison> {
        self.result.as_ref()
    }

    /// Run the comparison for the current pair. A failed run leaves no stale
    /// result behind.
    pub async fn compare(&mut self) -> Result<&Comparison, StoreError> {
        let (Some(left), Some(right)) = (&self.left, &self.right) else {
            return Err(StoreError::validation(
                "Please select two different documents to compare.",
            ));
        };
        self.result = None;
        self.cursor = None;

        let comparison = self.store.compare_documents(left, right).await?;
        Ok(&*self.result.insert(comparison))
    }

    /// Line id currently highlighted, if any
    pub fn highlighted(&self) -> Option<u32> {
        let ids = self.result.as_ref()?.diff_ids();
        self.cursor.and_then(|i| ids.get(i).copied())
    }

    /// Move to the next differing line, wrapping around at the end
    pub fn next_diff(&mut self) -> Option<u32> {
        let len = self.diff_count();
        if len == 0 {
            return None;
        }
        self.cursor = Some(match self.cursor {
            Some(i) => (i + 1) % len,
            None => 0,
        });
        self.highlighted()
    }

    /// Move to the previous differing line, wrapping around at the start
    pub fn prev_diff(&mut self) -> Option<u32> {
        let len = self.diff_count();
        if len == 0 {
            return None;
        }
        self.cursor = Some(match self.cursor {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        });
        self.highlighted()
    }

    /// Drop selections and results that reference a deleted document
    pub fn forget(&mut self, document_id: &DocumentId) {
        let left_hit = self.left.as_ref() == Some(document_id);
        let right_hit = self.right.as_ref() == Some(document_id);
        if left_hit {
            self.left = None;
        }
        if right_hit {
            self.right = None;
        }
        if left_hit || right_hit {
            self.result = None;
            self.cursor = None;
        }
    }

    fn diff_count(&self) -> usize {
        self.result.as_ref().map_or(0, |r| r.diff_ids().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intellidoc_core::{MockBackend, UploadFile};
    use std::sync::Arc;

    async fn compared_view() -> (CompareView, DocumentId, DocumentId) {
        let store = DocumentStore::new(Arc::new(MockBackend::instant()));
        let a = store
            .upload_document(UploadFile::named("v1.pdf"))
            .await
            .unwrap();
        let b = store
            .upload_document(UploadFile::named("v2.pdf"))
            .await
            .unwrap();
        let mut view = CompareView::new(store);
        view.select(a.clone(), b.clone());
        view.compare().await.unwrap();
        (view, a, b)
    }

    #[tokio::test]
    async fn test_compare_counts() {
        let (view, _, _) = compared_view().await;

        let result = view.result().unwrap();
        assert_eq!(result.removed, 3);
        assert_eq!(result.added, 4);
        assert_eq!(view.highlighted(), None);
    }

    #[tokio::test]
    async fn test_diff_cursor_wraps_both_ways() {
        let (mut view, _, _) = compared_view().await;

        let forward: Vec<_> = (0..6).filter_map(|_| view.next_diff()).collect();
        assert_eq!(forward, vec![2, 4, 6, 7, 8, 2]);

        assert_eq!(view.prev_diff(), Some(8));
        assert_eq!(view.prev_diff(), Some(7));
    }

    #[tokio::test]
    async fn test_prev_from_start_goes_to_last() {
        let (mut view, _, _) = compared_view().await;
        assert_eq!(view.prev_diff(), Some(8));
    }

    #[tokio::test]
    async fn test_same_document_rejected() {
        let store = DocumentStore::new(Arc::new(MockBackend::instant()));
        let a = store
            .upload_document(UploadFile::named("v1.pdf"))
            .await
            .unwrap();
        let mut view = CompareView::new(store);
        view.select(a.clone(), a);

        let err = view.compare().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Please select two different documents to compare."
        );
        assert!(view.result().is_none());
        assert_eq!(view.next_diff(), None);
    }

    #[tokio::test]
    async fn test_forget_clears_result() {
        let (mut view, a, _) = compared_view().await;
        view.next_diff();

        view.forget(&a);

        assert!(view.result().is_none());
        assert_eq!(view.highlighted(), None);
    }
}

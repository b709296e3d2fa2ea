//! In-process mock backend
//!
//! Simulates processing latency and returns canned text. Keeps a small
//! registry of ingested documents so unknown ids fail the same way a real
//! service would.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use tokio::sync::RwLock;

use super::InferenceBackend;
use crate::error::BackendError;
use crate::legal::{self, DocumentType, LegalReport};
use crate::models::{
    ClauseHit, Comparison, DiffKind, DiffLine, DocumentId, DocumentMetadata, SummaryStyle,
    UploadFile,
};

/// Rough byte count per page used to estimate page counts
const BYTES_PER_PAGE: usize = 3_000;

/// Page count reported for files uploaded without contents
const DEFAULT_PAGE_COUNT: usize = 32;

/// Answers for questions that match none of the keyword topics
const GENERIC_ANSWERS: &[&str] = &[
    "According to {name}, the relevant provisions are set out in Section 4 and the accompanying schedules.",
    "{name} addresses this in its general terms: both parties must give written notice within 30 days.",
    "I could not find a direct statement in {name}, but Section 7 (Obligations) is the closest match.",
    "Based on {name}, this is covered by the definitions clause and applies for the full term of the agreement.",
];

/// Canned answers keyed by a lowercase keyword found in the question
const TOPIC_ANSWERS: &[(&str, &str)] = &[
    (
        "analyze",
        "I've analyzed {name}. It is a services agreement with 12 sections covering scope, payment, confidentiality, termination and governing law. Ask me about any clause.",
    ),
    (
        "governing law",
        "{name} is governed by the laws of the State of Delaware (Section 12.1). Disputes go to the state and federal courts located in Wilmington.",
    ),
    (
        "parties",
        "{name} names two parties: Acme Holdings, Inc. (the \"Company\") and Northwind Consulting LLC (the \"Contractor\").",
    ),
    (
        "deadline",
        "Key deadlines in {name}: deliverables are due within 45 days of the effective date, invoices are payable net 30, and renewal notice must be given 60 days before expiry.",
    ),
    (
        "risk",
        "The main risks in {name} are an uncapped indemnity in Section 9, a one-sided termination-for-convenience right, and no limitation on consequential damages.",
    ),
    (
        "liabilit",
        "Liability in {name} is capped at the fees paid in the prior 12 months, except for breaches of confidentiality and indemnification obligations.",
    ),
    (
        "summar",
        "In short, {name} sets out a 24-month engagement with monthly fees, mutual confidentiality for 5 years, and termination on 30 days' notice.",
    ),
];

/// Snippets returned per document by clause search
const MAX_HITS_PER_DOCUMENT: usize = 3;

/// Text indexed for files uploaded without contents, matching the canned answers
const SAMPLE_CONTRACT: &str = "MASTER SERVICES AGREEMENT. This Agreement is made between Acme \
Holdings, Inc. (the \"Company\") and Northwind Consulting LLC (the \"Contractor\"). \
1. Scope of Services. The Contractor shall provide the advisory services and deliverables \
described in Schedule A for a term of 24 months. \
2. Fees and Payment. The Company shall pay monthly fees within 30 days of each invoice. \
3. Confidentiality. Each party shall protect the other party's Confidential Information for \
5 years after termination. \
4. Intellectual Property. Ownership of all deliverables passes to the Company on payment. \
5. Liability. Liability is capped at the fees paid in the prior 12 months, except for \
indemnification obligations. \
6. Termination. Either party may terminate this Agreement on 30 days' written notice. \
7. Governing Law. This Agreement is governed by the laws of the State of Delaware, and the \
courts of Wilmington have exclusive jurisdiction.";

/// What the mock remembers about an ingested document
struct Ingested {
    metadata: DocumentMetadata,
    text: String,
}

/// Mock inference backend with simulated latency
pub struct MockBackend {
    latency: Duration,
    rejected_names: HashSet<String>,
    documents: RwLock<HashMap<DocumentId, Ingested>>,
}

impl MockBackend {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            rejected_names: HashSet::new(),
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Mock backend that responds without delay
    pub fn instant() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Reject uploads with these file names as unreadable
    pub fn with_rejected_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rejected_names
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    async fn document_name(&self, document_id: &DocumentId) -> Result<String, BackendError> {
        self.documents
            .read()
            .await
            .get(document_id)
            .map(|d| d.metadata.name.clone())
            .ok_or_else(|| BackendError::NotFound(document_id.clone()))
    }

    async fn document_text(&self, document_id: &DocumentId) -> Result<String, BackendError> {
        self.documents
            .read()
            .await
            .get(document_id)
            .map(|d| d.text.clone())
            .ok_or_else(|| BackendError::NotFound(document_id.clone()))
    }
}

#[async_trait]
impl InferenceBackend for MockBackend {
    async fn ingest(
        &self,
        document_id: &DocumentId,
        file: &UploadFile,
    ) -> Result<DocumentMetadata, BackendError> {
        self.simulate_latency().await;

        let name = file.name.trim().to_string();
        if self.rejected_names.contains(&name) {
            return Err(BackendError::Rejected(format!(
                "'{}' could not be parsed",
                name
            )));
        }

        let (page_count, checksum) = if file.data.is_empty() {
            (DEFAULT_PAGE_COUNT, None)
        } else {
            (
                file.data.len().div_ceil(BYTES_PER_PAGE),
                Some(blake3::hash(&file.data).to_hex().to_string()),
            )
        };

        let metadata = DocumentMetadata {
            name,
            size_bytes: file.data.len() as u64,
            page_count,
            checksum,
        };

        let text = if file.data.is_empty() {
            SAMPLE_CONTRACT.to_string()
        } else {
            String::from_utf8_lossy(&file.data).into_owned()
        };
        self.documents.write().await.insert(
            document_id.clone(),
            Ingested {
                metadata: metadata.clone(),
                text,
            },
        );

        tracing::debug!(
            doc_id = %document_id,
            name = %metadata.name,
            page_count = metadata.page_count,
            "Mock ingest complete"
        );
        Ok(metadata)
    }

    async fn answer(&self, document_id: &DocumentId, query: &str) -> Result<String, BackendError> {
        self.simulate_latency().await;
        let name = self.document_name(document_id).await?;

        let query = query.to_lowercase();
        let template = TOPIC_ANSWERS
            .iter()
            .find(|(keyword, _)| query.contains(keyword))
            .map(|(_, answer)| *answer)
            .or_else(|| GENERIC_ANSWERS.choose(&mut rand::rng()).copied())
            .unwrap_or(GENERIC_ANSWERS[0]);

        Ok(template.replace("{name}", &name))
    }

    async fn summarize(
        &self,
        document_id: &DocumentId,
        style: SummaryStyle,
    ) -> Result<String, BackendError> {
        self.simulate_latency().await;
        let name = self.document_name(document_id).await?;

        let summary = match style {
            SummaryStyle::Concise => format!(
                "{} is a 24-month services agreement between Acme Holdings and Northwind Consulting. \
                 Fees are billed monthly, confidentiality survives for 5 years, and either party may \
                 terminate on 30 days' notice. Delaware law governs.",
                name
            ),
            SummaryStyle::Detailed => format!(
                "Overview: {name} establishes a 24-month engagement under which Northwind Consulting \
                 provides advisory services to Acme Holdings.\n\n\
                 Payment: fees are invoiced monthly and payable net 30; late payments accrue 1.5% \
                 interest per month.\n\n\
                 Confidentiality: both parties protect confidential information for 5 years after \
                 termination.\n\n\
                 Liability: capped at 12 months of fees, excluding confidentiality breaches and \
                 indemnification.\n\n\
                 Termination: either party may terminate for convenience on 30 days' notice, or \
                 immediately for material breach left uncured for 15 days.\n\n\
                 Governing law: State of Delaware, with exclusive venue in Wilmington."
            ),
            SummaryStyle::Keywords => format!(
                "Key terms in {}: services agreement, 24-month term, monthly fees, net 30, \
                 confidentiality (5 years), liability cap, indemnification, termination for \
                 convenience, material breach, Delaware law.",
                name
            ),
        };

        Ok(summary)
    }

    async fn compare(
        &self,
        left: &DocumentId,
        right: &DocumentId,
    ) -> Result<Comparison, BackendError> {
        self.simulate_latency().await;
        self.document_name(left).await?;
        self.document_name(right).await?;

        let left_pane = vec![
            DiffLine::new(1, DiffKind::Same, "This Agreement is made and entered into as of..."),
            DiffLine::new(2, DiffKind::Removed, "- The laws of the State of New York."),
            DiffLine::new(3, DiffKind::Same, "..."),
            DiffLine::new(
                4,
                DiffKind::Removed,
                "The \"Confidentiality Period\" shall mean 3 years.",
            ),
            DiffLine::new(5, DiffKind::Same, "All notices must be sent via certified mail."),
            DiffLine::new(6, DiffKind::Same, "..."),
            DiffLine::new(7, DiffKind::Same, "..."),
            DiffLine::new(
                8,
                DiffKind::Removed,
                "- The \"Termination Date\" is Dec 31, 2024.",
            ),
        ];
        let right_pane = vec![
            DiffLine::new(1, DiffKind::Same, "This Agreement is made and entered into as of..."),
            DiffLine::new(
                2,
                DiffKind::Added,
                "+ This Agreement is governed by the laws of the State of Delaware.",
            ),
            DiffLine::new(3, DiffKind::Same, "..."),
            DiffLine::new(
                4,
                DiffKind::Added,
                "The \"Confidentiality Period\" shall mean 5 years.",
            ),
            DiffLine::new(5, DiffKind::Same, "All notices must be sent via certified mail."),
            DiffLine::new(
                6,
                DiffKind::Added,
                "+ A new clause regarding data privacy is added here.",
            ),
            DiffLine::new(7, DiffKind::Added, "+ This clause was not in the original."),
            DiffLine::new(8, DiffKind::Same, "..."),
        ];

        Ok(Comparison::from_panes(
            left.clone(),
            right.clone(),
            left_pane,
            right_pane,
        ))
    }

    async fn search_clauses(
        &self,
        document_ids: &[DocumentId],
        term: &str,
    ) -> Result<Vec<ClauseHit>, BackendError> {
        self.simulate_latency().await;

        let documents = self.documents.read().await;
        let hits: Vec<ClauseHit> = document_ids
            .iter()
            .filter_map(|id| documents.get(id).map(|d| (id, d)))
            .flat_map(|(id, d)| {
                legal::find_snippets(&d.text, term, MAX_HITS_PER_DOCUMENT)
                    .into_iter()
                    .map(move |snippet| ClauseHit {
                        document_id: id.clone(),
                        snippet,
                    })
            })
            .collect();

        tracing::debug!(term, hits = hits.len(), "Mock clause search complete");
        Ok(hits)
    }

    async fn legal_check(
        &self,
        document_id: &DocumentId,
        document_type: DocumentType,
    ) -> Result<LegalReport, BackendError> {
        self.simulate_latency().await;
        let text = self.document_text(document_id).await?;
        Ok(LegalReport::from_text(
            document_id.clone(),
            document_type,
            &text,
        ))
    }

    async fn remove(&self, document_id: &DocumentId) -> Result<(), BackendError> {
        self.documents
            .write()
            .await
            .remove(document_id)
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound(document_id.clone()))
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ingest_reports_metadata() {
        let backend = MockBackend::instant();
        let id = DocumentId::new();

        let metadata = backend
            .ingest(&id, &UploadFile::new("notes.txt", vec![b'a'; 7_000]))
            .await
            .unwrap();

        assert_eq!(metadata.name, "notes.txt");
        assert_eq!(metadata.size_bytes, 7_000);
        assert_eq!(metadata.page_count, 3);
        assert_eq!(metadata.checksum.as_ref().map(|c| c.len()), Some(64));
    }

    #[tokio::test]
    async fn test_ingest_without_contents() {
        let backend = MockBackend::instant();
        let metadata = backend
            .ingest(&DocumentId::new(), &UploadFile::named("contract.pdf"))
            .await
            .unwrap();

        assert_eq!(metadata.page_count, DEFAULT_PAGE_COUNT);
        assert!(metadata.checksum.is_none());
    }

    #[tokio::test]
    async fn test_ingest_rejected_name() {
        let backend = MockBackend::instant().with_rejected_names(["corrupt.pdf"]);
        let result = backend
            .ingest(&DocumentId::new(), &UploadFile::named("corrupt.pdf"))
            .await;

        assert!(matches!(result, Err(BackendError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_answer_unknown_document() {
        let backend = MockBackend::instant();
        let result = backend.answer(&DocumentId::from("missing"), "hello").await;
        assert!(matches!(result, Err(BackendError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_answer_uses_topic_and_name() {
        let backend = MockBackend::instant();
        let id = DocumentId::new();
        backend
            .ingest(&id, &UploadFile::named("contract.pdf"))
            .await
            .unwrap();

        let answer = backend
            .answer(&id, "What is the Governing Law?")
            .await
            .unwrap();
        assert!(answer.contains("contract.pdf"));
        assert!(answer.contains("Delaware"));

        let generic = backend.answer(&id, "Who signs?").await.unwrap();
        assert!(generic.contains("contract.pdf"));
    }

    #[tokio::test]
    async fn test_summaries_differ_by_style() {
        let backend = MockBackend::instant();
        let id = DocumentId::new();
        backend
            .ingest(&id, &UploadFile::named("lease.docx"))
            .await
            .unwrap();

        let concise = backend
            .summarize(&id, SummaryStyle::Concise)
            .await
            .unwrap();
        let detailed = backend
            .summarize(&id, SummaryStyle::Detailed)
            .await
            .unwrap();
        let keywords = backend
            .summarize(&id, SummaryStyle::Keywords)
            .await
            .unwrap();

        assert_ne!(concise, detailed);
        assert!(detailed.len() > concise.len());
        assert!(keywords.starts_with("Key terms in lease.docx"));
    }

    #[tokio::test]
    async fn test_compare_and_remove() {
        let backend = MockBackend::instant();
        let a = DocumentId::new();
        let b = DocumentId::new();
        backend.ingest(&a, &UploadFile::named("v1.pdf")).await.unwrap();
        backend.ingest(&b, &UploadFile::named("v2.pdf")).await.unwrap();

        let comparison = backend.compare(&a, &b).await.unwrap();
        assert_eq!(comparison.removed, 3);
        assert_eq!(comparison.added, 4);
        assert_eq!(comparison.changed, 2);
        assert_eq!(comparison.diff_ids(), vec![2, 4, 6, 7, 8]);

        backend.remove(&b).await.unwrap();
        assert!(matches!(
            backend.compare(&a, &b).await,
            Err(BackendError::NotFound(_))
        ));
        assert!(backend.remove(&b).await.is_err());
    }

    #[tokio::test]
    async fn test_search_clauses_over_contents() {
        let backend = MockBackend::instant();
        let nda = DocumentId::new();
        let blank = DocumentId::new();
        backend
            .ingest(
                &nda,
                &UploadFile::new(
                    "nda.txt",
                    "This NDA is governed by the laws of New York. Nothing else.",
                ),
            )
            .await
            .unwrap();
        backend
            .ingest(&blank, &UploadFile::named("contract.pdf"))
            .await
            .unwrap();

        let hits = backend
            .search_clauses(&[nda.clone(), blank.clone(), DocumentId::from("gone")], "governed by")
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document_id, nda);
        assert!(hits[0].snippet.contains("New York"));
        assert_eq!(hits[1].document_id, blank);
        assert!(hits[1].snippet.contains("Delaware"));
    }

    #[tokio::test]
    async fn test_legal_check_reads_uploaded_text() {
        let backend = MockBackend::instant();
        let id = DocumentId::new();
        backend
            .ingest(&id, &UploadFile::new("bare.txt", "A short note with no clauses."))
            .await
            .unwrap();

        let report = backend.legal_check(&id, DocumentType::Nda).await.unwrap();
        assert_eq!(report.document_id, id);
        assert_eq!(report.missing().count(), report.clauses.len());
        assert_eq!(report.risk_score, 10);

        let sample = DocumentId::new();
        backend
            .ingest(&sample, &UploadFile::named("contract.pdf"))
            .await
            .unwrap();
        let report = backend.legal_check(&sample, DocumentType::Msa).await.unwrap();
        assert_eq!(report.missing().count(), 0);
        assert_eq!(report.risk_score, 1);
    }

    #[tokio::test]
    async fn test_legal_check_unknown_document() {
        let backend = MockBackend::instant();
        let result = backend
            .legal_check(&DocumentId::from("missing"), DocumentType::Loan)
            .await;
        assert!(matches!(result, Err(BackendError::NotFound(_))));
    }
}

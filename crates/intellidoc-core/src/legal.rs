//! Rule-based clause checks, risk scoring and clause search.
//!
//! Everything here is plain keyword and pattern matching over document text.
//! Backends call into it; the store never does.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::models::DocumentId;

// ============================================================================
// Document types and clause rules
// ============================================================================

/// Kinds of agreement the legal check knows rules for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Nda,
    Msa,
    Loan,
    Employment,
    Consultancy,
}

impl DocumentType {
    pub const ALL: [DocumentType; 5] = [
        DocumentType::Nda,
        DocumentType::Msa,
        DocumentType::Loan,
        DocumentType::Employment,
        DocumentType::Consultancy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Nda => "nda",
            DocumentType::Msa => "msa",
            DocumentType::Loan => "loan",
            DocumentType::Employment => "employment",
            DocumentType::Consultancy => "consultancy",
        }
    }

    /// Clause rules checked for this document type
    pub fn rules(&self) -> &'static [ClauseRule] {
        match self {
            DocumentType::Nda => NDA_RULES,
            DocumentType::Msa => MSA_RULES,
            DocumentType::Loan => LOAN_RULES,
            DocumentType::Employment => EMPLOYMENT_RULES,
            DocumentType::Consultancy => CONSULTANCY_RULES,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        DocumentType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| {
                StoreError::validation(format!(
                    "No rules for document type '{}' (expected nda, msa, loan, employment or consultancy)",
                    s.trim()
                ))
            })
    }
}

/// One clause a document type is expected to contain
#[derive(Debug)]
pub struct ClauseRule {
    pub name: &'static str,
    pub description: &'static str,
    pub keywords: &'static [&'static str],
}

const CONFIDENTIALITY: ClauseRule = ClauseRule {
    name: "confidentiality",
    description: "Obligations to protect confidential information",
    keywords: &["confidential", "non-disclosure", "proprietary"],
};

const TERMINATION: ClauseRule = ClauseRule {
    name: "termination",
    description: "How and when the agreement can be ended",
    keywords: &["terminate", "termination"],
};

const JURISDICTION: ClauseRule = ClauseRule {
    name: "jurisdiction",
    description: "Governing law and the courts that hear disputes",
    keywords: &["governing law", "jurisdiction", "governed by", "courts of"],
};

const LIABILITY: ClauseRule = ClauseRule {
    name: "liability",
    description: "Limits on liability and indemnification duties",
    keywords: &["liability", "indemnif", "damages"],
};

const INTELLECTUAL_PROPERTY: ClauseRule = ClauseRule {
    name: "intellectual_property",
    description: "Ownership of work product and intellectual property",
    keywords: &["intellectual property", "copyright", "ownership"],
};

const PAYMENT_TERMS: ClauseRule = ClauseRule {
    name: "payment_terms",
    description: "Fees, invoicing and payment deadlines",
    keywords: &["payment", "invoice", "fees", "compensation"],
};

const SCOPE_OF_WORK: ClauseRule = ClauseRule {
    name: "scope_of_work",
    description: "The services or deliverables being provided",
    keywords: &["scope", "services", "deliverables"],
};

const NDA_RULES: &[ClauseRule] = &[
    CONFIDENTIALITY,
    TERMINATION,
    JURISDICTION,
    LIABILITY,
    INTELLECTUAL_PROPERTY,
];

const MSA_RULES: &[ClauseRule] = &[
    SCOPE_OF_WORK,
    PAYMENT_TERMS,
    CONFIDENTIALITY,
    INTELLECTUAL_PROPERTY,
    LIABILITY,
    TERMINATION,
    JURISDICTION,
];

const LOAN_RULES: &[ClauseRule] = &[
    ClauseRule {
        name: "loan_amount",
        description: "Principal amount being lent",
        keywords: &["loan amount", "principal", "sanctioned amount"],
    },
    ClauseRule {
        name: "interest_rate",
        description: "Interest rate charged on the principal",
        keywords: &["interest", "rate of interest", "apr"],
    },
    ClauseRule {
        name: "repayment",
        description: "Repayment schedule and instalments",
        keywords: &["repayment", "emi", "instalment", "installment"],
    },
    ClauseRule {
        name: "collateral",
        description: "Security or collateral backing the loan",
        keywords: &["collateral", "security", "mortgage", "pledge"],
    },
    ClauseRule {
        name: "default",
        description: "Events of default and their consequences",
        keywords: &["default", "non-payment"],
    },
    JURISDICTION,
];

const EMPLOYMENT_RULES: &[ClauseRule] = &[
    ClauseRule {
        name: "services",
        description: "Position, duties and responsibilities",
        keywords: &["duties", "responsibilities", "position", "services"],
    },
    ClauseRule {
        name: "fees",
        description: "Salary and other compensation",
        keywords: &["salary", "compensation", "remuneration"],
    },
    CONFIDENTIALITY,
    INTELLECTUAL_PROPERTY,
    TERMINATION,
    JURISDICTION,
];

const CONSULTANCY_RULES: &[ClauseRule] = &[
    SCOPE_OF_WORK,
    PAYMENT_TERMS,
    CONFIDENTIALITY,
    INTELLECTUAL_PROPERTY,
    LIABILITY,
    TERMINATION,
    JURISDICTION,
];

// ============================================================================
// Clause check
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClauseStatus {
    Found,
    Missing,
}

/// Outcome of checking one clause rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseCheck {
    pub clause: String,
    pub status: ClauseStatus,
    /// Extracted value, only for found clauses ("N/A" when nothing specific matched)
    pub value: Option<String>,
    pub summary: String,
    pub recommendation: String,
}

/// Result of a legal check on one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalReport {
    pub document_id: DocumentId,
    pub document_type: DocumentType,
    pub clauses: Vec<ClauseCheck>,
    /// 1 (low) to 10 (high)
    pub risk_score: u8,
}

impl LegalReport {
    /// Run every rule for `document_type` over `text` and score what is missing
    pub fn from_text(document_id: DocumentId, document_type: DocumentType, text: &str) -> Self {
        let clauses = check_clauses(text, document_type.rules());
        let missing: Vec<&str> = clauses
            .iter()
            .filter(|c| c.status == ClauseStatus::Missing)
            .map(|c| c.clause.as_str())
            .collect();
        let risk_score = score_risk(&missing);

        Self {
            document_id,
            document_type,
            clauses,
            risk_score,
        }
    }

    pub fn missing(&self) -> impl Iterator<Item = &ClauseCheck> {
        self.clauses
            .iter()
            .filter(|c| c.status == ClauseStatus::Missing)
    }
}

/// Keyword presence check with value extraction for found clauses
pub fn check_clauses(text: &str, rules: &[ClauseRule]) -> Vec<ClauseCheck> {
    let lower = text.to_lowercase();
    rules
        .iter()
        .map(|rule| {
            let found = rule.keywords.iter().any(|kw| lower.contains(kw));
            if found {
                ClauseCheck {
                    clause: rule.name.to_string(),
                    status: ClauseStatus::Found,
                    value: Some(extract_value(rule.name, &lower)),
                    summary: rule.description.to_string(),
                    recommendation: format!("'{}' clause appears to be covered.", rule.name),
                }
            } else {
                ClauseCheck {
                    clause: rule.name.to_string(),
                    status: ClauseStatus::Missing,
                    value: None,
                    summary: rule.description.to_string(),
                    recommendation: format!("'{}' clause appears to be missing.", rule.name),
                }
            }
        })
        .collect()
}

static PERCENT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2}\.\d{1,2}%|\d{1,2}%)(\s*(p\.?a\.?|per annum)?)")
        .expect("Failed to compile percent regex")
});

static MONTHS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{1,3}\s*months?").expect("Failed to compile months regex"));

static AMOUNT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"inr\s?[\d,]+").expect("Failed to compile amount regex"));

static GOVERNING_LAW_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(jurisdiction|courts? of|governing law|governed by)[^.\n]+")
        .expect("Failed to compile governing law regex")
});

const NOT_APPLICABLE: &str = "N/A";

fn mentions(text: &str, words: &[&str], hit: &str) -> String {
    if words.iter().any(|w| text.contains(w)) {
        hit.to_string()
    } else {
        NOT_APPLICABLE.to_string()
    }
}

/// Pull the concrete value of a clause out of lowercased text
pub fn extract_value(clause: &str, text: &str) -> String {
    match clause {
        "interest_rate" | "apr" => PERCENT_PATTERN
            .find(text)
            .map_or_else(|| NOT_APPLICABLE.to_string(), |m| m.as_str().trim().to_string()),
        "repayment" | "tenure" | "installment" => {
            let parts: Vec<&str> = MONTHS_PATTERN
                .find_iter(text)
                .chain(AMOUNT_PATTERN.find_iter(text))
                .map(|m| m.as_str())
                .collect();
            if parts.is_empty() {
                NOT_APPLICABLE.to_string()
            } else {
                parts.join(", ")
            }
        }
        "loan_amount" | "principal_amount" => AMOUNT_PATTERN
            .find(text)
            .map_or_else(|| NOT_APPLICABLE.to_string(), |m| m.as_str().to_string()),
        "collateral" | "security" => {
            if ["mortgage", "pledge", "guarantee", "lien"]
                .iter()
                .any(|w| text.contains(w))
            {
                "Collateral/security clause mentioned".to_string()
            } else {
                NOT_APPLICABLE.to_string()
            }
        }
        "default" | "termination" => mentions(
            text,
            &["default", "non-payment", "breach", "terminate", "repayable on demand"],
            "Default or termination conditions mentioned",
        ),
        "confidentiality" | "confidential_information" => mentions(
            text,
            &["confidential", "non-disclosure", "proprietary"],
            "Confidentiality clause present",
        ),
        "payment_terms" | "fees" => mentions(
            text,
            &["payment", "invoice", "fees", "charges", "compensation", "salary"],
            "Payment terms mentioned",
        ),
        "intellectual_property" | "ip" => mentions(
            text,
            &["intellectual property", "copyright", "ownership"],
            "IP ownership clause found",
        ),
        "scope_of_work" | "services" => mentions(
            text,
            &["scope", "services", "duties"],
            "Scope/services clause found",
        ),
        "governing_law" | "jurisdiction" => GOVERNING_LAW_PATTERN
            .find(text)
            .map_or_else(|| "Missing".to_string(), |m| m.as_str().to_string()),
        "liability" | "indemnity" => mentions(
            text,
            &["liability", "indemnif", "damages", "loss"],
            "Liability/indemnity clause present",
        ),
        _ => NOT_APPLICABLE.to_string(),
    }
}

// ============================================================================
// Risk scoring
// ============================================================================

/// Weight of a missing clause when scoring risk. Unlisted clauses weigh 1.
pub const DEFAULT_SEVERITY: &[(&str, u32)] = &[
    ("termination", 3),
    ("liability", 5),
    ("confidentiality", 4),
    ("jurisdiction", 2),
];

/// Score missing clauses on a 1..=10 scale using the default weights
pub fn score_risk(missing: &[&str]) -> u8 {
    score_risk_with(missing, DEFAULT_SEVERITY)
}

/// Sum the weights of missing clauses, scale against the total weight of the
/// severity table and clamp to 1..=10 (higher is riskier).
pub fn score_risk_with(missing: &[&str], severity: &[(&str, u32)]) -> u8 {
    let weight = |clause: &str| {
        severity
            .iter()
            .find(|(name, _)| *name == clause)
            .map_or(1, |(_, w)| *w)
    };
    let score: u32 = missing.iter().map(|m| weight(*m)).sum();
    let max_possible: u32 = severity.iter().map(|(_, w)| w).sum();
    if max_possible == 0 {
        return 10;
    }

    let scaled = score * 10 / max_possible;
    scaled.clamp(1, 10) as u8
}

// ============================================================================
// Clause search
// ============================================================================

/// Characters of context kept on each side of a match
const SNIPPET_CONTEXT: usize = 60;

/// Case-insensitive search for `term`, returning up to `limit` context
/// snippets in document order. Overlapping matches yield one snippet.
pub fn find_snippets(text: &str, term: &str, limit: usize) -> Vec<String> {
    let term = term.trim().to_ascii_lowercase();
    if term.is_empty() || limit == 0 {
        return Vec::new();
    }
    // ASCII lowercasing keeps byte offsets aligned with `text`
    let haystack = text.to_ascii_lowercase();

    let mut snippets = Vec::new();
    let mut from = 0;
    while snippets.len() < limit {
        let Some(offset) = haystack[from..].find(&term) else {
            break;
        };
        let start = from + offset;
        let end = start + term.len();

        let lo = floor_boundary(text, start.saturating_sub(SNIPPET_CONTEXT));
        let hi = ceil_boundary(text, (end + SNIPPET_CONTEXT).min(text.len()));
        let body = text[lo..hi].split_whitespace().collect::<Vec<_>>().join(" ");

        snippets.push(format!(
            "{}{}{}",
            if lo > 0 { "..." } else { "" },
            body,
            if hi < text.len() { "..." } else { "" }
        ));
        from = hi;
    }
    snippets
}

fn floor_boundary(text: &str, mut index: usize) -> usize {
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_boundary(text: &str, mut index: usize) -> usize {
    while !text.is_char_boundary(index) {
        index += 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    const NDA_TEXT: &str = "This Non-Disclosure Agreement protects Confidential Information. \
        Either party may terminate this Agreement on 30 days notice. \
        This Agreement is governed by the laws of the State of New York.";

    #[test]
    fn test_document_type_parse() {
        assert_eq!("NDA".parse::<DocumentType>().unwrap(), DocumentType::Nda);
        assert_eq!(" loan ".parse::<DocumentType>().unwrap(), DocumentType::Loan);
        let err = "lease".parse::<DocumentType>().unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_nda_check_reports_found_and_missing() {
        let report = LegalReport::from_text(DocumentId::from("d"), DocumentType::Nda, NDA_TEXT);

        assert_eq!(report.clauses.len(), NDA_RULES.len());
        let status = |name: &str| {
            report
                .clauses
                .iter()
                .find(|c| c.clause == name)
                .map(|c| c.status)
                .unwrap()
        };
        assert_eq!(status("confidentiality"), ClauseStatus::Found);
        assert_eq!(status("termination"), ClauseStatus::Found);
        assert_eq!(status("jurisdiction"), ClauseStatus::Found);
        assert_eq!(status("liability"), ClauseStatus::Missing);
        assert_eq!(status("intellectual_property"), ClauseStatus::Missing);

        let missing: Vec<_> = report.missing().map(|c| c.clause.as_str()).collect();
        assert_eq!(missing, vec!["liability", "intellectual_property"]);
        assert!(report.missing().all(|c| c.value.is_none()));
        // liability (5) + unlisted (1) = 6 of 14
        assert_eq!(report.risk_score, 4);
    }

    #[test]
    fn test_found_clause_values() {
        let report = LegalReport::from_text(DocumentId::from("d"), DocumentType::Nda, NDA_TEXT);
        let jurisdiction = report
            .clauses
            .iter()
            .find(|c| c.clause == "jurisdiction")
            .unwrap();
        assert_eq!(
            jurisdiction.value.as_deref(),
            Some("governed by the laws of the state of new york")
        );
        assert_eq!(
            jurisdiction.recommendation,
            "'jurisdiction' clause appears to be covered."
        );
    }

    #[test]
    fn test_loan_values() {
        let text = "loan amount of inr 5,00,000 at an interest rate of 10.5% p.a. \
                    repayment in 24 months with emi of inr 23,000.";
        assert_eq!(extract_value("interest_rate", text), "10.5% p.a.");
        assert_eq!(extract_value("loan_amount", text), "inr 5,00,000");
        assert_eq!(
            extract_value("repayment", text),
            "24 months, inr 5,00,000, inr 23,000"
        );
        assert_eq!(extract_value("collateral", text), "N/A");
    }

    #[test]
    fn test_risk_score_bounds() {
        assert_eq!(score_risk(&[]), 1);
        assert_eq!(score_risk(&["jurisdiction"]), 1);
        assert_eq!(
            score_risk(&["termination", "liability", "confidentiality", "jurisdiction"]),
            10
        );
        // Unlisted clauses push past the table total but the score is clamped
        assert_eq!(
            score_risk(&[
                "termination",
                "liability",
                "confidentiality",
                "jurisdiction",
                "payment_terms",
                "scope_of_work",
            ]),
            10
        );
        assert_eq!(score_risk(&["liability", "confidentiality"]), 6);
    }

    #[test]
    fn test_every_report_is_in_range() {
        for document_type in DocumentType::ALL {
            for text in ["", NDA_TEXT] {
                let report = LegalReport::from_text(DocumentId::from("d"), document_type, text);
                assert!((1..=10).contains(&report.risk_score));
                assert_eq!(report.clauses.len(), document_type.rules().len());
            }
        }
    }

    #[test]
    fn test_find_snippets() {
        let snippets = find_snippets(NDA_TEXT, "GOVERNED BY", 5);
        assert_eq!(snippets.len(), 1);
        assert!(snippets[0].starts_with("..."));
        assert!(snippets[0].contains("governed by the laws of the State of New York."));

        assert!(find_snippets(NDA_TEXT, "arbitration", 5).is_empty());
        assert!(find_snippets(NDA_TEXT, "   ", 5).is_empty());
    }

    #[test]
    fn test_find_snippets_respects_limit() {
        let text = "fee ".repeat(200);
        assert_eq!(find_snippets(&text, "fee", 3).len(), 3);
    }
}

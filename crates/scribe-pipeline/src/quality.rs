//! Deterministic quality assessment of generated documents.
//!
//! The assessor never calls a model: it checks word counts, structural
//! markers, error and placeholder text, and a five-point completeness
//! score. Low-confidence results carry the flag the critique loop keys
//! on.

use std::collections::BTreeSet;

use scribe_core::{Confidence, LOW_CONFIDENCE_FLAG, QualityAssessment};

/// Words below which a document is too short to trust.
const MIN_WORDS: usize = 500;

/// Words below which a document is merely on the short side.
const GOOD_WORDS: usize = 1000;

/// Line count expected of a complete document.
const MIN_LINES: usize = 20;

/// Completeness score below which confidence drops to low.
const MIN_COMPLETENESS: f64 = 0.5;

/// Structural markers a real document should contain.
const SECTION_MARKERS: [&str; 7] = [
    "#",
    "##",
    "###",
    "Introduction",
    "Overview",
    "Requirements",
    "Conclusion",
];

/// Text fragments that indicate a failed generation leaked through.
const ERROR_INDICATORS: [&str; 5] = ["Error:", "Failed:", "not available", "not found", "Exception"];

/// Text fragments that indicate unfinished content.
const PLACEHOLDER_MARKERS: [&str; 5] = ["TODO", "TBD", "[Insert", "[Add", "PLACEHOLDER"];

/// Rule-based document scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityAssessor;

impl QualityAssessor {
    /// Creates an assessor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Assesses a generated document.
    ///
    /// The same document always produces the same assessment.
    #[must_use]
    pub fn assess(&self, document: &str) -> QualityAssessment {
        let word_count = document.split_whitespace().count();
        let line_count = document.lines().count();
        let distinct_markers = SECTION_MARKERS
            .iter()
            .filter(|marker| document.contains(*marker))
            .count();
        let has_sections = distinct_markers > 0;

        let lower = document.to_lowercase();
        let mentions_subject = lower.contains("requirements") || lower.contains("specification");

        let satisfied = [
            word_count >= GOOD_WORDS,
            has_sections,
            distinct_markers >= 3,
            mentions_subject,
            line_count >= MIN_LINES,
        ]
        .iter()
        .filter(|check| **check)
        .count();
        let completeness_score = satisfied as f64 / 5.0;

        let mut confidence = Confidence::High;
        let mut flags = BTreeSet::new();
        let mut issues = Vec::new();

        if word_count < MIN_WORDS {
            issues.push("Document too short (< 500 words)".to_owned());
            confidence = Confidence::Low;
            flags.insert(LOW_CONFIDENCE_FLAG.to_owned());
        } else if word_count < GOOD_WORDS {
            issues.push("Document relatively short (< 1000 words)".to_owned());
            confidence = confidence.at_most(Confidence::Medium);
        }

        if !has_sections {
            issues.push("Missing standard document sections".to_owned());
            confidence = Confidence::Low;
            flags.insert(LOW_CONFIDENCE_FLAG.to_owned());
        }

        if ERROR_INDICATORS
            .iter()
            .any(|indicator| document.contains(indicator))
        {
            issues.push("Document contains error messages".to_owned());
            confidence = Confidence::Low;
            flags.insert(LOW_CONFIDENCE_FLAG.to_owned());
        }

        if PLACEHOLDER_MARKERS
            .iter()
            .any(|marker| document.contains(marker))
        {
            issues.push("Document contains placeholder text".to_owned());
            confidence = confidence.at_most(Confidence::Medium);
        }

        if completeness_score < MIN_COMPLETENESS {
            issues.push(format!("Low completeness score: {completeness_score:.2}"));
            confidence = Confidence::Low;
            flags.insert(LOW_CONFIDENCE_FLAG.to_owned());
        }

        tracing::debug!(
            "Quality assessment: {confidence} ({} issues, completeness {completeness_score:.2})",
            issues.len()
        );

        QualityAssessment {
            confidence,
            flags,
            issues,
            word_count,
            has_sections,
            completeness_score,
        }
    }
}

use core::fmt::{Display, Formatter, Result as FmtResult};
use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::DocType;

/// Flag attached to assessments that should trigger the critique loop.
pub const LOW_CONFIDENCE_FLAG: &str = "low_confidence";

/// One prompt submitted to a text generation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    /// System prompt establishing the role for this call.
    pub system: String,
    /// Task text for this call.
    pub text: String,
    /// Sampling temperature override; the backend default applies when
    /// unset.
    pub temperature: Option<f32>,
}

impl Prompt {
    /// Creates a prompt with no system text.
    pub fn new<T: Into<String>>(text: T) -> Self {
        Self {
            system: String::new(),
            text: text.into(),
            temperature: None,
        }
    }

    /// Sets the system prompt.
    #[must_use]
    pub fn with_system<T: Into<String>>(mut self, system: T) -> Self {
        self.system = system.into();
        self
    }

    /// Sets the sampling temperature for this call.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Rough token estimate, assuming four characters per token.
    #[must_use]
    pub fn token_estimate(&self) -> usize {
        (self.system.len() + self.text.len()) / 4
    }
}

/// Completion returned by a text generation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// Generated text.
    pub text: String,
    /// Token accounting for the request.
    pub tokens_used: TokenUsage,
    /// Identifier of the backend that served the request.
    pub provider: String,
    /// Wall-clock latency of the request in milliseconds.
    pub latency_ms: u64,
}

/// Token usage metrics for a completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt portion of the request.
    pub input: u64,
    /// Tokens produced in the completion.
    pub output: u64,
}

impl TokenUsage {
    /// Total tokens consumed by the request.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.input + self.output
    }
}

/// Document confidence level assigned by quality assessment.
///
/// Ordered so that `min` picks the more severe level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Document has structural or content problems.
    Low,
    /// Document is usable but thin or blemished.
    Medium,
    /// No quality rules fired.
    High,
}

impl Confidence {
    /// Caps this level at `cap`, keeping the more severe of the two.
    #[must_use]
    pub fn at_most(self, cap: Self) -> Self {
        self.min(cap)
    }

    /// Lowercase label used in logs and summaries.
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl Display for Confidence {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.label())
    }
}

/// Parsed output of the dispatch phase.
///
/// A failed parse yields the default record: no document type, no
/// clarification, empty questions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchRecord {
    /// Raw document type string as emitted by the dispatcher.
    pub document_type: Option<String>,
    /// Workflow hint chosen by the dispatcher.
    pub workflow: Option<String>,
    /// Whether the dispatcher flagged the request as ambiguous.
    pub needs_clarification: bool,
    /// Questions suggested by the dispatcher, if any.
    pub clarification_questions: Vec<String>,
    /// Free-text analysis of the request.
    pub analysis: Option<String>,
}

/// Quality assessment derived deterministically from a document string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityAssessment {
    /// Overall confidence level, most severe rule wins.
    pub confidence: Confidence,
    /// Tags such as [`LOW_CONFIDENCE_FLAG`].
    pub flags: BTreeSet<String>,
    /// Human-readable findings, in rule order.
    pub issues: Vec<String>,
    /// Whitespace-separated word count.
    pub word_count: usize,
    /// Whether any structural marker was found.
    pub has_sections: bool,
    /// Fraction of completeness checks satisfied, in [0, 1].
    pub completeness_score: f64,
}

impl QualityAssessment {
    /// Whether this assessment should trigger regeneration.
    #[must_use]
    pub fn is_low_confidence(&self) -> bool {
        self.flags.contains(LOW_CONFIDENCE_FLAG)
    }
}

/// Result of one full generation pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Final document text.
    pub document: String,
    /// Normalized document type.
    pub document_type: DocType,
    /// Ordered names of the phases that executed.
    pub workflow: Vec<String>,
    /// Where the document was persisted, if the write succeeded.
    pub output_path: Option<PathBuf>,
    /// Description of a failed write. Never fatal.
    pub write_error: Option<String>,
    /// Dispatch record from phase one.
    pub dispatch: DispatchRecord,
    /// Quality assessment, attached by the caller after generation.
    pub quality: Option<QualityAssessment>,
    /// Number of critique-driven regenerations behind this result.
    pub critique_rounds: u32,
}

impl PipelineResult {
    /// Attaches a quality assessment to this result.
    #[must_use]
    pub fn with_quality(mut self, quality: QualityAssessment) -> Self {
        self.quality = Some(quality);
        self
    }
}

/// Outcome of the coordinator's dispatch gate.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// All phases ran and produced a document.
    Completed(Box<PipelineResult>),
    /// The dispatcher flagged the request as ambiguous; no further
    /// phases ran.
    NeedsClarification {
        /// Dispatch record carrying any suggested questions.
        dispatch: DispatchRecord,
    },
}

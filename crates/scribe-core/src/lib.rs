//! Core types and traits for the scribe documentation pipeline.
//!
//! This crate provides the shared vocabulary used across the workspace:
//! error handling, the text-generation boundary trait, document types,
//! pipeline result types, and configuration.
#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::print_stdout,
        clippy::print_stderr,
        reason = "Test allows"
    )
)]

/// Workspace configuration loaded from TOML.
pub mod config;
/// Document type registry and normalization.
pub mod doc_type;
/// Error types and result definitions.
pub mod error;
/// Synchronization utilities.
pub mod sync;
/// Trait definitions for text generation backends.
pub mod traits;
/// Core data types for prompts, completions, and pipeline results.
pub mod types;

pub use config::{
    ConversationConfig, LimitsConfig, OutputConfig, ProviderConfig, ScribeConfig,
};
pub use doc_type::DocType;
pub use error::{Error, Result};
pub use sync::IgnoreLock;
pub use traits::TextRunner;
pub use types::{
    Completion, Confidence, DispatchRecord, PipelineOutcome, PipelineResult, Prompt,
    QualityAssessment, TokenUsage, LOW_CONFIDENCE_FLAG,
};

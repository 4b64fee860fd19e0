//! Multi-agent documentation generation pipeline.
//!
//! This crate wires role-specific prompt wrappers around a [`TextRunner`]
//! into a four-phase generation pipeline (dispatch, parallel research,
//! synthesis, sequential review) with conversational clarification,
//! confidence scoring, and a bounded self-critique loop on top.
//!
//! [`TextRunner`]: scribe_core::TextRunner
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

/// Token estimation and budget-aware truncation.
pub mod budget;
/// Conversational clarification engine.
pub mod clarify;
/// State tracking for multi-round clarification dialogues.
pub mod conversation;
/// Four-phase generation pipeline coordinator.
pub mod coordinator;
/// Bounded self-critique regeneration loop.
pub mod critique;
/// Lenient extraction of structured data from model output.
pub mod parser;
/// Deterministic document quality assessment.
pub mod quality;
/// Agent roles and the crew that runs them.
pub mod roles;
/// Confidence scoring over conversation state.
pub mod scoring;
/// Source file collection and summarization.
pub mod sources;
/// Ordered, size-capped workflow step log.
pub mod workflow_log;

pub use budget::TokenBudget;
pub use clarify::{ClarificationEngine, EngineStep};
pub use conversation::{ConversationId, ConversationState, Exchange};
pub use coordinator::PipelineCoordinator;
pub use critique::SelfCritiqueLoop;
pub use quality::QualityAssessor;
pub use roles::{AgentCrew, AgentRole};
pub use sources::{SourceBundle, SourceFile};
pub use workflow_log::WorkflowLog;

//! Bounded self-critique regeneration loop.
//!
//! Every generated document is assessed deterministically; low-confidence
//! documents are fed back through the pipeline together with an editor
//! critique of what went wrong. The loop is bounded by configuration, so
//! a stubbornly bad backend costs a fixed number of extra rounds and
//! then ships the best it produced.

use scribe_core::{PipelineOutcome, PipelineResult, QualityAssessment, ScribeConfig};

use crate::budget::clip_chars;
use crate::coordinator::PipelineCoordinator;
use crate::quality::QualityAssessor;
use crate::roles::{AgentCrew, AgentRole};
use crate::sources::SourceBundle;

/// Wraps the pipeline with quality assessment and critique-driven
/// regeneration.
#[derive(Clone)]
pub struct SelfCritiqueLoop {
    coordinator: PipelineCoordinator,
    crew: AgentCrew,
    assessor: QualityAssessor,
    max_rounds: u32,
    critique_prefix_chars: usize,
}

impl SelfCritiqueLoop {
    /// Creates the loop around an existing coordinator.
    pub fn new(coordinator: PipelineCoordinator, crew: AgentCrew, config: &ScribeConfig) -> Self {
        Self {
            coordinator,
            crew,
            assessor: QualityAssessor::new(),
            max_rounds: config.conversation.max_critique_rounds,
            critique_prefix_chars: config.limits.critique_prefix_chars,
        }
    }

    /// Runs the gated pipeline, refining completed documents.
    ///
    /// A clarification stop passes through untouched; the conversation
    /// layer owns that path.
    pub async fn generate(&self, request: &str, sources: &SourceBundle) -> PipelineOutcome {
        match self.coordinator.run(request, sources).await {
            PipelineOutcome::NeedsClarification { dispatch } => {
                PipelineOutcome::NeedsClarification { dispatch }
            }
            PipelineOutcome::Completed(result) => {
                let refined = self.refine(request, sources, *result).await;
                PipelineOutcome::Completed(Box::new(refined))
            }
        }
    }

    /// Runs the pipeline without the dispatch gate, then refines.
    pub async fn generate_forced(&self, request: &str, sources: &SourceBundle) -> PipelineResult {
        let first = self.coordinator.run_forced(request, sources).await;
        self.refine(request, sources, first).await
    }

    /// Assesses the document and regenerates while confidence stays low,
    /// up to the configured round limit.
    async fn refine(
        &self,
        request: &str,
        sources: &SourceBundle,
        first: PipelineResult,
    ) -> PipelineResult {
        let mut result = first;
        let mut assessment = self.assessor.assess(&result.document);
        let mut rounds = 0;

        while assessment.is_low_confidence() && rounds < self.max_rounds {
            rounds += 1;
            tracing::info!(
                "Document confidence {} (round {rounds} of {}), regenerating with critique",
                assessment.confidence,
                self.max_rounds
            );

            let critique = self.critique(&result.document, &assessment).await;
            let enriched = critique_request(request, &critique, rounds);
            result = self.coordinator.run_forced(&enriched, sources).await;
            assessment = self.assessor.assess(&result.document);
        }

        if assessment.is_low_confidence() {
            tracing::warn!(
                "Document still low confidence after {rounds} critique rounds, keeping it"
            );
        }

        result.critique_rounds = rounds;
        result.with_quality(assessment)
    }

    /// Asks the editor what is wrong with the document, seeded with the
    /// deterministic findings.
    async fn critique(&self, document: &str, assessment: &QualityAssessment) -> String {
        let preview = clip_chars(document, self.critique_prefix_chars);
        let mut issue_lines = String::new();
        for issue in &assessment.issues {
            issue_lines.push_str(&format!("- {issue}\n"));
        }

        let task = format!(
            "Critique this document and suggest specific improvements:\n\n\
             Document Preview:\n{preview}\n\n\
             Detected Issues:\n{issue_lines}\n\
             Provide:\n\
             1. Specific problems with structure, content, or completeness\n\
             2. Concrete suggestions for improvement\n\
             3. Missing sections that should be added\n\
             4. Content that needs expansion\n\n\
             Format your response as actionable recommendations."
        );
        self.crew.run(AgentRole::Editor, &task).await
    }
}

/// Rebuilds the request with critique feedback attached, always from the
/// original request so that feedback never compounds across rounds.
fn critique_request(request: &str, critique: &str, round: u32) -> String {
    format!(
        "{request}\n\n\
         === SELF-CRITIQUE FEEDBACK (Iteration {round}) ===\n\
         Previous attempt had the following issues:\n{critique}\n\n\
         Please address these issues in the regenerated document.\n"
    )
}

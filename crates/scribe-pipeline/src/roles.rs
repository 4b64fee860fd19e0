//! Agent roles and the crew that runs them.
//!
//! Each role is a fixed system prompt plus a sampling temperature; the
//! [`AgentCrew`] submits role-tagged prompts to the configured backend
//! and converts provider failures into in-band error text so that the
//! pipeline never has to unwind mid-generation.

use core::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;

use scribe_core::{Prompt, TextRunner};

/// System prompt for the routing role.
const DISPATCHER_PROMPT: &str = r#"You are the Dispatcher Agent for a documentation system.

Your only job is to analyze the user request and decide:

A) Can documentation be generated right now?
   -> Return JSON with "needs_clarification": false

B) Is the request too vague, missing domain, document type, or context?
   -> Return JSON with "needs_clarification": true plus clarification_questions

Only proceed when AT LEAST 2 of these are present:
- Document type mentioned (BRD, FRD, API, NFRD, CLOUD, SECURITY)
- Application domain (e-commerce, trading, CRM, banking, healthcare, ...)
- Code or files provided as context
- Clear business goal or feature description

Requests like "Create documentation" or "Generate docs" with no context
MUST trigger clarification. Requests like "Create FRD for e-commerce
checkout flow" can proceed.

ALWAYS respond in this exact JSON format, no markdown, no extra text:

{
  "needs_clarification": true,
  "document_type": ["FRD"],
  "workflow": "prompt_based",
  "clarification_questions": ["What type of application is this?"]
}

If needs_clarification is false, omit clarification_questions or set it
to an empty array. Be strict: if the request is vague, ask questions."#;

/// System prompt for the requirements-extraction role.
const ANALYST_PROMPT: &str = r"You are a Business and Requirements Analyst.

Analyze the request thoroughly and use domain knowledge to infer
standard requirements for the application type. Fill in
industry-standard assumptions rather than asking for clarification.

Provide comprehensive requirements covering: functional requirements,
non-functional requirements (performance, security, scalability),
stakeholders, business objectives, scope and boundaries, and success
criteria.";

/// System prompt for the code-analysis role.
const RESEARCHER_PROMPT: &str = r"You are a Senior Code Analyst specialized in software architecture.

Analyze the provided source files and extract information relevant for
documentation: key components and their responsibilities, dependencies
and integrations, architectural patterns, and technical constraints.
Focus on documentation-relevant information, not code review.";

/// System prompt for the synthesis role.
const WRITER_PROMPT: &str = r"You are an Expert Technical Writer.

Synthesize input from analysts and researchers into clear, professional,
well-structured documentation. Output Markdown with a standard document
structure: title, executive summary, sections, conclusion. Use tables,
lists, and code blocks where appropriate, and include all sections the
document type requires.";

/// System prompt for the security-review role.
const SECURITY_PROMPT: &str = r"You are a Security and Compliance Expert.

Review draft documentation for security considerations: missing security
sections, authentication and authorization flows, data protection
measures, and compliance requirements (GDPR, HIPAA, SOC2 where
applicable). Be thorough but practical; focus on actionable security
documentation.";

/// System prompt for the editing role.
const EDITOR_PROMPT: &str = r"You are a Documentation Editor and Quality Assurance reviewer.

Review the complete document for quality: consistent formatting and
style, completeness of required sections, clarity and readability, and
grammar. Maintain technical accuracy while improving presentation, and
return the final polished document in Markdown.";

/// Role a prompt is executed under.
///
/// Mirrors the six specialists the generation pipeline coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRole {
    /// Routes requests and flags ambiguity.
    Dispatcher,
    /// Extracts and structures requirements.
    Analyst,
    /// Analyzes source code.
    Researcher,
    /// Synthesizes the document draft.
    Writer,
    /// Reviews for security and compliance.
    Security,
    /// Final polish, formatting, and critique.
    Editor,
}

impl AgentRole {
    /// All roles, in pipeline order.
    pub const ALL: [Self; 6] = [
        Self::Dispatcher,
        Self::Analyst,
        Self::Researcher,
        Self::Writer,
        Self::Security,
        Self::Editor,
    ];

    /// Human-readable role name used in workflow listings and logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Dispatcher => "Dispatcher",
            Self::Analyst => "Requirement Analyst",
            Self::Researcher => "Code Researcher",
            Self::Writer => "Technical Writer",
            Self::Security => "Security Reviewer",
            Self::Editor => "Editor & Formatter",
        }
    }

    /// System prompt establishing this role.
    #[must_use]
    pub fn system_prompt(self) -> &'static str {
        match self {
            Self::Dispatcher => DISPATCHER_PROMPT,
            Self::Analyst => ANALYST_PROMPT,
            Self::Researcher => RESEARCHER_PROMPT,
            Self::Writer => WRITER_PROMPT,
            Self::Security => SECURITY_PROMPT,
            Self::Editor => EDITOR_PROMPT,
        }
    }

    /// Sampling temperature for this role.
    ///
    /// Routing and code analysis run cold; synthesis runs warm.
    #[must_use]
    pub fn temperature(self) -> f32 {
        match self {
            Self::Dispatcher | Self::Researcher => 0.3,
            Self::Security => 0.4,
            Self::Analyst | Self::Editor => 0.5,
            Self::Writer => 0.7,
        }
    }
}

impl Display for AgentRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.name())
    }
}

/// Runs roles against a shared text generation backend.
///
/// The crew never fails: provider errors become in-band text starting
/// with `Error:` so downstream phases and the quality assessor can spot
/// degraded content without unwinding.
#[derive(Clone)]
pub struct AgentCrew {
    /// Backend all roles share.
    runner: Arc<dyn TextRunner>,
}

impl AgentCrew {
    /// Creates a crew around the given backend.
    pub fn new(runner: Arc<dyn TextRunner>) -> Self {
        Self { runner }
    }

    /// Runs one role against the backend and returns its response text.
    ///
    /// A provider error is converted into a marker string beginning with
    /// `Error:` instead of propagating.
    pub async fn run(&self, role: AgentRole, task: &str) -> String {
        let prompt = Prompt::new(task)
            .with_system(role.system_prompt())
            .with_temperature(role.temperature());

        tracing::debug!(
            "Running {} (~{} prompt tokens)",
            role.name(),
            prompt.token_estimate()
        );

        match self.runner.run(&prompt).await {
            Ok(completion) => {
                tracing::debug!(
                    "{} completed in {}ms ({} tokens)",
                    role.name(),
                    completion.latency_ms,
                    completion.tokens_used.total()
                );
                completion.text
            }
            Err(error) => {
                tracing::warn!("{} request failed: {error}", role.name());
                format!("Error: {} request failed ({error})", role.name())
            }
        }
    }
}

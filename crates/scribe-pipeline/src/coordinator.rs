//! Four-phase generation pipeline.
//!
//! The coordinator runs dispatch, parallel research, synthesis, and
//! sequential review over an [`AgentCrew`], then persists the finished
//! document. Dispatch acts as a gate: an ambiguous request stops the
//! pipeline and surfaces the dispatcher's questions instead of burning
//! tokens on a document nobody asked for.

use std::path::PathBuf;

use chrono::Local;
use scribe_core::{DispatchRecord, DocType, PipelineOutcome, PipelineResult, ScribeConfig};
use serde_json::Value;
use tokio::fs;

use crate::budget::{TokenBudget, clip_chars};
use crate::parser;
use crate::roles::{AgentCrew, AgentRole};
use crate::sources::SourceBundle;
use crate::workflow_log::WorkflowLog;

/// Terms that mark a draft as security-relevant.
///
/// The scan is diagnostic only: the security phase runs on every draft,
/// the gate result is just recorded in the workflow log.
const SECURITY_KEYWORDS: [&str; 31] = [
    "authentication",
    "authorization",
    "password",
    "token",
    "api key",
    "encryption",
    "decrypt",
    "ssl",
    "tls",
    "certificate",
    "credential",
    "secret",
    "security",
    "vulnerability",
    "attack",
    "threat",
    "compliance",
    "gdpr",
    "hipaa",
    "pci",
    "oauth",
    "jwt",
    "firewall",
    "access control",
    "privilege",
    "permission",
    "session",
    "inject",
    "xss",
    "csrf",
    "sql",
];

/// Drives the generation phases in order and persists the result.
#[derive(Clone)]
pub struct PipelineCoordinator {
    crew: AgentCrew,
    budget: TokenBudget,
    output_dir: PathBuf,
    write_workflow_log: bool,
    review_prefix_chars: usize,
    output_override: Option<PathBuf>,
}

impl PipelineCoordinator {
    /// Creates a coordinator over `crew` using the configured output
    /// directory and limits.
    pub fn new(crew: AgentCrew, config: &ScribeConfig) -> Self {
        Self {
            crew,
            budget: TokenBudget::new(config.provider.max_tokens),
            output_dir: config.output.dir.clone(),
            write_workflow_log: config.output.write_workflow_log,
            review_prefix_chars: config.limits.review_prefix_chars,
            output_override: None,
        }
    }

    /// Writes the document to `path` instead of a timestamped file under
    /// the output directory.
    #[must_use]
    pub fn with_output_override(mut self, path: PathBuf) -> Self {
        self.output_override = Some(path);
        self
    }

    /// Runs the pipeline behind the dispatch gate.
    ///
    /// When the dispatcher flags the request as ambiguous, no further
    /// phases run and the dispatch record (with any suggested questions)
    /// is returned for the caller to act on.
    pub async fn run(&self, request: &str, sources: &SourceBundle) -> PipelineOutcome {
        let mut log = WorkflowLog::default();
        log.record("Workflow Started", &[("request", request)]);

        let dispatch = self.dispatch(request, &mut log).await;
        if dispatch.needs_clarification {
            tracing::info!("Dispatcher requested clarification before generation");
            return PipelineOutcome::NeedsClarification { dispatch };
        }

        let result = self.generate(request, sources, dispatch, &mut log).await;
        PipelineOutcome::Completed(Box::new(result))
    }

    /// Runs the pipeline without the dispatch gate.
    ///
    /// Dispatch still executes for its routing analysis, but its
    /// clarification flag is ignored. Used once the conversation layer
    /// has decided to proceed, where stopping again would loop forever.
    pub async fn run_forced(&self, request: &str, sources: &SourceBundle) -> PipelineResult {
        let mut log = WorkflowLog::default();
        log.record("Workflow Started", &[("request", request)]);

        let dispatch = self.dispatch(request, &mut log).await;
        self.generate(request, sources, dispatch, &mut log).await
    }

    /// Phase one: route the request and decide whether to proceed.
    async fn dispatch(&self, request: &str, log: &mut WorkflowLog) -> DispatchRecord {
        let task = format!(
            "Analyze this documentation request and provide:\n\
             1. Document type(s) needed (BRD, FRD, NFRD, CLOUD, SECURITY, API, GENERIC)\n\
             2. Workflow agents required\n\
             3. Any clarifications needed\n\n\
             Request: {request}\n\n\
             Respond in JSON format with: document_type, workflow, needs_clarification"
        );
        let response = self.crew.run(AgentRole::Dispatcher, &task).await;
        let fields = parser::parse(&response);

        let needs_clarification = fields
            .get("needs_clarification")
            .is_some_and(clarification_flag);
        let record = DispatchRecord {
            document_type: fields.get("document_type").and_then(document_type_text),
            workflow: fields.get("workflow").and_then(field_text),
            needs_clarification,
            clarification_questions: fields
                .get("clarification_questions")
                .map_or_else(Vec::new, parser::string_list),
            analysis: fields.get("analysis").and_then(field_text).or_else(|| {
                let trimmed = response.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_owned())
            }),
        };

        log.record(
            "Dispatch",
            &[
                ("response", &response),
                ("needs_clarification", &needs_clarification.to_string()),
            ],
        );
        record
    }

    /// Phases two through four plus persistence.
    async fn generate(
        &self,
        request: &str,
        sources: &SourceBundle,
        dispatch: DispatchRecord,
        log: &mut WorkflowLog,
    ) -> PipelineResult {
        let doc_type = dispatch
            .document_type
            .as_deref()
            .map_or(DocType::Generic, DocType::normalize);
        let analysis = dispatch.analysis.as_deref().unwrap_or_default();

        let (requirements, code_analysis, researched) = self.research(request, sources, log).await;
        let draft = self
            .synthesize(request, analysis, &requirements, &code_analysis, log)
            .await;
        let document = self.review(&draft, log).await;
        let (output_path, write_error) = self.persist(&document, doc_type, log).await;

        if self.write_workflow_log {
            self.save_log(log).await;
        }

        let mut workflow = vec![
            AgentRole::Dispatcher.name().to_owned(),
            AgentRole::Analyst.name().to_owned(),
        ];
        if researched {
            workflow.push(AgentRole::Researcher.name().to_owned());
        }
        workflow.extend([
            AgentRole::Writer.name().to_owned(),
            AgentRole::Security.name().to_owned(),
            AgentRole::Editor.name().to_owned(),
        ]);

        PipelineResult {
            document,
            document_type: doc_type,
            workflow,
            output_path,
            write_error,
            dispatch,
            quality: None,
            critique_rounds: 0,
        }
    }

    /// Phase two: requirement analysis and, when code was provided, code
    /// research, run concurrently.
    async fn research(
        &self,
        request: &str,
        sources: &SourceBundle,
        log: &mut WorkflowLog,
    ) -> (String, String, bool) {
        let analyst_task = format!("Extract and structure requirements from:\n{request}");

        if sources.is_empty() {
            let requirements = self.crew.run(AgentRole::Analyst, &analyst_task).await;
            let code_analysis = "No code provided for analysis".to_owned();
            log.record(
                "Parallel Research",
                &[
                    ("requirements", &requirements),
                    ("code_analysis", &code_analysis),
                ],
            );
            return (requirements, code_analysis, false);
        }

        let summary = sources.summary();
        let researcher_task = format!(
            "Analyze code for documentation:\nRequest: {request}\n\n{summary}"
        );
        let fitted = self.budget.fit(&researcher_task);
        let (requirements, code_analysis) = tokio::join!(
            self.crew.run(AgentRole::Analyst, &analyst_task),
            self.crew.run(AgentRole::Researcher, &fitted),
        );
        log.record(
            "Parallel Research",
            &[
                ("requirements", &requirements),
                ("code_analysis", &code_analysis),
            ],
        );
        (requirements, code_analysis, true)
    }

    /// Phase three: synthesize the draft from every research strand.
    async fn synthesize(
        &self,
        request: &str,
        analysis: &str,
        requirements: &str,
        code_analysis: &str,
        log: &mut WorkflowLog,
    ) -> String {
        let task = format!(
            "Generate comprehensive documentation based on:\n\n\
             === USER REQUEST ===\n{request}\n\n\
             === DISPATCH ANALYSIS ===\n{analysis}\n\n\
             === REQUIREMENTS (from Analyst) ===\n{requirements}\n\n\
             === CODE ANALYSIS (from Researcher) ===\n{code_analysis}\n\n\
             Generate complete, well-structured documentation in Markdown format."
        );
        let fitted = self.budget.fit(&task);
        let draft = self.crew.run(AgentRole::Writer, &fitted).await;
        log.record("Document Generation", &[("draft", &draft)]);
        draft
    }

    /// Phase four: security review of the draft head, then an editor
    /// pass over the full draft with the findings attached.
    ///
    /// The editor's output is the final document, whatever it says.
    async fn review(&self, draft: &str, log: &mut WorkflowLog) -> String {
        if contains_security_keywords(draft) {
            log.record(
                "Security Gate",
                &[("keyword_scan", "draft mentions security-relevant terms")],
            );
        }

        let preview = clip_chars(draft, self.review_prefix_chars);
        let security_task = format!(
            "Review this document for security and compliance issues:\n\n{preview}\n\n\
             Provide:\n\
             1. Security concerns found\n\
             2. Compliance requirements\n\
             3. Recommended changes"
        );
        let findings = self.crew.run(AgentRole::Security, &security_task).await;
        log.record("Security Review", &[("findings", &findings)]);

        let editor_task = format!(
            "Polish and format this documentation:\n\n{draft}\n\n\
             Security Feedback:\n{findings}\n\n\
             Apply professional formatting, fix any issues, and ensure consistency."
        );
        let fitted = self.budget.fit(&editor_task);
        let document = self.crew.run(AgentRole::Editor, &fitted).await;
        log.record("Editor Polish", &[("document", &document)]);
        document
    }

    /// Writes the document, returning the path on success or a
    /// description of the failure. A failed write never fails the run;
    /// the document is still in the result.
    async fn persist(
        &self,
        document: &str,
        doc_type: DocType,
        log: &mut WorkflowLog,
    ) -> (Option<PathBuf>, Option<String>) {
        let path = self.output_override.clone().unwrap_or_else(|| {
            let timestamp = Local::now().format("%Y%m%d_%H%M%S");
            self.output_dir
                .join(format!("{}_{timestamp}.md", doc_type.tag()))
        });

        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty())
            && let Err(error) = fs::create_dir_all(parent).await
        {
            let message = format!("Error writing document: {error}");
            tracing::warn!("{message}");
            return (None, Some(message));
        }

        match fs::write(&path, document).await {
            Ok(()) => {
                tracing::info!("Document saved to {}", path.display());
                log.record("Document Saved", &[("path", &path.display().to_string())]);
                (Some(path), None)
            }
            Err(error) => {
                let message = format!("Error writing document: {error}");
                tracing::warn!("{message}");
                (None, Some(message))
            }
        }
    }

    /// Writes the workflow log next to the documents. Failures are
    /// logged and swallowed.
    async fn save_log(&self, log: &WorkflowLog) {
        if let Err(error) = fs::create_dir_all(&self.output_dir).await {
            tracing::warn!("Could not create log directory: {error}");
            return;
        }

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = self.output_dir.join(format!("workflow_log_{timestamp}.txt"));
        match fs::write(&path, log.render()).await {
            Ok(()) => tracing::info!("Workflow log saved to {}", path.display()),
            Err(error) => tracing::warn!("Could not write workflow log: {error}"),
        }
    }
}

/// Whether the draft touches any security-relevant topic.
fn contains_security_keywords(text: &str) -> bool {
    let lowered = text.to_lowercase();
    SECURITY_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}

/// Truthiness of the dispatcher's clarification flag. Accepts JSON
/// booleans plus the quoted forms models sometimes emit.
fn clarification_flag(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => matches!(text.trim().to_lowercase().as_str(), "true" | "yes"),
        _ => false,
    }
}

/// Non-empty trimmed text of a field value.
fn field_text(value: &Value) -> Option<String> {
    let text = parser::value_text(value);
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// First entry of the document type field, which may be a list.
fn document_type_text(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.first().and_then(field_text),
        other => field_text(other),
    }
}

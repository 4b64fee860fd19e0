//! Argument handling and pipeline wiring for the `scribe` binary

use anyhow::{Context as _, Result, bail};
use scribe_core::{PipelineOutcome, ScribeConfig};
use scribe_pipeline::{
    AgentCrew, ClarificationEngine, PipelineCoordinator, SelfCritiqueLoop, SourceBundle,
};
use scribe_providers::OpenAiRunner;
use std::io;
use std::sync::Arc;
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

use crate::cli::Cli;
use crate::interactive;

/// Initialize tracing with output on stderr so stdout stays reserved
/// for the document itself.
fn init_tracing(quiet: bool) {
    let default_filter = if quiet {
        "warn"
    } else {
        "scribe_core=info,scribe_pipeline=info,scribe_providers=info,scribe_cli=info"
    };

    Registry::default()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .init();
}

/// Load configuration from the explicit path if one was given, otherwise
/// from the default location with a fallback to built-in defaults.
fn load_config(cli: &Cli) -> Result<ScribeConfig> {
    match &cli.config {
        Some(path) => ScribeConfig::load_from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => Ok(ScribeConfig::load_or_create().unwrap_or_else(|error| {
            tracing::warn!("failed to load configuration: {error}");
            tracing::warn!("using built-in defaults");
            ScribeConfig::default()
        })),
    }
}

/// Prefixes the request with an explicit document type hint so the
/// dispatcher picks it up without guessing.
fn effective_request(request: &str, doc_type: Option<&str>) -> String {
    match doc_type {
        Some(tag) => format!("Generate a {} document: {request}", tag.to_uppercase()),
        None => request.to_owned(),
    }
}

/// Gather source material named on the command line, if any.
async fn collect_sources(cli: &Cli, config: &ScribeConfig) -> Result<SourceBundle> {
    let bundle = if let Some(dir) = &cli.code_dir {
        if !cli.files.is_empty() {
            tracing::warn!("--files is ignored when --code-dir is given");
        }
        SourceBundle::collect_dir(dir, &config.limits).await?
    } else if cli.files.is_empty() {
        return Ok(SourceBundle::default());
    } else {
        SourceBundle::collect_files(&cli.files, &config.limits).await
    };

    if !bundle.is_empty() {
        tracing::info!("collected {}", bundle.summary());
    }
    for skipped in bundle.skipped() {
        tracing::warn!("skipped source: {skipped}");
    }

    Ok(bundle)
}

/// Run one generation end to end: dispatch, optional clarification
/// dialogue, generation, and the final report.
///
/// # Errors
/// Returns an error for unusable arguments, unreadable configuration, a
/// missing API key, or an unreadable code directory. Provider failures
/// during generation degrade into error text inside the document
/// instead of aborting.
pub async fn handle_generate(cli: Cli) -> Result<()> {
    init_tracing(cli.quiet);

    let issues = cli.validate();
    if !issues.is_empty() {
        bail!("invalid arguments:\n  {}", issues.join("\n  "));
    }

    let config = load_config(&cli)?;
    config.validate().context(
        "configuration is incomplete; set the environment variable named by \
         [provider].api_key_env or add api_key to config.toml",
    )?;

    let sources = collect_sources(&cli, &config).await?;
    let request = effective_request(&cli.request, cli.doc_type.as_deref());

    let runner = OpenAiRunner::from_config(&config)?;
    let crew = AgentCrew::new(Arc::new(runner));
    let mut coordinator = PipelineCoordinator::new(crew.clone(), &config);
    if let Some(output) = &cli.output {
        coordinator = coordinator.with_output_override(output.clone());
    }
    let pipeline = SelfCritiqueLoop::new(coordinator, crew.clone(), &config);

    let result = match pipeline.generate(&request, &sources).await {
        PipelineOutcome::Completed(result) => *result,
        PipelineOutcome::NeedsClarification { dispatch } => {
            let engine =
                ClarificationEngine::new(crew, pipeline, &request, &dispatch, sources, &config);
            interactive::run_dialogue(engine).await?
        }
    };

    interactive::report(&result, cli.quiet, cli.full_preview);

    Ok(())
}

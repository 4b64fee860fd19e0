//! Interactive clarification dialogue and result reporting

use anyhow::Result;
use scribe_core::PipelineResult;
use scribe_pipeline::budget;
use scribe_pipeline::{ClarificationEngine, EngineStep};
use std::io::{self, BufRead as _, Write as _};

/// Characters shown in the default document preview.
const PREVIEW_CHARS: usize = 500;

/// Answers that force generation with whatever is known so far.
const PROCEED_WORDS: [&str; 3] = ["proceed", "continue", "skip"];

/// Whether an answer asks to stop the dialogue and generate now.
fn is_proceed(response: &str) -> bool {
    PROCEED_WORDS.contains(&response.to_lowercase().as_str())
}

/// Run the question loop on stdin until the engine produces a document.
///
/// # Errors
/// Returns an error only when stdin or stdout fails; the engine itself
/// always terminates with a document.
pub async fn run_dialogue(mut engine: ClarificationEngine) -> Result<PipelineResult> {
    announce_dialogue();

    let mut step = engine.begin().await;
    loop {
        match step {
            EngineStep::Finished(result) => return Ok(*result),
            EngineStep::Questions(questions) => {
                print_questions(&questions, engine.state().round(), engine.state().max_rounds());
                let response = read_response()?;
                step = if is_proceed(&response) {
                    engine.force_proceed().await
                } else {
                    engine.answer(&response).await
                };
            }
        }
    }
}

#[allow(clippy::print_stdout, reason = "User-facing dialogue output")]
fn announce_dialogue() {
    println!("\nThe request needs clarification before generation.");
}

#[allow(clippy::print_stdout, reason = "User-facing dialogue output")]
fn print_questions(questions: &[String], round: u32, max_rounds: u32) {
    println!("\nQuestions (round {round} of {max_rounds}):");
    for (index, question) in questions.iter().enumerate() {
        println!("  {}. {question}", index + 1);
    }
}

/// Read one non-empty line from stdin. EOF behaves like "proceed".
#[allow(clippy::print_stdout, reason = "User-facing dialogue output")]
fn read_response() -> Result<String> {
    let stdin = io::stdin();
    loop {
        print!("\nYour response (or 'proceed' to continue with defaults): ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok("proceed".to_owned());
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            println!("Please answer or type 'proceed' to continue.");
            continue;
        }
        return Ok(trimmed.to_owned());
    }
}

/// Print the generation summary and a document preview.
#[allow(clippy::print_stdout, reason = "Final result output")]
pub fn report(result: &PipelineResult, quiet: bool, full_preview: bool) {
    if quiet {
        if let Some(path) = &result.output_path {
            println!("{}", path.display());
        }
        return;
    }

    println!("\nDocumentation generation complete");
    println!("  document type: {}", result.document_type);
    println!("  workflow:      {}", result.workflow.join(" -> "));
    match &result.output_path {
        Some(path) => println!("  output path:   {}", path.display()),
        None => println!("  output path:   (not persisted)"),
    }
    if let Some(error) = &result.write_error {
        println!("  write error:   {error}");
    }
    if result.critique_rounds > 0 {
        println!("  critique:      {} revision round(s)", result.critique_rounds);
    }
    if let Some(quality) = &result.quality {
        println!(
            "  quality:       {} ({} words, completeness {:.2})",
            quality.confidence, quality.word_count, quality.completeness_score
        );
        for issue in &quality.issues {
            println!("    - {issue}");
        }
    }

    print_preview(&result.document, full_preview);
}

#[allow(clippy::print_stdout, reason = "Final result output")]
fn print_preview(document: &str, full_preview: bool) {
    if full_preview || document.chars().count() <= PREVIEW_CHARS {
        println!("\n{document}");
        return;
    }
    println!("\n{}", budget::clip_chars(document, PREVIEW_CHARS));
    println!("... (truncated, pass --full-preview for the whole document)");
}

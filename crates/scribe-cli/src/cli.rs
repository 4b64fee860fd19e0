//! Command-line argument definitions and validation

use clap::Parser;
use std::path::PathBuf;

/// Multi-agent documentation generator.
#[derive(Parser, Debug)]
#[command(
    name = "scribe",
    version,
    about = "Generates reviewed technical documents from a request and optional source code",
    after_help = "Examples:\n  \
        scribe --request \"Create a BRD for an online bookstore\"\n  \
        scribe --request \"Generate FRD\" --code-dir ./my-project\n  \
        scribe --request \"Document this API\" --files api.py routes.py"
)]
pub struct Cli {
    /// Documentation request or prompt
    #[arg(short = 'r', long)]
    pub request: String,

    /// Directory containing source code to analyze
    #[arg(short = 'c', long, value_name = "DIR")]
    pub code_dir: Option<PathBuf>,

    /// Specific source files to analyze
    #[arg(short = 'f', long, value_name = "FILE", num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// Document type hint (BRD, FRD, NFRD, CLOUD, SECURITY, API); auto-detected when omitted
    #[arg(short = 't', long, value_name = "TYPE")]
    pub doc_type: Option<String>,

    /// Custom output file path
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Quiet mode, only errors and the final result
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Print the full document instead of a 500 character preview
    #[arg(long)]
    pub full_preview: bool,

    /// Load configuration from this file instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Checks that every path argument points at something usable.
    ///
    /// Returns one message per problem; an empty list means the
    /// arguments are fine.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for file in &self.files {
            if !file.exists() {
                issues.push(format!("file not found: {}", file.display()));
            }
        }

        if let Some(dir) = &self.code_dir {
            if !dir.exists() {
                issues.push(format!("code directory not found: {}", dir.display()));
            } else if !dir.is_dir() {
                issues.push(format!("code path is not a directory: {}", dir.display()));
            }
        }

        if let Some(output) = &self.output {
            if output.is_dir() {
                issues.push(format!("output path is a directory: {}", output.display()));
            } else if let Some(parent) = output.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                issues.push(format!("output directory does not exist: {}", parent.display()));
            }
        }

        issues
    }
}

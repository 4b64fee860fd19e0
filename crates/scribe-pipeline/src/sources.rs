//! Source code collection for the research phase.
//!
//! Gathers code from a directory walk or an explicit file list under
//! size limits, then renders a markdown summary the code researcher can
//! digest. Unreadable files degrade into in-band marker entries rather
//! than failing the collection.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use futures::future::join_all;
use scribe_core::{Error, LimitsConfig, Result};
use tokio::fs;
use walkdir::WalkDir;

use crate::budget::clip_chars;

/// Extensions treated as source code.
const SOURCE_EXTENSIONS: [&str; 10] = ["py", "java", "js", "ts", "cs", "cpp", "c", "h", "go", "rs"];

/// Lines of each file shown in the code summary.
const MAX_SUMMARY_LINES: usize = 100;

/// Marker content for files that are not valid UTF-8.
const BINARY_MARKER: &str = "[Binary file - skipped]";

/// One collected source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the collection root, or as given by the caller.
    pub path: String,
    /// File content, or an in-band marker for unreadable files.
    pub content: String,
}

/// Source files gathered for code analysis.
#[derive(Debug, Clone, Default)]
pub struct SourceBundle {
    files: Vec<SourceFile>,
    skipped: Vec<String>,
    total_bytes: u64,
}

impl SourceBundle {
    /// Walks `dir` and collects every source file under the limits.
    ///
    /// Files are visited in name order and read sequentially so the
    /// running total is applied deterministically. Oversized files and
    /// files past the total budget land in the skipped list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileNotFound`] when `dir` does not exist or is
    /// not a directory.
    pub async fn collect_dir(dir: &Path, limits: &LimitsConfig) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::FileNotFound(dir.display().to_string()));
        }

        let mut bundle = Self::default();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let Ok(entry) = entry else {
                continue;
            };
            if !entry.file_type().is_file() || !is_source_file(entry.path()) {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };

            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !bundle.admit(&file_name, metadata.len(), limits) {
                continue;
            }

            let display_path = entry
                .path()
                .strip_prefix(dir)
                .unwrap_or(entry.path())
                .display()
                .to_string();
            bundle
                .push_read(display_path, entry.path(), metadata.len())
                .await;
        }

        tracing::debug!(
            "Collected {} source files ({} bytes) from {}",
            bundle.files.len(),
            bundle.total_bytes,
            dir.display()
        );
        Ok(bundle)
    }

    /// Collects an explicit list of files under the same limits.
    ///
    /// Reads run concurrently; results keep the caller's order and the
    /// size caps are applied in that order.
    pub async fn collect_files(paths: &[PathBuf], limits: &LimitsConfig) -> Self {
        let reads = paths.iter().map(|path| async move {
            let outcome = fs::read(path).await;
            (path, outcome)
        });
        let results = join_all(reads).await;

        let mut bundle = Self::default();
        for (path, outcome) in results {
            let display_path = path.display().to_string();
            let file_name = path.file_name().map_or_else(
                || display_path.clone(),
                |name| name.to_string_lossy().into_owned(),
            );

            match outcome {
                Ok(bytes) => {
                    let size = bytes.len() as u64;
                    if !bundle.admit(&file_name, size, limits) {
                        continue;
                    }
                    bundle.push_bytes(display_path, bytes, size);
                }
                Err(error) => bundle.files.push(SourceFile {
                    path: display_path,
                    content: format!("Error reading file: {error}"),
                }),
            }
        }
        bundle
    }

    /// Collected files, in collection order.
    #[must_use]
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Skip notices for files excluded by the size limits.
    #[must_use]
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Total bytes of content read.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Whether no file content was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Markdown summary of the collected code for the research prompt.
    ///
    /// Each file contributes a heading, its line count, and a fenced
    /// excerpt capped at [`MAX_SUMMARY_LINES`] lines. Failed reads are
    /// left out; skip notices are appended at the end.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::from("# Code Repository Summary\n");
        out.push_str(&format!("Total files: {}\n", self.files.len()));

        for file in &self.files {
            if clip_chars(&file.content, 50).contains("Error") {
                continue;
            }

            out.push_str(&format!("\n## File: {}\n", file.path));
            let lines: Vec<&str> = file.content.lines().collect();
            out.push_str(&format!("Lines: {}\n", lines.len()));

            let shown = if lines.len() > MAX_SUMMARY_LINES {
                out.push_str(&format!("(Showing first {MAX_SUMMARY_LINES} lines)\n"));
                &lines[..MAX_SUMMARY_LINES]
            } else {
                &lines[..]
            };

            out.push_str(&format!("```{}\n", language_tag(&file.path)));
            for line in shown {
                out.push_str(line);
                out.push('\n');
            }
            out.push_str("```\n");
        }

        if !self.skipped.is_empty() {
            out.push_str("\nFiles skipped due to size limits:\n");
            for notice in &self.skipped {
                out.push_str(notice);
                out.push('\n');
            }
            out.push_str(&format!(
                "\nTotal size read: {:.2} MB\n",
                self.total_bytes as f64 / 1024.0 / 1024.0
            ));
        }

        out
    }

    /// Applies the size caps, recording a skip notice on rejection.
    fn admit(&mut self, file_name: &str, size: u64, limits: &LimitsConfig) -> bool {
        if size > limits.max_file_bytes {
            let megabytes = size as f64 / 1024.0 / 1024.0;
            self.skipped
                .push(format!("{file_name} (too large: {megabytes:.2} MB)"));
            return false;
        }
        if self.total_bytes + size > limits.max_total_bytes {
            self.skipped
                .push(format!("{file_name} (total size limit reached)"));
            return false;
        }
        true
    }

    /// Reads one admitted file, storing markers for unreadable content.
    async fn push_read(&mut self, display_path: String, path: &Path, size: u64) {
        match fs::read(path).await {
            Ok(bytes) => self.push_bytes(display_path, bytes, size),
            Err(error) => self.files.push(SourceFile {
                path: display_path,
                content: format!("Error reading file: {error}"),
            }),
        }
    }

    /// Stores decoded content, or the binary marker for non-UTF-8 data.
    fn push_bytes(&mut self, display_path: String, bytes: Vec<u8>, size: u64) {
        match String::from_utf8(bytes) {
            Ok(content) => {
                self.total_bytes += size;
                self.files.push(SourceFile {
                    path: display_path,
                    content,
                });
            }
            Err(_) => self.files.push(SourceFile {
                path: display_path,
                content: BINARY_MARKER.to_owned(),
            }),
        }
    }
}

/// Whether the path carries a recognized source extension.
fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|extension| SOURCE_EXTENSIONS.contains(&extension))
}

/// Fence language tag for a file path, empty when unknown.
fn language_tag(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .and_then(OsStr::to_str)
        .unwrap_or_default();
    match extension {
        "py" => "python",
        "js" => "javascript",
        "ts" => "typescript",
        "java" => "java",
        "cpp" => "cpp",
        "c" => "c",
        "go" => "go",
        "rs" => "rust",
        _ => "",
    }
}

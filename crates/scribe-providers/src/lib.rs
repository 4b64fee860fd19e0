//! Text generation backends for the scribe pipeline.
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

/// Mock runner for tests.
pub mod mock;
/// `OpenAI`-compatible chat-completions backend.
pub mod openai;

pub use mock::MockRunner;
pub use openai::OpenAiRunner;

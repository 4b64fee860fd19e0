use async_trait::async_trait;

use crate::{Completion, Prompt, Result};

/// Trait for text generation backends that can answer role prompts.
///
/// Implementations wrap a hosted model, a local daemon, or a test double.
/// Callers above the agent boundary never see these errors directly; the
/// crew layer converts failures into in-band error text.
#[async_trait]
pub trait TextRunner: Send + Sync {
    /// Returns the unique identifier for this runner.
    fn name(&self) -> &'static str;

    /// Checks whether this runner is currently able to serve requests.
    async fn is_available(&self) -> bool;

    /// Generates a completion for the given prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unavailable, the request fails,
    /// or the response cannot be parsed.
    async fn run(&self, prompt: &Prompt) -> Result<Completion>;
}

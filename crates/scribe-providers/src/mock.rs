//! Mock runner for exercising pipeline flows without a real endpoint.
//!
//! Canned responses are keyed by prompt-text patterns, which lets tests
//! drive whole clarification and generation flows deterministically.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use scribe_core::{Completion, Error, IgnoreLock as _, Prompt, Result, TextRunner, TokenUsage};

/// Response storage type
type ResponseMap = Arc<Mutex<HashMap<String, String>>>;

/// Runner that returns pre-defined responses based on prompt patterns.
///
/// Matching is attempted against the prompt text: exact match first, then
/// the first pattern contained in the text.
#[derive(Clone)]
pub struct MockRunner {
    /// Name reported in completions.
    name: String,
    /// Predefined responses keyed by prompt-text pattern.
    responses: ResponseMap,
    /// Default response if no pattern matches.
    default_response: Arc<Mutex<Option<String>>>,
    /// Prompt texts seen, for verification.
    call_history: Arc<Mutex<Vec<String>>>,
    /// When set, every call fails with this message.
    failure: Arc<Mutex<Option<String>>>,
}

impl MockRunner {
    /// Create a new mock runner with a given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: Arc::new(Mutex::new(HashMap::new())),
            default_response: Arc::new(Mutex::new(None)),
            call_history: Arc::new(Mutex::new(Vec::new())),
            failure: Arc::new(Mutex::new(None)),
        }
    }

    /// Add a pattern-based response.
    #[must_use]
    pub fn with_response(self, pattern: impl Into<String>, response: impl Into<String>) -> Self {
        {
            let mut responses = self.responses.lock_ignore_poison();
            responses.insert(pattern.into(), response.into());
        }
        self
    }

    /// Set a default response for prompts that match no pattern.
    #[must_use]
    pub fn with_default_response(self, response: impl Into<String>) -> Self {
        {
            let mut default = self.default_response.lock_ignore_poison();
            *default = Some(response.into());
        }
        self
    }

    /// Make every subsequent call fail with the given message.
    #[must_use]
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        {
            let mut failure = self.failure.lock_ignore_poison();
            *failure = Some(message.into());
        }
        self
    }

    /// Clear the call history.
    pub fn clear_history(&self) {
        let mut history = self.call_history.lock_ignore_poison();
        history.clear();
    }

    /// Get the call history (all prompt texts seen, in order).
    #[must_use]
    pub fn get_call_history(&self) -> Vec<String> {
        let history = self.call_history.lock_ignore_poison();
        history.clone()
    }

    /// Get the number of calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        let history = self.call_history.lock_ignore_poison();
        history.len()
    }

    /// Find a matching response for the given prompt text.
    fn find_response(&self, prompt_text: &str) -> Option<String> {
        let responses = self.responses.lock_ignore_poison();

        // Try exact match first
        if let Some(response) = responses.get(prompt_text) {
            let result = response.clone();
            drop(responses);
            return Some(result);
        }

        // Try substring match
        for (pattern, response) in &*responses {
            if prompt_text.contains(pattern) {
                let result = response.clone();
                drop(responses);
                return Some(result);
            }
        }

        drop(responses);
        None
    }
}

#[async_trait]
impl TextRunner for MockRunner {
    fn name(&self) -> &'static str {
        // Lifetime constraints prevent returning the configured name here.
        "mock"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn run(&self, prompt: &Prompt) -> Result<Completion> {
        {
            let mut history = self.call_history.lock_ignore_poison();
            history.push(prompt.text.clone());
        }

        {
            let failure = self.failure.lock_ignore_poison();
            if let Some(message) = failure.as_ref() {
                return Err(Error::Provider(message.clone()));
            }
        }

        let text = self.find_response(&prompt.text).unwrap_or_else(|| {
            let default = self.default_response.lock_ignore_poison();
            default
                .clone()
                .unwrap_or_else(|| format!("Mock response for prompt: {}", prompt.text))
        });

        Ok(Completion {
            text,
            tokens_used: TokenUsage {
                input: prompt.text.len() as u64,
                output: 0,
            },
            provider: self.name.clone(),
            latency_ms: 0,
        })
    }
}

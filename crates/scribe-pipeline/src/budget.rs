//! Token budgeting for prompt assembly.
//!
//! Backends reject oversized prompts, so phase inputs are estimated and
//! truncated before dispatch. Estimates use the rough four-characters-
//! per-token approximation; truncation keeps the head and tail of the
//! text and drops the middle, since requests and code summaries carry
//! most of their signal at the edges.

use std::borrow::Cow;

/// Approximate characters per token.
const CHARS_PER_TOKEN: usize = 4;

/// Rough token estimate, assuming four characters per token.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / CHARS_PER_TOKEN
}

/// Returns the longest prefix of `text` holding at most `max_chars`
/// characters, cut on a character boundary.
#[must_use]
pub fn clip_chars(text: &str, max_chars: usize) -> &str {
    text.char_indices()
        .nth(max_chars)
        .map_or(text, |(boundary, _)| &text[..boundary])
}

/// Input budget derived from the backend's completion limit.
///
/// 30% of the limit is reserved for the response, leaving 70% for the
/// assembled prompt.
#[derive(Debug, Clone, Copy)]
pub struct TokenBudget {
    /// Tokens available for prompt input.
    max_input_tokens: usize,
}

impl TokenBudget {
    /// Creates a budget from the backend's `max_tokens` setting.
    pub fn new(max_tokens: usize) -> Self {
        Self {
            max_input_tokens: max_tokens * 7 / 10,
        }
    }

    /// Tokens available for prompt input.
    #[must_use]
    pub fn max_input_tokens(self) -> usize {
        self.max_input_tokens
    }

    /// Fits `text` into the input budget.
    ///
    /// Text within budget is returned borrowed; oversized text is
    /// truncated from the middle with an omission marker.
    #[must_use]
    pub fn fit<'text>(self, text: &'text str) -> Cow<'text, str> {
        let estimated = estimate_tokens(text);
        if estimated <= self.max_input_tokens {
            return Cow::Borrowed(text);
        }

        tracing::warn!(
            "Content size (~{estimated} tokens) exceeds input budget ({} tokens), truncating",
            self.max_input_tokens
        );
        let max_chars = self.max_input_tokens * CHARS_PER_TOKEN;
        Cow::Owned(truncate_middle(text, max_chars))
    }
}

/// Keeps 70% of the allowance from the start and 30% from the end,
/// marking the omitted span in between.
fn truncate_middle(text: &str, max_chars: usize) -> String {
    let total_chars = text.chars().count();
    if total_chars <= max_chars {
        return text.to_owned();
    }

    let keep_start = max_chars * 7 / 10;
    let keep_end = max_chars - keep_start;
    let head = clip_chars(text, keep_start);
    let tail_start = total_chars - keep_end;
    let tail = text
        .char_indices()
        .nth(tail_start)
        .map_or("", |(boundary, _)| &text[boundary..]);
    let omitted = total_chars - max_chars;

    format!(
        "{head}\n\n... [Content truncated for token limit: {omitted} chars omitted] ...\n\n{tail}"
    )
}

//! State accumulated across a clarification dialogue.
//!
//! Each conversation tracks the original request, facts gathered from
//! user answers, the question/answer history, and the bookkeeping the
//! readiness ladder needs: round counts, empty-response counts, and the
//! current confidence score.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::budget::clip_chars;

/// Most questions asked per round.
const MAX_QUESTIONS: usize = 3;

/// Exchanges included in the rolling context summary.
const SUMMARY_EXCHANGES: usize = 3;

/// Characters of each question and answer shown in the summary.
const SUMMARY_CLIP: usize = 100;

/// Unique identifier for a clarification conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationId(Uuid);

impl ConversationId {
    /// Creates a new random conversation ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One question/answer turn in the dialogue.
#[derive(Debug, Clone)]
pub struct Exchange {
    /// Agent that asked the question.
    pub agent: String,
    /// Question text, possibly several questions joined with `;`.
    pub question: String,
    /// The user's answer.
    pub answer: String,
    /// When the answer was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Accumulated state of one clarification dialogue.
#[derive(Debug, Clone)]
pub struct ConversationState {
    id: ConversationId,
    original_request: String,
    facts: BTreeMap<String, String>,
    history: Vec<Exchange>,
    round: u32,
    max_rounds: u32,
    empty_responses: u32,
    confidence: f64,
    last_questions: Vec<String>,
}

impl ConversationState {
    /// Starts a conversation around the given request.
    pub fn new<T: Into<String>>(original_request: T, max_rounds: u32) -> Self {
        Self {
            id: ConversationId::new(),
            original_request: original_request.into(),
            facts: BTreeMap::new(),
            history: Vec::new(),
            round: 0,
            max_rounds,
            empty_responses: 0,
            confidence: 0.0,
            last_questions: Vec::new(),
        }
    }

    /// Conversation identifier.
    #[must_use]
    pub fn id(&self) -> ConversationId {
        self.id
    }

    /// The request the dialogue started from.
    #[must_use]
    pub fn original_request(&self) -> &str {
        &self.original_request
    }

    /// Completed question rounds.
    #[must_use]
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Round limit for this conversation.
    #[must_use]
    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Current confidence score in `0.0..=1.0`.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Facts gathered so far, keyed by name.
    #[must_use]
    pub fn facts(&self) -> &BTreeMap<String, String> {
        &self.facts
    }

    /// Number of gathered facts.
    #[must_use]
    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    /// Question/answer history, oldest first.
    #[must_use]
    pub fn history(&self) -> &[Exchange] {
        &self.history
    }

    /// Questions asked in the most recent round.
    #[must_use]
    pub fn last_questions(&self) -> &[String] {
        &self.last_questions
    }

    /// Unanswered questions recorded in this round.
    #[must_use]
    pub fn empty_responses(&self) -> u32 {
        self.empty_responses
    }

    /// Advances to the next question round.
    pub fn increment_round(&mut self) {
        self.round += 1;
    }

    /// Marks the round budget as spent, forcing the ladder to proceed.
    pub fn exhaust_rounds(&mut self) {
        self.round = self.max_rounds;
    }

    /// Counts one unhelpful or empty answer.
    pub fn record_empty_response(&mut self) {
        self.empty_responses += 1;
    }

    /// Clears the unhelpful-answer streak after a substantive answer.
    pub fn reset_empty_responses(&mut self) {
        self.empty_responses = 0;
    }

    /// Stores a fact, rejecting blank keys and values.
    ///
    /// Returns whether the fact was stored. Keys and values are
    /// trimmed first; re-setting a key overwrites the old value.
    pub fn set_fact(&mut self, key: &str, value: &str) -> bool {
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() || value.is_empty() {
            return false;
        }
        self.facts.insert(key.to_owned(), value.to_owned());
        true
    }

    /// Updates the confidence score, clamped to `0.0..=1.0`.
    pub fn set_confidence(&mut self, confidence: f64) {
        self.confidence = confidence.clamp(0.0, 1.0);
    }

    /// Records the questions being asked this round, capped at three.
    pub fn set_last_questions(&mut self, mut questions: Vec<String>) {
        questions.truncate(MAX_QUESTIONS);
        self.last_questions = questions;
    }

    /// Appends a completed exchange to the history.
    pub fn add_exchange(&mut self, agent: &str, question: &str, answer: &str) {
        self.history.push(Exchange {
            agent: agent.to_owned(),
            question: question.to_owned(),
            answer: answer.to_owned(),
            timestamp: Utc::now(),
        });
    }

    /// Rolling summary fed to the analysis prompt.
    ///
    /// Shows the original request, all gathered facts, and the last
    /// three exchanges with clipped question and answer text.
    #[must_use]
    pub fn context_summary(&self) -> String {
        let mut summary = format!("Original Request: {}\n\n", self.original_request);

        if !self.facts.is_empty() {
            summary.push_str("Gathered Information:\n");
            for (key, value) in &self.facts {
                summary.push_str(&format!("- {key}: {value}\n"));
            }
            summary.push('\n');
        }

        if !self.history.is_empty() {
            summary.push_str("Previous Exchanges:\n");
            let start = self.history.len().saturating_sub(SUMMARY_EXCHANGES);
            for (offset, exchange) in self.history[start..].iter().enumerate() {
                summary.push_str(&format!(
                    "{}. Q: {}...\n   A: {}...\n",
                    offset + 1,
                    clip_chars(&exchange.question, SUMMARY_CLIP),
                    clip_chars(&exchange.answer, SUMMARY_CLIP)
                ));
            }
        }

        summary
    }

    /// The original request enriched with everything learned since.
    ///
    /// This is what the generation pipeline receives once the dialogue
    /// ends, so facts and full exchanges are appended unclipped.
    #[must_use]
    pub fn enriched_request(&self) -> String {
        let mut enriched = self.original_request.clone();

        if !self.facts.is_empty() {
            enriched.push_str("\n\nAdditional Context:\n");
            for (key, value) in &self.facts {
                enriched.push_str(&format!("- {key}: {value}\n"));
            }
        }

        if !self.history.is_empty() {
            enriched.push_str("\n\nFrom our conversation:\n");
            for exchange in &self.history {
                enriched.push_str(&format!(
                    "Q: {}\nA: {}\n\n",
                    exchange.question, exchange.answer
                ));
            }
        }

        enriched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_starts_cold() {
        let state = ConversationState::new("Create docs", 3);
        assert_eq!(state.round(), 0);
        assert_eq!(state.fact_count(), 0);
        assert!(state.confidence().abs() < f64::EPSILON);
        assert!(state.history().is_empty());
    }

    #[test]
    fn blank_facts_are_rejected() {
        let mut state = ConversationState::new("Create docs", 3);
        assert!(!state.set_fact("domain", ""));
        assert!(!state.set_fact("domain", "   \t"));
        assert!(!state.set_fact("", "e-commerce"));
        assert_eq!(state.fact_count(), 0);

        assert!(state.set_fact("domain", "  e-commerce  "));
        assert_eq!(state.facts().get("domain").map(String::as_str), Some("e-commerce"));
    }

    #[test]
    fn confidence_is_clamped() {
        let mut state = ConversationState::new("Create docs", 3);
        state.set_confidence(1.7);
        assert!((state.confidence() - 1.0).abs() < f64::EPSILON);
        state.set_confidence(-0.4);
        assert!(state.confidence().abs() < f64::EPSILON);
        state.set_confidence(0.55);
        assert!((state.confidence() - 0.55).abs() < f64::EPSILON);
    }

    #[test]
    fn question_list_is_capped_at_three() {
        let mut state = ConversationState::new("Create docs", 3);
        state.set_last_questions(vec![
            "one?".into(),
            "two?".into(),
            "three?".into(),
            "four?".into(),
        ]);
        assert_eq!(state.last_questions().len(), 3);
        assert_eq!(state.last_questions()[2], "three?");
    }

    #[test]
    fn exhausting_rounds_hits_the_limit() {
        let mut state = ConversationState::new("Create docs", 3);
        state.increment_round();
        assert_eq!(state.round(), 1);
        state.exhaust_rounds();
        assert_eq!(state.round(), state.max_rounds());
    }

    #[test]
    fn summary_windows_the_last_three_exchanges() {
        let mut state = ConversationState::new("Create docs", 3);
        assert!(state.set_fact("detected_domain", "trading"));
        for index in 1..=4 {
            state.add_exchange(
                "System",
                &format!("question {index}"),
                &format!("answer {index}"),
            );
        }

        let summary = state.context_summary();
        assert!(summary.starts_with("Original Request: Create docs"));
        assert!(summary.contains("Gathered Information:"));
        assert!(summary.contains("- detected_domain: trading"));
        assert!(summary.contains("Previous Exchanges:"));
        assert!(
            !summary.contains("question 1"),
            "Only the last three exchanges belong in the summary"
        );
        assert!(summary.contains("question 2"));
        assert!(summary.contains("question 4"));
    }

    #[test]
    fn enriched_request_carries_facts_and_full_history() {
        let mut state = ConversationState::new("Create docs", 3);
        assert!(state.set_fact("application_type", "web app"));
        state.add_exchange("System", "What domain?", "Online banking");

        let enriched = state.enriched_request();
        assert!(enriched.starts_with("Create docs"));
        assert!(enriched.contains("Additional Context:"));
        assert!(enriched.contains("- application_type: web app"));
        assert!(enriched.contains("From our conversation:"));
        assert!(enriched.contains("Q: What domain?\nA: Online banking"));
    }
}

//! Confidence scoring for the clarification dialogue.
//!
//! The score estimates how ready a conversation is for generation:
//! gathered facts push it up, stalled rounds and non-answers drag it
//! down. Scoring is pure; the engine decides what to do with the
//! number.

use crate::conversation::ConversationState;

/// Minimum stripped length for a fact to count.
const MIN_FACT_LEN: usize = 5;

/// Length above which a fact earns the detail bonus.
const DETAILED_FACT_LEN: usize = 50;

/// Numerator bonus for a detailed fact.
const DETAIL_BONUS: f64 = 0.3;

/// Weight of the information score in the final value.
const INFO_WEIGHT: f64 = 0.7;

/// Bonus per substantive exchange.
const EXCHANGE_BONUS: f64 = 0.1;

/// Cap on the total exchange bonus.
const EXCHANGE_BONUS_CAP: f64 = 0.25;

/// Answer length that makes an exchange substantive.
const SUBSTANTIVE_ANSWER_LEN: usize = 20;

/// Penalty per round past the second while no facts were gathered.
const STALL_PENALTY: f64 = 0.2;

/// Penalty per empty or unhelpful response.
const EMPTY_RESPONSE_PENALTY: f64 = 0.15;

/// Fact values that are really refusals to answer.
const NON_ANSWERS: [&str; 3] = ["none", "n/a", "unknown"];

/// Phrases that mark a short answer as disengaged.
const DISENGAGED_PHRASES: [&str; 8] = [
    "idk",
    "i don't know",
    "dunno",
    "skip",
    "pass",
    "whatever",
    "n/a",
    "none",
];

/// Answers at or above this length are never treated as disengaged.
const UNHELPFUL_MAX_LEN: usize = 20;

/// Scores the conversation's readiness for generation, in `0.0..=1.0`.
#[must_use]
pub fn score(state: &ConversationState) -> f64 {
    let mut numerator = 0.0;
    let mut denominator = 0.0;

    for value in state.facts().values() {
        let stripped = value.trim();
        if stripped.len() < MIN_FACT_LEN {
            continue;
        }
        let lower = stripped.to_lowercase();
        if NON_ANSWERS.contains(&lower.as_str()) {
            continue;
        }
        numerator += 1.0;
        denominator += 1.0;
        if stripped.len() > DETAILED_FACT_LEN {
            numerator += DETAIL_BONUS;
        }
    }

    let info_score = if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    };

    let substantive = state
        .history()
        .iter()
        .filter(|exchange| exchange.answer.trim().len() > SUBSTANTIVE_ANSWER_LEN)
        .count() as f64;
    let conversation_bonus = (EXCHANGE_BONUS * substantive).min(EXCHANGE_BONUS_CAP);

    let round_penalty = if state.facts().is_empty() {
        STALL_PENALTY * f64::from(state.round().saturating_sub(2))
    } else {
        0.0
    };

    let spam_penalty = EMPTY_RESPONSE_PENALTY * f64::from(state.empty_responses());

    let weighted = INFO_WEIGHT * info_score;
    let raw = weighted + conversation_bonus - round_penalty - spam_penalty;
    raw.clamp(0.0, 1.0)
}

/// Whether an answer reads as disengaged rather than informative.
///
/// Matching is substring-based, so it only applies to short answers; a
/// long answer that happens to contain "pass" is still informative.
#[must_use]
pub fn is_unhelpful(answer: &str) -> bool {
    let stripped = answer.trim();
    if stripped.len() >= UNHELPFUL_MAX_LEN {
        return false;
    }
    let lower = stripped.to_lowercase();
    DISENGAGED_PHRASES
        .iter()
        .any(|phrase| lower.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_conversation_scores_zero() {
        let state = ConversationState::new("Create docs", 3);
        assert!(score(&state).abs() < f64::EPSILON);
    }

    #[test]
    fn one_solid_fact_scores_the_info_weight() {
        let mut state = ConversationState::new("Create docs", 3);
        assert!(state.set_fact("application_type", "web application"));
        assert!((score(&state) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn refusal_facts_do_not_count() {
        let mut state = ConversationState::new("Create docs", 3);
        assert!(state.set_fact("technical_stack", "unknown"));
        assert!(state.set_fact("tiny", "api"));
        assert!(score(&state).abs() < f64::EPSILON);
    }

    #[test]
    fn detailed_facts_earn_a_bonus() {
        let mut state = ConversationState::new("Create docs", 3);
        let detail = "A multi-tenant trading platform with FIX connectivity and audit trails";
        assert!(state.set_fact("key_features", detail));
        assert!((score(&state) - 0.91).abs() < 1e-9);
    }

    #[test]
    fn exchange_bonus_is_capped() {
        let mut state = ConversationState::new("Create docs", 3);
        for index in 0..5 {
            state.add_exchange(
                "System",
                "What else?",
                &format!("A long and substantive answer number {index}"),
            );
        }
        assert!((score(&state) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn stalled_rounds_without_facts_are_penalized() {
        let mut state = ConversationState::new("Create docs", 5);
        state.increment_round();
        state.increment_round();
        state.increment_round();
        let stalled = score(&state);
        assert!(stalled.abs() < f64::EPSILON, "Clamp should floor at zero");
    }

    #[test]
    fn unhelpful_responses_drag_the_score_down() {
        let mut state = ConversationState::new("Create docs", 3);
        assert!(state.set_fact("application_type", "web application"));
        state.record_empty_response();
        state.record_empty_response();
        assert!((score(&state) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn extra_substantive_fact_never_lowers_the_score() {
        let mut base = ConversationState::new("Create docs", 3);
        assert!(base.set_fact("application_type", "web application"));
        let before = score(&base);

        let mut richer = base;
        assert!(richer.set_fact("detected_domain", "e-commerce storefront"));
        let after = score(&richer);

        assert!(
            after >= before,
            "Adding a fact lowered the score: {before} -> {after}"
        );
    }

    #[test]
    fn disengaged_answers_are_flagged() {
        assert!(is_unhelpful("idk"));
        assert!(is_unhelpful("  skip "));
        assert!(is_unhelpful("None"));
        assert!(!is_unhelpful("CRM"));
        assert!(!is_unhelpful(
            "The gateway passes each order through a validation queue"
        ));
    }
}

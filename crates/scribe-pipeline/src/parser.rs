//! Best-effort extraction of structured data from model output.
//!
//! Backends are asked for strict JSON but routinely wrap it in prose,
//! markdown fences, or trailing commentary. Extraction therefore works
//! through escalating strategies: whole-text parse, fenced block,
//! balanced-brace scan, and finally field-level salvage with regexes.
//! Extraction never fails; an empty map means nothing was recoverable.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

/// Matches a JSON object inside a markdown code fence.
static FENCED_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(r"(?is)```(?:json)?\s*(\{[^`]+\})\s*```") {
        Ok(regex) => regex,
        Err(err) => panic!("Fenced object pattern is invalid: {err}"),
    }
});

/// Matches a `needs_clarification` field and its truthiness.
static NEEDS_CLARIFICATION: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(r#"(?i)["']?needs_clarification["']?\s*:\s*["']?(true|yes|false|no)"#) {
        Ok(regex) => regex,
        Err(err) => panic!("Clarification pattern is invalid: {err}"),
    }
});

/// Matches a `document_type` field value.
static DOCUMENT_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(r#"(?i)["']?document_type["']?\s*:\s*\[?\s*["']?([A-Za-z_]+)"#) {
        Ok(regex) => regex,
        Err(err) => panic!("Document type pattern is invalid: {err}"),
    }
});

/// Matches a `workflow` field value.
static WORKFLOW: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(r#"(?i)["']?workflow["']?\s*:\s*["']?(\w+)"#) {
        Ok(regex) => regex,
        Err(err) => panic!("Workflow pattern is invalid: {err}"),
    }
});

/// Matches the bracketed body of a `priority_questions` array.
static PRIORITY_QUESTIONS: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(r#"(?is)["']?priority_questions["']?\s*:\s*\[(.*?)\]"#) {
        Ok(regex) => regex,
        Err(err) => panic!("Priority questions pattern is invalid: {err}"),
    }
});

/// Matches one quoted question inside an array body.
static QUESTION_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(r#"["']([^"']+\?)["']"#) {
        Ok(regex) => regex,
        Err(err) => panic!("Question item pattern is invalid: {err}"),
    }
});

/// Matches a quoted `analysis` field value.
static ANALYSIS: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(r#"(?i)["']?analysis["']?\s*:\s*["']([^"']+)["']"#) {
        Ok(regex) => regex,
        Err(err) => panic!("Analysis pattern is invalid: {err}"),
    }
});

/// Extracts a JSON object from raw model output.
///
/// Strategies are tried in order of fidelity: the whole text as JSON,
/// the first fenced code block, the first balanced `{...}` span, and
/// finally regex salvage of the routing fields. Returns an empty map
/// when nothing is recoverable.
#[must_use]
pub fn parse(raw: &str) -> Map<String, Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Map::new();
    }

    if let Some(map) = parse_object(trimmed) {
        return map;
    }
    if let Some(map) = parse_fenced(raw) {
        return map;
    }
    if let Some(map) = parse_embedded(raw) {
        return map;
    }
    salvage_fields(raw)
}

/// Renders an extracted map back into readable `key: value` lines.
///
/// Arrays are joined with commas; nested objects keep their compact
/// JSON form. Useful for feeding structured results back into prompts.
#[must_use]
pub fn parse_to_text(map: &Map<String, Value>) -> String {
    let mut out = String::new();
    for (key, value) in map {
        out.push_str(&format!("{key}: {}\n", value_text(value)));
    }
    out
}

/// Plain-text rendering of a single JSON value.
///
/// Strings lose their quotes, arrays join with commas, null becomes
/// empty; everything else keeps its JSON form.
#[must_use]
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_text)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Non-empty trimmed strings from a JSON array value.
///
/// Anything that is not an array yields nothing.
#[must_use]
pub fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| {
                let text = value_text(item);
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_owned())
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Parses `text` as JSON, accepting only top-level objects.
fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) | Err(_) => None,
    }
}

/// Strategy 2: object inside a markdown code fence.
fn parse_fenced(raw: &str) -> Option<Map<String, Value>> {
    let captures = FENCED_OBJECT.captures(raw)?;
    let body = captures.get(1)?.as_str();
    parse_object(body)
}

/// Strategy 3: first balanced `{...}` span anywhere in the text.
fn parse_embedded(raw: &str) -> Option<Map<String, Value>> {
    let start = raw.find('{')?;
    let candidate = balanced_object(&raw[start..])?;
    parse_object(candidate)
}

/// Returns the prefix of `text` spanning one balanced JSON object.
///
/// Tracks string and escape state so braces inside quoted values do
/// not derail the depth count. `text` must start at a `{`.
fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (index, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[..=index]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Strategy 4: regex salvage of individual routing fields.
fn salvage_fields(raw: &str) -> Map<String, Value> {
    let mut map = Map::new();

    if let Some(captures) = NEEDS_CLARIFICATION.captures(raw) {
        let flagged = captures.get(1).is_some_and(|group| {
            matches!(group.as_str().to_ascii_lowercase().as_str(), "true" | "yes")
        });
        map.insert("needs_clarification".to_owned(), Value::Bool(flagged));
    }

    if let Some(group) = DOCUMENT_TYPE.captures(raw).and_then(|captures| captures.get(1)) {
        map.insert(
            "document_type".to_owned(),
            Value::String(group.as_str().to_owned()),
        );
    }

    if let Some(group) = WORKFLOW.captures(raw).and_then(|captures| captures.get(1)) {
        map.insert(
            "workflow".to_owned(),
            Value::String(group.as_str().to_owned()),
        );
    }

    if let Some(body) = PRIORITY_QUESTIONS
        .captures(raw)
        .and_then(|captures| captures.get(1))
    {
        let questions: Vec<Value> = QUESTION_ITEM
            .captures_iter(body.as_str())
            .filter_map(|item| item.get(1))
            .map(|group| Value::String(group.as_str().trim().to_owned()))
            .collect();
        if !questions.is_empty() {
            map.insert("priority_questions".to_owned(), Value::Array(questions));
        }
    }

    if let Some(group) = ANALYSIS.captures(raw).and_then(|captures| captures.get(1)) {
        map.insert(
            "analysis".to_owned(),
            Value::String(group.as_str().trim().to_owned()),
        );
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_json_parses_directly() {
        let raw = r#"{"needs_clarification": false, "document_type": "FRD"}"#;
        let map = parse(raw);
        assert_eq!(map.get("needs_clarification"), Some(&Value::Bool(false)));
        assert_eq!(
            map.get("document_type").and_then(Value::as_str),
            Some("FRD")
        );
    }

    #[test]
    fn top_level_arrays_are_rejected() {
        let map = parse(r#"["FRD", "BRD"]"#);
        assert!(map.is_empty(), "Arrays are not usable dispatch results");
    }

    #[test]
    fn fenced_block_is_extracted() {
        let raw = "Here is my analysis:\n```json\n{\"workflow\": \"standard\"}\n```\nDone.";
        let map = parse(raw);
        assert_eq!(map.get("workflow").and_then(Value::as_str), Some("standard"));
    }

    #[test]
    fn untagged_fence_is_extracted() {
        let raw = "```\n{\"document_type\": \"API\"}\n```";
        let map = parse(raw);
        assert_eq!(map.get("document_type").and_then(Value::as_str), Some("API"));
    }

    #[test]
    fn embedded_object_is_found_in_prose() {
        let raw = "Sure! Based on the request, {\"needs_clarification\": true, \
                   \"clarification_questions\": [\"What domain?\"]} is my decision.";
        let map = parse(raw);
        assert_eq!(map.get("needs_clarification"), Some(&Value::Bool(true)));
    }

    #[test]
    fn braces_inside_strings_do_not_break_the_scan() {
        let raw = r#"Result: {"analysis": "a stray } inside text", "workflow": "full"}"#;
        let map = parse(raw);
        assert_eq!(map.get("workflow").and_then(Value::as_str), Some("full"));
    }

    #[test]
    fn salvage_recovers_fields_from_broken_json() {
        let raw = r#"
            "needs_clarification": yes,
            "document_type": BRD
            "workflow": prompt_based,,,
        "#;
        let map = parse(raw);
        assert_eq!(map.get("needs_clarification"), Some(&Value::Bool(true)));
        assert_eq!(map.get("document_type").and_then(Value::as_str), Some("BRD"));
        assert_eq!(
            map.get("workflow").and_then(Value::as_str),
            Some("prompt_based")
        );
    }

    #[test]
    fn salvage_reads_negative_clarification() {
        let map = parse("needs_clarification: no, everything is clear,");
        assert_eq!(map.get("needs_clarification"), Some(&Value::Bool(false)));
    }

    #[test]
    fn salvage_recovers_priority_questions() {
        let raw = r#"
            "priority_questions": ["What type of app is this?", 'Which doc type?', "no mark"]
            trailing garbage that breaks the parse
        "#;
        let map = parse(raw);
        let questions = match map.get("priority_questions") {
            Some(Value::Array(items)) => items,
            other => panic!("Expected question array, got {other:?}"),
        };
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0], Value::String("What type of app is this?".into()));
    }

    #[test]
    fn salvage_recovers_analysis_text() {
        let raw = "analysis: 'The request lacks a concrete domain' and more";
        let map = parse(raw);
        assert_eq!(
            map.get("analysis").and_then(Value::as_str),
            Some("The request lacks a concrete domain")
        );
    }

    #[test]
    fn empty_input_yields_empty_map() {
        assert!(parse("").is_empty());
        assert!(parse("   \n\t ").is_empty());
        assert!(parse("no structure here at all").is_empty());
    }

    #[test]
    fn document_type_list_salvages_first_entry() {
        let map = parse(r#"broken { "document_type": ["FRD", "BRD"], nope"#);
        assert_eq!(map.get("document_type").and_then(Value::as_str), Some("FRD"));
    }

    #[test]
    fn rendered_text_round_trips_routing_fields() {
        let mut map = Map::new();
        map.insert("document_type".to_owned(), Value::String("CLOUD".into()));
        map.insert("workflow".to_owned(), Value::String("full_analysis".into()));

        let text = parse_to_text(&map);
        assert!(text.contains("document_type: CLOUD"));

        let recovered = parse(&text);
        assert_eq!(
            recovered.get("document_type").and_then(Value::as_str),
            Some("CLOUD")
        );
        assert_eq!(
            recovered.get("workflow").and_then(Value::as_str),
            Some("full_analysis")
        );
    }

    #[test]
    fn value_text_flattens_arrays_and_strings() {
        let array = Value::Array(vec![
            Value::String("auth".into()),
            Value::String("payments".into()),
        ]);
        assert_eq!(value_text(&array), "auth, payments");
        assert_eq!(value_text(&Value::String("plain".into())), "plain");
        assert_eq!(value_text(&Value::Bool(true)), "true");
        assert_eq!(value_text(&Value::Null), "");
    }

    #[test]
    fn string_list_drops_blanks_and_non_arrays() {
        let array = Value::Array(vec![
            Value::String("  keep me  ".into()),
            Value::String("   ".into()),
            Value::Number(7.into()),
        ]);
        assert_eq!(string_list(&array), ["keep me", "7"]);
        assert!(string_list(&Value::String("not a list".into())).is_empty());
    }
}

//! Defensive readers for model output.
//!
//! Model responses are prose that usually, but not always, contains one JSON
//! object. Nothing here assumes the object matches any schema: every field
//! is read as optional, numbers may arrive as strings, lists may arrive as a
//! single string.

use std::cmp::Ordering;

use serde_json::Value;

use dxpanel_contracts::hypothesis::{DiagnosticHypothesis, TestRecommendation};

// ── Object extraction ─────────────────────────────────────────────────────────

/// Locate and parse the JSON object embedded in `text`.
///
/// Tries the span from the first `{` to the last `}` first, which covers the
/// common case of an object wrapped in prose or a code fence. If that span
/// does not parse (two objects, stray braces in trailing prose), falls back
/// to the first balanced `{...}` that parses as an object.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if start < end {
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&text[start..=end]) {
            return Some(value);
        }
    }

    for (offset, _) in text.match_indices('{') {
        if let Some(span) = balanced_span(&text[offset..]) {
            if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(span) {
                return Some(value);
            }
        }
    }
    None
}

/// Return the prefix of `s` (which starts with `{`) up to its matching `}`,
/// skipping braces inside string literals.
fn balanced_span(s: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

// ── Field accessors ───────────────────────────────────────────────────────────

/// Resolve a dotted path (e.g. `"content.diagnosis"`) into `value`.
///
/// Returns `None` if any segment is missing or null.
pub fn resolve_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    let mut current = value;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(v) if !v.is_null() => current = v,
            _ => return None,
        }
    }
    Some(current)
}

/// Read a field as text. Numbers and booleans are stringified; anything
/// else (including absence) yields an empty string.
pub fn text_at(value: &Value, path: &str) -> String {
    match resolve_path(value, path) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Read a number, accepting numeric strings such as `"0.8"` or `"85%"`.
///
/// A trailing percent sign divides by 100.
pub fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim().trim_start_matches('$');
            match s.strip_suffix('%') {
                Some(pct) => pct.trim().parse::<f64>().ok().map(|p| p / 100.0),
                None => s.replace(',', "").parse::<f64>().ok(),
            }
        }
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

pub fn number_at(value: &Value, path: &str) -> Option<f64> {
    resolve_path(value, path).and_then(number)
}

/// Bring a model-supplied probability into `[0, 1]`.
///
/// Values in `(1, 100]` are read as percentages.
pub fn normalize_probability(p: f64) -> f64 {
    if !p.is_finite() {
        return 0.0;
    }
    let p = if p > 1.0 && p <= 100.0 { p / 100.0 } else { p };
    p.clamp(0.0, 1.0)
}

/// Read a list of strings.
///
/// Accepts an array of strings, an array of objects carrying `name_key`, or
/// a single string. Empty entries are dropped.
pub fn string_list(value: Option<&Value>, name_key: &str) -> Vec<String> {
    let items = match value {
        Some(Value::Array(items)) => items.as_slice(),
        Some(Value::String(s)) if !s.trim().is_empty() => return vec![s.trim().to_string()],
        _ => return Vec::new(),
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Object(_) => Some(text_at(item, name_key)),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect()
}

// ── Typed readers ─────────────────────────────────────────────────────────────

/// Sort a differential most-probable first, keeping the original order of
/// ties.
pub fn sort_differential(hypotheses: &mut [DiagnosticHypothesis]) {
    hypotheses.sort_by(|a, b| b.probability.partial_cmp(&a.probability).unwrap_or(Ordering::Equal));
}

/// Read `hypotheses` from a Hypothesis agent response, sorted.
///
/// Entries without a condition are dropped. A bare string entry becomes a
/// hypothesis with probability 0.
pub fn parse_hypotheses(response: &Value) -> Vec<DiagnosticHypothesis> {
    let Some(Value::Array(items)) = response.get("hypotheses") else {
        return Vec::new();
    };

    let mut hypotheses: Vec<DiagnosticHypothesis> = items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) if !s.trim().is_empty() => {
                Some(DiagnosticHypothesis::new(s.trim(), 0.0, ""))
            }
            Value::Object(_) => {
                let condition = text_at(item, "condition");
                if condition.is_empty() {
                    return None;
                }
                Some(DiagnosticHypothesis {
                    condition,
                    probability: number_at(item, "probability")
                        .map(normalize_probability)
                        .unwrap_or(0.0),
                    reasoning: text_at(item, "reasoning"),
                    supporting_evidence: string_list(item.get("supporting_evidence"), "evidence"),
                    contradictory_evidence: string_list(item.get("contradictory_evidence"), "evidence"),
                })
            }
            _ => None,
        })
        .collect();

    sort_differential(&mut hypotheses);
    hypotheses
}

/// Read `recommended_tests` from a Test-Chooser response.
///
/// Entries without a test name are dropped; priority is clamped to 1..=3.
pub fn parse_recommendations(response: &Value) -> Vec<TestRecommendation> {
    let Some(Value::Array(items)) = response.get("recommended_tests") else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) if !s.trim().is_empty() => Some(TestRecommendation {
                test_name: s.trim().to_string(),
                rationale: String::new(),
                estimated_cost: None,
                priority: 1,
                discriminative_value: String::new(),
            }),
            Value::Object(_) => {
                let test_name = text_at(item, "test_name");
                if test_name.is_empty() {
                    return None;
                }
                let priority = number_at(item, "priority").unwrap_or(1.0).round().clamp(1.0, 3.0) as u8;
                Some(TestRecommendation {
                    test_name,
                    rationale: text_at(item, "rationale"),
                    estimated_cost: number_at(item, "estimated_cost").filter(|c| *c >= 0.0),
                    priority,
                    discriminative_value: text_at(item, "discriminative_value"),
                })
            }
            _ => None,
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

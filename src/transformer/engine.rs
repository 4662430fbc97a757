//! Transform Engine - Jolokia values to Prometheus lines
//!
//! [`map_response`] turns one rule plus its raw value into exposition lines:
//!
//! 1. an array value yields one candidate per element, anything else is the only candidate
//! 2. candidates failing the rule's filter are dropped
//! 3. the attribute selector extracts [`MatchedValue`]s (a regex selector keeps full matches only)
//! 4. each match renders a sample line, preceded by `# HELP`/`# TYPE` the first
//!    time its rendered name appears in this call

use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, trace};

use crate::collector::{JolokiaResponse, ReadRequest};

use super::formatter::{escape_help, format_sample_line, format_value};
use super::rules::{AttributeSelector, KeyMatch, Rule, RuleSet};
use super::template::{snake_case, Replacer};

/// Transform Engine configuration and state
///
/// Holds the rule set and correlates bulk responses with it by position.
#[derive(Debug, Clone, Default)]
pub struct TransformEngine {
    rules: RuleSet,
}

impl TransformEngine {
    /// Create a new TransformEngine with the given rules
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// Get a reference to the rule set
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Bulk request, one record per rule in rule order
    pub fn requests(&self) -> Vec<ReadRequest> {
        self.rules.requests()
    }

    /// Map bulk responses to lines, in rule order.
    ///
    /// `responses[i]` belongs to rule `i`. Error entries contribute nothing.
    pub fn transform(&self, responses: &[JolokiaResponse]) -> Vec<String> {
        let mut lines = Vec::new();

        for (rule, response) in self.rules.iter().zip(responses) {
            if let Some(err) = response.read_error(&rule.mbean()) {
                debug!(
                    pattern = %rule.pattern(),
                    error = %err,
                    error_type = ?err.error_type,
                    "Skipping error response"
                );
                continue;
            }

            lines.extend(map_response(rule, &response.value));
        }

        lines
    }
}

/// A value selected by a rule, with its placeholder bindings
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedValue<'a> {
    /// Raw matched value
    pub value: &'a Value,
    /// `$1` when selected by a regex; `$0` is bound at render time
    pub replacer: Replacer,
}

/// Produce the exposition lines for one rule and its (non-error) value.
pub fn map_response(rule: &Rule, value: &Value) -> Vec<String> {
    let candidates: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    let matched: Vec<MatchedValue<'_>> = candidates
        .into_iter()
        .filter(|candidate| passes_filter(rule.filter(), candidate))
        .flat_map(|candidate| extract_matches(rule.selector(), candidate))
        .collect();

    trace!(pattern = %rule.pattern(), matched = matched.len(), "Attribute matches");

    render_lines(rule, matched)
}

/// Every filter entry must be present on the candidate with an equal value.
/// An empty filter accepts everything.
fn passes_filter(filter: &[(String, Value)], candidate: &Value) -> bool {
    filter.iter().all(|(key, expected)| {
        candidate
            .get(key.as_str())
            .is_some_and(|actual| strict_eq(actual, expected))
    })
}

/// Structural equality, except that numbers compare by numeric value (`1` equals `1.0`).
fn strict_eq(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => actual == expected,
    }
}

fn extract_matches<'a>(selector: &AttributeSelector, candidate: &'a Value) -> Vec<MatchedValue<'a>> {
    match selector {
        AttributeSelector::Key(key) => match candidate.get(key.as_str()) {
            Some(value) if is_sample(value) => vec![MatchedValue {
                value,
                replacer: Replacer::new(),
            }],
            Some(_) => {
                debug!(key = %key, "Selected value is not a scalar, skipping");
                vec![]
            }
            None => vec![],
        },
        AttributeSelector::Regex(_) => {
            let Some(fields) = candidate.as_object() else {
                return vec![];
            };

            fields
                .iter()
                .filter_map(|(key, value)| match selector.match_key(key) {
                    KeyMatch::Full { capture } if is_sample(value) => {
                        let mut replacer = Replacer::new();
                        replacer.bind(1, capture);
                        Some(MatchedValue { value, replacer })
                    }
                    KeyMatch::Full { .. } => {
                        debug!(key = %key, "Selected value is not a scalar, skipping");
                        None
                    }
                    KeyMatch::Partial => {
                        trace!(key = %key, "Partial key match ignored");
                        None
                    }
                    KeyMatch::NoMatch => None,
                })
                .collect()
        }
    }
}

/// Objects and arrays are containers, not samples
fn is_sample(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

fn render_lines(rule: &Rule, matched: Vec<MatchedValue<'_>>) -> Vec<String> {
    let mut lines = Vec::new();
    let mut defined: HashSet<String> = HashSet::new();

    for MatchedValue { value, mut replacer } in matched {
        replacer.bind(0, raw_text(value));

        let mut name = replacer.render(rule.name());
        if rule.snake_case_name() {
            name = snake_case(&name);
        }

        if !defined.contains(&name) {
            if let Some(help) = rule.help().filter(|h| !h.is_empty()) {
                lines.push(format!(
                    "# HELP {} {}",
                    name,
                    escape_help(&replacer.render(help))
                ));
            }
            lines.push(format!("# TYPE {} {}", name, rule.metric_type().as_str()));
            defined.insert(name.clone());
        }

        let labels: Vec<(String, String)> = rule
            .labels()
            .iter()
            .map(|(k, v)| (replacer.render(k), replacer.render(v)))
            .collect();

        let sample = sample_value(value, rule.override_value(), rule.value_factor());
        let line = format_sample_line(&name, &labels, &sample);
        trace!(line = %line, "Rendered line");
        lines.push(line);
    }

    lines
}

/// Text bound to `$0`; numbers read the same as the emitted sample
fn raw_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
        Value::Number(n) => format_value(n.as_f64().unwrap_or(f64::NAN)),
        other => other.to_string(),
    }
}

/// Emitted value: the raw value, replaced by the override, then multiplied by the factor.
fn sample_value(raw: &Value, override_value: Option<f64>, factor: Option<f64>) -> String {
    let base = match override_value {
        Some(v) => v,
        None => {
            if factor.is_none() {
                // integers are printed verbatim to avoid f64 rounding
                if let Value::Number(n) = raw {
                    if n.is_i64() || n.is_u64() {
                        return n.to_string();
                    }
                }
            }
            to_number(raw)
        }
    };

    format_value(factor.map_or(base, |f| base * f))
}

/// Numeric reading of a JSON scalar; non-numeric input is NaN.
fn to_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Null | Value::Object(_) | Value::Array(_) => f64::NAN,
    }
}

//! Prometheus Exposition Format output
//!
//! Line-level helpers for the text exposition format (version 0.0.4).
//!
//! # Format Specification
//!
//! ```text
//! # HELP <metric_name> <help_text>
//! # TYPE <metric_name> <type>
//! <metric_name>{<label1>="<value1>",<label2>="<value2>"} <value>
//! ```
//!
//! Labels are written in the order given; rules keep their configured order.

/// Content type of the metrics endpoint
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Format a single sample line
///
/// `value` is already rendered (see [`format_value`]).
pub fn format_sample_line(name: &str, labels: &[(String, String)], value: &str) -> String {
    let mut line = String::with_capacity(name.len() + value.len() + labels.len() * 24 + 4);
    line.push_str(name);

    if !labels.is_empty() {
        let label_pairs: Vec<String> = labels
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
            .collect();

        line.push('{');
        line.push_str(&label_pairs.join(","));
        line.push('}');
    }

    line.push(' ');
    line.push_str(value);
    line
}

/// Format a numeric value for Prometheus
///
/// - NaN → "NaN"
/// - +Inf → "+Inf"
/// - -Inf → "-Inf"
/// - Integers are formatted without decimal point
/// - Large/small floats use scientific notation
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else if value.abs() >= 1e6 || (value.abs() < 1e-3 && value != 0.0) {
        format!("{:e}", value)
    } else {
        format!("{}", value)
    }
}

/// Escape help text
///
/// Escapes backslash and newline characters.
pub fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Escape label value
///
/// Escapes backslash, double-quote, and newline characters.
pub fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Join lines into a response body, newline-terminated
pub fn render_body(lines: &[String]) -> String {
    if lines.is_empty() {
        return String::new();
    }

    let mut body = lines.join("\n");
    body.push('\n');
    body
}

//! Positional placeholder rendering for names, help text and labels
//!
//! Templates reference matched values through `$n` tokens: `$0` is the raw
//! matched value, `$1` the key captured by an attribute regex.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// A `$` followed by one or more digits
static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\d+").expect("invalid placeholder regex"));

/// Rendered for a placeholder that has no binding
pub const UNBOUND_PLACEHOLDER: &str = "undefined";

/// Capture replacer: `$n` token to bound text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replacer {
    bindings: HashMap<String, String>,
}

impl Replacer {
    /// Create an empty replacer
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `$index` to `value`, replacing an earlier binding
    pub fn bind(&mut self, index: usize, value: impl Into<String>) {
        self.bindings.insert(format!("${}", index), value.into());
    }

    /// Look up a token such as `$1`
    ///
    /// Tokens are compared textually, so `$01` and `$1` are distinct.
    pub fn get(&self, token: &str) -> Option<&str> {
        self.bindings.get(token).map(String::as_str)
    }

    /// Substitute the **first** `$n` token of `template`.
    ///
    /// Only one token is replaced per call; later tokens stay literal.
    /// Configured templates rely on this, so do not turn it into a global replace.
    /// An unbound token renders as `undefined`.
    pub fn render(&self, template: &str) -> String {
        PLACEHOLDER_RE
            .replace(template, |caps: &Captures<'_>| {
                self.get(&caps[0]).unwrap_or(UNBOUND_PLACEHOLDER).to_string()
            })
            .into_owned()
    }
}

/// Convert a rendered metric name to snake_case.
///
/// The first character is lower-cased, `_` is inserted before every other
/// ASCII upper-case letter, `-` becomes `_`, and the result is lower-cased.
/// Runs of capitals are split letter by letter (`HTTPCount` → `h_t_t_p_count`).
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 8);
    let mut chars = name.chars();

    if let Some(first) = chars.next() {
        out.extend(first.to_lowercase());
    }

    for c in chars {
        if c.is_ascii_uppercase() {
            out.push('_');
        }
        out.push(if c == '-' { '_' } else { c });
    }

    out.to_lowercase()
}

//! Rule definitions for turning Jolokia reads into Prometheus lines
//!
//! A rule names one MBean attribute through a compact pattern and describes
//! how every value found there becomes a metric line.
//!
//! # Pattern Syntax
//!
//! ```text
//! <mbean-class><<mbean-path>><><attribute-expr>
//! ```
//!
//! `attribute-expr` is `access/path/selector`: everything before the last `/`
//! is sent to Jolokia as the attribute, the last segment selects keys of the
//! returned value. A selector containing `(` is a regex over those keys.
//!
//! # Example
//!
//! ```ignore
//! use jolokia_exporter::transformer::rules::{MetricType, Rule};
//!
//! let rule = Rule::builder("java.lang<type=Memory><>HeapMemoryUsage/(used|max)")
//!     .name("jvm_heap_$1_bytes")
//!     .metric_type(MetricType::Gauge)
//!     .build()?;
//!
//! assert_eq!(rule.mbean(), "java.lang:type=Memory");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::str::FromStr;

use crate::collector::ReadRequest;
use crate::config::RuleConfig;
pub use crate::error::RuleError;

/// Result type for rule operations
pub type RuleResult<T> = Result<T, RuleError>;

/// `{class}<{path}><>{attribute}`
static PATTERN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^<]+)<([^>]*)><>(.+)$").expect("invalid rule pattern regex"));

/// Prometheus metric type
///
/// Parsed case-insensitively from configuration and always emitted lower-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricType {
    /// Gauge metric - a value that can go up and down
    Gauge,
    /// Counter metric - a monotonically increasing value
    Counter,
    /// Summary metric
    Summary,
    /// Histogram metric - observations counted in buckets
    Histogram,
    /// Untyped metric - type is not specified
    #[default]
    Untyped,
}

impl MetricType {
    /// Returns the Prometheus type string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Gauge => "gauge",
            MetricType::Counter => "counter",
            MetricType::Summary => "summary",
            MetricType::Histogram => "histogram",
            MetricType::Untyped => "untyped",
        }
    }
}

impl FromStr for MetricType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gauge" => Ok(MetricType::Gauge),
            "counter" => Ok(MetricType::Counter),
            "summary" => Ok(MetricType::Summary),
            "histogram" => Ok(MetricType::Histogram),
            "untyped" => Ok(MetricType::Untyped),
            other => Err(format!(
                "unknown metric type '{}', expected one of: counter, gauge, summary, histogram, untyped",
                other
            )),
        }
    }
}

impl Serialize for MetricType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MetricType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// MBean coordinates and attribute expression extracted from a pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPattern {
    /// Text before the first `<`
    pub mbean_class: String,
    /// Text inside the first `<...>`, possibly empty
    pub mbean_path: String,
    /// Everything after `<>`
    pub attribute_expr: String,
}

/// Split a rule pattern into its parts.
///
/// There is no partial recovery: any deviation from the grammar is an
/// [`RuleError::InvalidPattern`].
pub fn parse_pattern(pattern: &str) -> RuleResult<ParsedPattern> {
    let caps = PATTERN_RE
        .captures(pattern)
        .ok_or_else(|| RuleError::InvalidPattern {
            pattern: pattern.to_string(),
        })?;

    Ok(ParsedPattern {
        mbean_class: caps[1].to_string(),
        mbean_path: caps[2].to_string(),
        attribute_expr: caps[3].to_string(),
    })
}

/// Outcome of running an attribute regex against one result key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMatch<'k> {
    /// The matched text is exactly the first capture group
    Full { capture: &'k str },
    /// The regex matched, but the match is wider than (or lacks) group 1.
    /// Partial matches produce no output.
    Partial,
    /// The regex did not match the key
    NoMatch,
}

/// Last segment of the attribute expression
#[derive(Debug, Clone)]
pub enum AttributeSelector {
    /// Literal key of the result object
    Key(String),
    /// Regex over the keys of the result object, compiled once
    Regex(Regex),
}

impl AttributeSelector {
    /// Build a selector; text containing `(` is compiled as a regex
    pub fn parse(selector: &str) -> RuleResult<Self> {
        if !selector.contains('(') {
            return Ok(AttributeSelector::Key(selector.to_string()));
        }

        check_regex_syntax(selector)?;
        Regex::new(selector)
            .map(AttributeSelector::Regex)
            .map_err(|e| RuleError::InvalidAttributeRegex {
                regex: selector.to_string(),
                source: e,
            })
    }

    /// Whether this selector is a regex
    pub fn is_regex(&self) -> bool {
        matches!(self, AttributeSelector::Regex(_))
    }

    /// Run the selector against a result key.
    ///
    /// A literal key yields [`KeyMatch::Full`] (capturing the key) on equality.
    /// A regex yields `Full` only when the leftmost match equals capture group 1.
    pub fn match_key<'k>(&self, key: &'k str) -> KeyMatch<'k> {
        match self {
            AttributeSelector::Key(k) if k == key => KeyMatch::Full { capture: key },
            AttributeSelector::Key(_) => KeyMatch::NoMatch,
            AttributeSelector::Regex(re) => match re.captures(key) {
                None => KeyMatch::NoMatch,
                Some(caps) => match (caps.get(0), caps.get(1)) {
                    (Some(whole), Some(group)) if whole.as_str() == group.as_str() => {
                        KeyMatch::Full {
                            capture: group.as_str(),
                        }
                    }
                    _ => KeyMatch::Partial,
                },
            },
        }
    }

    /// Source text of the selector
    pub fn as_str(&self) -> &str {
        match self {
            AttributeSelector::Key(k) => k,
            AttributeSelector::Regex(re) => re.as_str(),
        }
    }
}

impl PartialEq for AttributeSelector {
    fn eq(&self, other: &Self) -> bool {
        self.is_regex() == other.is_regex() && self.as_str() == other.as_str()
    }
}

/// Attribute expression split into access path and selector
#[derive(Debug, Clone, PartialEq)]
pub struct AttributePath {
    /// Sent to Jolokia as `attribute`; `None` reads the whole MBean
    pub access_path: Option<String>,
    /// Key (or key regex) applied to each result candidate
    pub selector: AttributeSelector,
}

impl AttributePath {
    /// Split at the last `/`
    pub fn parse(expr: &str) -> RuleResult<Self> {
        let (access_path, selector) = match expr.rsplit_once('/') {
            Some((path, last)) => (Some(path.to_string()), last),
            None => (None, expr),
        };

        Ok(Self {
            access_path,
            selector: AttributeSelector::parse(selector)?,
        })
    }
}

/// Reject regex features the `regex` crate cannot execute, with a clearer
/// message than the compiler gives.
fn check_regex_syntax(pattern: &str) -> RuleResult<()> {
    let unsupported = |feature: &str| RuleError::UnsupportedSyntax {
        regex: pattern.to_string(),
        feature: feature.to_string(),
    };

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    if matches!(escaped, '1'..='9') {
                        return Err(unsupported("back-references (\\1...)"));
                    }
                }
            }
            '(' if chars.peek() == Some(&'?') => {
                chars.next();
                match chars.peek() {
                    Some('=') => return Err(unsupported("lookahead assertions (?=...)")),
                    Some('!') => return Err(unsupported("negative lookahead assertions (?!...)")),
                    Some('<') => {
                        chars.next();
                        match chars.peek() {
                            Some('=') => return Err(unsupported("lookbehind assertions (?<=...)")),
                            Some('!') => {
                                return Err(unsupported("negative lookbehind assertions (?<!...)"))
                            }
                            // named group
                            _ => {}
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    Ok(())
}

/// Metric-producing rule
///
/// Immutable once built; shared read-only across concurrent collections.
///
/// # Example Configuration (YAML)
///
/// ```yaml
/// pattern: "java.lang<type=GarbageCollector,name=*><>CollectionCount"
/// name: "jvm_gc_collections_total"
/// type: counter
/// labels:
///   gc: "$1"
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pattern: String,
    mbean_class: String,
    mbean_path: String,
    attribute: AttributePath,
    filter: Vec<(String, Value)>,
    labels: Vec<(String, String)>,
    name: String,
    help: Option<String>,
    metric_type: MetricType,
    snake_case_name: bool,
    override_value: Option<f64>,
    value_factor: Option<f64>,
}

impl Rule {
    /// Create a new rule builder for fluent configuration
    pub fn builder(pattern: impl Into<String>) -> RuleBuilder {
        RuleBuilder::new(pattern)
    }

    /// Build a rule from its configuration record
    ///
    /// # Errors
    ///
    /// `RuleError::InvalidPattern` for a malformed pattern, regex errors for a
    /// bad attribute selector, `RuleError::Validation` for an empty name or a
    /// non-finite factor.
    pub fn from_config(config: &RuleConfig) -> RuleResult<Self> {
        let parsed = parse_pattern(&config.pattern)?;
        let attribute = AttributePath::parse(&parsed.attribute_expr)?;

        let rule = Self {
            pattern: config.pattern.clone(),
            mbean_class: parsed.mbean_class,
            mbean_path: parsed.mbean_path,
            attribute,
            filter: config.filter.clone(),
            labels: config.labels.clone(),
            name: config.name.clone(),
            help: config.help.clone(),
            metric_type: config.metric_type,
            snake_case_name: config.attr_name_snake_case,
            override_value: config.value,
            value_factor: config.value_factor,
        };
        rule.validate()?;

        Ok(rule)
    }

    fn validate(&self) -> RuleResult<()> {
        if self.name.is_empty() {
            return Err(RuleError::Validation(format!(
                "rule '{}' has an empty name",
                self.pattern
            )));
        }

        for (field, value) in [("value", self.override_value), ("valueFactor", self.value_factor)] {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(RuleError::Validation(format!(
                    "{} of rule '{}' must be a finite number",
                    field, self.pattern
                )));
            }
        }

        Ok(())
    }

    /// Build the read request for the bulk call
    pub fn to_request(&self) -> ReadRequest {
        ReadRequest::read(self.mbean(), self.attribute.access_path.clone())
    }

    /// Target MBean, `class:path` (or just `class` when the path is empty)
    pub fn mbean(&self) -> String {
        if self.mbean_path.is_empty() {
            self.mbean_class.clone()
        } else {
            format!("{}:{}", self.mbean_class, self.mbean_path)
        }
    }

    /// Raw pattern text
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn mbean_class(&self) -> &str {
        &self.mbean_class
    }

    pub fn mbean_path(&self) -> &str {
        &self.mbean_path
    }

    /// Access path sent to Jolokia, if any
    pub fn access_path(&self) -> Option<&str> {
        self.attribute.access_path.as_deref()
    }

    pub fn selector(&self) -> &AttributeSelector {
        &self.attribute.selector
    }

    /// Field filter; every entry must equal the candidate's field
    pub fn filter(&self) -> &[(String, Value)] {
        &self.filter
    }

    /// Label templates in configuration order
    pub fn labels(&self) -> &[(String, String)] {
        &self.labels
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn metric_type(&self) -> MetricType {
        self.metric_type
    }

    pub fn snake_case_name(&self) -> bool {
        self.snake_case_name
    }

    pub fn override_value(&self) -> Option<f64> {
        self.override_value
    }

    pub fn value_factor(&self) -> Option<f64> {
        self.value_factor
    }
}

/// Builder for creating Rule instances with fluent API
#[derive(Debug, Clone)]
pub struct RuleBuilder {
    config: RuleConfig,
}

impl RuleBuilder {
    /// Create a new rule builder
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            config: RuleConfig {
                pattern: pattern.into(),
                ..RuleConfig::default()
            },
        }
    }

    /// Set the metric name template
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the metric type
    pub fn metric_type(mut self, metric_type: MetricType) -> Self {
        self.config.metric_type = metric_type;
        self
    }

    /// Append a label template
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.labels.push((key.into(), value.into()));
        self
    }

    /// Append a filter entry
    pub fn filter(mut self, key: impl Into<String>, expected: impl Into<Value>) -> Self {
        self.config.filter.push((key.into(), expected.into()));
        self
    }

    /// Set help text template
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.config.help = Some(help.into());
        self
    }

    /// Replace observed values with a constant
    pub fn value(mut self, value: f64) -> Self {
        self.config.value = Some(value);
        self
    }

    /// Set value factor
    pub fn value_factor(mut self, factor: f64) -> Self {
        self.config.value_factor = Some(factor);
        self
    }

    /// Convert rendered names to snake_case
    pub fn snake_case_name(mut self, enabled: bool) -> Self {
        self.config.attr_name_snake_case = enabled;
        self
    }

    /// Build the rule
    pub fn build(self) -> RuleResult<Rule> {
        Rule::from_config(&self.config)
    }
}

/// Ordered collection of rules
///
/// Order matters: the bulk request and its response are correlated by position.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Create a new empty rule set
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Create a rule set from a vector of rules
    pub fn from_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Build every configured rule, failing on the first bad one
    ///
    /// # Errors
    ///
    /// Returns `RuleError::RuleCompileFailed` carrying the index of the
    /// offending rule; no partial set is produced.
    pub fn from_config(configs: &[RuleConfig]) -> RuleResult<Self> {
        configs
            .iter()
            .enumerate()
            .map(|(index, config)| {
                Rule::from_config(config).map_err(|e| RuleError::RuleCompileFailed {
                    index,
                    source: Box::new(e),
                })
            })
            .collect::<RuleResult<Vec<_>>>()
            .map(Self::from_rules)
    }

    /// Get the number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the rule set is empty
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterate over all rules
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Get a reference to the underlying rules vector
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Get a rule by index
    pub fn get(&self, index: usize) -> Option<&Rule> {
        self.rules.get(index)
    }

    /// Read requests for every rule, in rule order
    pub fn requests(&self) -> Vec<ReadRequest> {
        self.rules.iter().map(Rule::to_request).collect()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

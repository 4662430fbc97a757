//! Metric transformation module
//!
//! Rules, placeholder templates and the response mapper that together turn
//! Jolokia read results into Prometheus exposition lines.

pub mod engine;
pub mod formatter;
pub mod rules;
pub mod template;

pub use engine::{map_response, MatchedValue, TransformEngine};
pub use formatter::{render_body, CONTENT_TYPE};
pub use rules::{
    parse_pattern, AttributePath, AttributeSelector, KeyMatch, MetricType, ParsedPattern, Rule,
    RuleBuilder, RuleSet,
};
pub use template::{snake_case, Replacer};

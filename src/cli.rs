//! CLI argument parsing for jolokia-exporter
//!
//! This module provides the command-line interface using clap derive macros.
//!
//! # Options
//!
//! - `--config` / `-c`: Configuration file path (default: config.yaml, env: CONFIG_YML)
//! - `--port` / `-p`: Server port (overrides config file, env: PORT)
//! - `--bind-address`: Server bind address (env: BIND_ADDRESS)
//! - `--metrics-path`: Metrics endpoint path (env: METRICS_PATH)
//! - `--jolokia-url`: Jolokia endpoint URL (env: JOLOKIA_URL)
//! - `--jolokia-timeout`: HTTP timeout in milliseconds (env: JOLOKIA_TIMEOUT)
//! - `--username`: Jolokia auth username (env: JOLOKIA_USERNAME)
//! - `--password`: Jolokia auth password (env: JOLOKIA_PASSWORD)
//! - `--accept-invalid-certs`: Skip TLS verification towards Jolokia (env: JOLOKIA_ACCEPT_INVALID_CERTS)
//! - `--app-version`: Value of the `X-App-Version` header (env: APP_VERSION)
//! - `--validate`: Validate configuration and rules without starting the server
//! - `--dry-run`: Show the parsed rules
//! - `--log-level` / `-l`: Log level (trace/debug/info/warn/error, env: LOG_LEVEL)
//! - `--log-format`: Log output format (text/json)
//! - `--output-format`: Output format for validate/dry-run (text/json/yaml)
//!
//! # Precedence
//!
//! Configuration values are resolved in the following order (highest to lowest priority):
//! 1. CLI arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use anyhow::Result;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;

use crate::config::Config;
use crate::transformer::{Rule, RuleSet};

/// jolokia-exporter - JMX metrics via Jolokia, exported in Prometheus format
///
/// Environment variables can be used for all configuration options.
/// CLI arguments take precedence over environment variables,
/// which take precedence over config file values.
#[derive(Parser, Debug)]
#[command(name = "jolokia-exporter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config.yaml",
        env = "CONFIG_YML"
    )]
    pub config: PathBuf,

    /// Server port (overrides config file)
    #[arg(short, long, value_name = "PORT", env = "PORT")]
    pub port: Option<u16>,

    /// Server bind address (overrides config file)
    /// Supported values: IP addresses (0.0.0.0, 127.0.0.1, ::1) or "localhost"
    #[arg(long, value_name = "ADDRESS", env = "BIND_ADDRESS")]
    pub bind_address: Option<String>,

    /// Metrics endpoint path (overrides config file)
    /// Must start with '/' and not conflict with '/' or '/health'
    #[arg(long, value_name = "PATH", env = "METRICS_PATH")]
    pub metrics_path: Option<String>,

    /// Jolokia endpoint URL (overrides config file)
    #[arg(long, value_name = "URL", env = "JOLOKIA_URL")]
    pub jolokia_url: Option<String>,

    /// Jolokia HTTP timeout in milliseconds (overrides config file)
    #[arg(long, value_name = "MS", env = "JOLOKIA_TIMEOUT")]
    pub jolokia_timeout: Option<u64>,

    /// Jolokia authentication username (overrides config file)
    #[arg(long, value_name = "USERNAME", env = "JOLOKIA_USERNAME")]
    pub username: Option<String>,

    /// Jolokia authentication password (overrides config file)
    #[arg(long, value_name = "PASSWORD", env = "JOLOKIA_PASSWORD")]
    pub password: Option<String>,

    /// Accept invalid TLS certificates from the Jolokia endpoint
    #[arg(long, env = "JOLOKIA_ACCEPT_INVALID_CERTS")]
    pub accept_invalid_certs: bool,

    /// Version reported in the X-App-Version header
    #[arg(long, value_name = "VERSION", default_value = "dev", env = "APP_VERSION")]
    pub app_version: String,

    /// Validate configuration and rules without starting server
    #[arg(long)]
    pub validate: bool,

    /// Show the parsed rules without starting server
    #[arg(long)]
    pub dry_run: bool,

    /// Log level
    #[arg(short, long, value_enum, default_value = "info", env = "LOG_LEVEL")]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Output format for --validate and --dry-run
    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

/// Credential variables read when no Jolokia credentials are configured otherwise
pub const LEGACY_CREDENTIAL_VARS: (&str, &str) = ("USERNAME", "PASSWORD");

impl Cli {
    /// Apply command-line / environment overrides on top of the file config
    pub fn apply_to(&self, config: &mut Config) {
        self.apply_with_env(config, |key| std::env::var(key).ok());
    }

    /// [`apply_to`](Self::apply_to) with an explicit environment lookup
    ///
    /// `USERNAME`/`PASSWORD` are used only when both are set and neither the
    /// flags, `JOLOKIA_USERNAME`/`JOLOKIA_PASSWORD` nor the file provide credentials.
    pub fn apply_with_env<F>(&self, config: &mut Config, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ref address) = self.bind_address {
            config.server.bind_address = address.clone();
        }
        if let Some(ref path) = self.metrics_path {
            config.server.path = path.clone();
        }
        if let Some(ref url) = self.jolokia_url {
            config.jolokia.url = url.clone();
        }
        if let Some(timeout) = self.jolokia_timeout {
            config.jolokia.timeout_ms = timeout;
        }
        if let Some(ref username) = self.username {
            config.jolokia.username = Some(username.clone());
        }
        if let Some(ref password) = self.password {
            config.jolokia.password = Some(password.clone());
        }
        if self.accept_invalid_certs {
            config.jolokia.accept_invalid_certs = true;
        }

        if config.jolokia.username.is_none() && config.jolokia.password.is_none() {
            let (user_var, pass_var) = LEGACY_CREDENTIAL_VARS;
            if let (Some(username), Some(password)) = (env(user_var), env(pass_var)) {
                config.jolokia.username = Some(username);
                config.jolokia.password = Some(password);
            }
        }
    }
}

/// Log level options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Trace level - most verbose
    Trace,
    /// Debug level
    Debug,
    /// Info level - default
    Info,
    /// Warn level
    Warn,
    /// Error level - least verbose
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Log output format
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Output format options for validate and dry-run modes
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
        }
    }
}

/// What `--dry-run` reports for one rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleSummary {
    pub pattern: String,
    pub mbean: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    pub selector: String,
    pub name: String,
    #[serde(rename = "type")]
    pub metric_type: String,
}

impl From<&Rule> for RuleSummary {
    fn from(rule: &Rule) -> Self {
        Self {
            pattern: rule.pattern().to_string(),
            mbean: rule.mbean(),
            attribute: rule.access_path().map(str::to_string),
            selector: rule.selector().as_str().to_string(),
            name: rule.name().to_string(),
            metric_type: rule.metric_type().to_string(),
        }
    }
}

/// What `--validate` reports
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationSummary {
    pub valid: bool,
    pub rules: usize,
}

/// Render the `--validate` outcome for a rule set that loaded successfully
pub fn render_validation(rules: &RuleSet, format: OutputFormat) -> Result<String> {
    let summary = ValidationSummary {
        valid: true,
        rules: rules.len(),
    };

    let output = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&summary)?,
        OutputFormat::Yaml => serde_yaml::to_string(&summary)?,
        OutputFormat::Text => format!("Configuration is valid ({} rule(s))\n", summary.rules),
    };

    Ok(output)
}

/// Render the parsed rules for `--dry-run`
pub fn render_dry_run(rules: &RuleSet, format: OutputFormat) -> Result<String> {
    let summaries: Vec<RuleSummary> = rules.iter().map(RuleSummary::from).collect();

    let output = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&summaries)?,
        OutputFormat::Yaml => serde_yaml::to_string(&summaries)?,
        OutputFormat::Text => {
            let mut out = format!("{} rule(s)\n", summaries.len());
            for (i, s) in summaries.iter().enumerate() {
                out.push_str(&format!(
                    "[{}] {}\n    mbean: {}\n    attribute: {}\n    selector: {}\n    name: {} ({})\n",
                    i,
                    s.pattern,
                    s.mbean,
                    s.attribute.as_deref().unwrap_or("-"),
                    s.selector,
                    s.name,
                    s.metric_type
                ));
            }
            out
        }
    };

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transformer::MetricType;

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Trace.to_string(), "trace");
        assert_eq!(LogLevel::Debug.to_string(), "debug");
        assert_eq!(LogLevel::Info.to_string(), "info");
        assert_eq!(LogLevel::Warn.to_string(), "warn");
        assert_eq!(LogLevel::Error.to_string(), "error");
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(tracing::Level::from(LogLevel::Trace), tracing::Level::TRACE);
        assert_eq!(tracing::Level::from(LogLevel::Info), tracing::Level::INFO);
        assert_eq!(tracing::Level::from(LogLevel::Error), tracing::Level::ERROR);
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Text.to_string(), "text");
        assert_eq!(OutputFormat::Json.to_string(), "json");
        assert_eq!(OutputFormat::Yaml.to_string(), "yaml");
    }

    #[test]
    fn test_cli_flag_defaults() {
        let cli = Cli::parse_from(["jolokia-exporter"]);
        assert!(!cli.validate);
        assert!(!cli.dry_run);
        assert_eq!(cli.log_format, LogFormat::Text);
        assert_eq!(cli.output_format, OutputFormat::Text);
    }

    #[test]
    fn test_cli_with_options() {
        let cli = Cli::parse_from([
            "jolokia-exporter",
            "-c",
            "custom.yaml",
            "-p",
            "8080",
            "--log-level",
            "debug",
            "--log-format",
            "json",
            "--app-version",
            "1.2.3",
            "--validate",
        ]);
        assert_eq!(cli.config, PathBuf::from("custom.yaml"));
        assert_eq!(cli.port, Some(8080));
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.app_version, "1.2.3");
        assert!(cli.validate);
    }

    #[test]
    fn test_cli_dry_run() {
        let cli = Cli::parse_from(["jolokia-exporter", "--dry-run", "--output-format", "json"]);
        assert!(cli.dry_run);
        assert_eq!(cli.output_format, OutputFormat::Json);
    }

    #[test]
    fn test_apply_overrides() {
        let cli = Cli::parse_from([
            "jolokia-exporter",
            "-p",
            "9000",
            "--bind-address",
            "127.0.0.1",
            "--metrics-path",
            "/custom-metrics",
            "--jolokia-url",
            "https://jmx:8443/jolokia",
            "--jolokia-timeout",
            "10000",
            "--username",
            "admin",
            "--password",
            "secret",
            "--accept-invalid-certs",
        ]);

        let mut config = Config::default();
        cli.apply_to(&mut config);

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.server.path, "/custom-metrics");
        assert_eq!(config.jolokia.url, "https://jmx:8443/jolokia");
        assert_eq!(config.jolokia.timeout_ms, 10000);
        assert_eq!(config.jolokia.credentials(), Some(("admin", "secret")));
        assert!(config.jolokia.accept_invalid_certs);
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    #[test]
    fn test_legacy_credential_vars() {
        let cli = Cli::parse_from(["jolokia-exporter", "-p", "9000"]);

        let mut config = Config::default();
        cli.apply_with_env(&mut config, lookup(&[("USERNAME", "jmx"), ("PASSWORD", "pw")]));
        assert_eq!(config.jolokia.credentials(), Some(("jmx", "pw")));

        // both halves are required
        let mut config = Config::default();
        cli.apply_with_env(&mut config, lookup(&[("USERNAME", "jmx")]));
        assert_eq!(config.jolokia.username, None);
    }

    #[test]
    fn test_configured_credentials_win_over_legacy_vars() {
        let cli = Cli::parse_from(["jolokia-exporter", "--username", "admin", "--password", "secret"]);

        let mut config = Config::default();
        cli.apply_with_env(&mut config, lookup(&[("USERNAME", "jmx"), ("PASSWORD", "pw")]));
        assert_eq!(config.jolokia.credentials(), Some(("admin", "secret")));
    }

    #[test]
    fn test_render_validation() {
        let rules = RuleSet::from_config(&[crate::config::RuleConfig {
            pattern: "java.lang<type=Memory><>HeapMemoryUsage/used".to_string(),
            name: "jvm_heap_used".to_string(),
            metric_type: MetricType::Gauge,
            ..Default::default()
        }])
        .unwrap();

        let text = render_validation(&rules, OutputFormat::Text).unwrap();
        assert_eq!(text, "Configuration is valid (1 rule(s))\n");

        let json: serde_json::Value =
            serde_json::from_str(&render_validation(&rules, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({"valid": true, "rules": 1}));

        let yaml = render_validation(&rules, OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("valid: true"));
        assert!(yaml.contains("rules: 1"));
    }

    #[test]
    fn test_render_dry_run() {
        let rules = RuleSet::from_rules(vec![
            Rule::builder("java.lang<type=Memory><>HeapMemoryUsage/used")
                .name("jvm_heap_used_bytes")
                .metric_type(MetricType::Gauge)
                .build()
                .unwrap(),
            Rule::builder("java.lang<type=Threading><>ThreadCount")
                .name("jvm_threads")
                .metric_type(MetricType::Gauge)
                .build()
                .unwrap(),
        ]);

        let json = render_dry_run(&rules, OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["mbean"], "java.lang:type=Memory");
        assert_eq!(parsed[0]["attribute"], "HeapMemoryUsage");
        assert_eq!(parsed[0]["type"], "gauge");
        assert!(parsed[1].get("attribute").is_none());

        let text = render_dry_run(&rules, OutputFormat::Text).unwrap();
        assert!(text.starts_with("2 rule(s)\n"));
        assert!(text.contains("attribute: -"));

        let yaml = render_dry_run(&rules, OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("selector: used"));
    }
}

//! Error types for jolokia-exporter
//!
//! This module defines the error types used throughout the application.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors raised while turning rule configuration into [`crate::transformer::Rule`]s
#[derive(Error, Debug)]
pub enum RuleError {
    /// Pattern does not follow `<class><<path>><><attribute>`
    #[error("Invalid pattern '{pattern}': expected '<mbean-class><<mbean-path>><><attribute>'")]
    InvalidPattern { pattern: String },

    /// Attribute selector regex failed to compile
    #[error("Invalid attribute regex '{regex}': {source}")]
    InvalidAttributeRegex {
        regex: String,
        #[source]
        source: regex::Error,
    },

    /// Attribute selector uses syntax the regex engine cannot run
    #[error("Unsupported regex syntax in attribute selector '{regex}': {feature}")]
    UnsupportedSyntax { regex: String, feature: String },

    /// Rule validation error
    #[error("Rule validation error: {0}")]
    Validation(String),

    /// Rule construction failed (with index)
    #[error("Failed to build rule at index {index}: {source}")]
    RuleCompileFailed {
        index: usize,
        #[source]
        source: Box<RuleError>,
    },
}

/// A single MBean read inside an otherwise successful bulk response failed.
///
/// These are recoverable: the owning rule contributes no lines for the cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "Read of '{mbean}' failed{}: {message}",
    .status.map(|s| format!(" (status {})", s)).unwrap_or_default()
)]
pub struct MBeanReadError {
    /// Target MBean of the failing request
    pub mbean: String,
    /// Jolokia status code, if reported
    pub status: Option<u16>,
    /// Java exception class, if reported
    pub error_type: Option<String>,
    /// Error message reported by the proxy
    pub message: String,
}

/// Errors surfaced by HTTP handlers
///
/// Startup failures (config, rules) never reach a handler; they abort `main`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Collector error
    #[error("Collector error: {0}")]
    Collector(#[from] CollectorError),
}

/// Transport errors of the batched Jolokia call
#[derive(Error, Debug)]
pub enum CollectorError {
    /// HTTP 클라이언트 초기화 실패
    #[error("Failed to initialize HTTP client: {0}")]
    HttpClientInit(#[source] reqwest::Error),

    /// HTTP 요청 실패
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[source] reqwest::Error),

    /// HTTP 응답 읽기 실패
    #[error("Failed to read HTTP response: {0}")]
    HttpResponse(#[source] reqwest::Error),

    /// HTTP 상태 코드 에러
    #[error("HTTP error status: {0}")]
    HttpStatus(u16),

    /// JSON 파싱 에러
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// 타임아웃
    /// The value is the configured timeout in milliseconds, if known.
    #[error("Request timed out{}", .0.map(|ms| format!(" after {}ms", ms)).unwrap_or_default())]
    Timeout(Option<u64>),

    /// 연결 실패
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// 인증 실패
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Bulk response cannot be correlated with the request positionally
    #[error("Bulk response has {actual} entries, expected {expected}")]
    ResponseMismatch { expected: usize, actual: usize },
}

impl CollectorError {
    /// HTTP 상태 코드 추출
    pub fn http_status(&self) -> Option<u16> {
        match self {
            CollectorError::HttpStatus(code) => Some(*code),
            _ => None,
        }
    }

    /// Create a Timeout error with known duration
    pub fn timeout_with_duration(ms: u64) -> Self {
        CollectorError::Timeout(Some(ms))
    }
}

impl From<reqwest::Error> for CollectorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest does not expose the configured duration here;
            // JolokiaClient attaches it when it knows it.
            CollectorError::Timeout(None)
        } else if err.is_connect() {
            CollectorError::ConnectionFailed(err.to_string())
        } else if err.is_request() {
            CollectorError::HttpRequest(err)
        } else {
            CollectorError::HttpResponse(err)
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, public_message, log_message) = match self {
            AppError::Collector(e) => (StatusCode::BAD_GATEWAY, "Collector error", e.to_string()),
        };

        tracing::error!(status = %status, error = %log_message, "Request failed");

        (status, public_message).into_response()
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

//! Jolokia 요청/응답 와이어 타입
//!
//! Bulk read requests and the per-request entries of the response array.
//! Values are kept as raw JSON so object key order survives for rule matching.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CollectorError, MBeanReadError};

/// Collector 작업 결과 타입
pub type CollectResult<T> = Result<T, CollectorError>;

/// One `read` record of a bulk request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadRequest {
    /// Always `read`
    #[serde(rename = "type")]
    pub request_type: String,
    /// MBean ObjectName
    pub mbean: String,
    /// Attribute (path); omitted to read every attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl ReadRequest {
    /// Build a `read` request
    pub fn read(mbean: String, attribute: Option<String>) -> Self {
        Self {
            request_type: "read".to_string(),
            mbean,
            attribute,
        }
    }
}

/// One entry of a Jolokia bulk response
///
/// Either a success (`value`) or an error descriptor (`error`, `stacktrace`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JolokiaResponse {
    /// Echo of the request
    #[serde(default)]
    pub request: Option<Value>,
    /// 응답 값: scalar, object, or array of objects
    #[serde(default)]
    pub value: Value,
    /// 응답 상태 코드
    #[serde(default)]
    pub status: Option<u16>,
    /// 타임스탬프 (Unix epoch)
    #[serde(default)]
    pub timestamp: Option<u64>,
    /// 에러 메시지 (실패 시)
    #[serde(default)]
    pub error: Option<String>,
    /// 에러 타입 (실패 시)
    #[serde(default)]
    pub error_type: Option<String>,
    /// Java stack trace (실패 시)
    #[serde(default)]
    pub stacktrace: Option<Value>,
}

impl JolokiaResponse {
    /// Successful entry carrying `value`
    pub fn success(value: Value) -> Self {
        Self {
            value,
            status: Some(200),
            ..Self::default()
        }
    }

    /// Whether this entry reports a failed read.
    ///
    /// A non-empty stack trace, an `error` field or a non-200 status all count.
    pub fn is_error(&self) -> bool {
        let has_stacktrace = match &self.stacktrace {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        };

        has_stacktrace || self.error.is_some() || self.status.is_some_and(|s| s != 200)
    }

    /// Error details for an entry that [`is_error`](Self::is_error)
    pub fn read_error(&self, mbean: &str) -> Option<MBeanReadError> {
        if !self.is_error() {
            return None;
        }

        Some(MBeanReadError {
            mbean: mbean.to_string(),
            status: self.status,
            error_type: self.error_type.clone(),
            message: self
                .error
                .clone()
                .unwrap_or_else(|| "error entry without message".to_string()),
        })
    }
}

/// Bulk 응답 파싱
pub fn parse_bulk_response(json: &str) -> CollectResult<Vec<JolokiaResponse>> {
    serde_json::from_str(json).map_err(|e| CollectorError::JsonParse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_request_serialization() {
        let request = ReadRequest::read(
            "java.lang:type=Memory".to_string(),
            Some("HeapMemoryUsage".to_string()),
        );
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"type": "read", "mbean": "java.lang:type=Memory", "attribute": "HeapMemoryUsage"})
        );

        let request = ReadRequest::read("java.lang:type=Threading".to_string(), None);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"type": "read", "mbean": "java.lang:type=Threading"})
        );
    }

    #[test]
    fn test_parse_bulk_response() {
        let json = r#"[
            {
                "request": {"mbean": "java.lang:type=Threading", "attribute": "ThreadCount", "type": "read"},
                "value": 42,
                "status": 200,
                "timestamp": 1609459200
            },
            {
                "request": {"mbean": "java.lang:type=Memory", "type": "read"},
                "value": {"used": 1000000, "max": 2000000},
                "status": 200,
                "timestamp": 1609459200
            }
        ]"#;

        let responses = parse_bulk_response(json).unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].value, json!(42));
        assert!(!responses[0].is_error());
        assert_eq!(responses[1].timestamp, Some(1609459200));
    }

    #[test]
    fn test_object_key_order_preserved() {
        let json = r#"[{"value": {"zeta": 1, "alpha": 2, "mid": 3}, "status": 200}]"#;
        let responses = parse_bulk_response(json).unwrap();
        let keys: Vec<&str> = responses[0]
            .value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_error_entry_with_stacktrace() {
        let json = r#"[{
            "request": {"mbean": "invalid:type=NotFound", "type": "read"},
            "error_type": "javax.management.InstanceNotFoundException",
            "error": "No MBean found",
            "stacktrace": "javax.management.InstanceNotFoundException\n\tat ...",
            "status": 404
        }]"#;

        let responses = parse_bulk_response(json).unwrap();
        assert!(responses[0].is_error());

        let err = responses[0].read_error("invalid:type=NotFound").unwrap();
        assert_eq!(err.status, Some(404));
        assert_eq!(err.message, "No MBean found");
        assert_eq!(
            err.error_type.as_deref(),
            Some("javax.management.InstanceNotFoundException")
        );
    }

    #[test]
    fn test_error_detection_variants() {
        let only_stacktrace = JolokiaResponse {
            stacktrace: Some(json!("trace")),
            ..JolokiaResponse::default()
        };
        assert!(only_stacktrace.is_error());

        let empty_stacktrace = JolokiaResponse {
            stacktrace: Some(json!("")),
            ..JolokiaResponse::success(json!(1))
        };
        assert!(!empty_stacktrace.is_error());

        let bad_status = JolokiaResponse {
            status: Some(500),
            ..JolokiaResponse::default()
        };
        assert!(bad_status.is_error());

        assert!(!JolokiaResponse::success(json!({"a": 1})).is_error());
        assert!(JolokiaResponse::success(json!(1)).read_error("x:y=z").is_none());
    }

    #[test]
    fn test_parse_invalid_json() {
        let result = parse_bulk_response("{not json");
        assert!(matches!(result, Err(CollectorError::JsonParse(_))));

        // a bare object is not a bulk response
        let result = parse_bulk_response(r#"{"value": 1, "status": 200}"#);
        assert!(matches!(result, Err(CollectorError::JsonParse(_))));
    }
}

//! Jolokia HTTP 클라이언트
//!
//! Connection pooling과 타임아웃을 지원하는 비동기 HTTP 클라이언트입니다.
//! Only the bulk `read` operation is used: one POST per collection cycle.

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument};

use super::parser::{parse_bulk_response, CollectResult, JolokiaResponse, ReadRequest};
use super::Transport;
use crate::config::JolokiaConfig;
use crate::error::CollectorError;

/// Jolokia HTTP 클라이언트
#[derive(Clone)]
pub struct JolokiaClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    auth: Option<(String, String)>,
}

impl std::fmt::Debug for JolokiaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JolokiaClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("auth", &self.auth.as_ref().map(|(user, _)| user))
            .finish()
    }
}

impl JolokiaClient {
    /// 새 클라이언트 생성
    ///
    /// # Arguments
    /// * `base_url` - Jolokia 엔드포인트 URL (예: "http://localhost:8778/jolokia")
    /// * `timeout_ms` - 기본 타임아웃 (밀리초)
    pub fn new(base_url: &str, timeout_ms: u64) -> CollectResult<Self> {
        Self::build(base_url, timeout_ms, false)
    }

    /// Client configured from the `jolokia` config section
    pub fn from_config(config: &JolokiaConfig) -> CollectResult<Self> {
        let client = Self::build(&config.url, config.timeout_ms, config.accept_invalid_certs)?;

        Ok(match config.credentials() {
            Some((username, password)) => client.with_auth(username, password),
            None => client,
        })
    }

    fn build(base_url: &str, timeout_ms: u64, accept_invalid_certs: bool) -> CollectResult<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_millis(timeout_ms))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(CollectorError::HttpClientInit)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(timeout_ms),
            auth: None,
        })
    }

    /// Basic Auth 설정
    pub fn with_auth(mut self, username: &str, password: &str) -> Self {
        self.auth = Some((username.to_string(), password.to_string()));
        self
    }

    /// Endpoint the bulk request is posted to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Bulk Read - 여러 MBean 일괄 조회
    ///
    /// The response array is returned as-is; correlating it with `requests`
    /// is the caller's job.
    #[instrument(skip(self, requests), fields(count = requests.len()))]
    pub async fn read_mbeans_bulk(
        &self,
        requests: &[ReadRequest],
    ) -> CollectResult<Vec<JolokiaResponse>> {
        if requests.is_empty() {
            return Ok(vec![]);
        }

        debug!("Sending Jolokia bulk read request");

        let mut req = self.client.post(&self.base_url).json(requests);

        if let Some((username, password)) = &self.auth {
            req = req.basic_auth(username, Some(password));
        }

        let response = req.send().await.map_err(|e| self.classify(e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(CollectorError::AuthenticationFailed);
        }
        if !status.is_success() {
            return Err(CollectorError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;

        parse_bulk_response(&body)
    }

    fn classify(&self, err: reqwest::Error) -> CollectorError {
        if err.is_timeout() {
            CollectorError::timeout_with_duration(self.timeout.as_millis() as u64)
        } else {
            CollectorError::from(err)
        }
    }
}

#[async_trait]
impl Transport for JolokiaClient {
    async fn read_bulk(&self, requests: &[ReadRequest]) -> CollectResult<Vec<JolokiaResponse>> {
        self.read_mbeans_bulk(requests).await
    }
}

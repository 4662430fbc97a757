//! Jolokia JMX 메트릭 수집 모듈
//!
//! Issues one bulk read per collection cycle and hands the positionally
//! aligned responses to the [`TransformEngine`].
//!
//! # Example
//!
//! ```ignore
//! use jolokia_exporter::collector::{Collector, JolokiaClient};
//! use jolokia_exporter::transformer::{RuleSet, TransformEngine};
//!
//! let client = JolokiaClient::new("http://localhost:8778/jolokia", 5000)?;
//! let collector = Collector::new(client, TransformEngine::new(rules));
//! let lines = collector.collect().await?;
//! ```

mod client;
mod parser;

use async_trait::async_trait;
use tracing::{debug, instrument};

pub use client::JolokiaClient;
pub use parser::{parse_bulk_response, CollectResult, JolokiaResponse, ReadRequest};

use crate::error::CollectorError;
use crate::transformer::TransformEngine;

/// Batched read transport towards the JMX proxy
///
/// The returned entries must be in request order.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send every request in a single call
    async fn read_bulk(&self, requests: &[ReadRequest]) -> CollectResult<Vec<JolokiaResponse>>;
}

/// Collector 구조체 - 트랜스포트 + 규칙 엔진
///
/// Holds no mutable state; concurrent `collect` calls are independent.
#[derive(Debug)]
pub struct Collector<T> {
    transport: T,
    engine: TransformEngine,
}

impl<T: Transport> Collector<T> {
    /// 새 Collector 생성
    pub fn new(transport: T, engine: TransformEngine) -> Self {
        Self { transport, engine }
    }

    /// Run one collection cycle and return the exposition lines.
    ///
    /// Entries that report a read error are skipped; a failure of the bulk
    /// call itself is returned as is.
    ///
    /// # Errors
    /// Transport failures, and `CollectorError::ResponseMismatch` when the
    /// response cannot be aligned with the request.
    #[instrument(skip(self), fields(rules = self.engine.rules().len()))]
    pub async fn collect(&self) -> CollectResult<Vec<String>> {
        let requests = self.engine.requests();
        if requests.is_empty() {
            debug!("No rules configured, skipping Jolokia call");
            return Ok(vec![]);
        }

        let responses = self.transport.read_bulk(&requests).await?;
        if responses.len() != requests.len() {
            return Err(CollectorError::ResponseMismatch {
                expected: requests.len(),
                actual: responses.len(),
            });
        }

        let lines = self.engine.transform(&responses);
        debug!(lines = lines.len(), "Collection complete");

        Ok(lines)
    }

    /// 엔진 참조 반환
    pub fn engine(&self) -> &TransformEngine {
        &self.engine
    }

    /// 트랜스포트 참조 반환
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

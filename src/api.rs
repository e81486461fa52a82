use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::config::Config;
use crate::constants::{CHAT_PATH, HEALTH_PATH, HEALTH_TIMEOUT, MAX_TOKENS, TOP_M};

/// Tunable retrieval parameters as the form holds them.
///
/// `k` and `temperature` are raw text; they are coerced to numbers only when
/// the outbound request is built.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    pub k: String,
    pub temperature: String,
    pub rerank: bool,
}

impl QueryParams {
    pub fn new(k: u32, temperature: f64, rerank: bool) -> Self {
        Self {
            k: k.to_string(),
            temperature: temperature.to_string(),
            rerank,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.default_k, config.default_temperature, config.default_rerank)
    }
}

/// Coerce form text to a JSON number.
///
/// Blank text is `0`; integers stay integers; anything unparseable (or not
/// finite) is `None` and goes over the wire as `null`. No range checks: the
/// server owns validation.
pub fn coerce_number(text: &str) -> Option<Number> {
    let text = text.trim();
    if text.is_empty() {
        return Some(Number::from(0));
    }
    if let Ok(i) = text.parse::<i64>() {
        return Some(Number::from(i));
    }
    text.parse::<f64>().ok().and_then(Number::from_f64)
}

/// Outbound payload for `POST /chat`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRequest {
    pub query: String,
    pub k: Option<Number>,
    pub rerank: bool,
    pub top_m: u32,
    pub max_tokens: u32,
    pub temperature: Option<Number>,
}

impl QueryRequest {
    pub fn build(query: &str, params: &QueryParams) -> Self {
        Self {
            query: query.to_string(),
            k: coerce_number(&params.k),
            rerank: params.rerank,
            top_m: TOP_M,
            max_tokens: MAX_TOKENS,
            temperature: coerce_number(&params.temperature),
        }
    }
}

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl Health {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

/// The network collaborator behind the query controller.
///
/// Implementations return the parsed JSON body whatever the HTTP status;
/// `Err` is reserved for failures where no JSON body is available.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn chat(&self, request: &QueryRequest) -> Result<Value>;
}

#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.api_base.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> Result<Health> {
        let resp = self.client.get(self.endpoint(HEALTH_PATH)).send().await?;
        let health = resp.error_for_status()?.json::<Health>().await?;
        Ok(health)
    }

    /// Bounded health check; `None` when the backend is unreachable or slow
    pub async fn health_check(&self) -> Option<Health> {
        match tokio::time::timeout(HEALTH_TIMEOUT, self.health()).await {
            Ok(Ok(health)) => Some(health),
            Ok(Err(e)) => {
                tracing::debug!("Health check failed: {e:#}");
                None
            }
            Err(_) => {
                tracing::debug!("Health check timed out");
                None
            }
        }
    }
}

#[async_trait]
impl ChatTransport for ApiClient {
    async fn chat(&self, request: &QueryRequest) -> Result<Value> {
        let url = self.endpoint(CHAT_PATH);
        let resp = self.client.post(&url).json(request).send().await?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!("Chat endpoint returned HTTP {status}; interpreting body anyway");
        }

        let body = resp.json::<Value>().await?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_integer_text() {
        assert_eq!(coerce_number("6"), Some(Number::from(6)));
        assert_eq!(coerce_number(" 12 "), Some(Number::from(12)));
        assert_eq!(coerce_number("-3"), Some(Number::from(-3)));
    }

    #[test]
    fn test_coerce_decimal_text() {
        assert_eq!(coerce_number("0.2"), Number::from_f64(0.2));
        assert_eq!(coerce_number("1e-1"), Number::from_f64(0.1));
    }

    #[test]
    fn test_coerce_blank_is_zero() {
        assert_eq!(coerce_number(""), Some(Number::from(0)));
        assert_eq!(coerce_number("   "), Some(Number::from(0)));
    }

    #[test]
    fn test_coerce_garbage_is_none() {
        assert_eq!(coerce_number("six"), None);
        assert_eq!(coerce_number("NaN"), None);
        assert_eq!(coerce_number("inf"), None);
    }

    #[test]
    fn test_out_of_range_passes_through() {
        let params = QueryParams {
            k: "99".to_string(),
            temperature: "3.5".to_string(),
            rerank: false,
        };
        let request = QueryRequest::build("q", &params);
        assert_eq!(request.k, Some(Number::from(99)));
        assert_eq!(request.temperature, Number::from_f64(3.5));
    }

    #[test]
    fn test_request_wire_shape() {
        let params = QueryParams::new(6, 0.2, true);
        let request = QueryRequest::build("What is RAG?", &params);

        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(
            wire,
            json!({
                "query": "What is RAG?",
                "k": 6,
                "rerank": true,
                "top_m": 40,
                "max_tokens": 512,
                "temperature": 0.2
            })
        );
    }

    #[test]
    fn test_unparseable_params_serialize_as_null() {
        let params = QueryParams {
            k: "lots".to_string(),
            temperature: "warm".to_string(),
            rerank: true,
        };
        let wire = serde_json::to_value(QueryRequest::build("q", &params)).unwrap();
        assert_eq!(wire["k"], Value::Null);
        assert_eq!(wire["temperature"], Value::Null);
    }

    #[test]
    fn test_query_sent_untrimmed() {
        let request = QueryRequest::build("  padded  ", &QueryParams::new(6, 0.2, true));
        assert_eq!(request.query, "  padded  ");
    }

    #[test]
    fn test_endpoint_joins_base() {
        let client = ApiClient::new("http://localhost:8000/".to_string(), Duration::from_secs(1));
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.endpoint(CHAT_PATH), "http://localhost:8000/chat");
        assert_eq!(client.endpoint(HEALTH_PATH), "http://localhost:8000/health");
    }

    #[test]
    fn test_health_status() {
        let health: Health =
            serde_json::from_value(json!({"status": "ok", "service": "docuchat-pro", "version": "0.1.0"}))
                .unwrap();
        assert!(health.is_ok());
        assert_eq!(health.service.as_deref(), Some("docuchat-pro"));

        let degraded: Health = serde_json::from_value(json!({"status": "degraded"})).unwrap();
        assert!(!degraded.is_ok());
        assert!(degraded.version.is_none());
    }
}

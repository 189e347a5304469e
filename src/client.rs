//! Query executor: the single seam between the engine and the network.
//!
//! The engine only knows [`QueryExecutor`]. [`HttpExecutor`] implements it over
//! the service's JSON API with a blocking reqwest client; tests substitute
//! scripted executors.
use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::QueryError;
use crate::query::SearchQuery;
use crate::record::{SearchResult, lenient_counts, lenient_u64};

pub const DEFAULT_BASE_URL: &str = "https://api.keysco.re";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Performs one query against one source.
///
/// Implementations must be shareable across the engine's worker threads.
pub trait QueryExecutor: Send + Sync {
    fn perform_search(&self, query: &SearchQuery, source: &str)
    -> Result<SearchResult, QueryError>;

    fn perform_count(&self, query: &SearchQuery, source: &str)
    -> Result<CountResponse, QueryError>;
}

/// Body of a successful `/count` call. Single-source calls answer with a
/// bare count; aggregated calls with a per-source breakdown kept in service
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CountResponse {
    Breakdown {
        #[serde(deserialize_with = "lenient_u64")]
        total_count: u64,
        #[serde(default, deserialize_with = "lenient_u64")]
        took: u64,
        #[serde(deserialize_with = "lenient_counts")]
        counts: Vec<(String, u64)>,
    },
    Single {
        #[serde(deserialize_with = "lenient_u64")]
        count: u64,
    },
}

impl CountResponse {
    pub fn total(&self) -> u64 {
        match self {
            CountResponse::Single { count } => *count,
            CountResponse::Breakdown { counts, .. } => counts.iter().map(|(_, c)| c).sum(),
        }
    }
}

/// Connection settings supplied by the front end.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct HttpExecutor {
    client: Client,
    base_url: String,
}

impl HttpExecutor {
    pub fn new(config: &ClientConfig) -> Result<Self, QueryError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|e| QueryError::Transport(format!("invalid API key header: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| QueryError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn post<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, QueryError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| QueryError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::from_status(status.as_u16()));
        }
        let text = response
            .text()
            .map_err(|e| QueryError::Transport(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| QueryError::Decode(e.to_string()))
    }
}

impl QueryExecutor for HttpExecutor {
    fn perform_search(
        &self,
        query: &SearchQuery,
        source: &str,
    ) -> Result<SearchResult, QueryError> {
        self.post("search", &query.search_body(source))
    }

    fn perform_count(
        &self,
        query: &SearchQuery,
        source: &str,
    ) -> Result<CountResponse, QueryError> {
        self.post("count", &query.count_body(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn count_response_accepts_both_shapes() {
        let single: CountResponse = serde_json::from_value(json!({"count": 12})).unwrap();
        assert_eq!(single, CountResponse::Single { count: 12 });
        assert_eq!(single.total(), 12);

        let multi: CountResponse = serde_json::from_value(json!({
            "total_count": 30,
            "took": 5,
            "counts": {"snusbase": 10, "leakcheck": 20}
        }))
        .unwrap();
        assert_eq!(multi.total(), 30);
        assert!(matches!(multi, CountResponse::Breakdown { took: 5, .. }));
    }

    #[test]
    fn breakdown_tolerates_float_and_null_counts() {
        let resp: CountResponse = serde_json::from_str(
            r#"{"total_count":12,"took":3,"counts":{"snusbase":12.0,"leakcheck":null}}"#,
        )
        .unwrap();
        assert_eq!(
            resp,
            CountResponse::Breakdown {
                total_count: 12,
                took: 3,
                counts: vec![("snusbase".to_string(), 12), ("leakcheck".to_string(), 0)],
            }
        );
        assert_eq!(resp.total(), 12);
    }

    #[test]
    fn breakdown_keeps_service_order() {
        let resp: CountResponse = serde_json::from_str(
            r#"{"total_count":3,"counts":{"xkeyscore":1,"snusbase":2,"leakcheck":0}}"#,
        )
        .unwrap();
        let c = crate::count::CountResult::from_response("ignored", resp);
        let order: Vec<&str> = c.per_source().iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(order, vec!["xkeyscore", "snusbase", "leakcheck"]);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let cfg = ClientConfig::new("k").with_base_url("http://localhost:9/");
        let exec = HttpExecutor::new(&cfg).unwrap();
        assert_eq!(exec.base_url, "http://localhost:9");
    }

    #[test]
    fn invalid_key_is_reported_not_panicked() {
        let cfg = ClientConfig::new("bad\nkey");
        assert!(matches!(
            HttpExecutor::new(&cfg),
            Err(QueryError::Transport(_))
        ));
    }
}

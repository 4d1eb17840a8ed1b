//! Database client used by the import workers
//!
//! [`DatabaseClient`] is the seam between the pipeline and the server;
//! [`HttpClient`] implements it over the HTTP `/ping`, `/query` and `/write`
//! endpoints.

use crate::config::{Precision, WriteConsistency};
use crate::error::{ImportError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};

/// Header carrying the server version in `/ping` responses
const VERSION_HEADER: &str = "X-Influxdb-Version";

/// Operations the importer needs from the database.
///
/// Implementations must be safe to call from the executor and the
/// accumulator at the same time.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Liveness check before the import begins
    async fn ping(&self) -> Result<PingInfo>;

    /// Execute one statement. Transport failures are `Err`; statement
    /// failures reported by the server are embedded in the response.
    async fn execute_statement(&self, statement: &str, database: &str) -> Result<QueryResponse>;

    /// Write newline-separated line protocol in a single request
    async fn write_batch(
        &self,
        lines: &str,
        database: &str,
        retention_policy: &str,
        precision: Option<Precision>,
        consistency: Option<WriteConsistency>,
    ) -> Result<()>;
}

/// Result of a successful ping
#[derive(Debug, Clone)]
pub struct PingInfo {
    /// Server version, if advertised
    pub version: Option<String>,
    /// Round-trip time of the ping
    pub latency: Duration,
}

/// Response of a statement execution
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<StatementResult>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Per-statement part of a [`QueryResponse`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatementResult {
    #[serde(default)]
    pub statement_id: u64,
    #[serde(default)]
    pub series: Vec<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl QueryResponse {
    /// First error embedded in the response, top-level before per-result
    pub fn error(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or_else(|| self.results.iter().find_map(|r| r.error.as_deref()))
    }
}

/// Credentials sent with every request
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// HTTP client for the query and write API
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl HttpClient {
    /// Create a client for the given server URL.
    ///
    /// `version` is advertised in the user agent. A `timeout` of `None`
    /// leaves requests unbounded.
    pub fn connect(
        server_url: &str,
        credentials: Credentials,
        version: &str,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        reqwest::Url::parse(server_url).map_err(|e| {
            ImportError::Config(format!("invalid server url '{}': {}", server_url, e))
        })?;

        let mut builder =
            reqwest::Client::builder().user_agent(format!("rusts-dump-import/{}", version));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let base_url = server_url.trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    /// Server address requests are sent to
    pub fn addr(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        if self.credentials.username.is_empty() {
            builder
        } else {
            builder.basic_auth(&self.credentials.username, Some(&self.credentials.password))
        }
    }
}

#[async_trait]
impl DatabaseClient for HttpClient {
    async fn ping(&self) -> Result<PingInfo> {
        let start = Instant::now();
        let response = self.request(reqwest::Method::GET, "/ping").send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ImportError::Server { status, message });
        }

        let version = response
            .headers()
            .get(VERSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(PingInfo {
            version,
            latency: start.elapsed(),
        })
    }

    async fn execute_statement(&self, statement: &str, database: &str) -> Result<QueryResponse> {
        let response = self
            .request(reqwest::Method::POST, "/query")
            .query(&[("q", statement), ("db", database)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // Statement errors come back as JSON, sometimes with a 4xx status
        match serde_json::from_str::<QueryResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => Err(ImportError::Server {
                status: status.as_u16(),
                message: body,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_batch(
        &self,
        lines: &str,
        database: &str,
        retention_policy: &str,
        precision: Option<Precision>,
        consistency: Option<WriteConsistency>,
    ) -> Result<()> {
        let mut params: Vec<(&str, &str)> = vec![("db", database)];
        if !retention_policy.is_empty() {
            params.push(("rp", retention_policy));
        }
        if let Some(precision) = precision {
            params.push(("precision", precision.as_str()));
        }
        if let Some(consistency) = consistency {
            params.push(("consistency", consistency.as_str()));
        }

        let response = self
            .request(reqwest::Method::POST, "/write")
            .query(&params)
            .header("Content-Type", "text/plain")
            .body(lines.to_string())
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            Err(ImportError::Server { status, message })
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_without_error() {
        let body = r#"{"results":[{"statement_id":0}]}"#;
        let response: QueryResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.results.len(), 1);
        assert!(response.error().is_none());
    }

    #[test]
    fn test_response_result_error() {
        let body = concat!(
            r#"{"results":[{"statement_id":0},"#,
            r#"{"statement_id":1,"error":"database not found: foo"}]}"#
        );
        let response: QueryResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.error(), Some("database not found: foo"));
    }

    #[test]
    fn test_response_top_level_error_wins() {
        let body = r#"{"error":"error parsing query","results":[{"error":"other"}]}"#;
        let response: QueryResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.error(), Some("error parsing query"));
    }

    #[test]
    fn test_connect_trims_trailing_slash() {
        let client =
            HttpClient::connect("http://localhost:8086/", Credentials::default(), "1.0", None)
                .unwrap();
        assert_eq!(client.addr(), "http://localhost:8086");
    }

    #[test]
    fn test_connect_rejects_invalid_url() {
        let result = HttpClient::connect("localhost 8086", Credentials::default(), "1.0", None);
        assert!(matches!(result, Err(ImportError::Config(_))));
    }
}

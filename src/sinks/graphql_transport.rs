use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::service::GraphqlConfig;
use crate::observability::metrics::get_metrics;
use crate::sinks::pipeline::{OutgoingRequest, Transport};
use crate::utils::constants::DEFAULT_HTTP_TIMEOUT_MS;

static OK_MSG: &str = "ok";
static HTTP_ERROR_MSG: &str = "http_error";
static GRAPHQL_ERROR_MSG: &str = "graphql_error";

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

/// POSTs GraphQL requests over HTTP and returns the `data` member of the response.
#[derive(Debug, Clone)]
pub struct GraphqlTransport {
    client: Client,
    url: String,
    timeout: Duration,
}

impl GraphqlTransport {
    pub fn new(client: Client, config: &GraphqlConfig) -> Self {
        Self {
            client,
            url: config.url.clone(),
            timeout: Duration::from_millis(config.timeout_ms.unwrap_or(DEFAULT_HTTP_TIMEOUT_MS)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for GraphqlTransport {
    async fn send(&self, request: OutgoingRequest) -> Result<Value> {
        let metrics = get_metrics();
        debug!(url = %self.url, "sending graphql request");

        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .headers(request.headers)
            .json(&request.body)
            .send()
            .await
            .inspect_err(|_| {
                metrics.graphql_requests.with_label_values(&[HTTP_ERROR_MSG]).inc();
            })?;

        let status = response.status();
        if !status.is_success() {
            metrics.graphql_requests.with_label_values(&[HTTP_ERROR_MSG]).inc();
            return Err(anyhow!("GraphQL request failed: {}", status));
        }

        let body: GraphqlResponse = response.json().await?;
        if !body.errors.is_empty() {
            metrics.graphql_requests.with_label_values(&[GRAPHQL_ERROR_MSG]).inc();
            let messages: Vec<&str> = body.errors.iter().map(|e| e.message.as_str()).collect();
            warn!(errors = body.errors.len(), "graphql response carried errors");
            return Err(anyhow!("GraphQL errors: {}", messages.join(", ")));
        }

        metrics.graphql_requests.with_label_values(&[OK_MSG]).inc();
        Ok(body.data.unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use http::{HeaderMap, HeaderValue};
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use reqwest::Client;
    use serde_json::json;

    use super::GraphqlTransport;
    use crate::config::service::GraphqlConfig;
    use crate::sinks::pipeline::{GraphqlRequest, OutgoingRequest, Transport};

    fn transport(url: String) -> GraphqlTransport {
        GraphqlTransport::new(
            Client::new(),
            &GraphqlConfig { url, timeout_ms: Some(2000), headers: None },
        )
    }

    #[tokio::test]
    async fn forwards_headers_and_returns_data() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/graphql")
                    .header("x-trace", "42")
                    .json_body(json!({ "query": "{ me { id } }" }));
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(json!({ "data": { "me": { "id": "1" } } }));
            })
            .await;

        let mut headers = HeaderMap::new();
        headers.insert("x-trace", HeaderValue::from_static("42"));
        let request = OutgoingRequest { headers, body: GraphqlRequest::new("{ me { id } }") };

        let data = transport(server.url("/graphql")).send(request).await.unwrap();

        assert_eq!(data, json!({ "me": { "id": "1" } }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn graphql_errors_fail_the_request() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/graphql");
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(json!({
                        "data": null,
                        "errors": [{ "message": "not authorized" }]
                    }));
            })
            .await;

        let request = OutgoingRequest {
            headers: HeaderMap::new(),
            body: GraphqlRequest::new("{ me { id } }"),
        };
        let err = transport(server.url("/graphql")).send(request).await.unwrap_err();

        assert_eq!(err.to_string(), "GraphQL errors: not authorized");
    }

    #[tokio::test]
    async fn http_status_failure_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/graphql");
                then.status(503);
            })
            .await;

        let request = OutgoingRequest {
            headers: HeaderMap::new(),
            body: GraphqlRequest::new("{ me { id } }"),
        };
        let err = transport(server.url("/graphql")).send(request).await.unwrap_err();

        assert!(err.to_string().contains("503"), "{err}");
    }
}

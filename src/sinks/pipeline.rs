use anyhow::Result;
use http::HeaderMap;
use serde::Serialize;
use serde_json::Value;

/// Body of a GraphQL request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GraphqlRequest {
    pub query: String,
    #[serde(rename = "operationName", skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
}

impl GraphqlRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            operation_name: None,
            variables: None,
        }
    }

    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = Some(variables);
        self
    }
}

#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub headers: HeaderMap,
    pub body: GraphqlRequest,
}

/// A step that inspects or rewrites a request before it is sent.
pub trait RequestDecorator: Send + Sync {
    fn decorate(&self, request: OutgoingRequest) -> Result<OutgoingRequest>;
}

impl<F> RequestDecorator for F
where
    F: Fn(OutgoingRequest) -> Result<OutgoingRequest> + Send + Sync,
{
    fn decorate(&self, request: OutgoingRequest) -> Result<OutgoingRequest> {
        self(request)
    }
}

/// Final step of the pipeline: puts the request on the wire and returns GraphQL `data`.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: OutgoingRequest,
    ) -> impl std::future::Future<Output = Result<Value>> + Send;
}

/// Decorators run in insertion order, then the transport sends.
pub struct RequestPipeline<T> {
    base_headers: HeaderMap,
    decorators: Vec<Box<dyn RequestDecorator>>,
    transport: T,
}

impl<T: Transport> RequestPipeline<T> {
    pub fn new(transport: T) -> Self {
        Self {
            base_headers: HeaderMap::new(),
            decorators: Vec::new(),
            transport,
        }
    }

    /// Headers every request starts with, before any decorator runs.
    pub fn with_base_headers(mut self, headers: HeaderMap) -> Self {
        self.base_headers = headers;
        self
    }

    pub fn with_decorator(mut self, decorator: impl RequestDecorator + 'static) -> Self {
        self.decorators.push(Box::new(decorator));
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn request(&self, body: GraphqlRequest) -> OutgoingRequest {
        OutgoingRequest {
            headers: self.base_headers.clone(),
            body,
        }
    }

    /// Runs every decorator; the first failure aborts the request.
    pub fn prepare(&self, request: OutgoingRequest) -> Result<OutgoingRequest> {
        self.decorators
            .iter()
            .try_fold(request, |request, decorator| decorator.decorate(request))
    }

    pub async fn dispatch(&self, request: OutgoingRequest) -> Result<Value> {
        let request = self.prepare(request)?;
        self.transport.send(request).await
    }

    pub async fn query(&self, query: &str, variables: Option<Value>) -> Result<Value> {
        let mut body = GraphqlRequest::new(query);
        body.variables = variables;
        self.dispatch(self.request(body)).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::{anyhow, Result};
    use http::{HeaderMap, HeaderValue};
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    use super::{GraphqlRequest, OutgoingRequest, RequestPipeline, Transport};

    #[derive(Default, Clone)]
    struct RecordingTransport {
        sent: Arc<Mutex<Vec<OutgoingRequest>>>,
    }

    impl Transport for RecordingTransport {
        async fn send(&self, request: OutgoingRequest) -> Result<Value> {
            self.sent.lock().push(request);
            Ok(json!({ "ok": true }))
        }
    }

    fn tag(
        name: &'static str,
    ) -> impl Fn(OutgoingRequest) -> Result<OutgoingRequest> + Send + Sync {
        move |mut request: OutgoingRequest| {
            let order = request
                .headers
                .get("x-order")
                .and_then(|v| v.to_str().ok())
                .map(|v| format!("{v},{name}"))
                .unwrap_or_else(|| name.to_owned());
            request.headers.insert("x-order", HeaderValue::from_str(&order)?);
            Ok(request)
        }
    }

    #[tokio::test]
    async fn decorators_run_in_order_before_transport() {
        let transport = RecordingTransport::default();
        let mut base = HeaderMap::new();
        base.insert("x-client", HeaderValue::from_static("relay"));
        let pipeline = RequestPipeline::new(transport.clone())
            .with_base_headers(base)
            .with_decorator(tag("first"))
            .with_decorator(tag("second"));

        let data = pipeline.query("{ me { id } }", Some(json!({ "a": 1 }))).await.unwrap();

        assert_eq!(data, json!({ "ok": true }));
        let sent = transport.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].headers["x-order"], "first,second");
        assert_eq!(sent[0].headers["x-client"], "relay");
        assert_eq!(
            sent[0].body,
            GraphqlRequest::new("{ me { id } }").with_variables(json!({ "a": 1 }))
        );
    }

    #[tokio::test]
    async fn failing_decorator_aborts_before_send() {
        let transport = RecordingTransport::default();
        let pipeline = RequestPipeline::new(transport.clone())
            .with_decorator(|_: OutgoingRequest| -> Result<OutgoingRequest> {
                Err(anyhow!("refused"))
            })
            .with_decorator(tag("never"));

        let err = pipeline.query("{ me { id } }", None).await.unwrap_err();

        assert_eq!(err.to_string(), "refused");
        assert!(transport.sent.lock().is_empty());
    }

    #[test]
    fn request_body_serializes_graphql_field_names() {
        let mut body = GraphqlRequest::new("query Me { me { id } }");
        body.operation_name = Some("Me".into());

        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value, json!({ "query": "query Me { me { id } }", "operationName": "Me" }));
    }
}

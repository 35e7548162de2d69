use std::time::Duration;

use anyhow::{Context, Result};
use http::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use tracing::info;

use crate::cache::token_store::TokenStore;
use crate::config::service::{GraphqlConfig, ServiceConfig};
use crate::lifecycle::binding::{LifecycleBinding, TokenMirror};
use crate::sinks::graphql_transport::GraphqlTransport;
use crate::sinks::request_auth::RequestAuthDecorator;
use crate::sinks::GraphqlClient;
use crate::sources::graphql_auth::GraphqlAuthenticator;
use crate::sources::sign_in::SignIn;
use crate::utils::constants::DEFAULT_HTTP_TIMEOUT_MS;

/// Builds every component once and hands each of them the same [`TokenStore`].
pub struct Container {
    token_store: TokenStore,
    sign_in: SignIn<GraphqlAuthenticator>,
    graphql: GraphqlClient,
}

impl Container {
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(
                config.auth.timeout_ms.unwrap_or(DEFAULT_HTTP_TIMEOUT_MS),
            ))
            .build()
            .context("failed to build HTTP client")?;

        let token_store = TokenStore::new();
        let sign_in = SignIn::new(
            token_store.clone(),
            GraphqlAuthenticator::new(client.clone(), &config.auth),
        );
        let graphql = build_graphql_client(client, &config.graphql, &token_store)?;
        info!(auth_url = %config.auth.url, graphql_url = %config.graphql.url, "container ready");

        Ok(Self { token_store, sign_in, graphql })
    }

    /// The shared store; every call returns a handle to the same instance.
    pub fn token_store(&self) -> TokenStore {
        self.token_store.clone()
    }

    pub fn sign_in(&self) -> &SignIn<GraphqlAuthenticator> {
        &self.sign_in
    }

    pub fn graphql(&self) -> &GraphqlClient {
        &self.graphql
    }

    pub fn binding(&self, mirror: TokenMirror) -> LifecycleBinding {
        LifecycleBinding::new(self.token_store(), mirror)
    }
}

/// Auth decoration is installed first so it runs before the transport sends.
pub fn build_graphql_client(
    client: Client,
    config: &GraphqlConfig,
    store: &TokenStore,
) -> Result<GraphqlClient> {
    let mut base_headers = HeaderMap::new();
    for (name, value) in config.headers.iter().flatten() {
        base_headers.insert(
            HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("invalid header name '{}'", name))?,
            HeaderValue::from_str(value)
                .with_context(|| format!("invalid value for header '{}'", name))?,
        );
    }

    Ok(GraphqlClient::new(GraphqlTransport::new(client, config))
        .with_base_headers(base_headers)
        .with_decorator(RequestAuthDecorator::new(store.clone())))
}

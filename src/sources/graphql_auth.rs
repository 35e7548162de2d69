use std::time::Duration;

use anyhow::{anyhow, Error, Result};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::service::{AuthConfig, AuthFormat};
use crate::sources::{Authenticator, Credential};
use crate::utils::constants::{
    DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_SIGN_IN_MUTATION, DEFAULT_TOKEN_POINTER,
};

/// Signs in against an HTTP endpoint, either through a GraphQL mutation or a
/// plain JSON body, and picks the token out of the response with a JSON pointer.
#[derive(Debug, Clone)]
pub struct GraphqlAuthenticator {
    client: Client,
    url: String,
    format: AuthFormat,
    mutation: String,
    token_pointer: String,
    timeout: Duration,
}

impl GraphqlAuthenticator {
    pub fn new(client: Client, config: &AuthConfig) -> Self {
        Self {
            client,
            url: config.url.clone(),
            format: config.format,
            mutation: config
                .mutation
                .clone()
                .unwrap_or_else(|| DEFAULT_SIGN_IN_MUTATION.to_owned()),
            token_pointer: config
                .token_pointer
                .clone()
                .unwrap_or_else(|| DEFAULT_TOKEN_POINTER.to_owned()),
            timeout: Duration::from_millis(config.timeout_ms.unwrap_or(DEFAULT_HTTP_TIMEOUT_MS)),
        }
    }

    fn request_body(&self, credential: &Credential) -> Value {
        let variables = json!({
            "username": credential.username,
            "password": credential.password,
        });
        match self.format {
            AuthFormat::Graphql => json!({ "query": self.mutation, "variables": variables }),
            AuthFormat::Json => variables,
        }
    }
}

impl Authenticator for GraphqlAuthenticator {
    async fn authenticate(&self, credential: &Credential) -> Result<String, Error> {
        debug!(url = %self.url, format = ?self.format, "sending sign-in request");
        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&self.request_body(credential))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("sign-in request failed: {}", response.status()));
        }
        let body: Value = response.json().await?;
        extract_token(&body, self.format, &self.token_pointer)
    }
}

/// Pull the token out of a sign-in response, surfacing GraphQL errors first.
pub fn extract_token(body: &Value, format: AuthFormat, token_pointer: &str) -> Result<String> {
    if format == AuthFormat::Graphql {
        if let Some(errors) = body
            .get("errors")
            .and_then(Value::as_array)
            .filter(|e| !e.is_empty())
        {
            let messages: Vec<&str> = errors
                .iter()
                .map(|e| e.get("message").and_then(Value::as_str).unwrap_or("unknown error"))
                .collect();
            return Err(anyhow!("sign-in rejected: {}", messages.join(", ")));
        }
    }

    body.pointer(token_pointer)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| anyhow!("body field '{}' not found or not a string", token_pointer))
}

#[cfg(test)]
mod tests {
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use reqwest::Client;
    use serde_json::json;

    use super::{extract_token, GraphqlAuthenticator};
    use crate::config::service::{AuthConfig, AuthFormat};
    use crate::sources::{Authenticator, Credential};
    use crate::utils::constants::{DEFAULT_SIGN_IN_MUTATION, DEFAULT_TOKEN_POINTER};

    fn auth_config(url: String, format: AuthFormat, token_pointer: Option<&str>) -> AuthConfig {
        AuthConfig {
            url,
            format,
            mutation: None,
            token_pointer: token_pointer.map(str::to_owned),
            timeout_ms: Some(2000),
        }
    }

    #[tokio::test]
    async fn graphql_mutation_returns_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/graphql").json_body(json!({
                    "query": DEFAULT_SIGN_IN_MUTATION,
                    "variables": { "username": "u", "password": "p" }
                }));
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(json!({ "data": { "signIn": { "token": "TOKEN123" } } }));
            })
            .await;

        let authenticator = GraphqlAuthenticator::new(
            Client::new(),
            &auth_config(server.url("/graphql"), AuthFormat::Graphql, None),
        );
        let token = authenticator.authenticate(&Credential::new("u", "p")).await.unwrap();

        assert_eq!(token, "TOKEN123");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn json_format_posts_plain_credentials() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/login")
                    .json_body(json!({ "username": "u", "password": "p" }));
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(json!({ "access_token": "plain-token", "expires_in": 3600 }));
            })
            .await;

        let authenticator = GraphqlAuthenticator::new(
            Client::new(),
            &auth_config(server.url("/login"), AuthFormat::Json, Some("/access_token")),
        );
        let token = authenticator.authenticate(&Credential::new("u", "p")).await.unwrap();

        assert_eq!(token, "plain-token");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/graphql");
                then.status(401).body("unauthorized");
            })
            .await;

        let authenticator = GraphqlAuthenticator::new(
            Client::new(),
            &auth_config(server.url("/graphql"), AuthFormat::Graphql, None),
        );
        let err = authenticator.authenticate(&Credential::new("u", "wrong")).await.unwrap_err();

        assert!(err.to_string().contains("401"), "{err}");
    }

    #[test]
    fn graphql_errors_take_precedence_over_data() {
        let body = json!({
            "data": { "signIn": null },
            "errors": [{ "message": "invalid credentials" }]
        });

        let err = extract_token(&body, AuthFormat::Graphql, DEFAULT_TOKEN_POINTER).unwrap_err();

        assert_eq!(err.to_string(), "sign-in rejected: invalid credentials");
    }

    #[test]
    fn missing_token_field_is_an_error() {
        let body = json!({ "data": { "signIn": { "token": 42 } } });

        let err = extract_token(&body, AuthFormat::Graphql, DEFAULT_TOKEN_POINTER).unwrap_err();

        assert!(err.to_string().contains(DEFAULT_TOKEN_POINTER));
    }
}

use std::sync::Arc;

use anyhow::anyhow;
use tokio::time::Instant;
use tracing::{error, info};

use crate::cache::token_store::TokenStore;
use crate::errors::AuthenticationError;
use crate::observability::metrics::get_metrics;
use crate::sources::{Authenticator, Credential};

/// Signs a user in and publishes the resulting token to the shared store.
///
/// Overlapping calls are not serialized: each one pushes its token when it
/// resolves, so the store ends up holding whichever call finished last.
pub struct SignIn<A> {
    store: TokenStore,
    authenticator: Arc<A>,
}

impl<A> Clone for SignIn<A> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            authenticator: self.authenticator.clone(),
        }
    }
}

impl<A: Authenticator> SignIn<A> {
    pub fn new(store: TokenStore, authenticator: A) -> Self {
        Self {
            store,
            authenticator: Arc::new(authenticator),
        }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Authenticates `credential` and pushes the token on success.
    ///
    /// An empty token from the endpoint is a failure: it is reported as an
    /// [`AuthenticationError`] and never pushed. On failure the store keeps its
    /// previous token. Nothing is retried.
    pub async fn execute(&self, credential: Credential) -> Result<String, AuthenticationError> {
        let metrics = get_metrics();
        let start = Instant::now();
        metrics.sign_in_requests.inc();
        info!(username = %credential.username, "signing in");

        let outcome = self
            .authenticator
            .authenticate(&credential)
            .await
            .and_then(|token| {
                if token.is_empty() {
                    Err(anyhow!("authentication endpoint returned an empty token"))
                } else {
                    Ok(token)
                }
            });
        metrics.sign_in_duration.observe(start.elapsed().as_secs_f64());

        match outcome {
            Ok(token) => {
                self.store.push(token.clone());
                info!(username = %credential.username, "signed in, token published");
                Ok(token)
            }
            Err(cause) => {
                metrics.sign_in_failures.inc();
                error!(username = %credential.username, error = %cause, "sign-in failed");
                Err(AuthenticationError::new(credential.username, cause))
            }
        }
    }
}

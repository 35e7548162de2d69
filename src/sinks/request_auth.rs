use anyhow::{Context, Result};
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue};
use tracing::debug;

use crate::cache::token_store::TokenStore;
use crate::observability::metrics::get_metrics;
use crate::sinks::pipeline::{OutgoingRequest, RequestDecorator};
use crate::utils::constants::BEARER_SCHEME;

static AUTHORIZED_MSG: &str = "true";
static ANONYMOUS_MSG: &str = "false";

/// Sets `Authorization: Bearer <token>` from the store's current value.
///
/// The token is read on every request and never cached, so a sign-in between
/// two requests is picked up by the second one.
#[derive(Debug, Clone)]
pub struct RequestAuthDecorator {
    store: TokenStore,
}

impl RequestAuthDecorator {
    pub fn new(store: TokenStore) -> Self {
        Self { store }
    }

    /// Adds the header when signed in; leaves `headers` untouched otherwise.
    pub fn apply(&self, headers: &mut HeaderMap) -> Result<()> {
        let metrics = get_metrics();
        let token = self.store.current_value();
        if token.is_empty() {
            metrics.decorated_requests.with_label_values(&[ANONYMOUS_MSG]).inc();
            debug!("no token, request sent without authorization");
            return Ok(());
        }

        let mut value = HeaderValue::from_str(&format!("{} {}", BEARER_SCHEME, token))
            .context("signed-in token is not a valid header value")?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
        metrics.decorated_requests.with_label_values(&[AUTHORIZED_MSG]).inc();
        debug!("authorization header set");
        Ok(())
    }
}

impl RequestDecorator for RequestAuthDecorator {
    fn decorate(&self, mut request: OutgoingRequest) -> Result<OutgoingRequest> {
        self.apply(&mut request.headers)?;
        Ok(request)
    }
}

use crate::config::service::{AuthFormat, ServiceConfig};
use crate::config::settings::LoggingConfig;
use crate::utils::constants::{
    DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_SIGN_IN_MUTATION, DEFAULT_TOKEN_POINTER,
};

pub fn initiate_default_values(mut config: ServiceConfig) -> ServiceConfig {
    if config.settings.logging.is_none() {
        config.settings.logging = Some(LoggingConfig::default());
    }

    let auth = &mut config.auth;
    if auth.token_pointer.is_none() {
        auth.token_pointer = Some(DEFAULT_TOKEN_POINTER.to_owned());
    }
    // the json format posts credentials only, so a mutation is never defaulted for it
    if auth.format == AuthFormat::Graphql && auth.mutation.is_none() {
        auth.mutation = Some(DEFAULT_SIGN_IN_MUTATION.to_owned());
    }
    auth.timeout_ms.get_or_insert(DEFAULT_HTTP_TIMEOUT_MS);
    config.graphql.timeout_ms.get_or_insert(DEFAULT_HTTP_TIMEOUT_MS);

    config
}

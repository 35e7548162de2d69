//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Validates:
//!   * endpoint URLs (http/https only)
//!   * sign-in format vs mutation / token pointer rules
//!   * timeouts
//!   * static GraphQL headers (valid, never `Authorization`)
//!   * logging level

use http::header::{HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use tracing::{error, info};

use crate::config::service::{AuthConfig, AuthFormat, GraphqlConfig, ServiceConfig};
use crate::config::settings::SettingsConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_auth(&cfg.auth, &mut errors);
    validate_graphql(&cfg.graphql, &mut errors);

    if errors.is_empty() {
        info!("config is valid");
        Ok(())
    } else {
        for e in &errors {
            error!("config validation: {}", e);
        }
        Err(errors)
    }
}

fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if let Some(logging) = &settings.logging {
        if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' is not one of {:?}",
                logging.level, LOG_LEVELS
            ));
        }
    }
}

fn validate_auth(auth: &AuthConfig, errors: &mut Vec<String>) {
    validate_url("auth.url", &auth.url, errors);
    validate_timeout("auth.timeout_ms", auth.timeout_ms, errors);

    match &auth.token_pointer {
        Some(pointer) if !pointer.starts_with('/') => errors.push(format!(
            "auth.token_pointer '{}' must be a JSON pointer starting with '/'",
            pointer
        )),
        _ => {}
    }

    match (auth.format, &auth.mutation) {
        (AuthFormat::Graphql, Some(mutation)) if mutation.trim().is_empty() => {
            errors.push("auth.mutation must not be empty for the graphql format".to_string());
        }
        (AuthFormat::Json, Some(_)) => {
            errors.push("auth.mutation is only used by the graphql format".to_string());
        }
        _ => {}
    }
}

fn validate_graphql(graphql: &GraphqlConfig, errors: &mut Vec<String>) {
    validate_url("graphql.url", &graphql.url, errors);
    validate_timeout("graphql.timeout_ms", graphql.timeout_ms, errors);

    for (name, value) in graphql.headers.iter().flatten() {
        match HeaderName::from_bytes(name.as_bytes()) {
            Ok(header) if header == AUTHORIZATION => errors.push(format!(
                "graphql.headers['{}'] is set from the signed-in token and must not be static",
                name
            )),
            Ok(_) => {}
            Err(_) => errors.push(format!(
                "graphql.headers['{}'] is not a valid header name",
                name
            )),
        }
        if HeaderValue::from_str(value).is_err() {
            errors.push(format!("graphql.headers['{}'] has an invalid value", name));
        }
    }
}

fn validate_url(field: &str, raw: &str, errors: &mut Vec<String>) {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(format!(
            "{} scheme '{}' must be http or https",
            field,
            url.scheme()
        )),
        Err(e) => errors.push(format!("{} '{}' is not a valid URL: {}", field, raw, e)),
    }
}

fn validate_timeout(field: &str, timeout_ms: Option<u64>, errors: &mut Vec<String>) {
    if timeout_ms == Some(0) {
        errors.push(format!("{} must be greater than 0", field));
    }
}

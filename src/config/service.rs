use serde::Deserialize;
use std::collections::HashMap;

use crate::config::settings::SettingsConfig;

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    pub auth: AuthConfig,
    pub graphql: GraphqlConfig,
}

/// ================================
/// Sign-in endpoint
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub url: String,
    #[serde(default)]
    pub format: AuthFormat,
    /// sign-in mutation, only used by the graphql format
    pub mutation: Option<String>,
    /// JSON pointer to the token inside the response body
    pub token_pointer: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthFormat {
    /// `{ query, variables: { username, password } }`
    #[default]
    Graphql,
    /// `{ username, password }`
    Json,
}

/// ================================
/// GraphQL API the token is propagated to
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct GraphqlConfig {
    pub url: String,
    pub timeout_ms: Option<u64>,
    /// static headers sent with every request, before auth decoration
    pub headers: Option<HashMap<String, String>>,
}

use thiserror::Error;

/// Sign-in failed; the token store was left untouched.
#[derive(Debug, Error)]
#[error("authentication failed for user '{username}': {cause}")]
pub struct AuthenticationError {
    pub username: String,
    #[source]
    pub cause: anyhow::Error,
}

impl AuthenticationError {
    pub fn new(username: impl Into<String>, cause: anyhow::Error) -> Self {
        Self { username: username.into(), cause }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindingError {
    #[error("lifecycle binding is already active")]
    AlreadyActive,
}

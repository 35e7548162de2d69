//! Sources module
//!
//! Where tokens come from: the credentials a user signs in with, the
//! authenticator that trades them for a token, and the sign-in operation
//! that publishes the result to the token store.

use anyhow::Error;

pub mod graphql_auth;
pub mod sign_in;

/// Username and password for one sign-in call. Never stored.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Trades credentials for a bearer token.
pub trait Authenticator: Send + Sync {
    fn authenticate(
        &self,
        credential: &Credential,
    ) -> impl std::future::Future<Output = Result<String, Error>> + Send;
}

#[cfg(test)]
mod tests {
    use super::Credential;

    #[test]
    fn debug_output_hides_password() {
        let credential = Credential::new("u", "hunter2");
        let printed = format!("{:?}", credential);

        assert!(printed.contains("\"u\""));
        assert!(!printed.contains("hunter2"));
    }
}

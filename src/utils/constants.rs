//! Shared constants and invariants

/// Token value of a store nobody has signed into yet.
pub const UNAUTHENTICATED: &str = "";

pub const BEARER_SCHEME: &str = "Bearer";
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5000;

pub const DEFAULT_TOKEN_POINTER: &str = "/data/signIn/token";
pub const DEFAULT_SIGN_IN_MUTATION: &str = "mutation SignIn($username: String!, $password: String!) { signIn(username: $username, password: $password) { token } }";

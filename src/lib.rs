//! # Token Relay Library
//!
//! Propagates a bearer token obtained at sign-in into the headers of every
//! later GraphQL request.
//!
//! Modules:
//! - `cache`: token store and its subscriptions
//! - `sources`: credentials, authenticators and the sign-in operation
//! - `sinks`: request pipeline, auth decorator and GraphQL transport
//! - `lifecycle`: binding a consuming context to the token store
//! - `container`: wiring one shared store into every component
//! - `config`: YAML configuration, defaults and validation

pub mod cache;
pub mod config;
pub mod container;
pub mod errors;
pub mod lifecycle;
pub mod observability;
pub mod sinks;
pub mod sources;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::cache::subscription::Subscription;
pub use crate::cache::token_store::TokenStore;
pub use crate::container::Container;
pub use crate::errors::{AuthenticationError, BindingError};
pub use crate::lifecycle::binding::{LifecycleBinding, TokenMirror};
pub use crate::sinks::request_auth::RequestAuthDecorator;
pub use crate::sources::sign_in::SignIn;
pub use crate::sources::{Authenticator, Credential};

//! Sinks: where the token ends up, the headers of outgoing GraphQL requests.

use crate::sinks::graphql_transport::GraphqlTransport;
use crate::sinks::pipeline::RequestPipeline;

pub mod graphql_transport;
pub mod pipeline;
pub mod request_auth;

/// GraphQL client: auth decoration ahead of the HTTP transport.
pub type GraphqlClient = RequestPipeline<GraphqlTransport>;

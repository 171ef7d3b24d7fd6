//! API module
//!
//! HTTP API endpoints, middleware, and the response envelope.

pub mod middleware;
pub mod response;
pub mod routes;

pub use response::{ApiResponse, JsonBody};
pub use routes::{create_public_router, create_router};

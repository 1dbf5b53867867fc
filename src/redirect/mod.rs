//! Public redirect surface
//!
//! Served on its own listener so redirect latency is isolated from the
//! management API. The hot path is cache-aside resolution plus a
//! fire-and-forget click job; analytics must never delay or fail a
//! redirect.

pub mod handlers;
pub mod resolver;
pub mod routes;

pub use resolver::Resolver;
pub use routes::create_redirect_router;

//! The API layer, containing web handlers and routing.

pub mod handlers;
pub mod router;

pub use handlers::ApiDoc;
pub use router::{
    DEFAULT_REQUEST_TIMEOUT, RateLimitConfig, RouterOptions, create_router,
    create_router_with_options, create_router_with_rate_limit,
};

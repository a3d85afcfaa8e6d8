//! The HTTP-facing layer: request funnel, per-request context, rate
//! limiting and the error taxonomy.

mod error;
mod funnel;
mod rate_limiter;
mod request;

pub use error::ApiError;
pub use funnel::Funnel;
pub use rate_limiter::{RESET_PERIOD, RateLimiter};
pub use request::{RequestContext, RequestParts};

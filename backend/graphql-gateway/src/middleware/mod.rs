//! GraphQL Gateway Middleware

pub mod jwt;
pub mod auth;
pub mod rate_limit;

pub use jwt::{JwtMiddleware, Claims};
pub use auth::{check_user_authorization, require_auth};
pub use rate_limit::{RateLimitMiddleware, RateLimitConfig};
